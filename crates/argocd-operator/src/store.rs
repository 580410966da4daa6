use std::fmt::Debug;
use std::future::Future;

use argocd_crds::ArgoCD;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::api::rbac::v1::{ClusterRole, Role};
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::{Client, Resource, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub const FIELD_MANAGER: &str = "argocd-operator";

/// A Kubernetes object the operator reads or writes through an
/// [`ObjectStore`].
pub trait KubeObject:
    Resource<DynamicType = ()> + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const NAMESPACED: bool;

    fn api(client: &Client, namespace: Option<&str>) -> Api<Self>;
}

macro_rules! namespaced {
    ($($ty:ty),*) => {$(
        impl KubeObject for $ty {
            const NAMESPACED: bool = true;

            fn api(client: &Client, namespace: Option<&str>) -> Api<Self> {
                match namespace {
                    Some(ns) => Api::namespaced(client.clone(), ns),
                    None => Api::default_namespaced(client.clone()),
                }
            }
        }
    )*};
}

macro_rules! cluster_scoped {
    ($($ty:ty),*) => {$(
        impl KubeObject for $ty {
            const NAMESPACED: bool = false;

            fn api(client: &Client, _namespace: Option<&str>) -> Api<Self> {
                Api::all(client.clone())
            }
        }
    )*};
}

namespaced!(Role, Deployment, ArgoCD);
cluster_scoped!(ClusterRole, Namespace);

/// Read/write access to cluster objects.
///
/// `get` maps not-found to `Ok(None)`; every other failure is returned as
/// the underlying [`kube::Error`]. `list` matches across all namespaces.
pub trait ObjectStore: Send + Sync {
    fn get<K: KubeObject>(
        &self,
        name: &str,
        namespace: Option<&str>,
    ) -> impl Future<Output = Result<Option<K>, kube::Error>> + Send;

    fn list<K: KubeObject>(
        &self,
        label_selector: &str,
    ) -> impl Future<Output = Result<Vec<K>, kube::Error>> + Send;

    fn create<K: KubeObject>(&self, obj: &K)
    -> impl Future<Output = Result<K, kube::Error>> + Send;

    fn update<K: KubeObject>(&self, obj: &K)
    -> impl Future<Output = Result<K, kube::Error>> + Send;

    fn delete<K: KubeObject>(
        &self,
        name: &str,
        namespace: Option<&str>,
    ) -> impl Future<Output = Result<(), kube::Error>> + Send;
}

fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(FIELD_MANAGER.into()),
        ..Default::default()
    }
}

impl ObjectStore for Client {
    async fn get<K: KubeObject>(
        &self,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<Option<K>, kube::Error> {
        K::api(self, namespace).get_opt(name).await
    }

    async fn list<K: KubeObject>(&self, label_selector: &str) -> Result<Vec<K>, kube::Error> {
        let lp = ListParams::default().labels(label_selector);
        Ok(Api::<K>::all(self.clone()).list(&lp).await?.items)
    }

    async fn create<K: KubeObject>(&self, obj: &K) -> Result<K, kube::Error> {
        K::api(self, obj.namespace().as_deref())
            .create(&post_params(), obj)
            .await
    }

    async fn update<K: KubeObject>(&self, obj: &K) -> Result<K, kube::Error> {
        K::api(self, obj.namespace().as_deref())
            .replace(&obj.name_any(), &post_params(), obj)
            .await
    }

    async fn delete<K: KubeObject>(
        &self,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<(), kube::Error> {
        K::api(self, namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
    }
}
