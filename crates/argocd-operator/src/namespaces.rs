use argocd_crds::ArgoCD;
use argocd_resources::common;
use k8s_openapi::api::core::v1::Namespace;
use kube::ResourceExt;
use tracing::debug;

use crate::store::ObjectStore;

/// Names of the namespaces labelled as managed by the instance's namespace.
/// Computed fresh on every call.
pub async fn managed_namespaces<S: ObjectStore>(
    store: &S,
    cr: &ArgoCD,
) -> Result<Vec<String>, kube::Error> {
    let selector = format!(
        "{}={}",
        common::MANAGED_BY_LABEL,
        common::instance_namespace(cr)
    );
    let namespaces: Vec<Namespace> = store.list(&selector).await?;
    let names: Vec<String> = namespaces.iter().map(|ns| ns.name_any()).collect();
    debug!(%selector, count = names.len(), "discovered managed namespaces");
    Ok(names)
}
