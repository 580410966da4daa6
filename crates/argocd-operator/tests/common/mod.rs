//! In-memory [`ObjectStore`] and fixtures shared by the reconcile tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::future::{Future, ready};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use argocd_crds::{ArgoCD, ArgoCDSpec};
use argocd_operator::{Context, KubeObject, ObjectStore, OperatorConfig};
use argocd_resources::common::MANAGED_BY_LABEL;
use k8s_openapi::api::core::v1::Namespace;
use kube::{Resource, ResourceExt};
use serde_json::{Value, json};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct ObjectKey {
    kind: String,
    namespace: Option<String>,
    name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verb {
    Get,
    List,
    Create,
    Update,
    Delete,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call {
    pub verb: Verb,
    pub kind: String,
    pub name: String,
}

/// Object store backed by a map of JSON documents. Every call is logged and
/// failures can be injected per verb and kind.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<ObjectKey, Value>>,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<Vec<(Verb, String, String)>>,
    server_defaults: AtomicBool,
}

fn kind_of<K: KubeObject>() -> String {
    K::kind(&()).to_string()
}

fn key<K: KubeObject>(name: &str, namespace: Option<&str>) -> ObjectKey {
    ObjectKey {
        kind: kind_of::<K>(),
        namespace: if K::NAMESPACED {
            namespace.map(str::to_string)
        } else {
            None
        },
        name: name.to_string(),
    }
}

fn matches_selector(labels: &BTreeMap<String, String>, selector: &str) -> bool {
    selector
        .split(',')
        .filter(|s| !s.is_empty())
        .all(|term| match term.split_once('=') {
            Some((k, v)) => labels.get(k).is_some_and(|l| l == v),
            None => labels.contains_key(term),
        })
}

fn error(message: impl Into<String>) -> kube::Error {
    let message: String = message.into();
    kube::Error::Service(message.into())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill in the fields the API server defaults on every Deployment that is
    /// created or updated, and hand back the defaulted object.
    pub fn with_server_defaults(self) -> Self {
        self.server_defaults.store(true, Ordering::Relaxed);
        self
    }

    pub fn with_object<K: KubeObject>(self, obj: K) -> Self {
        self.insert(&obj);
        self
    }

    pub fn insert<K: KubeObject>(&self, obj: &K) {
        let key = key::<K>(&obj.name_any(), obj.namespace().as_deref());
        let value = serde_json::to_value(obj).unwrap();
        self.objects.lock().unwrap().insert(key, value);
    }

    pub fn object<K: KubeObject>(&self, name: &str, namespace: Option<&str>) -> Option<K> {
        self.objects
            .lock()
            .unwrap()
            .get(&key::<K>(name, namespace))
            .map(|v| serde_json::from_value(v.clone()).unwrap())
    }

    pub fn objects<K: KubeObject>(&self) -> Vec<K> {
        let kind = kind_of::<K>();
        self.objects
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| k.kind == kind)
            .map(|(_, v)| serde_json::from_value(v.clone()).unwrap())
            .collect()
    }

    /// Make every `verb` on `K` fail with `message`.
    pub fn fail<K: KubeObject>(&self, verb: Verb, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .push((verb, kind_of::<K>(), message.to_string()));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Create, update and delete calls only.
    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c.verb, Verb::Create | Verb::Update | Verb::Delete))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record<K: KubeObject>(&self, verb: Verb, name: &str) -> Result<(), kube::Error> {
        let kind = kind_of::<K>();
        self.calls.lock().unwrap().push(Call {
            verb,
            kind: kind.clone(),
            name: name.to_string(),
        });
        let failures = self.failures.lock().unwrap();
        match failures.iter().find(|(v, k, _)| *v == verb && *k == kind) {
            Some((_, _, message)) => Err(error(message.clone())),
            None => Ok(()),
        }
    }

    fn get_now<K: KubeObject>(
        &self,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<Option<K>, kube::Error> {
        self.record::<K>(Verb::Get, name)?;
        Ok(self.object(name, namespace))
    }

    fn list_now<K: KubeObject>(&self, selector: &str) -> Result<Vec<K>, kube::Error> {
        self.record::<K>(Verb::List, selector)?;
        Ok(self
            .objects::<K>()
            .into_iter()
            .filter(|o| matches_selector(o.labels(), selector))
            .collect())
    }

    fn create_now<K: KubeObject>(&self, obj: &K) -> Result<K, kube::Error> {
        let name = obj.name_any();
        self.record::<K>(Verb::Create, &name)?;
        if self.object::<K>(&name, obj.namespace().as_deref()).is_some() {
            return Err(error(format!("{name} already exists")));
        }
        let mut stored = obj.clone();
        stored.meta_mut().resource_version = Some("1".into());
        Ok(self.persist(stored))
    }

    fn update_now<K: KubeObject>(&self, obj: &K) -> Result<K, kube::Error> {
        let name = obj.name_any();
        self.record::<K>(Verb::Update, &name)?;
        let Some(live) = self.object::<K>(&name, obj.namespace().as_deref()) else {
            return Err(error(format!("{name} not found")));
        };
        let version = live
            .resource_version()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        let mut stored = obj.clone();
        stored.meta_mut().resource_version = Some((version + 1).to_string());
        Ok(self.persist(stored))
    }

    fn persist<K: KubeObject>(&self, obj: K) -> K {
        if !self.server_defaults.load(Ordering::Relaxed) || kind_of::<K>() != "Deployment" {
            self.insert(&obj);
            return obj;
        }
        let mut value = serde_json::to_value(&obj).unwrap();
        default_deployment(&mut value);
        let defaulted: K = serde_json::from_value(value).unwrap();
        self.insert(&defaulted);
        defaulted
    }

    fn delete_now<K: KubeObject>(
        &self,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<(), kube::Error> {
        self.record::<K>(Verb::Delete, name)?;
        match self
            .objects
            .lock()
            .unwrap()
            .remove(&key::<K>(name, namespace))
        {
            Some(_) => Ok(()),
            None => Err(error(format!("{name} not found"))),
        }
    }
}

impl ObjectStore for MemoryStore {
    fn get<K: KubeObject>(
        &self,
        name: &str,
        namespace: Option<&str>,
    ) -> impl Future<Output = Result<Option<K>, kube::Error>> + Send {
        ready(self.get_now::<K>(name, namespace))
    }

    fn list<K: KubeObject>(
        &self,
        label_selector: &str,
    ) -> impl Future<Output = Result<Vec<K>, kube::Error>> + Send {
        ready(self.list_now::<K>(label_selector))
    }

    fn create<K: KubeObject>(
        &self,
        obj: &K,
    ) -> impl Future<Output = Result<K, kube::Error>> + Send {
        ready(self.create_now(obj))
    }

    fn update<K: KubeObject>(
        &self,
        obj: &K,
    ) -> impl Future<Output = Result<K, kube::Error>> + Send {
        ready(self.update_now(obj))
    }

    fn delete<K: KubeObject>(
        &self,
        name: &str,
        namespace: Option<&str>,
    ) -> impl Future<Output = Result<(), kube::Error>> + Send {
        ready(self.delete_now::<K>(name, namespace))
    }
}

fn or_insert(value: &mut Value, key: &str, default: Value) {
    if let Some(map) = value.as_object_mut() {
        map.entry(key).or_insert(default);
    }
}

fn default_pull_policy(image: &str) -> &'static str {
    let tag = image.rsplit('/').next().unwrap_or(image);
    if image.contains('@') || (tag.contains(':') && !tag.ends_with(":latest")) {
        "IfNotPresent"
    } else {
        "Always"
    }
}

fn default_probe(probe: &mut Value) {
    or_insert(probe, "timeoutSeconds", json!(1));
    or_insert(probe, "successThreshold", json!(1));
    or_insert(probe, "failureThreshold", json!(3));
    if let Some(http) = probe.get_mut("httpGet") {
        or_insert(http, "scheme", json!("HTTP"));
    }
}

fn default_container(container: &mut Value) {
    let image = container["image"].as_str().unwrap_or_default().to_string();
    or_insert(container, "imagePullPolicy", json!(default_pull_policy(&image)));
    or_insert(container, "resources", json!({}));
    or_insert(container, "terminationMessagePath", json!("/dev/termination-log"));
    or_insert(container, "terminationMessagePolicy", json!("File"));
    for port in container["ports"].as_array_mut().into_iter().flatten() {
        or_insert(port, "protocol", json!("TCP"));
    }
    for probe in ["livenessProbe", "readinessProbe"] {
        if let Some(p) = container.get_mut(probe) {
            default_probe(p);
        }
    }
}

/// What the API server adds to a Deployment on admission.
fn default_deployment(deploy: &mut Value) {
    let Some(spec) = deploy.get_mut("spec") else {
        return;
    };
    or_insert(spec, "replicas", json!(1));
    or_insert(spec, "revisionHistoryLimit", json!(10));
    or_insert(spec, "progressDeadlineSeconds", json!(600));
    or_insert(
        spec,
        "strategy",
        json!({
            "type": "RollingUpdate",
            "rollingUpdate": {"maxSurge": "25%", "maxUnavailable": "25%"}
        }),
    );

    let Some(pod) = spec.pointer_mut("/template/spec") else {
        return;
    };
    or_insert(pod, "restartPolicy", json!("Always"));
    or_insert(pod, "dnsPolicy", json!("ClusterFirst"));
    or_insert(pod, "schedulerName", json!("default-scheduler"));
    or_insert(pod, "securityContext", json!({}));
    or_insert(pod, "terminationGracePeriodSeconds", json!(30));
    if let Some(sa) = pod.get("serviceAccountName").cloned() {
        or_insert(pod, "serviceAccount", sa);
    }
    for volume in pod["volumes"].as_array_mut().into_iter().flatten() {
        for source in ["configMap", "secret"] {
            if let Some(s) = volume.get_mut(source) {
                or_insert(s, "defaultMode", json!(420));
            }
        }
    }
    for list in ["containers", "initContainers"] {
        for container in pod[list].as_array_mut().into_iter().flatten() {
            default_container(container);
        }
    }
}

pub fn make_argocd() -> ArgoCD {
    let mut cr = ArgoCD::new("argocd", ArgoCDSpec::default());
    cr.metadata.namespace = Some("argocd".into());
    cr.metadata.uid = Some("test-uid-12345".into());
    cr.metadata.resource_version = Some("1".into());
    cr.metadata.generation = Some(1);
    cr
}

/// Namespace labelled as managed by the instances of `managed_by`.
pub fn managed_namespace(name: &str, managed_by: &str) -> Namespace {
    let mut ns = Namespace::default();
    ns.metadata.name = Some(name.into());
    ns.metadata.labels = Some(BTreeMap::from([(
        MANAGED_BY_LABEL.to_string(),
        managed_by.to_string(),
    )]));
    ns
}

pub fn config(vars: &[(&str, &str)]) -> OperatorConfig {
    let vars: BTreeMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    OperatorConfig::from_lookup(|key| vars.get(key).cloned())
}

pub fn test_context(store: MemoryStore, config: OperatorConfig) -> Context<MemoryStore> {
    Context::new(store, config)
}
