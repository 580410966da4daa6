use argocd_crds::ArgoCD;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Resource;
use std::collections::BTreeMap;

pub const PART_OF: &str = "argocd";

/// Label binding a namespace to the instance living in the label's value.
pub const MANAGED_BY_LABEL: &str = "argocd.argoproj.io/managed-by";

pub const NAME_LABEL: &str = "app.kubernetes.io/name";
pub const PART_OF_LABEL: &str = "app.kubernetes.io/part-of";
pub const MANAGED_BY_INSTANCE_LABEL: &str = "app.kubernetes.io/managed-by";
pub const COMPONENT_LABEL: &str = "app.kubernetes.io/component";

pub const NAME_ANNOTATION: &str = "argocds.argoproj.io/name";
pub const NAMESPACE_ANNOTATION: &str = "argocds.argoproj.io/namespace";

// Component names. These double as the suffix of Role and ServiceAccount names.
pub const APPLICATION_CONTROLLER: &str = "argocd-application-controller";
pub const SERVER: &str = "argocd-server";
pub const REDIS: &str = "argocd-redis";
pub const REDIS_HA: &str = "argocd-redis-ha";
pub const DEX_SERVER: &str = "argocd-dex-server";
pub const REPO_SERVER: &str = "argocd-repo-server";
pub const GRAFANA: &str = "argocd-grafana";

pub fn instance_name(cr: &ArgoCD) -> String {
    cr.metadata
        .name
        .clone()
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn instance_namespace(cr: &ArgoCD) -> String {
    cr.metadata
        .namespace
        .clone()
        .unwrap_or_else(|| "default".to_string())
}

/// `<instance>-<component>`, used for namespaced resources.
pub fn resource_name(cr: &ArgoCD, component: &str) -> String {
    format!("{}-{component}", instance_name(cr))
}

/// `<instance>-<namespace>-<component>`, used for cluster-scoped resources so
/// that same-named instances in different namespaces do not collide.
pub fn unique_resource_name(cr: &ArgoCD, component: &str) -> String {
    format!(
        "{}-{}-{component}",
        instance_name(cr),
        instance_namespace(cr)
    )
}

/// Fully qualified in-cluster address of `<instance>-<suffix>`.
pub fn fqdn_service_ref(cr: &ArgoCD, suffix: &str, port: i32) -> String {
    format!(
        "{}.{}.svc.cluster.local:{port}",
        resource_name(cr, suffix),
        instance_namespace(cr)
    )
}

pub fn labels(cr: &ArgoCD) -> BTreeMap<String, String> {
    let name = instance_name(cr);
    BTreeMap::from([
        (NAME_LABEL.into(), name.clone()),
        (PART_OF_LABEL.into(), PART_OF.into()),
        (MANAGED_BY_INSTANCE_LABEL.into(), name),
    ])
}

pub fn annotations(cr: &ArgoCD) -> BTreeMap<String, String> {
    BTreeMap::from([
        (NAME_ANNOTATION.into(), instance_name(cr)),
        (NAMESPACE_ANNOTATION.into(), instance_namespace(cr)),
    ])
}

/// Controller owner reference pointing at the instance. `None` when the
/// instance has not been persisted yet (no uid).
pub fn owner_reference(cr: &ArgoCD) -> Option<OwnerReference> {
    cr.controller_owner_ref(&())
}
