use argocd_crds::ArgoCD;
use k8s_openapi::api::rbac::v1::{ClusterRole, PolicyRule, Role};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::common;

/// Desired Role for `component` in `namespace`.
pub fn build(component: &str, rules: Vec<PolicyRule>, cr: &ArgoCD, namespace: &str) -> Role {
    Role {
        metadata: ObjectMeta {
            name: Some(common::resource_name(cr, component)),
            namespace: Some(namespace.to_string()),
            labels: Some(common::labels(cr)),
            ..Default::default()
        },
        rules: Some(rules),
    }
}

/// Desired ClusterRole for `component`. The name embeds the instance
/// namespace; the annotations record which instance owns it.
pub fn build_cluster(component: &str, rules: Vec<PolicyRule>, cr: &ArgoCD) -> ClusterRole {
    ClusterRole {
        metadata: ObjectMeta {
            name: Some(common::unique_resource_name(cr, component)),
            labels: Some(common::labels(cr)),
            annotations: Some(common::annotations(cr)),
            ..Default::default()
        },
        rules: Some(rules),
        ..Default::default()
    }
}
