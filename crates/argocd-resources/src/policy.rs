//! Canonical RBAC rule sets for each Argo CD component.

use k8s_openapi::api::rbac::v1::PolicyRule;

fn rule(api_groups: &[&str], resources: &[&str], verbs: &[&str]) -> PolicyRule {
    PolicyRule {
        api_groups: Some(api_groups.iter().map(|s| s.to_string()).collect()),
        resources: Some(resources.iter().map(|s| s.to_string()).collect()),
        verbs: verbs.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

pub fn application_controller() -> Vec<PolicyRule> {
    vec![
        rule(&["*"], &["*"], &["*"]),
        PolicyRule {
            non_resource_urls: Some(vec!["*".into()]),
            verbs: vec!["*".into()],
            ..Default::default()
        },
    ]
}

pub fn dex_server() -> Vec<PolicyRule> {
    vec![rule(
        &[""],
        &["secrets", "configmaps"],
        &["get", "list", "watch"],
    )]
}

pub fn server() -> Vec<PolicyRule> {
    vec![
        rule(&["*"], &["*"], &["get", "delete", "patch"]),
        rule(
            &["argoproj.io"],
            &["applications", "appprojects"],
            &["create", "get", "list", "watch", "update", "delete", "patch"],
        ),
        rule(&[""], &["events"], &["create", "list"]),
    ]
}

pub fn redis_ha() -> Vec<PolicyRule> {
    vec![rule(&[""], &["endpoints"], &["get"])]
}

pub fn server_cluster_role() -> Vec<PolicyRule> {
    vec![
        rule(&["*"], &["*"], &["get", "delete", "patch"]),
        rule(&["argoproj.io"], &["applications"], &["list", "watch"]),
        rule(&[""], &["events"], &["list"]),
    ]
}
