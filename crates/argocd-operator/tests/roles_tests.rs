mod common;

use argocd_crds::ArgoCD;
use argocd_operator::roles::{
    cleanup_cluster_roles, reconcile_cluster_role, reconcile_role, reconcile_roles,
};
use argocd_operator::{Error, HookError, HookTarget};
use argocd_resources::{common as names, policy, role};
use common::*;
use k8s_openapi::api::rbac::v1::{ClusterRole, PolicyRule, Role};
use kube::ResourceExt;

fn store_with_namespaces() -> MemoryStore {
    MemoryStore::new()
        .with_object(managed_namespace("argocd", "argocd"))
        .with_object(managed_namespace("apps", "argocd"))
        .with_object(managed_namespace("elsewhere", "other"))
}

fn allow_cluster_config(namespaces: &str) -> argocd_operator::OperatorConfig {
    config(&[("ARGOCD_CLUSTER_CONFIG_NAMESPACES", namespaces)])
}

fn add_events_rule(_: &ArgoCD, target: HookTarget<'_>, _: &str) -> Result<(), HookError> {
    if let HookTarget::Role(role) = target {
        role.rules.get_or_insert_with(Vec::new).push(PolicyRule {
            api_groups: Some(vec!["".into()]),
            resources: Some(vec!["pods".into()]),
            verbs: vec!["watch".into()],
            ..Default::default()
        });
    }
    Ok(())
}

fn failing_hook(_: &ArgoCD, _: HookTarget<'_>, _: &str) -> Result<(), HookError> {
    Err(HookError::new("this is a test error"))
}

#[tokio::test]
async fn test_reconcile_role_creates_one_role_per_managed_namespace() {
    let ctx = test_context(store_with_namespaces(), Default::default());
    let cr = make_argocd();

    let roles = reconcile_role(&ctx, &cr, names::APPLICATION_CONTROLLER, policy::application_controller())
        .await
        .unwrap();

    assert_eq!(roles.len(), 2);
    let stored: Vec<Role> = ctx.store.objects();
    assert_eq!(stored.len(), 2);
    for ns in ["argocd", "apps"] {
        let role: Role = ctx
            .store
            .object("argocd-argocd-application-controller", Some(ns))
            .unwrap();
        assert_eq!(role.rules.unwrap(), policy::application_controller());
        let owners = role.metadata.owner_references.unwrap();
        assert_eq!(owners[0].kind, "ArgoCD");
        assert_eq!(owners[0].uid, "test-uid-12345");
    }
    assert!(
        ctx.store
            .object::<Role>("argocd-argocd-application-controller", Some("elsewhere"))
            .is_none()
    );
}

#[tokio::test]
async fn test_reconcile_role_is_idempotent() {
    let ctx = test_context(store_with_namespaces(), Default::default());
    let cr = make_argocd();

    let first = reconcile_role(&ctx, &cr, names::SERVER, policy::server())
        .await
        .unwrap();
    let second = reconcile_role(&ctx, &cr, names::SERVER, policy::server())
        .await
        .unwrap();

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.rules, b.rules);
        assert_eq!(a.name_any(), b.name_any());
    }
    assert_eq!(ctx.store.objects::<Role>().len(), 2);
}

#[tokio::test]
async fn test_reconcile_role_overwrites_rules() {
    let cr = make_argocd();
    let mut stale = role::build(names::SERVER, policy::redis_ha(), &cr, "argocd");
    stale.metadata.resource_version = Some("7".into());
    let store = MemoryStore::new()
        .with_object(managed_namespace("argocd", "argocd"))
        .with_object(stale);
    let ctx = test_context(store, Default::default());

    let roles = reconcile_role(&ctx, &cr, names::SERVER, policy::server())
        .await
        .unwrap();

    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0].rules.as_ref().unwrap(), &policy::server());
    assert_eq!(roles[0].resource_version().as_deref(), Some("8"));
}

#[tokio::test]
async fn test_dex_role_follows_disable_dex() {
    let cr = make_argocd();
    let existing = role::build(names::DEX_SERVER, policy::dex_server(), &cr, "argocd");
    let store = MemoryStore::new()
        .with_object(managed_namespace("argocd", "argocd"))
        .with_object(existing);

    let ctx = test_context(store, config(&[("DISABLE_DEX", "true")]));
    let roles = reconcile_role(&ctx, &cr, names::DEX_SERVER, policy::dex_server())
        .await
        .unwrap();
    assert!(roles.is_empty());
    assert!(ctx.store.objects::<Role>().is_empty());

    // Still disabled and absent: nothing to do.
    ctx.store.clear_calls();
    reconcile_role(&ctx, &cr, names::DEX_SERVER, policy::dex_server())
        .await
        .unwrap();
    assert!(ctx.store.writes().is_empty());

    let ctx = test_context(ctx.store, Default::default());
    let roles = reconcile_role(&ctx, &cr, names::DEX_SERVER, policy::dex_server())
        .await
        .unwrap();
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0].rules.as_ref().unwrap(), &policy::dex_server());
}

#[tokio::test]
async fn test_disable_dex_leaves_other_roles() {
    let ctx = test_context(store_with_namespaces(), config(&[("DISABLE_DEX", "TRUE")]));
    let cr = make_argocd();

    let roles = reconcile_role(&ctx, &cr, names::SERVER, policy::server())
        .await
        .unwrap();
    assert_eq!(roles.len(), 2);
}

#[tokio::test]
async fn test_role_lookup_error_names_component() {
    let ctx = test_context(store_with_namespaces(), Default::default());
    ctx.store.fail::<Role>(Verb::Get, "connection refused");
    let cr = make_argocd();

    let err = reconcile_role(&ctx, &cr, names::SERVER, policy::server())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Lookup { kind: "role", .. }));
    let message = err.to_string();
    assert!(message.starts_with(
        "failed to reconcile the role for the service account associated with argocd-server"
    ));
    assert!(message.contains("connection refused"));
    assert!(ctx.store.writes().is_empty());
}

#[tokio::test]
async fn test_role_create_error_is_not_wrapped() {
    let ctx = test_context(store_with_namespaces(), Default::default());
    ctx.store.fail::<Role>(Verb::Create, "quota exceeded");
    let cr = make_argocd();

    let err = reconcile_role(&ctx, &cr, names::SERVER, policy::server())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Kube(_)));
    assert!(err.to_string().contains("quota exceeded"));
    assert!(!err.to_string().contains("service account"));
}

#[tokio::test]
async fn test_role_hook_mutates_before_write() {
    let mut ctx = test_context(store_with_namespaces(), Default::default());
    ctx.hooks.register(add_events_rule);
    let cr = make_argocd();

    let roles = reconcile_role(&ctx, &cr, names::DEX_SERVER, policy::dex_server())
        .await
        .unwrap();

    for role in roles {
        let rules = role.rules.unwrap();
        assert_eq!(rules.len(), policy::dex_server().len() + 1);
        assert_eq!(rules.last().unwrap().resources.as_deref(), Some(&["pods".to_string()][..]));
    }
}

#[tokio::test]
async fn test_role_hook_failure_aborts_before_write() {
    let mut ctx = test_context(store_with_namespaces(), Default::default());
    ctx.hooks.register(failing_hook);
    let cr = make_argocd();

    let err = reconcile_role(&ctx, &cr, names::SERVER, policy::server())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "this is a test error");
    assert!(matches!(err, Error::Hook(_)));
    assert!(ctx.store.writes().is_empty());
    assert!(ctx.store.objects::<Role>().is_empty());
}

#[tokio::test]
async fn test_cluster_role_not_created_when_namespace_not_allowed() {
    let ctx = test_context(MemoryStore::new(), allow_cluster_config("foo,bar"));
    let cr = make_argocd();

    let result = reconcile_cluster_role(&ctx, &cr, names::APPLICATION_CONTROLLER, policy::application_controller())
        .await
        .unwrap();

    assert!(result.is_none());
    assert!(ctx.store.objects::<ClusterRole>().is_empty());
    assert!(ctx.store.writes().is_empty());
}

#[tokio::test]
async fn test_cluster_role_lifecycle_follows_allow_list() {
    let cr = make_argocd();
    let ctx = test_context(MemoryStore::new(), allow_cluster_config(" foo , argocd "));

    let created = reconcile_cluster_role(&ctx, &cr, names::SERVER, policy::server_cluster_role())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(created.name_any(), "argocd-argocd-argocd-server");
    assert_eq!(created.rules.as_ref().unwrap(), &policy::server_cluster_role());
    assert!(created.metadata.owner_references.is_none());
    assert_eq!(
        created.annotations().get(names::NAMESPACE_ANNOTATION).map(String::as_str),
        Some("argocd")
    );

    let updated = reconcile_cluster_role(&ctx, &cr, names::SERVER, policy::server_cluster_role())
        .await
        .unwrap();
    assert!(updated.is_some());
    assert_eq!(ctx.store.objects::<ClusterRole>().len(), 1);

    let ctx = test_context(ctx.store, allow_cluster_config("foo"));
    let removed = reconcile_cluster_role(&ctx, &cr, names::SERVER, policy::server_cluster_role())
        .await
        .unwrap();
    assert!(removed.is_none());
    assert!(ctx.store.objects::<ClusterRole>().is_empty());
}

#[tokio::test]
async fn test_cluster_role_wildcard_allows_any_namespace() {
    let ctx = test_context(MemoryStore::new(), allow_cluster_config("*"));
    let cr = make_argocd();

    let created = reconcile_cluster_role(&ctx, &cr, names::APPLICATION_CONTROLLER, policy::application_controller())
        .await
        .unwrap();
    assert!(created.is_some());
}

#[tokio::test]
async fn test_cluster_role_lookup_error() {
    let ctx = test_context(MemoryStore::new(), allow_cluster_config("*"));
    ctx.store.fail::<ClusterRole>(Verb::Get, "timeout");
    let cr = make_argocd();

    let err = reconcile_cluster_role(&ctx, &cr, names::SERVER, policy::server_cluster_role())
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with(
        "failed to reconcile the cluster role for the service account associated with argocd-server"
    ));
}

#[tokio::test]
async fn test_reconcile_roles_covers_every_component() {
    let ctx = test_context(store_with_namespaces(), allow_cluster_config("argocd"));
    let cr = make_argocd();

    reconcile_roles(&ctx, &cr).await.unwrap();

    let roles: Vec<Role> = ctx.store.objects();
    assert_eq!(roles.len(), 4 * 2);
    for component in [
        names::APPLICATION_CONTROLLER,
        names::DEX_SERVER,
        names::SERVER,
        names::REDIS_HA,
    ] {
        let name = format!("argocd-{component}");
        assert!(ctx.store.object::<Role>(&name, Some("apps")).is_some(), "{name}");
    }
    assert_eq!(ctx.store.objects::<ClusterRole>().len(), 2);
}

#[tokio::test]
async fn test_cleanup_deletes_only_this_instances_cluster_roles() {
    let cr = make_argocd();
    let mut other = make_argocd();
    other.metadata.namespace = Some("other".into());

    let store = MemoryStore::new()
        .with_object(role::build_cluster(names::SERVER, policy::server_cluster_role(), &cr))
        .with_object(role::build_cluster(
            names::APPLICATION_CONTROLLER,
            policy::application_controller(),
            &cr,
        ))
        .with_object(role::build_cluster(names::SERVER, policy::server_cluster_role(), &other));
    let ctx = test_context(store, Default::default());

    let removed = cleanup_cluster_roles(&ctx, &cr).await.unwrap();

    assert_eq!(removed, 2);
    let left: Vec<ClusterRole> = ctx.store.objects();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].name_any(), "argocd-other-argocd-server");
}

#[tokio::test]
async fn test_cleanup_error_names_cluster_role() {
    let cr = make_argocd();
    let store = MemoryStore::new()
        .with_object(role::build_cluster(names::SERVER, policy::server_cluster_role(), &cr));
    store.fail::<ClusterRole>(Verb::Delete, "forbidden");
    let ctx = test_context(store, Default::default());

    let err = cleanup_cluster_roles(&ctx, &cr).await.unwrap_err();

    assert!(matches!(err, Error::Cleanup { ref name, .. } if name == "argocd-argocd-argocd-server"));
    assert!(err.to_string().contains("argocd-argocd-argocd-server"));
}
