use argocd_crds::ArgoCD;
use argocd_resources::{common, policy, role};
use k8s_openapi::api::rbac::v1::{ClusterRole, PolicyRule, Role};
use kube::ResourceExt;
use tracing::{debug, info};

use crate::context::Context;
use crate::decision::{Decision, decide, set_owner};
use crate::error::{Error, Result};
use crate::hooks::HookTarget;
use crate::metrics::increment_resource_operations;
use crate::namespaces::managed_namespaces;
use crate::store::ObjectStore;

/// Converge the Roles and ClusterRoles of every component.
pub async fn reconcile_roles<S: ObjectStore>(ctx: &Context<S>, cr: &ArgoCD) -> Result<()> {
    let roles = [
        (
            common::APPLICATION_CONTROLLER,
            policy::application_controller(),
        ),
        (common::DEX_SERVER, policy::dex_server()),
        (common::SERVER, policy::server()),
        (common::REDIS_HA, policy::redis_ha()),
    ];
    for (component, rules) in roles {
        reconcile_role(ctx, cr, component, rules).await?;
    }

    reconcile_cluster_role(
        ctx,
        cr,
        common::APPLICATION_CONTROLLER,
        policy::application_controller(),
    )
    .await?;
    reconcile_cluster_role(ctx, cr, common::SERVER, policy::server_cluster_role()).await?;
    Ok(())
}

/// Converge the Role of `component` in every managed namespace and return
/// the roles that were created or updated.
pub async fn reconcile_role<S: ObjectStore>(
    ctx: &Context<S>,
    cr: &ArgoCD,
    component: &str,
    rules: Vec<PolicyRule>,
) -> Result<Vec<Role>> {
    let namespaces = managed_namespaces(&ctx.store, cr).await?;
    let enabled = !(component == common::DEX_SERVER && ctx.config.dex_disabled);

    let mut converged = Vec::with_capacity(namespaces.len());
    for ns in &namespaces {
        let mut desired = role::build(component, rules.clone(), cr, ns);
        ctx.hooks
            .apply(cr, HookTarget::Role(&mut desired), component)?;
        let name = desired.name_any();

        let existing = ctx
            .store
            .get::<Role>(&name, Some(ns))
            .await
            .map_err(Error::lookup("role", component))?;

        match decide(existing, enabled) {
            Decision::Create => {
                set_owner(&mut desired, cr);
                let created = ctx.store.create(&desired).await?;
                increment_resource_operations("Role", "create");
                info!(%name, %ns, "created role");
                converged.push(created);
            }
            Decision::Update(mut live) => {
                live.rules = desired.rules;
                let updated = ctx.store.update(&live).await?;
                increment_resource_operations("Role", "update");
                debug!(%name, %ns, "updated role");
                converged.push(updated);
            }
            Decision::Delete(_) => {
                ctx.store.delete::<Role>(&name, Some(ns)).await?;
                increment_resource_operations("Role", "delete");
                info!(%name, %ns, "deleted role for disabled component");
            }
            Decision::Noop => {}
        }
    }
    Ok(converged)
}

/// Converge the ClusterRole of `component`. Returns `None` when the role is
/// absent afterwards, either because it was deleted or because the
/// instance's namespace may not hold cluster-scoped configuration.
pub async fn reconcile_cluster_role<S: ObjectStore>(
    ctx: &Context<S>,
    cr: &ArgoCD,
    component: &str,
    rules: Vec<PolicyRule>,
) -> Result<Option<ClusterRole>> {
    let ns = common::instance_namespace(cr);
    let allowed = ctx.config.cluster_config_namespaces.allows(&ns);

    let mut desired = role::build_cluster(component, rules, cr);
    ctx.hooks
        .apply(cr, HookTarget::ClusterRole(&mut desired), component)?;
    let name = desired.name_any();

    let existing = ctx
        .store
        .get::<ClusterRole>(&name, None)
        .await
        .map_err(Error::lookup("cluster role", component))?;

    match decide(existing, allowed) {
        Decision::Create => {
            set_owner(&mut desired, cr);
            let created = ctx.store.create(&desired).await?;
            increment_resource_operations("ClusterRole", "create");
            info!(%name, "created cluster role");
            Ok(Some(created))
        }
        Decision::Update(mut live) => {
            live.rules = desired.rules;
            let updated = ctx.store.update(&live).await?;
            increment_resource_operations("ClusterRole", "update");
            debug!(%name, "updated cluster role");
            Ok(Some(updated))
        }
        Decision::Delete(_) => {
            ctx.store.delete::<ClusterRole>(&name, None).await?;
            increment_resource_operations("ClusterRole", "delete");
            info!(%name, %ns, "deleted cluster role, namespace not allowed cluster config");
            Ok(None)
        }
        Decision::Noop => {
            debug!(%name, %ns, "namespace not allowed cluster config, skipping cluster role");
            Ok(None)
        }
    }
}

/// Delete every ClusterRole created for the instance. Returns how many were
/// removed.
pub async fn cleanup_cluster_roles<S: ObjectStore>(ctx: &Context<S>, cr: &ArgoCD) -> Result<usize> {
    let ns = common::instance_namespace(cr);
    let selector = format!(
        "{}={},{}={}",
        common::MANAGED_BY_INSTANCE_LABEL,
        common::instance_name(cr),
        common::PART_OF_LABEL,
        common::PART_OF
    );
    let owned: Vec<ClusterRole> = ctx.store.list(&selector).await?;

    let mut removed = 0;
    for cluster_role in owned.iter().filter(|r| {
        r.annotations()
            .get(common::NAMESPACE_ANNOTATION)
            .is_some_and(|v| *v == ns)
    }) {
        let name = cluster_role.name_any();
        ctx.store
            .delete::<ClusterRole>(&name, None)
            .await
            .map_err(|source| Error::Cleanup {
                name: name.clone(),
                source,
            })?;
        increment_resource_operations("ClusterRole", "delete");
        info!(%name, "deleted cluster role of removed instance");
        removed += 1;
    }
    Ok(removed)
}
