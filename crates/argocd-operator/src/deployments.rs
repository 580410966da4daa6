use argocd_crds::ArgoCD;
use argocd_resources::common;
use argocd_resources::deployment;
use k8s_openapi::api::apps::v1::Deployment;
use kube::ResourceExt;
use tracing::{debug, info};

use crate::context::Context;
use crate::decision::{Decision, decide, set_owner};
use crate::drift;
use crate::error::{Error, Result};
use crate::hooks::HookTarget;
use crate::metrics::increment_resource_operations;
use crate::store::ObjectStore;

/// Converge every managed workload.
pub async fn reconcile_deployments<S: ObjectStore>(ctx: &Context<S>, cr: &ArgoCD) -> Result<()> {
    reconcile_redis_deployment(ctx, cr).await?;
    reconcile_redis_ha_proxy_deployment(ctx, cr).await?;
    reconcile_repo_deployment(ctx, cr).await?;
    reconcile_dex_deployment(ctx, cr).await?;
    reconcile_server_deployment(ctx, cr).await?;
    reconcile_grafana_deployment(ctx, cr).await?;
    Ok(())
}

pub async fn reconcile_repo_deployment<S: ObjectStore>(
    ctx: &Context<S>,
    cr: &ArgoCD,
) -> Result<Option<Deployment>> {
    let desired = deployment::build_repo_server(cr, &ctx.config.build);
    converge(
        ctx,
        cr,
        common::REPO_SERVER,
        desired,
        true,
        Some(deployment::REPO_SERVER_DEFAULT_CONTAINERS),
    )
    .await
}

/// Deleted while `DISABLE_DEX` is set.
pub async fn reconcile_dex_deployment<S: ObjectStore>(
    ctx: &Context<S>,
    cr: &ArgoCD,
) -> Result<Option<Deployment>> {
    let desired = deployment::build_dex(cr, &ctx.config.build);
    let enabled = !ctx.config.dex_disabled;
    converge(ctx, cr, common::DEX_SERVER, desired, enabled, None).await
}

pub async fn reconcile_server_deployment<S: ObjectStore>(
    ctx: &Context<S>,
    cr: &ArgoCD,
) -> Result<Option<Deployment>> {
    let desired = deployment::build_server(cr, &ctx.config.build);
    converge(ctx, cr, common::SERVER, desired, true, None).await
}

/// The single redis instance, replaced by haproxy in HA mode.
pub async fn reconcile_redis_deployment<S: ObjectStore>(
    ctx: &Context<S>,
    cr: &ArgoCD,
) -> Result<Option<Deployment>> {
    let desired = deployment::build_redis(cr, &ctx.config.build);
    converge(ctx, cr, common::REDIS, desired, !cr.ha_enabled(), None).await
}

pub async fn reconcile_redis_ha_proxy_deployment<S: ObjectStore>(
    ctx: &Context<S>,
    cr: &ArgoCD,
) -> Result<Option<Deployment>> {
    let desired = deployment::build_redis_ha_proxy(cr, &ctx.config.build);
    converge(ctx, cr, common::REDIS_HA, desired, cr.ha_enabled(), None).await
}

pub async fn reconcile_grafana_deployment<S: ObjectStore>(
    ctx: &Context<S>,
    cr: &ArgoCD,
) -> Result<Option<Deployment>> {
    let desired = deployment::build_grafana(cr, &ctx.config.build);
    converge(ctx, cr, common::GRAFANA, desired, cr.spec.grafana.enabled, None).await
}

/// Apply hooks to `desired`, then create, update, delete or leave the live
/// Deployment. Returns the Deployment as it exists after the call.
async fn converge<S: ObjectStore>(
    ctx: &Context<S>,
    cr: &ArgoCD,
    component: &str,
    mut desired: Deployment,
    enabled: bool,
    first_sidecar: Option<usize>,
) -> Result<Option<Deployment>> {
    ctx.hooks
        .apply(cr, HookTarget::Deployment(&mut desired), component)?;
    let name = desired.name_any();
    let ns = desired.namespace();

    let existing = ctx
        .store
        .get::<Deployment>(&name, ns.as_deref())
        .await
        .map_err(Error::lookup("deployment", component))?;

    match decide(existing, enabled) {
        Decision::Create => {
            set_owner(&mut desired, cr);
            let created = ctx.store.create(&desired).await?;
            increment_resource_operations("Deployment", "create");
            info!(%name, ns = ns.as_deref().unwrap_or_default(), "created deployment");
            Ok(Some(created))
        }
        Decision::Update(mut live) => {
            let before = live.spec.clone();
            if !drift::converge_deployment(&mut live, &desired, first_sidecar) {
                debug!(%name, "deployment up to date");
                return Ok(Some(live));
            }
            debug!(
                %name,
                diff = ?drift::diff_paths(&live.spec, &before),
                "deployment drift detected"
            );
            let updated = ctx.store.update(&live).await?;
            increment_resource_operations("Deployment", "update");
            info!(%name, ns = ns.as_deref().unwrap_or_default(), "updated deployment");
            Ok(Some(updated))
        }
        Decision::Delete(_) => {
            ctx.store.delete::<Deployment>(&name, ns.as_deref()).await?;
            increment_resource_operations("Deployment", "delete");
            info!(%name, ns = ns.as_deref().unwrap_or_default(), "deleted deployment for disabled component");
            Ok(None)
        }
        Decision::Noop => Ok(None),
    }
}
