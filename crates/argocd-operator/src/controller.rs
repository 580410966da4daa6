use std::sync::Arc;

use anyhow::Result;
use argocd_crds::{ArgoCD, Condition, Phase, condition_types};
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::rbac::v1::Role;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::runtime::controller::{Action, Controller};
use kube::runtime::events::{Event, EventType, Recorder};
use kube::runtime::watcher;
use kube::{Client, CustomResourceExt, Resource, ResourceExt};
use tokio::time::Duration;
use tracing::{error, info, warn};

use crate::config::OperatorConfig;
use crate::context::Context;
use crate::deployments::reconcile_deployments;
use crate::error::Error;
use crate::metrics::{increment_reconcile_total, observe_reconcile_duration, set_managed_instances};
use crate::roles::{cleanup_cluster_roles, reconcile_roles};
use crate::server::ServerState;
use crate::store::{FIELD_MANAGER, ObjectStore};

/// Keeps an instance around until its cluster-scoped roles are gone.
pub const CLUSTER_ROLE_FINALIZER: &str = "argoproj.io/cluster-role-cleanup";

const REQUEUE_AFTER: Duration = Duration::from_secs(300);
const ERROR_REQUEUE_AFTER: Duration = Duration::from_secs(60);

pub fn print_crd() -> Result<()> {
    let crd = ArgoCD::crd();
    let yaml = serde_yaml::to_string(&crd)?;
    println!("{yaml}");
    Ok(())
}

pub async fn run(server_state: ServerState) -> Result<()> {
    let client = Client::try_default().await?;
    let ctx = Arc::new(Context::new(client.clone(), OperatorConfig::from_env()));

    info!("starting ArgoCD operator controller");
    server_state.set_ready();

    Controller::new(Api::<ArgoCD>::all(client.clone()), watcher::Config::default())
        .owns(
            Api::<Deployment>::all(client.clone()),
            watcher::Config::default(),
        )
        .owns(Api::<Role>::all(client), watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok(o) => info!(?o, "reconciled"),
                Err(e) => error!(%e, "reconcile error"),
            }
        })
        .await;

    Ok(())
}

/// One full pass: roles, cluster roles, then every managed workload.
pub async fn reconcile_instance<S: ObjectStore>(
    ctx: &Context<S>,
    cr: &ArgoCD,
) -> Result<(), Error> {
    reconcile_roles(ctx, cr).await?;
    reconcile_deployments(ctx, cr).await?;
    Ok(())
}

pub async fn reconcile(cr: Arc<ArgoCD>, ctx: Arc<Context>) -> Result<Action, Error> {
    let client = &ctx.store;
    let name = cr.name_any();
    let ns = cr.namespace().unwrap_or_else(|| "default".into());
    let recorder = Recorder::new(client.clone(), ctx.reporter.clone());
    let obj_ref = cr.object_ref(&());
    let start_time = std::time::Instant::now();

    if cr.metadata.deletion_timestamp.is_some() {
        let removed = cleanup_cluster_roles(&*ctx, &cr).await?;
        info!(%name, %ns, removed, "cleaned up cluster roles");
        set_finalizer(client, &cr, false).await?;
        return Ok(Action::await_change());
    }

    info!(%name, %ns, "reconciling");
    if !has_finalizer(&cr) {
        set_finalizer(client, &cr, true).await?;
    }

    reconcile_instance(&*ctx, &cr).await?;

    update_status(client, &cr, None).await?;
    recorder
        .publish(
            &Event {
                type_: EventType::Normal,
                reason: "Reconciled".into(),
                note: Some("All managed resources converged".into()),
                action: "Reconcile".into(),
                secondary: None,
            },
            &obj_ref,
        )
        .await
        .map_err(Error::Kube)?;

    if let Ok(list) = Api::<ArgoCD>::namespaced(client.clone(), &ns)
        .list(&ListParams::default())
        .await
    {
        set_managed_instances(&ns, list.items.len() as i64);
    }

    increment_reconcile_total("success");
    observe_reconcile_duration(start_time.elapsed().as_secs_f64());
    Ok(Action::requeue(REQUEUE_AFTER))
}

pub fn error_policy(cr: Arc<ArgoCD>, error: &Error, ctx: Arc<Context>) -> Action {
    increment_reconcile_total("error");
    warn!(%error, "reconciliation failed, requeuing");

    let client = ctx.store.clone();
    let recorder = Recorder::new(client.clone(), ctx.reporter.clone());
    let obj_ref = cr.object_ref(&());
    let error_msg = error.to_string();
    tokio::spawn(async move {
        let _ = recorder
            .publish(
                &Event {
                    type_: EventType::Warning,
                    reason: "ReconcileError".into(),
                    note: Some(error_msg.clone()),
                    action: "Reconcile".into(),
                    secondary: None,
                },
                &obj_ref,
            )
            .await;
        if let Err(e) = update_status(&client, &cr, Some(error_msg.as_str())).await {
            warn!(%e, "failed to record failure in status");
        }
    });

    Action::requeue(ERROR_REQUEUE_AFTER)
}

fn has_finalizer(cr: &ArgoCD) -> bool {
    cr.finalizers().iter().any(|f| f == CLUSTER_ROLE_FINALIZER)
}

async fn set_finalizer(client: &Client, cr: &ArgoCD, present: bool) -> Result<(), Error> {
    let mut finalizers: Vec<String> = cr
        .finalizers()
        .iter()
        .filter(|f| *f != CLUSTER_ROLE_FINALIZER)
        .cloned()
        .collect();
    if present {
        finalizers.push(CLUSTER_ROLE_FINALIZER.to_string());
    }
    let patch = serde_json::json!({
        "metadata": { "finalizers": finalizers }
    });
    let api = Api::<ArgoCD>::namespaced(client.clone(), &cr.namespace().unwrap_or_default());
    api.patch(&cr.name_any(), &PatchParams::default(), &Patch::Merge(patch))
        .await
        .map_err(Error::Kube)?;
    Ok(())
}

/// Write phase, observed generation and conditions. `failure` carries the
/// error message of a failed pass.
pub(crate) async fn update_status(
    client: &Client,
    cr: &ArgoCD,
    failure: Option<&str>,
) -> Result<(), Error> {
    let now = chrono_now();
    let mut status = cr.status.clone().unwrap_or_default();
    status.observed_generation = cr.metadata.generation.unwrap_or(0);

    match failure {
        None => {
            status.phase = Phase::Available;
            status.set_condition(Condition::ok(
                condition_types::RECONCILED,
                "ReconcileSucceeded",
                "All managed resources converged",
                &now,
            ));
            status.set_condition(Condition::fail(
                condition_types::DEGRADED,
                "AllHealthy",
                "No reconcile errors",
                &now,
            ));
        }
        Some(message) => {
            status.phase = Phase::Failed;
            status.set_condition(Condition::fail(
                condition_types::RECONCILED,
                "ReconcileFailed",
                message,
                &now,
            ));
            status.set_condition(Condition::ok(
                condition_types::DEGRADED,
                "ReconcileFailed",
                message,
                &now,
            ));
        }
    }

    let status_patch = serde_json::json!({
        "apiVersion": ArgoCD::api_version(&()),
        "kind": ArgoCD::kind(&()),
        "status": status,
    });

    let api = Api::<ArgoCD>::namespaced(client.clone(), &cr.namespace().unwrap_or_default());
    api.patch_status(
        &cr.name_any(),
        &PatchParams::apply(FIELD_MANAGER).force(),
        &Patch::Apply(status_patch),
    )
    .await
    .map_err(Error::Kube)?;
    Ok(())
}

fn chrono_now() -> String {
    use chrono::{SecondsFormat, Utc};
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
