//! Callbacks run against desired objects after they are built and before
//! they are written.
//!
//! Hooks may inspect or mutate the object, or fail. A failing hook aborts
//! the pass before anything is persisted. The registry lives in the
//! reconcile [`Context`](crate::Context); there is no process-wide state.

use std::fmt;
use std::sync::Arc;

use argocd_crds::ArgoCD;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::rbac::v1::{ClusterRole, Role};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HookError(String);

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The object a hook is invoked on.
#[derive(Debug)]
pub enum HookTarget<'a> {
    Role(&'a mut Role),
    ClusterRole(&'a mut ClusterRole),
    Deployment(&'a mut Deployment),
}

impl HookTarget<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            HookTarget::Role(_) => "Role",
            HookTarget::ClusterRole(_) => "ClusterRole",
            HookTarget::Deployment(_) => "Deployment",
        }
    }

    fn reborrow(&mut self) -> HookTarget<'_> {
        match self {
            HookTarget::Role(r) => HookTarget::Role(&mut **r),
            HookTarget::ClusterRole(r) => HookTarget::ClusterRole(&mut **r),
            HookTarget::Deployment(d) => HookTarget::Deployment(&mut **d),
        }
    }
}

pub trait ReconcilerHook: Send + Sync {
    /// `hint` names the component the object belongs to.
    fn apply(&self, cr: &ArgoCD, target: HookTarget<'_>, hint: &str) -> Result<(), HookError>;
}

impl<F> ReconcilerHook for F
where
    F: Fn(&ArgoCD, HookTarget<'_>, &str) -> Result<(), HookError> + Send + Sync,
{
    fn apply(&self, cr: &ArgoCD, target: HookTarget<'_>, hint: &str) -> Result<(), HookError> {
        self(cr, target, hint)
    }
}

/// Ordered hook registry. Registration is additive.
#[derive(Clone, Default)]
pub struct Hooks {
    hooks: Vec<Arc<dyn ReconcilerHook>>,
}

impl Hooks {
    pub fn register(&mut self, hook: impl ReconcilerHook + 'static) {
        self.hooks.push(Arc::new(hook));
    }

    pub fn clear(&mut self) {
        self.hooks.clear();
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run every hook in registration order, stopping at the first error.
    pub fn apply(
        &self,
        cr: &ArgoCD,
        mut target: HookTarget<'_>,
        hint: &str,
    ) -> Result<(), HookError> {
        for hook in &self.hooks {
            hook.apply(cr, target.reborrow(), hint)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("registered", &self.hooks.len())
            .finish()
    }
}
