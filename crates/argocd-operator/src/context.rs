use kube::Client;
use kube::runtime::events::Reporter;

use crate::config::OperatorConfig;
use crate::hooks::Hooks;

/// Shared state handed to every reconcile pass.
pub struct Context<S = Client> {
    pub store: S,
    pub config: OperatorConfig,
    pub hooks: Hooks,
    /// Reporter identity used when publishing Kubernetes Events.
    pub reporter: Reporter,
}

impl<S> Context<S> {
    pub fn new(store: S, config: OperatorConfig) -> Self {
        let reporter = Reporter {
            controller: "argocd-operator".into(),
            instance: config.pod_name.clone(),
        };
        Self {
            store,
            config,
            hooks: Hooks::default(),
            reporter,
        }
    }
}
