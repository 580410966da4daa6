use std::collections::BTreeSet;

use argocd_resources::{BuildEnv, ImageOverrides, ProxyEnv};
use tracing::info;

pub const DISABLE_DEX_ENV: &str = "DISABLE_DEX";
pub const CLUSTER_CONFIG_NAMESPACES_ENV: &str = "ARGOCD_CLUSTER_CONFIG_NAMESPACES";
pub const POD_NAME_ENV: &str = "POD_NAME";

/// Namespaces whose instances may hold cluster-scoped configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusterConfigNamespaces {
    all: bool,
    namespaces: BTreeSet<String>,
}

impl ClusterConfigNamespaces {
    /// Parse a comma separated list. Entries are trimmed and `*` allows
    /// every namespace.
    pub fn parse(value: &str) -> Self {
        let mut parsed = Self::default();
        for entry in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if entry == "*" {
                parsed.all = true;
            } else {
                parsed.namespaces.insert(entry.to_string());
            }
        }
        parsed
    }

    pub fn allows(&self, namespace: &str) -> bool {
        self.all || self.namespaces.contains(namespace)
    }
}

/// Operator settings, read once at start-up.
#[derive(Clone, Debug, Default)]
pub struct OperatorConfig {
    pub dex_disabled: bool,
    pub cluster_config_namespaces: ClusterConfigNamespaces,
    pub build: BuildEnv,
    pub pod_name: Option<String>,
}

impl OperatorConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let dex_disabled = lookup(DISABLE_DEX_ENV).is_some_and(|v| v.to_lowercase() == "true");
        let cluster_config_namespaces =
            ClusterConfigNamespaces::parse(&lookup(CLUSTER_CONFIG_NAMESPACES_ENV).unwrap_or_default());
        let images = ImageOverrides::from_lookup(&lookup);
        let proxy = ProxyEnv::from_lookup(&lookup);

        for (name, value) in proxy.vars() {
            info!(%name, %value, "propagating proxy setting to managed deployments");
        }
        if dex_disabled {
            info!("dex is disabled");
        }

        Self {
            dex_disabled,
            cluster_config_namespaces,
            build: BuildEnv { images, proxy },
            pod_name: lookup(POD_NAME_ENV),
        }
    }
}
