use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::components::*;
use super::status::ArgoCDStatus;

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema)]
#[kube(
    group = "argoproj.io",
    version = "v1alpha1",
    kind = "ArgoCD",
    plural = "argocds",
    namespaced,
    status = "ArgoCDStatus",
    shortname = "argocd",
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".spec.version","priority":1}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDSpec {
    /// Container image for the Argo CD components that run the `argocd` binary.
    #[serde(default)]
    pub image: Option<String>,

    /// Tag (or `sha256:` digest) for `image`.
    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub controller: ControllerSpec,

    #[serde(default)]
    pub server: ServerSpec,

    #[serde(default)]
    pub dex: DexSpec,

    #[serde(default)]
    pub redis: RedisSpec,

    #[serde(default)]
    pub repo: RepoSpec,

    #[serde(default)]
    pub ha: HaSpec,

    #[serde(default)]
    pub grafana: GrafanaSpec,
}

impl ArgoCD {
    /// Whether Redis runs in HA mode (redis-ha servers fronted by haproxy).
    pub fn ha_enabled(&self) -> bool {
        self.spec.ha.enabled
    }
}
