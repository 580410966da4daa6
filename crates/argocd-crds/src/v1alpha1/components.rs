use k8s_openapi::api::core::v1::{Container, ResourceRequirements};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Application controller settings. The controller itself runs as a
/// StatefulSet; this operator only manages its RBAC.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ControllerSpec {
    /// Accepted for compatibility; not yet applied to any managed object.
    #[serde(default)]
    pub processors: ProcessorsSpec,
    /// Accepted for compatibility; not yet applied to any managed object.
    #[serde(default)]
    pub resources: Option<ResourceRequirements>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorsSpec {
    /// Number of application operation processors.
    #[serde(default)]
    pub operation: Option<i32>,
    /// Number of application status processors.
    #[serde(default)]
    pub status: Option<i32>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServerSpec {
    /// Run the API server without TLS (`--insecure`), e.g. behind a
    /// TLS-terminating ingress.
    #[serde(default)]
    pub insecure: bool,
    #[serde(default)]
    pub resources: Option<ResourceRequirements>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DexSpec {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub resources: Option<ResourceRequirements>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RedisSpec {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub resources: Option<ResourceRequirements>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepoSpec {
    #[serde(default)]
    pub resources: Option<ResourceRequirements>,
    /// Config management plugin sidecars, appended after the repo-server
    /// container in the order given.
    #[serde(default)]
    pub plugin_containers: Vec<Container>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HaSpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub redis_proxy_image: Option<String>,
    #[serde(default)]
    pub redis_proxy_version: Option<String>,
    #[serde(default)]
    pub resources: Option<ResourceRequirements>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrafanaSpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub resources: Option<ResourceRequirements>,
}
