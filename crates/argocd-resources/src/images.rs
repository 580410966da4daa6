use argocd_crds::ArgoCD;

pub const DEFAULT_ARGOCD_IMAGE: &str = "quay.io/argoproj/argocd";
pub const DEFAULT_ARGOCD_VERSION: &str = "v2.0.5";
pub const DEFAULT_DEX_IMAGE: &str = "ghcr.io/dexidp/dex";
pub const DEFAULT_DEX_VERSION: &str = "v2.28.1";
pub const DEFAULT_REDIS_IMAGE: &str = "redis";
pub const DEFAULT_REDIS_VERSION: &str = "6.2.4-alpine";
pub const DEFAULT_REDIS_HA_PROXY_IMAGE: &str = "haproxy";
pub const DEFAULT_REDIS_HA_PROXY_VERSION: &str = "2.0.25-alpine";
pub const DEFAULT_GRAFANA_IMAGE: &str = "grafana/grafana";
pub const DEFAULT_GRAFANA_VERSION: &str = "7.5.10";

/// Operator-wide image references, loaded from `ARGOCD_*_IMAGE` env vars.
///
/// An override only applies when the custom resource leaves both the image
/// and the version of a component unset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImageOverrides {
    pub argocd: Option<String>,
    pub dex: Option<String>,
    pub redis: Option<String>,
    pub redis_ha_proxy: Option<String>,
    pub grafana: Option<String>,
}

impl ImageOverrides {
    pub const ARGOCD_ENV: &'static str = "ARGOCD_IMAGE";
    pub const DEX_ENV: &'static str = "ARGOCD_DEX_IMAGE";
    pub const REDIS_ENV: &'static str = "ARGOCD_REDIS_IMAGE";
    pub const REDIS_HA_PROXY_ENV: &'static str = "ARGOCD_REDIS_HA_PROXY_IMAGE";
    pub const GRAFANA_ENV: &'static str = "ARGOCD_GRAFANA_IMAGE";

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            argocd: get(Self::ARGOCD_ENV),
            dex: get(Self::DEX_ENV),
            redis: get(Self::REDIS_ENV),
            redis_ha_proxy: get(Self::REDIS_HA_PROXY_ENV),
            grafana: get(Self::GRAFANA_ENV),
        }
    }
}

/// Join an image and a tag. Tags containing `:` are digests (`sha256:...`).
pub fn combine_image_tag(image: &str, tag: &str) -> String {
    if tag.contains(':') {
        format!("{image}@{tag}")
    } else if tag.is_empty() {
        image.to_string()
    } else {
        format!("{image}:{tag}")
    }
}

fn resolve(
    image: Option<&str>,
    version: Option<&str>,
    default_image: &str,
    default_version: &str,
    env_override: Option<&str>,
) -> String {
    let image = image.filter(|s| !s.is_empty());
    let version = version.filter(|s| !s.is_empty());
    if image.is_none()
        && version.is_none()
        && let Some(reference) = env_override
    {
        tracing::debug!(image = reference, "using image from operator environment");
        return reference.to_string();
    }
    combine_image_tag(
        image.unwrap_or(default_image),
        version.unwrap_or(default_version),
    )
}

pub fn argocd_image(cr: &ArgoCD, overrides: &ImageOverrides) -> String {
    resolve(
        cr.spec.image.as_deref(),
        cr.spec.version.as_deref(),
        DEFAULT_ARGOCD_IMAGE,
        DEFAULT_ARGOCD_VERSION,
        overrides.argocd.as_deref(),
    )
}

pub fn dex_image(cr: &ArgoCD, overrides: &ImageOverrides) -> String {
    resolve(
        cr.spec.dex.image.as_deref(),
        cr.spec.dex.version.as_deref(),
        DEFAULT_DEX_IMAGE,
        DEFAULT_DEX_VERSION,
        overrides.dex.as_deref(),
    )
}

pub fn redis_image(cr: &ArgoCD, overrides: &ImageOverrides) -> String {
    resolve(
        cr.spec.redis.image.as_deref(),
        cr.spec.redis.version.as_deref(),
        DEFAULT_REDIS_IMAGE,
        DEFAULT_REDIS_VERSION,
        overrides.redis.as_deref(),
    )
}

pub fn redis_ha_proxy_image(cr: &ArgoCD, overrides: &ImageOverrides) -> String {
    resolve(
        cr.spec.ha.redis_proxy_image.as_deref(),
        cr.spec.ha.redis_proxy_version.as_deref(),
        DEFAULT_REDIS_HA_PROXY_IMAGE,
        DEFAULT_REDIS_HA_PROXY_VERSION,
        overrides.redis_ha_proxy.as_deref(),
    )
}

pub fn grafana_image(cr: &ArgoCD, overrides: &ImageOverrides) -> String {
    resolve(
        cr.spec.grafana.image.as_deref(),
        cr.spec.grafana.version.as_deref(),
        DEFAULT_GRAFANA_IMAGE,
        DEFAULT_GRAFANA_VERSION,
        overrides.grafana.as_deref(),
    )
}
