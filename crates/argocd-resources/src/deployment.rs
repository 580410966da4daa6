use argocd_crds::ArgoCD;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, Container, ContainerPort, EmptyDirVolumeSource, HTTPGetAction, PodSpec,
    PodTemplateSpec, Probe, SecretVolumeSource, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

use crate::common;
use crate::images::{self, ImageOverrides};
use crate::proxy::ProxyEnv;

pub const DEX_HTTP_PORT: i32 = 5556;
pub const DEX_GRPC_PORT: i32 = 5557;
pub const REPO_SERVER_PORT: i32 = 8081;
pub const REPO_SERVER_METRICS_PORT: i32 = 8084;
pub const SERVER_PORT: i32 = 8080;
pub const SERVER_METRICS_PORT: i32 = 8083;
pub const REDIS_PORT: i32 = 6379;
pub const REDIS_HA_PROXY_HEALTH_PORT: i32 = 8888;
pub const GRAFANA_PORT: i32 = 3000;

pub const HEALTH_PATH: &str = "/healthz";
pub const PROBE_INITIAL_DELAY_SECONDS: i32 = 3;
pub const PROBE_PERIOD_SECONDS: i32 = 30;

pub const KNOWN_HOSTS_CONFIGMAP: &str = "argocd-ssh-known-hosts-cm";
pub const TLS_CERTS_CONFIGMAP: &str = "argocd-tls-certs-cm";
pub const GPG_KEYS_CONFIGMAP: &str = "argocd-gpg-keys-cm";
pub const REPO_SERVER_TLS_SECRET: &str = "argocd-repo-server-tls";
pub const REDIS_HA_CONFIGMAP: &str = "argocd-redis-ha-configmap";

// Deployment name suffixes: `<instance>-<suffix>`.
pub const REPO_SERVER_SUFFIX: &str = "repo-server";
pub const DEX_SERVER_SUFFIX: &str = "dex-server";
pub const SERVER_SUFFIX: &str = "server";
pub const REDIS_SUFFIX: &str = "redis";
pub const REDIS_HA_PROXY_SUFFIX: &str = "redis-ha-haproxy";
pub const GRAFANA_SUFFIX: &str = "grafana";

const PULL_ALWAYS: &str = "Always";
const PULL_IF_NOT_PRESENT: &str = "IfNotPresent";

/// Operator-level inputs to the deployment builders, resolved once at
/// start-up.
#[derive(Clone, Debug, Default)]
pub struct BuildEnv {
    pub images: ImageOverrides,
    pub proxy: ProxyEnv,
}

/// Base Deployment named `<instance>-<suffix>` with labels and selector set
/// and an empty pod spec running as `<instance>-<component>`.
pub fn new_deployment(cr: &ArgoCD, suffix: &str, component: &str) -> Deployment {
    let name = common::resource_name(cr, suffix);
    let mut labels = common::labels(cr);
    labels.insert(common::NAME_LABEL.into(), name.clone());
    labels.insert(common::COMPONENT_LABEL.into(), component.into());
    let selector = BTreeMap::from([(common::NAME_LABEL.to_string(), name.clone())]);

    Deployment {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: Some(common::instance_namespace(cr)),
            labels: Some(labels),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(selector.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(selector),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    service_account_name: Some(common::resource_name(cr, component)),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn finish(mut deploy: Deployment, env: &BuildEnv, mut pod: PodSpec) -> Deployment {
    env.proxy.inject(&mut pod);
    if let Some(spec) = deploy.spec.as_mut() {
        let base = spec.template.spec.take().unwrap_or_default();
        pod.service_account_name = base.service_account_name;
        spec.template.spec = Some(pod);
    }
    deploy
}

fn http_probe(port: i32) -> Probe {
    Probe {
        http_get: Some(HTTPGetAction {
            path: Some(HEALTH_PATH.into()),
            port: IntOrString::Int(port),
            ..Default::default()
        }),
        initial_delay_seconds: Some(PROBE_INITIAL_DELAY_SECONDS),
        period_seconds: Some(PROBE_PERIOD_SECONDS),
        ..Default::default()
    }
}

fn port(container_port: i32, name: Option<&str>) -> ContainerPort {
    ContainerPort {
        container_port,
        name: name.map(str::to_string),
        ..Default::default()
    }
}

fn mount(name: &str, mount_path: &str) -> VolumeMount {
    VolumeMount {
        name: name.into(),
        mount_path: mount_path.into(),
        ..Default::default()
    }
}

fn config_map_volume(name: &str, config_map: &str) -> Volume {
    Volume {
        name: name.into(),
        config_map: Some(ConfigMapVolumeSource {
            name: config_map.into(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn empty_dir_volume(name: &str) -> Volume {
    Volume {
        name: name.into(),
        empty_dir: Some(EmptyDirVolumeSource::default()),
        ..Default::default()
    }
}

fn optional_secret_volume(name: &str, secret: &str) -> Volume {
    Volume {
        name: name.into(),
        secret: Some(SecretVolumeSource {
            secret_name: Some(secret.into()),
            optional: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn dex_server_address(cr: &ArgoCD) -> String {
    format!(
        "http://{}",
        common::fqdn_service_ref(cr, DEX_SERVER_SUFFIX, DEX_HTTP_PORT)
    )
}

pub fn repo_server_address(cr: &ArgoCD) -> String {
    common::fqdn_service_ref(cr, REPO_SERVER_SUFFIX, REPO_SERVER_PORT)
}

/// Redis endpoint for server and repo-server: haproxy in HA mode.
pub fn redis_server_address(cr: &ArgoCD) -> String {
    if cr.ha_enabled() {
        common::fqdn_service_ref(cr, REDIS_HA_PROXY_SUFFIX, REDIS_PORT)
    } else {
        common::fqdn_service_ref(cr, REDIS_SUFFIX, REDIS_PORT)
    }
}

/// Command line for argocd-server. `--insecure` must come first.
pub fn server_command(cr: &ArgoCD) -> Vec<String> {
    let mut cmd = vec!["argocd-server".to_string()];
    if cr.spec.server.insecure {
        cmd.push("--insecure".into());
    }
    cmd.extend([
        "--staticassets".to_string(),
        "/shared/app".to_string(),
        "--dex-server".to_string(),
        dex_server_address(cr),
        "--repo-server".to_string(),
        repo_server_address(cr),
        "--redis".to_string(),
        redis_server_address(cr),
    ]);
    cmd
}

pub fn repo_server_command(cr: &ArgoCD) -> Vec<String> {
    vec![
        "uid_entrypoint.sh".into(),
        "argocd-repo-server".into(),
        "--redis".into(),
        redis_server_address(cr),
    ]
}

pub fn repo_server_default_volumes() -> Vec<Volume> {
    vec![
        config_map_volume("ssh-known-hosts", KNOWN_HOSTS_CONFIGMAP),
        config_map_volume("tls-certs", TLS_CERTS_CONFIGMAP),
        config_map_volume("gpg-keys", GPG_KEYS_CONFIGMAP),
        empty_dir_volume("gpg-keyring"),
        optional_secret_volume("argocd-repo-server-tls", REPO_SERVER_TLS_SECRET),
        empty_dir_volume("var-files"),
    ]
}

pub fn repo_server_default_volume_mounts() -> Vec<VolumeMount> {
    vec![
        mount("ssh-known-hosts", "/app/config/ssh"),
        mount("tls-certs", "/app/config/tls"),
        mount("gpg-keys", "/app/config/gpg/source"),
        mount("gpg-keyring", "/app/config/gpg/keys"),
        mount("argocd-repo-server-tls", "/app/config/reposerver/tls"),
        mount("var-files", "/var/run/argocd"),
    ]
}

pub fn server_default_volumes() -> Vec<Volume> {
    vec![
        config_map_volume("ssh-known-hosts", KNOWN_HOSTS_CONFIGMAP),
        config_map_volume("tls-certs", TLS_CERTS_CONFIGMAP),
        optional_secret_volume("argocd-repo-server-tls", REPO_SERVER_TLS_SECRET),
    ]
}

pub fn server_default_volume_mounts() -> Vec<VolumeMount> {
    vec![
        mount("ssh-known-hosts", "/app/config/ssh"),
        mount("tls-certs", "/app/config/tls"),
        mount("argocd-repo-server-tls", "/app/config/server/tls"),
    ]
}

/// Number of operator-owned containers in the repo-server pod. Plugin
/// containers start at this index.
pub const REPO_SERVER_DEFAULT_CONTAINERS: usize = 1;

pub fn build_repo_server(cr: &ArgoCD, env: &BuildEnv) -> Deployment {
    let deploy = new_deployment(cr, REPO_SERVER_SUFFIX, common::REPO_SERVER);
    let image = images::argocd_image(cr, &env.images);
    let resources = cr.spec.repo.resources.clone();

    let copyutil = Container {
        name: "copyutil".into(),
        image: Some(image.clone()),
        image_pull_policy: Some(PULL_ALWAYS.into()),
        command: Some(strings(&[
            "cp",
            "-n",
            "/usr/local/bin/argocd",
            "/var/run/argocd/argocd-cmp-server",
        ])),
        resources: resources.clone(),
        volume_mounts: Some(vec![mount("var-files", "/var/run/argocd")]),
        ..Default::default()
    };

    let mut containers = vec![Container {
        name: common::REPO_SERVER.into(),
        image: Some(image),
        image_pull_policy: Some(PULL_ALWAYS.into()),
        command: Some(repo_server_command(cr)),
        ports: Some(vec![
            port(REPO_SERVER_PORT, Some("server")),
            port(REPO_SERVER_METRICS_PORT, Some("metrics")),
        ]),
        liveness_probe: Some(http_probe(REPO_SERVER_METRICS_PORT)),
        readiness_probe: Some(http_probe(REPO_SERVER_METRICS_PORT)),
        resources,
        volume_mounts: Some(repo_server_default_volume_mounts()),
        ..Default::default()
    }];
    containers.extend(cr.spec.repo.plugin_containers.iter().cloned());

    let pod = PodSpec {
        init_containers: Some(vec![copyutil]),
        containers,
        volumes: Some(repo_server_default_volumes()),
        ..Default::default()
    };
    finish(deploy, env, pod)
}

pub fn build_dex(cr: &ArgoCD, env: &BuildEnv) -> Deployment {
    let deploy = new_deployment(cr, DEX_SERVER_SUFFIX, common::DEX_SERVER);
    let resources = cr.spec.dex.resources.clone();

    let copyutil = Container {
        name: "copyutil".into(),
        image: Some(images::argocd_image(cr, &env.images)),
        image_pull_policy: Some(PULL_ALWAYS.into()),
        command: Some(strings(&[
            "cp",
            "-n",
            "/usr/local/bin/argocd",
            "/shared/argocd-dex",
        ])),
        resources: resources.clone(),
        volume_mounts: Some(vec![mount("static-files", "/shared")]),
        ..Default::default()
    };

    let dex = Container {
        name: "dex".into(),
        image: Some(images::dex_image(cr, &env.images)),
        image_pull_policy: Some(PULL_ALWAYS.into()),
        command: Some(strings(&["/shared/argocd-dex", "rundex"])),
        ports: Some(vec![
            port(DEX_HTTP_PORT, Some("http")),
            port(DEX_GRPC_PORT, Some("grpc")),
        ]),
        resources,
        volume_mounts: Some(vec![mount("static-files", "/shared")]),
        ..Default::default()
    };

    let pod = PodSpec {
        init_containers: Some(vec![copyutil]),
        containers: vec![dex],
        volumes: Some(vec![empty_dir_volume("static-files")]),
        ..Default::default()
    };
    finish(deploy, env, pod)
}

pub fn build_server(cr: &ArgoCD, env: &BuildEnv) -> Deployment {
    let deploy = new_deployment(cr, SERVER_SUFFIX, common::SERVER);

    let server = Container {
        name: common::SERVER.into(),
        image: Some(images::argocd_image(cr, &env.images)),
        image_pull_policy: Some(PULL_ALWAYS.into()),
        command: Some(server_command(cr)),
        ports: Some(vec![
            port(SERVER_PORT, None),
            port(SERVER_METRICS_PORT, None),
        ]),
        liveness_probe: Some(http_probe(SERVER_PORT)),
        readiness_probe: Some(http_probe(SERVER_PORT)),
        resources: cr.spec.server.resources.clone(),
        volume_mounts: Some(server_default_volume_mounts()),
        ..Default::default()
    };

    let pod = PodSpec {
        containers: vec![server],
        volumes: Some(server_default_volumes()),
        ..Default::default()
    };
    finish(deploy, env, pod)
}

pub fn build_redis(cr: &ArgoCD, env: &BuildEnv) -> Deployment {
    let deploy = new_deployment(cr, REDIS_SUFFIX, common::REDIS);

    let redis = Container {
        name: "redis".into(),
        image: Some(images::redis_image(cr, &env.images)),
        image_pull_policy: Some(PULL_ALWAYS.into()),
        args: Some(strings(&["--save", "", "--appendonly", "no"])),
        ports: Some(vec![port(REDIS_PORT, None)]),
        resources: cr.spec.redis.resources.clone(),
        ..Default::default()
    };

    let pod = PodSpec {
        containers: vec![redis],
        ..Default::default()
    };
    finish(deploy, env, pod)
}

pub fn build_redis_ha_proxy(cr: &ArgoCD, env: &BuildEnv) -> Deployment {
    let deploy = new_deployment(cr, REDIS_HA_PROXY_SUFFIX, common::REDIS_HA);
    let image = images::redis_ha_proxy_image(cr, &env.images);
    let resources = cr.spec.ha.resources.clone();

    let config_init = Container {
        name: "config-init".into(),
        image: Some(images::redis_image(cr, &env.images)),
        image_pull_policy: Some(PULL_IF_NOT_PRESENT.into()),
        command: Some(strings(&["sh"])),
        args: Some(strings(&["/readonly/haproxy_init.sh"])),
        resources: resources.clone(),
        volume_mounts: Some(vec![
            VolumeMount {
                read_only: Some(true),
                ..mount("config-volume", "/readonly")
            },
            mount("data", "/data"),
        ]),
        ..Default::default()
    };

    let haproxy = Container {
        name: "haproxy".into(),
        image: Some(image),
        image_pull_policy: Some(PULL_IF_NOT_PRESENT.into()),
        ports: Some(vec![port(REDIS_PORT, Some("redis"))]),
        liveness_probe: Some(http_probe(REDIS_HA_PROXY_HEALTH_PORT)),
        readiness_probe: Some(http_probe(REDIS_HA_PROXY_HEALTH_PORT)),
        resources,
        volume_mounts: Some(vec![
            mount("data", "/usr/local/etc/haproxy"),
            mount("shared-socket", "/run/haproxy"),
        ]),
        ..Default::default()
    };

    let pod = PodSpec {
        init_containers: Some(vec![config_init]),
        containers: vec![haproxy],
        volumes: Some(vec![
            config_map_volume("config-volume", REDIS_HA_CONFIGMAP),
            empty_dir_volume("shared-socket"),
            empty_dir_volume("data"),
        ]),
        ..Default::default()
    };
    finish(deploy, env, pod)
}

pub fn build_grafana(cr: &ArgoCD, env: &BuildEnv) -> Deployment {
    let deploy = new_deployment(cr, GRAFANA_SUFFIX, common::GRAFANA);
    let config_map = common::resource_name(cr, "grafana-config");

    let grafana = Container {
        name: "grafana".into(),
        image: Some(images::grafana_image(cr, &env.images)),
        image_pull_policy: Some(PULL_ALWAYS.into()),
        ports: Some(vec![port(GRAFANA_PORT, Some("http"))]),
        resources: cr.spec.grafana.resources.clone(),
        volume_mounts: Some(vec![mount("grafana-config", "/etc/grafana")]),
        ..Default::default()
    };

    let pod = PodSpec {
        containers: vec![grafana],
        volumes: Some(vec![config_map_volume("grafana-config", &config_map)]),
        ..Default::default()
    };
    finish(deploy, env, pod)
}
