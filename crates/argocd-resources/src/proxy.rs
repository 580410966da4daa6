use k8s_openapi::api::core::v1::{EnvVar, PodSpec};

/// Proxy variables propagated from the operator's environment, in the order
/// they are appended to container env lists.
pub const PROXY_KEYS: [&str; 3] = ["HTTP_PROXY", "HTTPS_PROXY", "no_proxy"];

/// Proxy settings resolved from the operator's environment.
///
/// Each key is looked up by its exact name first and then by its lower-case
/// name; the name that was found is the one written into containers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProxyEnv {
    vars: Vec<(String, String)>,
}

impl ProxyEnv {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut vars = Vec::new();
        for key in PROXY_KEYS {
            let lower = key.to_lowercase();
            let found = [key, lower.as_str()].into_iter().find_map(|k| {
                lookup(k)
                    .filter(|v| !v.is_empty())
                    .map(|v| (k.to_string(), v))
            });
            if let Some(var) = found {
                vars.push(var);
            }
        }
        Self { vars }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn vars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Append every proxy variable not already present in `env` under any
    /// case variant. Existing entries keep their value and position.
    pub fn append_to(&self, mut env: Vec<EnvVar>) -> Vec<EnvVar> {
        for (name, value) in &self.vars {
            let present = env.iter().any(|e| e.name.eq_ignore_ascii_case(name));
            if !present {
                env.push(EnvVar {
                    name: name.clone(),
                    value: Some(value.clone()),
                    ..Default::default()
                });
            }
        }
        env
    }

    /// Apply [`ProxyEnv::append_to`] to every container and init container.
    pub fn inject(&self, pod: &mut PodSpec) {
        if self.is_empty() {
            return;
        }
        let init = pod.init_containers.iter_mut().flatten();
        for container in pod.containers.iter_mut().chain(init) {
            let env = self.append_to(container.env.take().unwrap_or_default());
            container.env = (!env.is_empty()).then_some(env);
        }
    }
}
