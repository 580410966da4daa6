//! Field-level convergence of a live Deployment towards its desired state.
//!
//! Image, command and args are compared strictly. Everything else is
//! compared as a JSON subset of the live object, so values the API server
//! fills in (pull policies, empty resources, port protocols, probe
//! thresholds, volume default modes) never register as drift.

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Container;
use serde::Serialize;
use serde_json::Value;

/// Copy every differing managed field of `desired` into `live`. Returns
/// whether anything changed.
///
/// Containers at or after `first_sidecar` are taken verbatim from the custom
/// resource and are replaced as a whole whenever any field they set differs.
pub fn converge_deployment(
    live: &mut Deployment,
    desired: &Deployment,
    first_sidecar: Option<usize>,
) -> bool {
    let Some(want) = desired.spec.as_ref() else {
        return false;
    };
    let Some(have) = live.spec.as_mut() else {
        live.spec = Some(want.clone());
        return true;
    };

    let mut changed = false;
    if want.replicas.is_some() && have.replicas != want.replicas {
        have.replicas = want.replicas;
        changed = true;
    }

    let Some(want_pod) = want.template.spec.as_ref() else {
        return changed;
    };
    let have_pod = have.template.spec.get_or_insert_with(Default::default);

    if have_pod.service_account_name != want_pod.service_account_name {
        have_pod.service_account_name = want_pod.service_account_name.clone();
        changed = true;
    }
    if list_differs(&want_pod.volumes, &have_pod.volumes) {
        have_pod.volumes = want_pod.volumes.clone();
        changed = true;
    }
    if want_pod.init_containers.is_some() != have_pod.init_containers.is_some() {
        have_pod.init_containers = want_pod.init_containers.clone();
        changed = true;
    } else if let (Some(want_init), Some(have_init)) =
        (&want_pod.init_containers, &mut have_pod.init_containers)
    {
        changed |= converge_containers(have_init, want_init, None);
    }
    changed |= converge_containers(
        &mut have_pod.containers,
        &want_pod.containers,
        first_sidecar,
    );
    changed
}

/// A length mismatch or a renamed slot replaces containers wholesale, so a
/// swapped plugin sidecar never inherits fields from its predecessor.
fn converge_containers(
    live: &mut Vec<Container>,
    desired: &[Container],
    first_sidecar: Option<usize>,
) -> bool {
    if live.len() != desired.len() {
        *live = desired.to_vec();
        return true;
    }
    let mut changed = false;
    for (i, (have, want)) in live.iter_mut().zip(desired).enumerate() {
        let sidecar = first_sidecar.is_some_and(|first| i >= first);
        if have.name != want.name || (sidecar && differs(want, have)) {
            *have = want.clone();
            changed = true;
        } else {
            changed |= converge_container(have, want);
        }
    }
    changed
}

fn converge_container(have: &mut Container, want: &Container) -> bool {
    let mut changed = false;

    macro_rules! strict {
        ($($field:ident),*) => {$(
            if have.$field != want.$field {
                have.$field = want.$field.clone();
                changed = true;
            }
        )*};
    }
    macro_rules! lists {
        ($($field:ident),*) => {$(
            if list_differs(&want.$field, &have.$field) {
                have.$field = want.$field.clone();
                changed = true;
            }
        )*};
    }
    macro_rules! optional {
        ($($field:ident),*) => {$(
            if option_differs(&want.$field, &have.$field) {
                have.$field = want.$field.clone();
                changed = true;
            }
        )*};
    }

    strict!(image, command, args);
    lists!(env, volume_mounts, ports);
    optional!(liveness_probe, readiness_probe);

    // Left unset, the API server picks the pull policy.
    if want.image_pull_policy.is_some() && have.image_pull_policy != want.image_pull_policy {
        have.image_pull_policy = want.image_pull_policy.clone();
        changed = true;
    }
    // The API server returns `{}` for containers without requirements.
    if want.resources.clone().unwrap_or_default() != have.resources.clone().unwrap_or_default() {
        have.resources = want.resources.clone();
        changed = true;
    }
    changed
}

fn differs<T: Serialize>(desired: &T, live: &T) -> bool {
    let desired = prune_empty(serde_json::to_value(desired).unwrap_or_default());
    let live = serde_json::to_value(live).unwrap_or_default();
    !json_is_subset(&desired, &live)
}

/// Unset and empty lists compare equal; the API server omits empty lists.
fn list_differs<T: Serialize>(desired: &Option<Vec<T>>, live: &Option<Vec<T>>) -> bool {
    differs(
        &desired.as_deref().unwrap_or_default(),
        &live.as_deref().unwrap_or_default(),
    )
}

fn option_differs<T: Serialize>(desired: &Option<T>, live: &Option<T>) -> bool {
    match (desired, live) {
        (Some(d), Some(l)) => differs(d, l),
        (d, l) => d.is_some() != l.is_some(),
    }
}

/// Drop nulls and empty lists from object fields, which the API server
/// omits. Array elements are kept so lengths still compare.
fn prune_empty(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, prune_empty(v)))
                .filter(|(_, v)| !is_empty(v))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(prune_empty).collect()),
        other => other,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

/// Paths where `desired` differs from `live`, for debug logging.
pub fn diff_paths<T: Serialize>(desired: &T, live: &T) -> Vec<String> {
    let desired = serde_json::to_value(desired).unwrap_or_default();
    let live = serde_json::to_value(live).unwrap_or_default();
    json_diff_paths(&desired, &live, String::new())
}

fn json_diff_paths(desired: &Value, actual: &Value, path: String) -> Vec<String> {
    match (desired, actual) {
        (Value::Object(d), Value::Object(a)) => d
            .iter()
            .flat_map(|(k, dv)| {
                let p = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                match a.get(k) {
                    Some(av) => json_diff_paths(dv, av, p),
                    None => vec![format!("{p}: missing in actual")],
                }
            })
            .collect(),
        (Value::Array(d), Value::Array(a)) if d.len() == a.len() => d
            .iter()
            .zip(a.iter())
            .enumerate()
            .flat_map(|(i, (dv, av))| json_diff_paths(dv, av, format!("{path}[{i}]")))
            .collect(),
        (Value::Array(d), Value::Array(a)) => {
            vec![format!("{path}: array length {0} vs {1}", d.len(), a.len())]
        }
        _ if desired == actual => vec![],
        _ => vec![format!("{path}: {desired} vs {actual}")],
    }
}

/// Every field in `desired` exists with the same value in `actual`; extra
/// fields in `actual` are ignored.
fn json_is_subset(desired: &Value, actual: &Value) -> bool {
    match (desired, actual) {
        (Value::Object(d), Value::Object(a)) => d
            .iter()
            .all(|(k, dv)| a.get(k).is_some_and(|av| json_is_subset(dv, av))),
        (Value::Array(d), Value::Array(a)) => {
            d.len() == a.len()
                && d.iter()
                    .zip(a.iter())
                    .all(|(dv, av)| json_is_subset(dv, av))
        }
        _ => desired == actual,
    }
}
