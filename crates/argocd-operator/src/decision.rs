use argocd_crds::ArgoCD;
use argocd_resources::common;
use tracing::debug;

use crate::store::KubeObject;

/// What to do with a managed object given whether it exists and whether the
/// feature that owns it is enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision<T> {
    Create,
    Update(T),
    Delete(T),
    Noop,
}

pub fn decide<T>(existing: Option<T>, enabled: bool) -> Decision<T> {
    match (existing, enabled) {
        (None, true) => Decision::Create,
        (None, false) => Decision::Noop,
        (Some(live), true) => Decision::Update(live),
        (Some(live), false) => Decision::Delete(live),
    }
}

/// Point `obj` at the instance as its controller. Cluster-scoped objects are
/// left alone: a namespaced owner cannot own them.
pub fn set_owner<K: KubeObject>(obj: &mut K, cr: &ArgoCD) {
    if !K::NAMESPACED {
        debug!(
            name = obj.meta().name.as_deref().unwrap_or_default(),
            "skipping owner reference on cluster-scoped object"
        );
        return;
    }
    if let Some(owner) = common::owner_reference(cr) {
        obj.meta_mut().owner_references = Some(vec![owner]);
    }
}
