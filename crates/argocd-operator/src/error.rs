use thiserror::Error;

use crate::hooks::HookError;

#[derive(Debug, Error)]
pub enum Error {
    /// A read failed for a reason other than not-found.
    #[error("failed to reconcile the {kind} for the service account associated with {component}: {source}")]
    Lookup {
        kind: &'static str,
        component: String,
        #[source]
        source: kube::Error,
    },

    #[error(transparent)]
    Kube(#[from] kube::Error),

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error("failed to delete cluster role {name}: {source}")]
    Cleanup {
        name: String,
        #[source]
        source: kube::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn lookup(kind: &'static str, component: &str) -> impl FnOnce(kube::Error) -> Self {
        move |source| Self::Lookup {
            kind,
            component: component.to_string(),
            source,
        }
    }
}
