pub mod config;
pub mod context;
pub mod controller;
pub mod decision;
pub mod deployments;
pub mod drift;
pub mod error;
pub mod hooks;
pub mod metrics;
pub mod namespaces;
pub mod roles;
pub mod server;
pub mod store;
pub mod telemetry;

pub use config::{ClusterConfigNamespaces, OperatorConfig};
pub use context::Context;
pub use decision::{Decision, decide};
pub use error::{Error, Result};
pub use hooks::{HookError, HookTarget, Hooks, ReconcilerHook};
pub use store::{KubeObject, ObjectStore};
