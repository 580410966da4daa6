pub mod common;
pub mod deployment;
pub mod images;
pub mod policy;
pub mod proxy;
pub mod role;

pub use deployment::BuildEnv;
pub use images::ImageOverrides;
pub use proxy::ProxyEnv;
