mod components;
mod spec;
mod status;

pub use components::*;
pub use spec::*;
pub use status::*;
