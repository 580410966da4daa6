pub mod v1alpha1;

pub use v1alpha1::*;
