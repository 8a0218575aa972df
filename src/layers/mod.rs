#[macro_use]
mod macros;

pub mod base;
pub mod binder;
pub mod marker;

pub use base::{descriptors, AttachedPair, LayerConfig, LayerDescriptor, LayerKind};
pub use binder::{LayerBinder, LayerBinding};
pub use marker::{MarkerBinder, MarkerBinding, MarkerConfig};
