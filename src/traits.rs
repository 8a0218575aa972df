//! Shared trait abstractions
//!
//! Every gated binder is a [`Binding`]: a value that knows how to put its
//! engine objects on the map and take them off again. The mount lifecycle in
//! [`crate::core::lifecycle`] drives any binding from readiness edges.

use crate::engine::MapEngine;
use crate::Result;

/// One wrapped engine object (or source+layer pair) and its attachment state
pub trait Binding<E: MapEngine>: Send + 'static {
    /// Registers the object with the engine. Called on mount when the style
    /// is loaded and again on every ready edge.
    fn attach(&mut self, engine: &mut E) -> Result<()>;

    /// Takes the object off the map. Must be a no-op when nothing is attached
    /// from this binding's point of view, apart from notifications the binding
    /// always sends.
    fn detach(&mut self, engine: &mut E) -> Result<()>;

    fn is_attached(&self) -> bool;

    /// The readiness poll gave up on the current style-load cycle
    fn on_timeout(&mut self) {}

    /// Short description used in log lines
    fn describe(&self) -> String;
}
