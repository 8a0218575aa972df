//! # mapbind
//!
//! Declarative binders over an interactive map engine and its GPU overlay
//! layers.
//!
//! A [`MapHost`] creates the engine and hands out a [`MapHandle`]. Binders
//! (layers, markers, popups, controls) take that handle explicitly, put their
//! engine objects on the map, keep them there across style swaps through a
//! readiness gate, and re-emit the objects' native events. Everything else
//! (rendering, projection, tiles, picking) stays inside the engine, which is
//! reached only through the [`MapEngine`] trait.

pub mod core;
pub mod engine;
pub mod input;
pub mod layers;
pub mod prelude;
pub mod runtime;
pub mod traits;
pub mod ui;
pub use crate::core::constants;

use std::time::Duration;

// Re-export public API
pub use crate::core::{
    config::{GateConfig, GateProfile, MapOptions},
    geo::{CoordinateShape, Coordinates, LngLat},
    handle::{MapHandle, WeakMapHandle},
    lifecycle::Mounted,
    map::{HostEvent, MapHost},
    readiness::{wait_until_loaded, Readiness, ReadinessGate, ReadinessTracker},
};

pub use engine::{
    memory::MemoryEngine, ControlKind, ControlPosition, EventTarget, ListenerId, MapEngine,
    ObjectId, PopupAnchor,
};

pub use input::{BinderEvent, EngineEvent, EventKind, ObjectKind, ObjectRef};

pub use layers::{descriptors, LayerBinder, LayerConfig, MarkerBinder, MarkerConfig};

pub use ui::{ControlBinder, ControlConfig, PopupBinder, PopupConfig};

pub use traits::Binding;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Map has been destroyed")]
    MapDestroyed,

    #[error("Map has already been created by this host")]
    AlreadyCreated,

    #[error("Map host is not mounted")]
    NotMounted,

    #[error("Style did not finish loading within {0:?}")]
    StyleTimeout(Duration),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Lock poisoned")]
    Poisoned,
}

/// Error type alias for convenience
pub type Error = MapError;

/// Routes `log` output through `env_logger`, honouring `RUST_LOG`
#[cfg(feature = "debug")]
pub fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
