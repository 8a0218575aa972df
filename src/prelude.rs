//! Prelude module for common mapbind types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use mapbind::prelude::*;`

pub use crate::core::{
    config::{GateConfig, GateProfile, MapOptions},
    geo::{CoordinateShape, Coordinates, LngLat},
    handle::{MapHandle, WeakMapHandle},
    map::{HostEvent, MapHost},
    readiness::{wait_until_loaded, Readiness},
};

pub use crate::engine::{
    memory::MemoryEngine, ControlKind, ControlPosition, EventTarget, MapEngine, ObjectId,
    PopupAnchor,
};

pub use crate::input::{BinderEvent, EngineEvent, Emitter, EventKind, ObjectKind, ObjectRef};

pub use crate::layers::{descriptors, LayerBinder, LayerConfig, MarkerBinder, MarkerConfig};

pub use crate::ui::{ControlBinder, ControlConfig, PopupBinder, PopupConfig};

pub use crate::runtime::{runtime, spawn, AsyncHandle, AsyncSpawner};

pub use crate::traits::Binding;

pub use crate::{Error as MapError, Result};

pub use std::{pin::Pin, sync::Arc, time::Duration};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};

pub use futures::Future;
