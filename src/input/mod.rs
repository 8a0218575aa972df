pub mod emitter;
pub mod events;
pub mod forward;

// Re-export the essential types
pub use emitter::Emitter;
pub use events::{
    BinderEvent, EngineEvent, EventCatalog, EventKind, ObjectKind, ObjectRef, PayloadKind,
};
pub use forward::EventForwarder;
