use std::fmt;
use std::str::FromStr;

use fxhash::FxHashMap;
use once_cell::sync::Lazy;

use crate::core::geo::{Coordinates, LngLat};
use crate::engine::{EventTarget, ObjectId};
use crate::Error;

/// What an event carries besides its name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    /// Nothing beyond the event name
    Empty,
    /// Pointer position (`lng_lat`) plus raw pointer data
    Pointer,
    /// Camera state after a pan/zoom/rotate/pitch step
    Camera,
    /// Source or style data notification
    Data,
    /// Error description
    Error,
    /// Position fix or geolocation failure
    Geolocation,
}

/// Generates the single event table: variant, engine-side name and payload kind.
macro_rules! event_kinds {
    ($($variant:ident => $name:literal : $payload:ident),+ $(,)?) => {
        /// Every event name any wrapped object can emit
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum EventKind {
            $($variant),+
        }

        impl EventKind {
            pub const ALL: &'static [EventKind] = &[$(EventKind::$variant),+];

            /// Name the engine uses for this event
            pub fn as_str(self) -> &'static str {
                match self {
                    $(EventKind::$variant => $name),+
                }
            }

            pub fn payload(self) -> PayloadKind {
                match self {
                    $(EventKind::$variant => PayloadKind::$payload),+
                }
            }
        }
    };
}

event_kinds! {
    Error => "error": Error,
    Load => "load": Empty,
    Idle => "idle": Empty,
    Remove => "remove": Empty,
    Render => "render": Empty,
    Resize => "resize": Empty,
    WebglContextLost => "webglcontextlost": Empty,
    WebglContextRestored => "webglcontextrestored": Empty,
    DataLoading => "dataloading": Data,
    Data => "data": Data,
    TileDataLoading => "tiledataloading": Data,
    SourceDataLoading => "sourcedataloading": Data,
    StyleDataLoading => "styledataloading": Data,
    SourceData => "sourcedata": Data,
    StyleData => "styledata": Data,
    StyleLoad => "style.load": Empty,
    BoxZoomCancel => "boxzoomcancel": Pointer,
    BoxZoomStart => "boxzoomstart": Pointer,
    BoxZoomEnd => "boxzoomend": Pointer,
    TouchCancel => "touchcancel": Pointer,
    TouchMove => "touchmove": Pointer,
    TouchEnd => "touchend": Pointer,
    TouchStart => "touchstart": Pointer,
    Click => "click": Pointer,
    ContextMenu => "contextmenu": Pointer,
    DblClick => "dblclick": Pointer,
    MouseMove => "mousemove": Pointer,
    MouseUp => "mouseup": Pointer,
    MouseDown => "mousedown": Pointer,
    MouseOut => "mouseout": Pointer,
    MouseOver => "mouseover": Pointer,
    MouseEnter => "mouseenter": Pointer,
    MouseLeave => "mouseleave": Pointer,
    Wheel => "wheel": Pointer,
    MoveStart => "movestart": Camera,
    Move => "move": Camera,
    MoveEnd => "moveend": Camera,
    ZoomStart => "zoomstart": Camera,
    Zoom => "zoom": Camera,
    ZoomEnd => "zoomend": Camera,
    RotateStart => "rotatestart": Camera,
    Rotate => "rotate": Camera,
    RotateEnd => "rotateend": Camera,
    DragStart => "dragstart": Pointer,
    Drag => "drag": Pointer,
    DragEnd => "dragend": Pointer,
    PitchStart => "pitchstart": Camera,
    Pitch => "pitch": Camera,
    PitchEnd => "pitchend": Camera,
    Geolocate => "geolocate": Geolocation,
    OutOfMaxBounds => "outofmaxbounds": Geolocation,
    TrackUserLocationStart => "trackuserlocationstart": Empty,
    TrackUserLocationEnd => "trackuserlocationend": Empty,
    Open => "open": Empty,
    Close => "close": Empty,
}

static BY_NAME: Lazy<FxHashMap<&'static str, EventKind>> = Lazy::new(|| {
    EventKind::ALL
        .iter()
        .map(|kind| (kind.as_str(), *kind))
        .collect()
});

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        BY_NAME
            .get(name)
            .copied()
            .ok_or_else(|| Error::Config(format!("unknown event name '{}'", name)))
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named set of events one kind of wrapped object emits
#[derive(Debug, Clone, Copy)]
pub struct EventCatalog {
    pub name: &'static str,
    pub kinds: &'static [EventKind],
}

impl EventCatalog {
    pub fn contains(&self, kind: EventKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

/// Lifecycle and interaction events of the map itself
pub const MAP_EVENTS: EventCatalog = EventCatalog {
    name: "map",
    kinds: &[
        EventKind::Error,
        EventKind::Load,
        EventKind::Idle,
        EventKind::Remove,
        EventKind::Render,
        EventKind::Resize,
        EventKind::WebglContextLost,
        EventKind::WebglContextRestored,
        EventKind::DataLoading,
        EventKind::Data,
        EventKind::TileDataLoading,
        EventKind::SourceDataLoading,
        EventKind::StyleDataLoading,
        EventKind::SourceData,
        EventKind::StyleData,
        EventKind::BoxZoomCancel,
        EventKind::BoxZoomStart,
        EventKind::BoxZoomEnd,
        EventKind::TouchCancel,
        EventKind::TouchMove,
        EventKind::TouchEnd,
        EventKind::TouchStart,
        EventKind::Click,
        EventKind::ContextMenu,
        EventKind::DblClick,
        EventKind::MouseMove,
        EventKind::MouseUp,
        EventKind::MouseDown,
        EventKind::MouseOut,
        EventKind::MouseOver,
        EventKind::MoveStart,
        EventKind::Move,
        EventKind::MoveEnd,
        EventKind::ZoomStart,
        EventKind::Zoom,
        EventKind::ZoomEnd,
        EventKind::RotateStart,
        EventKind::Rotate,
        EventKind::RotateEnd,
        EventKind::DragStart,
        EventKind::Drag,
        EventKind::DragEnd,
        EventKind::PitchStart,
        EventKind::Pitch,
        EventKind::PitchEnd,
        EventKind::Wheel,
    ],
};

/// Pointer events delivered for features of one layer
pub const LAYER_EVENTS: EventCatalog = EventCatalog {
    name: "layer",
    kinds: &[
        EventKind::Click,
        EventKind::DblClick,
        EventKind::MouseDown,
        EventKind::MouseUp,
        EventKind::MouseMove,
        EventKind::MouseEnter,
        EventKind::MouseLeave,
        EventKind::MouseOver,
        EventKind::MouseOut,
        EventKind::ContextMenu,
        EventKind::TouchStart,
        EventKind::TouchEnd,
        EventKind::TouchCancel,
    ],
};

/// Drag events of a marker plus the pointer events of its element
pub const MARKER_EVENTS: EventCatalog = EventCatalog {
    name: "marker",
    kinds: &[
        EventKind::DragStart,
        EventKind::Drag,
        EventKind::DragEnd,
        EventKind::Click,
        EventKind::MouseEnter,
        EventKind::MouseLeave,
    ],
};

pub const POPUP_EVENTS: EventCatalog = EventCatalog {
    name: "popup",
    kinds: &[EventKind::Open, EventKind::Close],
};

pub const GEOLOCATE_EVENTS: EventCatalog = EventCatalog {
    name: "geolocate",
    kinds: &[
        EventKind::Geolocate,
        EventKind::Error,
        EventKind::OutOfMaxBounds,
        EventKind::TrackUserLocationStart,
        EventKind::TrackUserLocationEnd,
    ],
};

/// A native event as delivered by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineEvent {
    pub kind: EventKind,
    pub target: EventTarget,
    /// Geographic position for pointer and drag events
    pub lng_lat: Option<LngLat>,
    /// Remaining engine payload, forwarded as-is
    pub data: serde_json::Value,
}

impl EngineEvent {
    pub fn new(kind: EventKind, target: EventTarget) -> Self {
        Self {
            kind,
            target,
            lng_lat: None,
            data: serde_json::Value::Null,
        }
    }

    pub fn on_map(kind: EventKind) -> Self {
        Self::new(kind, EventTarget::Map)
    }

    pub fn on_layer(kind: EventKind, layer_id: impl Into<String>) -> Self {
        Self::new(kind, EventTarget::Layer(layer_id.into()))
    }

    pub fn on_object(kind: EventKind, id: ObjectId) -> Self {
        Self::new(kind, EventTarget::Object(id))
    }

    pub fn with_lng_lat(mut self, lng_lat: LngLat) -> Self {
        self.lng_lat = Some(lng_lat);
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    pub fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    pub fn payload(&self) -> PayloadKind {
        self.kind.payload()
    }
}

/// Kind of object a binder owns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Layer,
    Marker,
    Popup,
}

/// The engine object a binder just put on the map
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectRef {
    Layer {
        layer_id: String,
        /// `None` for overlay layers, which carry their own data
        source_id: Option<String>,
    },
    Marker(ObjectId),
    Popup(ObjectId),
    Control(ObjectId),
}

/// What a binder emits to its owner
#[derive(Debug, Clone, PartialEq)]
pub enum BinderEvent {
    Added(ObjectRef),
    Removed(ObjectKind),
    /// A marker drag ended; coordinates are in the shape the caller used
    CoordinatesUpdated(Coordinates),
    /// The readiness poll gave up on the current style-load cycle
    StyleTimedOut,
    /// A native event of the wrapped object, forwarded verbatim
    Native(EngineEvent),
}

impl BinderEvent {
    pub fn native(&self) -> Option<&EngineEvent> {
        match self {
            BinderEvent::Native(event) => Some(event),
            _ => None,
        }
    }
}
