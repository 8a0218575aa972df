//! The wrapped map engine, seen through the calls binders make against it
//!
//! Binders never talk to a concrete engine. They drive any [`MapEngine`]
//! implementation through a [`MapHandle`](crate::core::handle::MapHandle).

pub mod memory;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{config::MapOptions, geo::LngLat};
use crate::input::events::{EngineEvent, EventKind};
use crate::{Error, Result};

/// Engine-assigned id of a marker, popup or control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

/// Id returned by [`MapEngine::on`], needed to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// What a listener is attached to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventTarget {
    Map,
    /// Map events filtered to features of one layer
    Layer(String),
    /// A marker, popup or control
    Object(ObjectId),
}

pub type Listener = Box<dyn Fn(&EngineEvent) + Send + 'static>;

/// Native source types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    GeoJson,
    Raster,
    Vector,
    Image,
    Video,
    Canvas,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::GeoJson => crate::core::constants::GEOJSON_SOURCE_TYPE,
            SourceKind::Raster => "raster",
            SourceKind::Vector => "vector",
            SourceKind::Image => "image",
            SourceKind::Video => "video",
            SourceKind::Canvas => "canvas",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Layer types rendered by the GPU overlay library instead of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    Arc,
    GeoJson,
}

impl OverlayKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OverlayKind::Arc => "ArcLayer",
            OverlayKind::GeoJson => "GeoJsonLayer",
        }
    }
}

/// A source registration: its type tag plus the caller's source object
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSpec {
    pub kind: SourceKind,
    pub body: serde_json::Map<String, serde_json::Value>,
}

impl SourceSpec {
    /// Builds a source from a caller-supplied JSON object. A `type` field in
    /// the object is replaced by `kind`.
    pub fn from_value(kind: SourceKind, value: &serde_json::Value) -> Result<Self> {
        let mut body = match value {
            serde_json::Value::Object(map) => map.clone(),
            serde_json::Value::Null => serde_json::Map::new(),
            other => {
                return Err(Error::Config(format!(
                    "{} source must be a JSON object, got {}",
                    kind, other
                )))
            }
        };
        body.remove("type");
        Ok(Self { kind, body })
    }

    pub fn data(&self) -> Option<&serde_json::Value> {
        self.body.get("data")
    }

    /// The object the engine receives
    pub fn to_value(&self) -> serde_json::Value {
        let mut object = self.body.clone();
        object.insert("type".to_string(), self.kind.as_str().into());
        serde_json::Value::Object(object)
    }
}

/// Who draws a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerRenderer {
    Native,
    Overlay(OverlayKind),
}

/// A layer registration
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub id: String,
    /// Source the layer draws from; overlay layers carry their own data
    pub source: Option<String>,
    pub renderer: LayerRenderer,
    pub body: serde_json::Map<String, serde_json::Value>,
}

impl LayerSpec {
    /// Merges the caller's layer object under the fixed id and source fields
    pub fn native(
        id: impl Into<String>,
        source: impl Into<String>,
        layer: &serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            id: id.into(),
            source: Some(source.into()),
            renderer: LayerRenderer::Native,
            body: layer.clone(),
        }
    }

    pub fn overlay(
        id: impl Into<String>,
        kind: OverlayKind,
        options: &serde_json::Map<String, serde_json::Value>,
        data: serde_json::Value,
    ) -> Self {
        let mut body = options.clone();
        body.insert("data".to_string(), data);
        Self {
            id: id.into(),
            source: None,
            renderer: LayerRenderer::Overlay(kind),
            body,
        }
    }

    /// The object the engine receives. Fixed fields win over caller fields.
    pub fn to_value(&self) -> serde_json::Value {
        let mut object = self.body.clone();
        object.insert("id".to_string(), self.id.clone().into());
        if let Some(source) = &self.source {
            object.insert("source".to_string(), source.clone().into());
        }
        if let LayerRenderer::Overlay(kind) = self.renderer {
            object.insert("type".to_string(), kind.as_str().into());
        }
        serde_json::Value::Object(object)
    }
}

/// Built-in map controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Attribution,
    Fullscreen,
    Geolocate,
    Navigation,
    Scale,
}

impl ControlKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlKind::Attribution => "attribution",
            ControlKind::Fullscreen => "fullscreen",
            ControlKind::Geolocate => "geolocate",
            ControlKind::Navigation => "navigation",
            ControlKind::Scale => "scale",
        }
    }

    /// Corner the control goes to when the caller does not pick one
    pub fn default_position(self) -> ControlPosition {
        match self {
            ControlKind::Attribution => ControlPosition::BottomRight,
            ControlKind::Fullscreen | ControlKind::Geolocate | ControlKind::Navigation => {
                ControlPosition::TopLeft
            }
            ControlKind::Scale => ControlPosition::BottomLeft,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl ControlPosition {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlPosition::TopLeft => "top-left",
            ControlPosition::TopRight => "top-right",
            ControlPosition::BottomLeft => "bottom-left",
            ControlPosition::BottomRight => "bottom-right",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlSpec {
    pub kind: ControlKind,
    pub options: serde_json::Value,
}

/// A marker registration
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub position: LngLat,
    /// Custom element markup; `None` uses the engine's default glyph
    pub element: Option<String>,
    pub cursor: String,
    pub options: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopupSpec {
    pub position: LngLat,
    pub html: String,
    pub options: serde_json::Value,
}

/// Where a popup lives. A popup belongs to one marker or to the map, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PopupAnchor {
    Map,
    /// The marker owns the popup; removing the marker removes the popup
    Marker(ObjectId),
}

/// The calls this crate makes against a map engine.
///
/// Listener callbacks registered through [`MapEngine::on`] run while the
/// engine is borrowed and must not call back into it.
pub trait MapEngine: Send + 'static {
    /// Constructs the engine. Side-effecting and not idempotent.
    fn create(options: &MapOptions) -> Result<Self>
    where
        Self: Sized;

    /// Tears the engine down
    fn remove(&mut self);

    fn is_style_loaded(&self) -> bool;

    fn add_source(&mut self, id: &str, source: SourceSpec) -> Result<()>;
    fn has_source(&self, id: &str) -> bool;
    /// Replaces the feature data of a geojson source in place
    fn set_source_data(&mut self, id: &str, data: serde_json::Value) -> Result<()>;
    fn remove_source(&mut self, id: &str) -> Result<()>;

    /// Adds a layer below `before`, or on top of the stack when `before` is `None`
    fn add_layer(&mut self, layer: LayerSpec, before: Option<&str>) -> Result<()>;
    fn has_layer(&self, id: &str) -> bool;
    fn remove_layer(&mut self, id: &str) -> Result<()>;

    fn add_control(&mut self, control: ControlSpec, position: ControlPosition) -> Result<ObjectId>;

    fn add_marker(&mut self, marker: MarkerSpec) -> Result<ObjectId>;
    fn set_marker_position(&mut self, id: ObjectId, position: LngLat) -> Result<()>;
    fn has_marker(&self, id: ObjectId) -> bool;
    /// Removes the marker and any popup anchored to it
    fn remove_marker(&mut self, id: ObjectId) -> Result<()>;

    fn add_popup(&mut self, popup: PopupSpec, anchor: PopupAnchor) -> Result<ObjectId>;
    fn has_popup(&self, id: ObjectId) -> bool;
    fn remove_popup(&mut self, id: ObjectId) -> Result<()>;

    fn on(&mut self, kind: EventKind, target: EventTarget, listener: Listener) -> ListenerId;
    /// Returns `false` when the listener was not registered
    fn off(&mut self, id: ListenerId) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_layer_fixed_fields_override_caller() {
        let caller = json!({ "id": "ignored", "source": "ignored", "type": "fill" });
        let spec = LayerSpec::native("l1", "s1", caller.as_object().unwrap());
        let value = spec.to_value();
        assert_eq!(value["id"], json!("l1"));
        assert_eq!(value["source"], json!("s1"));
        assert_eq!(value["type"], json!("fill"));
    }

    #[test]
    fn test_overlay_layer_value() {
        let options = json!({ "getWidth": 2 });
        let spec = LayerSpec::overlay(
            "arcs",
            OverlayKind::Arc,
            options.as_object().unwrap(),
            json!([{ "from": [0, 0], "to": [1, 1] }]),
        );
        let value = spec.to_value();
        assert_eq!(value["type"], json!("ArcLayer"));
        assert_eq!(value["getWidth"], json!(2));
        assert!(value.get("source").is_none());
        assert!(value["data"].is_array());
    }

    #[test]
    fn test_source_type_comes_from_kind() {
        let spec = SourceSpec::from_value(
            SourceKind::Raster,
            &json!({ "type": "geojson", "tiles": ["https://tiles/{z}/{x}/{y}.png"] }),
        )
        .unwrap();
        assert_eq!(spec.to_value()["type"], json!("raster"));
        assert!(spec.to_value()["tiles"].is_array());
    }

    #[test]
    fn test_source_must_be_object() {
        assert!(SourceSpec::from_value(SourceKind::GeoJson, &json!("nope")).is_err());
        assert!(SourceSpec::from_value(SourceKind::GeoJson, &serde_json::Value::Null).is_ok());
    }

    #[test]
    fn test_control_default_positions() {
        assert_eq!(
            ControlKind::Attribution.default_position(),
            ControlPosition::BottomRight
        );
        assert_eq!(ControlKind::Scale.default_position(), ControlPosition::BottomLeft);
        assert_eq!(ControlKind::Navigation.default_position().as_str(), "top-left");
    }
}
