use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::config::GateConfig;
use crate::engine::{LayerSpec, MapEngine, OverlayKind, SourceKind, SourceSpec};
use crate::{Error, Result};

/// Who renders a layer variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// Engine-rendered layer drawing from its own source
    Native(SourceKind),
    /// GPU overlay layer carrying its data inline
    Overlay(OverlayKind),
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKind::Native(kind) => write!(f, "{} layer", kind),
            LayerKind::Overlay(kind) => write!(f, "{} overlay", kind.as_str()),
        }
    }
}

/// Static description of one layer binder variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerDescriptor {
    pub name: &'static str,
    /// `None` for overlay variants, which own no source
    pub default_source_id: Option<&'static str>,
    pub default_layer_id: &'static str,
    pub kind: LayerKind,
    /// Whether the layer interaction events are re-emitted
    pub forwards_events: bool,
}

impl LayerDescriptor {
    pub fn is_overlay(&self) -> bool {
        matches!(self.kind, LayerKind::Overlay(_))
    }

    /// Only geojson sources accept in-place data replacement
    pub fn supports_data_replace(&self) -> bool {
        self.kind == LayerKind::Native(SourceKind::GeoJson)
    }
}

pub mod descriptors {
    use super::{LayerDescriptor, LayerKind};
    use crate::engine::{OverlayKind, SourceKind};

    layer_descriptors! {
        GEOJSON => {
            name: "geojson",
            source: Some("mapbox.gl-geojson-source"),
            layer: "mapbox.gl-geojson-layer",
            kind: LayerKind::Native(SourceKind::GeoJson),
            forwards_events: true,
        },
        RASTER => {
            name: "raster",
            source: Some("mapbox.gl-raster-source"),
            layer: "mapbox.gl-raster-layer",
            kind: LayerKind::Native(SourceKind::Raster),
            forwards_events: false,
        },
        VECTOR => {
            name: "vector",
            source: Some("mapbox.gl-vector-source"),
            layer: "mapbox.gl-vector-layer",
            kind: LayerKind::Native(SourceKind::Vector),
            forwards_events: false,
        },
        IMAGE => {
            name: "image",
            source: Some("mapbox.gl-image-source"),
            layer: "mapbox.gl-image-layer",
            kind: LayerKind::Native(SourceKind::Image),
            forwards_events: false,
        },
        VIDEO => {
            name: "video",
            source: Some("mapbox.gl-video-source"),
            layer: "mapbox.gl-video-layer",
            kind: LayerKind::Native(SourceKind::Video),
            forwards_events: false,
        },
        CANVAS => {
            name: "canvas",
            source: Some("mapbox.gl-canvas-source"),
            layer: "mapbox.gl-canvas-layer",
            kind: LayerKind::Native(SourceKind::Canvas),
            forwards_events: false,
        },
        /// Arcs between origin/destination pairs, drawn by the overlay library
        ARC_OVERLAY => {
            name: "arc-overlay",
            source: None,
            layer: "deck.gl-arc-layer",
            kind: LayerKind::Overlay(OverlayKind::Arc),
            forwards_events: false,
        },
        GEOJSON_OVERLAY => {
            name: "geojson-overlay",
            source: None,
            layer: "deck.gl-geojson-layer",
            kind: LayerKind::Overlay(OverlayKind::GeoJson),
            forwards_events: false,
        },
    }
}

/// Caller configuration of a layer binder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    /// Defaults to the variant's source id
    pub source_id: Option<String>,
    /// Defaults to the variant's layer id
    pub layer_id: Option<String>,
    /// Source object handed to the engine. Overlay variants use it as the
    /// layer data instead.
    pub source: serde_json::Value,
    /// Layer object; `id` and `source` are always overridden
    pub layer: serde_json::Value,
    /// Layer id to insert below; top of the stack when `None`
    pub before: Option<String>,
    pub gate: GateConfig,
}

impl LayerConfig {
    pub fn new(source: serde_json::Value) -> Self {
        Self {
            source,
            ..Self::default()
        }
    }

    pub fn with_ids(mut self, source_id: impl Into<String>, layer_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self.layer_id = Some(layer_id.into());
        self
    }

    pub fn with_layer_id(mut self, layer_id: impl Into<String>) -> Self {
        self.layer_id = Some(layer_id.into());
        self
    }

    pub fn with_layer(mut self, layer: serde_json::Value) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_before(mut self, before: impl Into<String>) -> Self {
        self.before = Some(before.into());
        self
    }

    pub fn with_gate(mut self, gate: GateConfig) -> Self {
        self.gate = gate;
        self
    }

    /// The layer object as a JSON map; `null` counts as empty
    pub fn layer_object(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        match &self.layer {
            serde_json::Value::Object(map) => Ok(map.clone()),
            serde_json::Value::Null => Ok(serde_json::Map::new()),
            other => Err(Error::Config(format!(
                "layer must be a JSON object, got {}",
                other
            ))),
        }
    }
}

/// A source+layer pair currently registered with the engine.
///
/// Only [`AttachedPair::register`] creates one, and [`AttachedPair::remove`]
/// always takes the layer off before its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedPair {
    layer_id: String,
    source_id: Option<String>,
}

impl AttachedPair {
    /// Adds the source (if any), then the layer. A failed layer registration
    /// rolls the fresh source back.
    pub fn register<E: MapEngine + ?Sized>(
        engine: &mut E,
        source: Option<(&str, SourceSpec)>,
        layer: LayerSpec,
        before: Option<&str>,
    ) -> Result<Self> {
        let source_id = match source {
            Some((id, spec)) => {
                engine.add_source(id, spec)?;
                Some(id.to_string())
            }
            None => None,
        };
        let layer_id = layer.id.clone();

        if let Err(err) = engine.add_layer(layer, before) {
            if let Some(id) = &source_id {
                if let Err(rollback) = engine.remove_source(id) {
                    log::warn!("could not roll back source '{}': {}", id, rollback);
                }
            }
            return Err(err);
        }

        Ok(Self {
            layer_id,
            source_id,
        })
    }

    /// Removes the layer, then its source. Objects the engine already dropped
    /// (after a style swap) are skipped, so a partly failed removal can be retried.
    pub fn remove<E: MapEngine + ?Sized>(&self, engine: &mut E) -> Result<()> {
        if engine.has_layer(&self.layer_id) {
            engine.remove_layer(&self.layer_id)?;
        }
        if let Some(source_id) = &self.source_id {
            if engine.has_source(source_id) {
                engine.remove_source(source_id)?;
            }
        }
        Ok(())
    }

    pub fn layer_id(&self) -> &str {
        &self.layer_id
    }

    pub fn source_id(&self) -> Option<&str> {
        self.source_id.as_deref()
    }
}
