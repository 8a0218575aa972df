use serde::{Deserialize, Serialize};

use crate::core::handle::MapHandle;
use crate::engine::{ControlKind, ControlPosition, ControlSpec, EventTarget, MapEngine, ObjectId};
use crate::input::emitter::Emitter;
use crate::input::events::{BinderEvent, EngineEvent, ObjectRef, GEOLOCATE_EVENTS};
use crate::input::forward::EventForwarder;
use crate::{Error, Result};

/// Control configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlConfig {
    pub kind: ControlKind,
    /// Engine control options, forwarded verbatim
    #[serde(default)]
    pub options: Option<serde_json::Value>,
    /// Defaults to [`ControlKind::default_position`]
    #[serde(default)]
    pub position: Option<ControlPosition>,
    /// Attribution text; replaces `customAttribution` in the options
    #[serde(default)]
    pub content: Option<String>,
}

impl ControlConfig {
    pub fn new(kind: ControlKind) -> Self {
        Self {
            kind,
            options: None,
            position: None,
            content: None,
        }
    }

    pub fn with_options(mut self, options: serde_json::Value) -> Self {
        self.options = Some(options);
        self
    }

    pub fn at(mut self, position: ControlPosition) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn position(&self) -> ControlPosition {
        self.position
            .unwrap_or_else(|| self.kind.default_position())
    }

    /// Options as handed to the engine
    pub fn resolved_options(&self) -> Result<serde_json::Value> {
        let mut options = match &self.options {
            Some(serde_json::Value::Object(map)) => map.clone(),
            Some(serde_json::Value::Null) | None => self.default_options(),
            Some(other) => {
                return Err(Error::Config(format!(
                    "{} control options must be a JSON object, got {}",
                    self.kind.as_str(),
                    other
                )))
            }
        };
        if self.kind == ControlKind::Attribution {
            if let Some(content) = &self.content {
                options.insert("customAttribution".to_string(), content.clone().into());
            }
        }
        Ok(serde_json::Value::Object(options))
    }

    fn default_options(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut options = serde_json::Map::new();
        if self.kind == ControlKind::Attribution {
            options.insert("compact".to_string(), false.into());
        }
        options
    }
}

/// A control added once on mount. Controls have no teardown and ignore
/// later configuration changes.
#[derive(Debug)]
pub struct ControlBinder {
    id: ObjectId,
    kind: ControlKind,
    position: ControlPosition,
    forwarder: EventForwarder,
    events: Emitter<BinderEvent>,
}

impl ControlBinder {
    pub fn mount<E: MapEngine>(handle: &MapHandle<E>, config: ControlConfig) -> Result<Self> {
        let kind = config.kind;
        let position = config.position();
        let options = config.resolved_options()?;
        let events = Emitter::new();
        let mut forwarder = EventForwarder::new();

        let id = handle.try_with(|engine| {
            let id = engine.add_control(ControlSpec { kind, options }, position)?;
            if kind == ControlKind::Geolocate {
                let sink = events.clone();
                forwarder.install(
                    engine,
                    &GEOLOCATE_EVENTS,
                    EventTarget::Object(id),
                    move |event: &EngineEvent| sink.emit(BinderEvent::Native(event.clone())),
                );
            }
            Ok(id)
        })?;
        log::debug!("{} control {:?} added at {}", kind.as_str(), id, position.as_str());
        events.emit(BinderEvent::Added(ObjectRef::Control(id)));

        Ok(Self {
            id,
            kind,
            position,
            forwarder,
            events,
        })
    }

    pub fn attribution<E: MapEngine>(handle: &MapHandle<E>, content: Option<&str>) -> Result<Self> {
        let mut config = ControlConfig::new(ControlKind::Attribution);
        config.content = content.map(str::to_string);
        Self::mount(handle, config)
    }

    pub fn fullscreen<E: MapEngine>(handle: &MapHandle<E>) -> Result<Self> {
        Self::mount(handle, ControlConfig::new(ControlKind::Fullscreen))
    }

    pub fn geolocate<E: MapEngine>(handle: &MapHandle<E>) -> Result<Self> {
        Self::mount(handle, ControlConfig::new(ControlKind::Geolocate))
    }

    pub fn navigation<E: MapEngine>(handle: &MapHandle<E>) -> Result<Self> {
        Self::mount(handle, ControlConfig::new(ControlKind::Navigation))
    }

    pub fn scale<E: MapEngine>(handle: &MapHandle<E>) -> Result<Self> {
        Self::mount(handle, ControlConfig::new(ControlKind::Scale))
    }

    pub fn control_id(&self) -> ObjectId {
        self.id
    }

    pub fn kind(&self) -> ControlKind {
        self.kind
    }

    pub fn position(&self) -> ControlPosition {
        self.position
    }

    /// Whether engine events of this control are re-emitted
    pub fn forwards_events(&self) -> bool {
        self.forwarder.is_installed()
    }

    /// Events emitted by this binder. They queue until drained.
    pub fn events(&self) -> &Emitter<BinderEvent> {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_positions_apply() {
        assert_eq!(
            ControlConfig::new(ControlKind::Scale).position(),
            ControlPosition::BottomLeft
        );
        assert_eq!(
            ControlConfig::new(ControlKind::Scale)
                .at(ControlPosition::TopRight)
                .position(),
            ControlPosition::TopRight
        );
    }

    #[test]
    fn test_attribution_content_replaces_custom_attribution() {
        let config = ControlConfig::new(ControlKind::Attribution)
            .with_options(json!({ "compact": true, "customAttribution": "old" }))
            .with_content("© Contributors");
        let options = config.resolved_options().unwrap();
        assert_eq!(options["customAttribution"], json!("© Contributors"));
        assert_eq!(options["compact"], json!(true));

        let defaults = ControlConfig::new(ControlKind::Attribution)
            .resolved_options()
            .unwrap();
        assert_eq!(defaults, json!({ "compact": false }));
    }

    #[test]
    fn test_content_ignored_for_other_controls() {
        let options = ControlConfig::new(ControlKind::Navigation)
            .with_content("ignored")
            .resolved_options()
            .unwrap();
        assert_eq!(options, json!({}));
    }

    #[test]
    fn test_non_object_options_rejected() {
        let config = ControlConfig::new(ControlKind::Fullscreen).with_options(json!(3));
        assert!(config.resolved_options().is_err());
    }
}
