use serde::{Deserialize, Serialize};

use crate::core::config::GateConfig;
use crate::core::geo::Coordinates;
use crate::core::handle::MapHandle;
use crate::core::lifecycle::Mounted;
use crate::engine::{EventTarget, MapEngine, ObjectId, PopupAnchor, PopupSpec};
use crate::input::emitter::Emitter;
use crate::input::events::{BinderEvent, EngineEvent, ObjectKind, ObjectRef, POPUP_EVENTS};
use crate::input::forward::EventForwarder;
use crate::traits::Binding;
use crate::Result;

/// Caller configuration of a popup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopupConfig {
    /// Replaced by the marker's position when the popup is nested in a marker
    pub coordinates: Coordinates,
    /// Markup shown inside the popup
    #[serde(default)]
    pub html: String,
    /// Engine popup options, forwarded verbatim
    #[serde(default)]
    pub options: serde_json::Value,
    /// Ignored for popups nested in a marker, which follow the marker
    #[serde(default)]
    pub gate: GateConfig,
}

impl PopupConfig {
    pub fn new(coordinates: impl Into<Coordinates>, html: impl Into<String>) -> Self {
        Self {
            coordinates: coordinates.into(),
            html: html.into(),
            options: serde_json::Value::Object(serde_json::Map::new()),
            gate: GateConfig::default(),
        }
    }

    pub fn with_options(mut self, options: serde_json::Value) -> Self {
        self.options = options;
        self
    }

    pub fn with_gate(mut self, gate: GateConfig) -> Self {
        self.gate = gate;
        self
    }
}

/// Attachment state of one popup
#[derive(Debug)]
pub struct PopupBinding {
    config: PopupConfig,
    anchor: PopupAnchor,
    popup: Option<ObjectId>,
    forwarder: EventForwarder,
    events: Emitter<BinderEvent>,
}

impl PopupBinding {
    pub fn new(config: PopupConfig, anchor: PopupAnchor, events: Emitter<BinderEvent>) -> Self {
        Self {
            config,
            anchor,
            popup: None,
            forwarder: EventForwarder::new(),
            events,
        }
    }

    pub fn anchor(&self) -> PopupAnchor {
        self.anchor
    }

    /// Takes effect on the next attach
    pub fn set_anchor(&mut self, anchor: PopupAnchor) {
        self.anchor = anchor;
    }

    pub fn popup_id(&self) -> Option<ObjectId> {
        self.popup
    }

    pub fn config(&self) -> &PopupConfig {
        &self.config
    }

    /// Takes effect on the next attach
    pub fn set_coordinates(&mut self, coordinates: Coordinates) {
        self.config.coordinates = coordinates;
    }
}

impl<E: MapEngine> Binding<E> for PopupBinding {
    fn attach(&mut self, engine: &mut E) -> Result<()> {
        if let Some(id) = self.popup {
            if engine.has_popup(id) {
                return Ok(());
            }
            self.popup = None;
            self.forwarder.remove(engine);
        }

        let position = self.config.coordinates.validate()?;
        let id = engine.add_popup(
            PopupSpec {
                position,
                html: self.config.html.clone(),
                options: self.config.options.clone(),
            },
            self.anchor,
        )?;
        self.popup = Some(id);

        let sink = self.events.clone();
        self.forwarder.install(
            engine,
            &POPUP_EVENTS,
            EventTarget::Object(id),
            move |event: &EngineEvent| sink.emit(BinderEvent::Native(event.clone())),
        );
        log::debug!("popup {:?} added to {:?}", id, self.anchor);
        self.events.emit(BinderEvent::Added(ObjectRef::Popup(id)));
        Ok(())
    }

    /// Removes the popup if it exists. `Removed` is emitted either way.
    fn detach(&mut self, engine: &mut E) -> Result<()> {
        if let Some(id) = self.popup {
            if engine.has_popup(id) {
                engine.remove_popup(id)?;
            }
        }
        self.forwarder.remove(engine);
        self.popup = None;
        self.events.emit(BinderEvent::Removed(ObjectKind::Popup));
        Ok(())
    }

    fn is_attached(&self) -> bool {
        self.popup.is_some()
    }

    fn on_timeout(&mut self) {
        self.events.emit(BinderEvent::StyleTimedOut);
    }

    fn describe(&self) -> String {
        format!("popup on {:?}", self.anchor)
    }
}

/// A popup mounted on its own, with its own readiness gate
pub struct PopupBinder<E: MapEngine> {
    mounted: Mounted<E, PopupBinding>,
    events: Emitter<BinderEvent>,
}

impl<E: MapEngine> PopupBinder<E> {
    /// Mounts a popup anchored to the map
    pub fn mount(handle: &MapHandle<E>, config: PopupConfig) -> Result<Self> {
        Self::mount_anchored(handle, PopupAnchor::Map, config)
    }

    /// Mounts a popup owned by an existing marker or by the map
    pub fn mount_anchored(
        handle: &MapHandle<E>,
        anchor: PopupAnchor,
        config: PopupConfig,
    ) -> Result<Self> {
        config.coordinates.validate()?;
        let events = Emitter::new();
        let gate = config.gate;
        let binding = PopupBinding::new(config, anchor, events.clone());
        let mounted = Mounted::mount(handle, binding, gate)?;
        Ok(Self { mounted, events })
    }

    pub fn popup_id(&self) -> Option<ObjectId> {
        self.mounted
            .inspect(|binding| binding.popup_id())
            .ok()
            .flatten()
    }

    pub fn is_attached(&self) -> bool {
        self.popup_id().is_some()
    }

    /// Events emitted by this binder. They queue until drained.
    pub fn events(&self) -> &Emitter<BinderEvent> {
        &self.events
    }

    pub fn unmount(self) -> Result<()> {
        self.mounted.unmount()
    }
}
