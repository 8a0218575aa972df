use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::core::config::GateConfig;
use crate::core::constants::DEFAULT_MARKER_CURSOR;
use crate::core::geo::Coordinates;
use crate::core::handle::MapHandle;
use crate::core::lifecycle::Mounted;
use crate::engine::{EventTarget, MapEngine, MarkerSpec, ObjectId, PopupAnchor};
use crate::input::emitter::Emitter;
use crate::input::events::{
    BinderEvent, EngineEvent, EventKind, ObjectKind, ObjectRef, MARKER_EVENTS,
};
use crate::input::forward::EventForwarder;
use crate::traits::Binding;
use crate::ui::popup::{PopupBinding, PopupConfig};
use crate::{Error, Result};

/// Caller configuration of a marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerConfig {
    /// `[lng, lat]` or `{ "lng": .., "lat": .. }`; drag results come back in the same shape
    pub coordinates: Coordinates,
    /// Engine marker options, forwarded verbatim
    #[serde(default)]
    pub options: serde_json::Value,
    /// Custom element markup; the engine's default glyph when `None`
    #[serde(default)]
    pub element: Option<String>,
    #[serde(default)]
    pub cursor: Option<String>,
    /// Nested popup; it is placed at the marker's position, not its own
    #[serde(default)]
    pub popup: Option<PopupConfig>,
    #[serde(default)]
    pub gate: GateConfig,
}

impl MarkerConfig {
    pub fn new(coordinates: impl Into<Coordinates>) -> Self {
        Self {
            coordinates: coordinates.into(),
            options: serde_json::Value::Object(serde_json::Map::new()),
            element: None,
            cursor: None,
            popup: None,
            gate: GateConfig::default(),
        }
    }

    pub fn with_options(mut self, options: serde_json::Value) -> Self {
        self.options = options;
        self
    }

    pub fn with_element(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }

    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    pub fn with_popup(mut self, popup: PopupConfig) -> Self {
        self.popup = Some(popup);
        self
    }

    /// Nested popup showing `html` at the marker's position
    pub fn with_popup_html(self, html: impl Into<String>) -> Self {
        let popup = PopupConfig::new(self.coordinates, html);
        self.with_popup(popup)
    }

    pub fn with_gate(mut self, gate: GateConfig) -> Self {
        self.gate = gate;
        self
    }
}

/// Attachment state of one marker and its optional popup
#[derive(Debug)]
pub struct MarkerBinding {
    /// Shared with the drag-end listener, which writes the dropped position back
    coordinates: Arc<Mutex<Coordinates>>,
    options: serde_json::Value,
    element: Option<String>,
    cursor: String,
    popup: Option<PopupBinding>,
    marker: Option<ObjectId>,
    forwarder: EventForwarder,
    events: Emitter<BinderEvent>,
}

impl MarkerBinding {
    pub fn new(config: MarkerConfig, events: Emitter<BinderEvent>) -> Self {
        let popup = config
            .popup
            .map(|popup| PopupBinding::new(popup, PopupAnchor::Map, events.clone()));
        Self {
            coordinates: Arc::new(Mutex::new(config.coordinates)),
            options: config.options,
            element: config.element,
            cursor: config
                .cursor
                .unwrap_or_else(|| DEFAULT_MARKER_CURSOR.to_string()),
            popup,
            marker: None,
            forwarder: EventForwarder::new(),
            events,
        }
    }

    pub fn marker_id(&self) -> Option<ObjectId> {
        self.marker
    }

    pub fn popup_id(&self) -> Option<ObjectId> {
        self.popup.as_ref().and_then(PopupBinding::popup_id)
    }

    pub fn coordinates(&self) -> Result<Coordinates> {
        self.coordinates
            .lock()
            .map(|coordinates| *coordinates)
            .map_err(|_| Error::Poisoned)
    }

    /// Moves the marker. The caller's shape is kept for later drag results.
    pub fn set_coordinates<E: MapEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        coordinates: Coordinates,
    ) -> Result<()> {
        let position = coordinates.validate()?;
        *self.coordinates.lock().map_err(|_| Error::Poisoned)? = coordinates;
        if let Some(popup) = &mut self.popup {
            popup.set_coordinates(coordinates);
        }
        if let Some(id) = self.marker {
            engine.set_marker_position(id, position)?;
        }
        Ok(())
    }

    fn listen<E: MapEngine + ?Sized>(&mut self, engine: &mut E, id: ObjectId) {
        let sink = self.events.clone();
        let shape = self.coordinates.clone();
        self.forwarder.install(
            engine,
            &MARKER_EVENTS,
            EventTarget::Object(id),
            move |event: &EngineEvent| {
                if event.kind == EventKind::DragEnd {
                    if let Some(position) = event.lng_lat {
                        let updated = shape.lock().ok().map(|mut coordinates| {
                            *coordinates = coordinates.reshaped(position);
                            *coordinates
                        });
                        if let Some(coordinates) = updated {
                            sink.emit(BinderEvent::CoordinatesUpdated(coordinates));
                        }
                    }
                }
                sink.emit(BinderEvent::Native(event.clone()));
            },
        );
    }
}

impl<E: MapEngine> Binding<E> for MarkerBinding {
    fn attach(&mut self, engine: &mut E) -> Result<()> {
        if let Some(id) = self.marker {
            if engine.has_marker(id) {
                return Ok(());
            }
            self.marker = None;
            self.forwarder.remove(engine);
        }

        let coordinates = self.coordinates()?;
        let position = coordinates.validate()?;
        let id = engine.add_marker(MarkerSpec {
            position,
            element: self.element.clone(),
            cursor: self.cursor.clone(),
            options: self.options.clone(),
        })?;
        self.marker = Some(id);
        self.listen(engine, id);
        log::debug!("marker {:?} added at {:?}", id, position);
        self.events.emit(BinderEvent::Added(ObjectRef::Marker(id)));

        if let Some(popup) = &mut self.popup {
            popup.set_anchor(PopupAnchor::Marker(id));
            popup.set_coordinates(coordinates);
            popup.attach(engine)?;
        }
        Ok(())
    }

    /// State is cleared only once the engine accepted the removal, so a
    /// failed detach leaves the binder attached and retryable.
    fn detach(&mut self, engine: &mut E) -> Result<()> {
        let Some(id) = self.marker else {
            return Ok(());
        };
        if let Some(popup) = &mut self.popup {
            popup.detach(engine)?;
        }
        engine.remove_marker(id)?;
        self.forwarder.remove(engine);
        self.marker = None;
        log::debug!("marker {:?} removed", id);
        self.events.emit(BinderEvent::Removed(ObjectKind::Marker));
        Ok(())
    }

    fn is_attached(&self) -> bool {
        self.marker.is_some()
    }

    fn on_timeout(&mut self) {
        self.events.emit(BinderEvent::StyleTimedOut);
    }

    fn describe(&self) -> String {
        match self.marker {
            Some(id) => format!("marker {:?}", id),
            None => "marker".to_string(),
        }
    }
}

/// A draggable point marker with an optional popup
pub struct MarkerBinder<E: MapEngine> {
    mounted: Mounted<E, MarkerBinding>,
    events: Emitter<BinderEvent>,
}

impl<E: MapEngine> MarkerBinder<E> {
    pub fn mount(handle: &MapHandle<E>, config: MarkerConfig) -> Result<Self> {
        config.coordinates.validate()?;
        let events = Emitter::new();
        let gate = config.gate;
        let binding = MarkerBinding::new(config, events.clone());
        let mounted = Mounted::mount(handle, binding, gate)?;
        Ok(Self { mounted, events })
    }

    pub fn marker_id(&self) -> Option<ObjectId> {
        self.mounted
            .inspect(MarkerBinding::marker_id)
            .ok()
            .flatten()
    }

    pub fn popup_id(&self) -> Option<ObjectId> {
        self.mounted
            .inspect(MarkerBinding::popup_id)
            .ok()
            .flatten()
    }

    pub fn is_attached(&self) -> bool {
        self.marker_id().is_some()
    }

    /// Current coordinates, in the shape the caller supplied them
    pub fn coordinates(&self) -> Result<Coordinates> {
        self.mounted.inspect(MarkerBinding::coordinates)?
    }

    pub fn set_coordinates(&self, coordinates: impl Into<Coordinates>) -> Result<()> {
        let coordinates = coordinates.into();
        self.mounted
            .with_binding(|binding, engine| binding.set_coordinates(engine, coordinates))
    }

    /// Events emitted by this binder. They queue until drained.
    pub fn events(&self) -> &Emitter<BinderEvent> {
        &self.events
    }

    /// Removes the popup, then the marker
    pub fn unmount(self) -> Result<()> {
        self.mounted.unmount()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::MapOptions;
    use crate::core::geo::LngLat;
    use crate::engine::memory::{EngineCall, MemoryEngine};

    fn engine() -> MemoryEngine {
        MemoryEngine::create(&MapOptions::new().resolved()).unwrap()
    }

    fn attach(binding: &mut MarkerBinding, engine: &mut MemoryEngine) {
        Binding::<MemoryEngine>::attach(binding, engine).unwrap();
    }

    #[test]
    fn test_default_cursor_and_element() {
        let mut engine = engine();
        let mut marker = MarkerBinding::new(MarkerConfig::new([10.0, 20.0]), Emitter::new());
        attach(&mut marker, &mut engine);

        let spec = engine.marker(marker.marker_id().unwrap()).unwrap();
        assert_eq!(spec.cursor, "pointer");
        assert_eq!(spec.element, None);
        assert_eq!(spec.position, LngLat::new(10.0, 20.0));
    }

    #[test]
    fn test_drag_end_keeps_pair_shape() {
        let mut engine = engine();
        let events = Emitter::new();
        let mut marker = MarkerBinding::new(MarkerConfig::new([10.0, 20.0]), events.clone());
        attach(&mut marker, &mut engine);
        let id = marker.marker_id().unwrap();
        events.drain();

        engine.drag_marker(id, LngLat::new(11.0, 21.0)).unwrap();
        let emitted = events.drain();
        let kinds: Vec<_> = emitted
            .iter()
            .map(|event| match event {
                BinderEvent::Native(native) => native.name().to_string(),
                BinderEvent::CoordinatesUpdated(_) => "coordinates".to_string(),
                other => format!("{:?}", other),
            })
            .collect();
        assert_eq!(kinds, vec!["dragstart", "drag", "coordinates", "dragend"]);
        assert!(emitted.contains(&BinderEvent::CoordinatesUpdated(Coordinates::Pair([
            11.0, 21.0
        ]))));
        assert_eq!(marker.coordinates().unwrap(), Coordinates::Pair([11.0, 21.0]));
    }

    #[test]
    fn test_drag_end_keeps_named_shape() {
        let mut engine = engine();
        let events = Emitter::new();
        let mut marker =
            MarkerBinding::new(MarkerConfig::new(LngLat::new(1.0, 2.0)), events.clone());
        attach(&mut marker, &mut engine);

        engine
            .drag_marker(marker.marker_id().unwrap(), LngLat::new(3.0, 4.0))
            .unwrap();
        assert!(events.drain().contains(&BinderEvent::CoordinatesUpdated(
            Coordinates::Named(LngLat::new(3.0, 4.0))
        )));
    }

    #[test]
    fn test_nested_popup_is_owned_by_marker() {
        let mut engine = engine();
        let config = MarkerConfig::new([0.0, 0.0]).with_popup(PopupConfig::new([0.0, 0.0], "hi"));
        let mut marker = MarkerBinding::new(config, Emitter::new());
        attach(&mut marker, &mut engine);

        let marker_id = marker.marker_id().unwrap();
        let popup_id = marker.popup_id().unwrap();
        assert_eq!(engine.popup(popup_id).unwrap().1, PopupAnchor::Marker(marker_id));

        engine.take_calls();
        Binding::<MemoryEngine>::detach(&mut marker, &mut engine).unwrap();
        assert_eq!(
            engine.take_calls(),
            vec![
                EngineCall::RemovePopup(popup_id),
                EngineCall::RemoveMarker(marker_id)
            ]
        );
        assert_eq!(engine.listener_count(), 0);
    }

    #[test]
    fn test_nested_popup_follows_marker_position() {
        let mut engine = engine();
        let config = MarkerConfig::new([5.0, 5.0]).with_popup(PopupConfig::new([0.0, 0.0], "hi"));
        let mut marker = MarkerBinding::new(config, Emitter::new());
        attach(&mut marker, &mut engine);
        let popup_id = marker.popup_id().unwrap();
        assert_eq!(engine.popup(popup_id).unwrap().0.position, LngLat::new(5.0, 5.0));

        engine
            .drag_marker(marker.marker_id().unwrap(), LngLat::new(10.0, 50.0))
            .unwrap();
        Binding::<MemoryEngine>::detach(&mut marker, &mut engine).unwrap();
        attach(&mut marker, &mut engine);
        let popup_id = marker.popup_id().unwrap();
        assert_eq!(engine.popup(popup_id).unwrap().0.position, LngLat::new(10.0, 50.0));
    }

    #[test]
    fn test_popup_html_uses_marker_coordinates() {
        let config = MarkerConfig::new([1.0, 2.0]).with_popup_html("<b>here</b>");
        let popup = config.popup.unwrap();
        assert_eq!(popup.coordinates, Coordinates::Pair([1.0, 2.0]));
        assert_eq!(popup.html, "<b>here</b>");
    }

    #[test]
    fn test_failed_detach_keeps_marker_attached() {
        let mut engine = engine();
        let config = MarkerConfig::new([0.0, 0.0]).with_popup_html("hi");
        let mut marker = MarkerBinding::new(config, Emitter::new());
        attach(&mut marker, &mut engine);
        let marker_id = marker.marker_id().unwrap();

        engine.reject_removals(true);
        assert!(Binding::<MemoryEngine>::detach(&mut marker, &mut engine).is_err());
        assert_eq!(marker.marker_id(), Some(marker_id));
        assert!(marker.popup_id().is_some());

        // A ready edge must not add a second marker
        attach(&mut marker, &mut engine);
        assert_eq!(engine.marker_count(), 1);
        assert_eq!(engine.popup_count(), 1);

        engine.reject_removals(false);
        Binding::<MemoryEngine>::detach(&mut marker, &mut engine).unwrap();
        assert_eq!(engine.marker_count(), 0);
        assert_eq!(engine.popup_count(), 0);
        assert_eq!(engine.listener_count(), 0);
    }

    #[test]
    fn test_marker_removed_by_engine_is_added_again() {
        let mut engine = engine();
        let mut marker = MarkerBinding::new(MarkerConfig::new([0.0, 0.0]), Emitter::new());
        attach(&mut marker, &mut engine);
        let first = marker.marker_id().unwrap();
        engine.remove_marker(first).unwrap();

        attach(&mut marker, &mut engine);
        assert_ne!(marker.marker_id(), Some(first));
        assert_eq!(engine.marker_count(), 1);
        assert_eq!(engine.listener_count(), MARKER_EVENTS.len());
    }

    #[test]
    fn test_detach_without_marker_does_nothing() {
        let mut engine = engine();
        let events = Emitter::new();
        let mut marker = MarkerBinding::new(MarkerConfig::new([0.0, 0.0]), events.clone());
        Binding::<MemoryEngine>::detach(&mut marker, &mut engine).unwrap();
        assert!(events.drain().is_empty());
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn test_set_coordinates_moves_attached_marker() {
        let mut engine = engine();
        let mut marker = MarkerBinding::new(MarkerConfig::new([0.0, 0.0]), Emitter::new());
        marker
            .set_coordinates(&mut engine, Coordinates::Pair([5.0, 5.0]))
            .unwrap();
        attach(&mut marker, &mut engine);
        let id = marker.marker_id().unwrap();
        assert_eq!(engine.marker(id).unwrap().position, LngLat::new(5.0, 5.0));

        marker
            .set_coordinates(&mut engine, Coordinates::Pair([6.0, 7.0]))
            .unwrap();
        assert_eq!(engine.marker(id).unwrap().position, LngLat::new(6.0, 7.0));
        assert!(marker
            .set_coordinates(&mut engine, Coordinates::Pair([0.0, 95.0]))
            .is_err());
    }
}
