//! In-process engine that keeps the bookkeeping a real map engine does
//! (sources, layer paint order, markers, popups, controls, listeners, style
//! state) and records every mutating call made against it.
//!
//! Used by the headless demo and by tests. It enforces the same rules a real
//! engine does: a layer needs its source, a source cannot be removed while a
//! layer still uses it, and a style reload discards runtime-added sources and
//! layers.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;

use fxhash::FxHashMap;

use crate::core::{config::MapOptions, geo::LngLat};
use crate::engine::{
    ControlKind, ControlPosition, ControlSpec, EventTarget, LayerRenderer, LayerSpec, Listener,
    ListenerId, MapEngine, MarkerSpec, ObjectId, PopupAnchor, PopupSpec, SourceKind, SourceSpec,
};
use crate::input::events::{EngineEvent, EventKind};
use crate::{Error, Result};

/// A mutating call, as recorded by [`MemoryEngine`]
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    AddSource(String),
    SetSourceData(String),
    RemoveSource(String),
    AddLayer { id: String, before: Option<String> },
    RemoveLayer(String),
    AddControl {
        id: ObjectId,
        kind: ControlKind,
        position: ControlPosition,
    },
    AddMarker(ObjectId),
    SetMarkerPosition(ObjectId),
    RemoveMarker(ObjectId),
    AddPopup { id: ObjectId, anchor: PopupAnchor },
    RemovePopup(ObjectId),
    Remove,
}

struct Registration {
    id: ListenerId,
    kind: EventKind,
    target: EventTarget,
    listener: Listener,
}

pub struct MemoryEngine {
    options: MapOptions,
    style_loaded: bool,
    style_probes: RefCell<VecDeque<bool>>,
    probe_count: Cell<usize>,
    sources: FxHashMap<String, SourceSpec>,
    /// Bottom to top
    layers: Vec<LayerSpec>,
    controls: Vec<(ObjectId, ControlSpec, ControlPosition)>,
    markers: FxHashMap<ObjectId, MarkerSpec>,
    popups: FxHashMap<ObjectId, (PopupSpec, PopupAnchor)>,
    listeners: Vec<Registration>,
    calls: Vec<EngineCall>,
    next_object: u64,
    next_listener: u64,
    rejects_removals: bool,
    removed: bool,
}

impl MemoryEngine {
    fn ensure_live(&self) -> Result<()> {
        if self.removed {
            Err(Error::Engine("map has been removed".to_string()))
        } else {
            Ok(())
        }
    }

    fn ensure_removable(&self, what: &str) -> Result<()> {
        self.ensure_live()?;
        if self.rejects_removals {
            Err(Error::Engine(format!("removal of {} rejected", what)))
        } else {
            Ok(())
        }
    }

    fn next_object_id(&mut self) -> ObjectId {
        self.next_object += 1;
        ObjectId(self.next_object)
    }

    pub fn options(&self) -> &MapOptions {
        &self.options
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// Makes every `remove_*` call fail, as an engine mid-teardown does
    pub fn reject_removals(&mut self, reject: bool) {
        self.rejects_removals = reject;
    }

    /// Sets the value `is_style_loaded` reports once scripted probes run out
    pub fn set_style_loaded(&mut self, loaded: bool) {
        self.style_loaded = loaded;
    }

    /// Queues answers for the next `is_style_loaded` probes. The last value
    /// keeps being reported after the queue runs out.
    pub fn script_style_probes(&mut self, probes: impl IntoIterator<Item = bool>) {
        let mut queue = self.style_probes.borrow_mut();
        queue.clear();
        queue.extend(probes);
        if let Some(last) = queue.back() {
            self.style_loaded = *last;
        }
    }

    /// Number of `is_style_loaded` calls so far
    pub fn probe_count(&self) -> usize {
        self.probe_count.get()
    }

    /// Swaps the style: runtime sources and layers are dropped, the given
    /// probe answers are queued, and `style.load` is fired.
    pub fn reload_style(&mut self, probes: impl IntoIterator<Item = bool>) {
        log::debug!(
            "style reload drops {} layers and {} sources",
            self.layers.len(),
            self.sources.len()
        );
        self.layers.clear();
        self.sources.clear();
        self.style_loaded = false;
        self.script_style_probes(probes);
        self.fire(&EngineEvent::on_map(EventKind::StyleLoad));
    }

    /// Delivers an event to every matching listener. Returns how many ran.
    pub fn fire(&self, event: &EngineEvent) -> usize {
        let mut delivered = 0;
        for registration in &self.listeners {
            if registration.kind == event.kind && registration.target == event.target {
                (registration.listener)(event);
                delivered += 1;
            }
        }
        log::trace!("{} delivered to {} listeners", event.name(), delivered);
        delivered
    }

    /// Moves a marker the way a user drag does, firing the drag events
    pub fn drag_marker(&mut self, id: ObjectId, to: LngLat) -> Result<()> {
        let from = self
            .markers
            .get(&id)
            .map(|marker| marker.position)
            .ok_or_else(|| Error::Engine(format!("marker {:?} does not exist", id)))?;

        self.fire(&EngineEvent::on_object(EventKind::DragStart, id).with_lng_lat(from));
        if let Some(marker) = self.markers.get_mut(&id) {
            marker.position = to;
        }
        self.fire(&EngineEvent::on_object(EventKind::Drag, id).with_lng_lat(to));
        self.fire(&EngineEvent::on_object(EventKind::DragEnd, id).with_lng_lat(to));
        Ok(())
    }

    pub fn calls(&self) -> &[EngineCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<EngineCall> {
        std::mem::take(&mut self.calls)
    }

    /// Layer ids in paint order, bottom first
    pub fn layer_ids(&self) -> Vec<String> {
        self.layers.iter().map(|layer| layer.id.clone()).collect()
    }

    pub fn layer(&self, id: &str) -> Option<&LayerSpec> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    pub fn source(&self, id: &str) -> Option<&SourceSpec> {
        self.sources.get(id)
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn marker(&self, id: ObjectId) -> Option<&MarkerSpec> {
        self.markers.get(&id)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn popup(&self, id: ObjectId) -> Option<(&PopupSpec, PopupAnchor)> {
        self.popups.get(&id).map(|(spec, anchor)| (spec, *anchor))
    }

    pub fn popup_count(&self) -> usize {
        self.popups.len()
    }

    pub fn controls(&self) -> &[(ObjectId, ControlSpec, ControlPosition)] {
        &self.controls
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn listeners_on(&self, target: &EventTarget) -> usize {
        self.listeners
            .iter()
            .filter(|registration| &registration.target == target)
            .count()
    }
}

impl fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("container", &self.options.container_id())
            .field("style_loaded", &self.style_loaded)
            .field("sources", &self.sources.len())
            .field("layers", &self.layer_ids())
            .field("markers", &self.markers.len())
            .field("popups", &self.popups.len())
            .field("listeners", &self.listeners.len())
            .field("removed", &self.removed)
            .finish()
    }
}

impl MapEngine for MemoryEngine {
    fn create(options: &MapOptions) -> Result<Self> {
        log::debug!("creating memory engine in #{}", options.container_id());
        Ok(Self {
            options: options.clone(),
            style_loaded: true,
            style_probes: RefCell::new(VecDeque::new()),
            probe_count: Cell::new(0),
            sources: FxHashMap::default(),
            layers: Vec::new(),
            controls: Vec::new(),
            markers: FxHashMap::default(),
            popups: FxHashMap::default(),
            listeners: Vec::new(),
            calls: Vec::new(),
            next_object: 0,
            next_listener: 0,
            rejects_removals: false,
            removed: false,
        })
    }

    fn remove(&mut self) {
        if self.removed {
            return;
        }
        self.fire(&EngineEvent::on_map(EventKind::Remove));
        self.layers.clear();
        self.sources.clear();
        self.markers.clear();
        self.popups.clear();
        self.controls.clear();
        self.listeners.clear();
        self.removed = true;
        self.calls.push(EngineCall::Remove);
    }

    fn is_style_loaded(&self) -> bool {
        self.probe_count.set(self.probe_count.get() + 1);
        if self.removed {
            return false;
        }
        self.style_probes
            .borrow_mut()
            .pop_front()
            .unwrap_or(self.style_loaded)
    }

    fn add_source(&mut self, id: &str, source: SourceSpec) -> Result<()> {
        self.ensure_live()?;
        if self.sources.contains_key(id) {
            return Err(Error::Engine(format!("source '{}' already exists", id)));
        }
        self.sources.insert(id.to_string(), source);
        self.calls.push(EngineCall::AddSource(id.to_string()));
        Ok(())
    }

    fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    fn set_source_data(&mut self, id: &str, data: serde_json::Value) -> Result<()> {
        self.ensure_live()?;
        let source = self
            .sources
            .get_mut(id)
            .ok_or_else(|| Error::Engine(format!("source '{}' does not exist", id)))?;
        if source.kind != SourceKind::GeoJson {
            return Err(Error::Engine(format!(
                "source '{}' is a {} source and has no data to replace",
                id, source.kind
            )));
        }
        source.body.insert("data".to_string(), data);
        self.calls.push(EngineCall::SetSourceData(id.to_string()));
        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> Result<()> {
        self.ensure_removable(id)?;
        if !self.sources.contains_key(id) {
            return Err(Error::Engine(format!("source '{}' does not exist", id)));
        }
        if let Some(layer) = self
            .layers
            .iter()
            .find(|layer| layer.source.as_deref() == Some(id))
        {
            return Err(Error::Engine(format!(
                "source '{}' cannot be removed while layer '{}' is using it",
                id, layer.id
            )));
        }
        self.sources.remove(id);
        self.calls.push(EngineCall::RemoveSource(id.to_string()));
        Ok(())
    }

    fn add_layer(&mut self, layer: LayerSpec, before: Option<&str>) -> Result<()> {
        self.ensure_live()?;
        if self.has_layer(&layer.id) {
            return Err(Error::Engine(format!("layer '{}' already exists", layer.id)));
        }
        if layer.renderer == LayerRenderer::Native {
            match layer.source.as_deref() {
                Some(source) if self.sources.contains_key(source) => {}
                Some(source) => {
                    return Err(Error::Engine(format!(
                        "layer '{}' references missing source '{}'",
                        layer.id, source
                    )))
                }
                None => {
                    return Err(Error::Engine(format!(
                        "layer '{}' has no source",
                        layer.id
                    )))
                }
            }
        }

        let index = match before {
            Some(before_id) => self
                .layers
                .iter()
                .position(|existing| existing.id == before_id)
                .ok_or_else(|| {
                    Error::Engine(format!(
                        "cannot add layer '{}' before missing layer '{}'",
                        layer.id, before_id
                    ))
                })?,
            None => self.layers.len(),
        };

        self.calls.push(EngineCall::AddLayer {
            id: layer.id.clone(),
            before: before.map(str::to_string),
        });
        self.layers.insert(index, layer);
        Ok(())
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layers.iter().any(|layer| layer.id == id)
    }

    fn remove_layer(&mut self, id: &str) -> Result<()> {
        self.ensure_removable(id)?;
        let index = self
            .layers
            .iter()
            .position(|layer| layer.id == id)
            .ok_or_else(|| Error::Engine(format!("layer '{}' does not exist", id)))?;
        self.layers.remove(index);
        self.calls.push(EngineCall::RemoveLayer(id.to_string()));
        Ok(())
    }

    fn add_control(&mut self, control: ControlSpec, position: ControlPosition) -> Result<ObjectId> {
        self.ensure_live()?;
        let id = self.next_object_id();
        self.calls.push(EngineCall::AddControl {
            id,
            kind: control.kind,
            position,
        });
        self.controls.push((id, control, position));
        Ok(id)
    }

    fn add_marker(&mut self, marker: MarkerSpec) -> Result<ObjectId> {
        self.ensure_live()?;
        let id = self.next_object_id();
        self.markers.insert(id, marker);
        self.calls.push(EngineCall::AddMarker(id));
        Ok(id)
    }

    fn set_marker_position(&mut self, id: ObjectId, position: LngLat) -> Result<()> {
        self.ensure_live()?;
        let marker = self
            .markers
            .get_mut(&id)
            .ok_or_else(|| Error::Engine(format!("marker {:?} does not exist", id)))?;
        marker.position = position;
        self.calls.push(EngineCall::SetMarkerPosition(id));
        Ok(())
    }

    fn has_marker(&self, id: ObjectId) -> bool {
        self.markers.contains_key(&id)
    }

    fn remove_marker(&mut self, id: ObjectId) -> Result<()> {
        self.ensure_removable("marker")?;
        if self.markers.remove(&id).is_none() {
            return Ok(());
        }
        self.popups
            .retain(|_, (_, anchor)| *anchor != PopupAnchor::Marker(id));
        self.calls.push(EngineCall::RemoveMarker(id));
        Ok(())
    }

    fn add_popup(&mut self, popup: PopupSpec, anchor: PopupAnchor) -> Result<ObjectId> {
        self.ensure_live()?;
        if let PopupAnchor::Marker(marker) = anchor {
            if !self.markers.contains_key(&marker) {
                return Err(Error::Engine(format!(
                    "cannot anchor popup to missing marker {:?}",
                    marker
                )));
            }
            // A marker holds a single popup
            self.popups.retain(|_, (_, existing)| *existing != anchor);
        }
        let id = self.next_object_id();
        self.popups.insert(id, (popup, anchor));
        self.calls.push(EngineCall::AddPopup { id, anchor });
        Ok(id)
    }

    fn has_popup(&self, id: ObjectId) -> bool {
        self.popups.contains_key(&id)
    }

    fn remove_popup(&mut self, id: ObjectId) -> Result<()> {
        self.ensure_removable("popup")?;
        if self.popups.remove(&id).is_some() {
            self.calls.push(EngineCall::RemovePopup(id));
        }
        Ok(())
    }

    fn on(&mut self, kind: EventKind, target: EventTarget, listener: Listener) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.push(Registration {
            id,
            kind,
            target,
            listener,
        });
        id
    }

    fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|registration| registration.id != id);
        self.listeners.len() != before
    }
}
