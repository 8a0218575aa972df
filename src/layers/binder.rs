//! The generic source+layer binder

use crate::core::handle::MapHandle;
use crate::core::lifecycle::Mounted;
use crate::engine::{EventTarget, LayerSpec, MapEngine, SourceSpec};
use crate::input::emitter::Emitter;
use crate::input::events::{BinderEvent, EngineEvent, ObjectKind, ObjectRef, LAYER_EVENTS};
use crate::input::forward::EventForwarder;
use crate::layers::base::{descriptors, AttachedPair, LayerConfig, LayerDescriptor, LayerKind};
use crate::traits::Binding;
use crate::{Error, Result};

/// Attachment state of one source+layer pair
#[derive(Debug)]
pub struct LayerBinding {
    descriptor: LayerDescriptor,
    source_id: Option<String>,
    layer_id: String,
    source: serde_json::Value,
    layer: serde_json::Map<String, serde_json::Value>,
    before: Option<String>,
    attached: Option<AttachedPair>,
    forwarder: EventForwarder,
    events: Emitter<BinderEvent>,
}

impl LayerBinding {
    pub fn new(
        descriptor: LayerDescriptor,
        config: &LayerConfig,
        events: Emitter<BinderEvent>,
    ) -> Result<Self> {
        let layer = config.layer_object()?;
        let source_id = if descriptor.is_overlay() {
            None
        } else {
            config
                .source_id
                .clone()
                .or_else(|| descriptor.default_source_id.map(str::to_string))
        };
        let layer_id = config
            .layer_id
            .clone()
            .unwrap_or_else(|| descriptor.default_layer_id.to_string());

        Ok(Self {
            descriptor,
            source_id,
            layer_id,
            source: config.source.clone(),
            layer,
            before: config.before.clone(),
            attached: None,
            forwarder: EventForwarder::new(),
            events,
        })
    }

    pub fn descriptor(&self) -> &LayerDescriptor {
        &self.descriptor
    }

    pub fn source_id(&self) -> Option<&str> {
        self.source_id.as_deref()
    }

    pub fn layer_id(&self) -> &str {
        &self.layer_id
    }

    /// The source object (or overlay data) used on the next attach
    pub fn source(&self) -> &serde_json::Value {
        &self.source
    }

    /// Swaps the source object. When attached, its `data` is pushed into the
    /// live source in place; otherwise it is used on the next attach.
    pub fn replace_data<E: MapEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        source: serde_json::Value,
    ) -> Result<()> {
        if !self.descriptor.supports_data_replace() {
            return Err(Error::Unsupported(format!(
                "{} layers do not support data replacement",
                self.descriptor.name
            )));
        }
        self.source = source;

        let live_source = self
            .attached
            .as_ref()
            .and_then(|pair| pair.source_id())
            .filter(|id| engine.has_source(id));
        if let Some(source_id) = live_source {
            let data = self
                .source
                .get("data")
                .cloned()
                .unwrap_or(serde_json::Value::Null);
            engine.set_source_data(source_id, data)?;
        }
        Ok(())
    }

    fn register<E: MapEngine + ?Sized>(&self, engine: &mut E) -> Result<AttachedPair> {
        let before = self.before.as_deref();
        match (self.descriptor.kind, self.source_id.as_deref()) {
            (LayerKind::Native(kind), Some(source_id)) => {
                let source = SourceSpec::from_value(kind, &self.source)?;
                let layer = LayerSpec::native(&self.layer_id, source_id, &self.layer);
                AttachedPair::register(engine, Some((source_id, source)), layer, before)
            }
            (LayerKind::Native(_), None) => Err(Error::Config(format!(
                "{} layer '{}' has no source id",
                self.descriptor.name, self.layer_id
            ))),
            (LayerKind::Overlay(kind), _) => {
                let layer = LayerSpec::overlay(&self.layer_id, kind, &self.layer, self.source.clone());
                AttachedPair::register(engine, None, layer, before)
            }
        }
    }
}

impl<E: MapEngine> Binding<E> for LayerBinding {
    fn attach(&mut self, engine: &mut E) -> Result<()> {
        if let Some(pair) = &self.attached {
            if engine.has_layer(pair.layer_id()) {
                return Ok(());
            }
            // The engine dropped the pair behind our back (style swap)
            self.attached = None;
            self.forwarder.remove(engine);
        }

        let pair = self.register(engine)?;
        if self.descriptor.forwards_events {
            let sink = self.events.clone();
            self.forwarder.install(
                engine,
                &LAYER_EVENTS,
                EventTarget::Layer(self.layer_id.clone()),
                move |event: &EngineEvent| sink.emit(BinderEvent::Native(event.clone())),
            );
        }
        log::debug!(
            "attached {} '{}' (source {:?})",
            self.descriptor.kind,
            self.layer_id,
            self.source_id
        );
        self.events.emit(BinderEvent::Added(ObjectRef::Layer {
            layer_id: pair.layer_id().to_string(),
            source_id: pair.source_id().map(str::to_string),
        }));
        self.attached = Some(pair);
        Ok(())
    }

    /// State is cleared only once the engine accepted the removal, so a
    /// failed detach leaves the binder attached and retryable.
    fn detach(&mut self, engine: &mut E) -> Result<()> {
        let Some(pair) = &self.attached else {
            self.forwarder.remove(engine);
            return Ok(());
        };
        pair.remove(engine)?;
        self.forwarder.remove(engine);
        self.attached = None;
        log::debug!("detached {} '{}'", self.descriptor.kind, self.layer_id);
        self.events.emit(BinderEvent::Removed(ObjectKind::Layer));
        Ok(())
    }

    fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    fn on_timeout(&mut self) {
        self.events.emit(BinderEvent::StyleTimedOut);
    }

    fn describe(&self) -> String {
        format!("{} layer '{}'", self.descriptor.name, self.layer_id)
    }
}

/// One source+layer pair (or overlay layer) kept on the map across style swaps.
///
/// ```ignore
/// let layer = LayerBinder::geojson(&handle, LayerConfig::new(json!({ "data": features })))?;
/// layer.replace_data(json!({ "data": updated }))?;
/// layer.unmount()?;
/// ```
pub struct LayerBinder<E: MapEngine> {
    mounted: Mounted<E, LayerBinding>,
    descriptor: LayerDescriptor,
    source_id: Option<String>,
    layer_id: String,
    events: Emitter<BinderEvent>,
}

impl<E: MapEngine> LayerBinder<E> {
    /// Mounts a binder for any descriptor. Attaches right away when the
    /// style is loaded, otherwise on the gate's ready edge.
    pub fn mount(
        handle: &MapHandle<E>,
        descriptor: LayerDescriptor,
        config: LayerConfig,
    ) -> Result<Self> {
        let events = Emitter::new();
        let binding = LayerBinding::new(descriptor, &config, events.clone())?;
        let source_id = binding.source_id().map(str::to_string);
        let layer_id = binding.layer_id().to_string();
        let mounted = Mounted::mount(handle, binding, config.gate)?;

        Ok(Self {
            mounted,
            descriptor,
            source_id,
            layer_id,
            events,
        })
    }

    layer_constructors! {
        geojson => GEOJSON,
        raster => RASTER,
        vector => VECTOR,
        image => IMAGE,
        video => VIDEO,
        canvas => CANVAS,
        arc_overlay => ARC_OVERLAY,
        geojson_overlay => GEOJSON_OVERLAY,
    }

    pub fn descriptor(&self) -> &LayerDescriptor {
        &self.descriptor
    }

    pub fn source_id(&self) -> Option<&str> {
        self.source_id.as_deref()
    }

    pub fn layer_id(&self) -> &str {
        &self.layer_id
    }

    pub fn is_attached(&self) -> bool {
        self.mounted
            .inspect(|binding| Binding::<E>::is_attached(binding))
            .unwrap_or(false)
    }

    pub fn is_ready(&self) -> bool {
        self.mounted.is_ready()
    }

    /// Events emitted by this binder. They queue until drained.
    pub fn events(&self) -> &Emitter<BinderEvent> {
        &self.events
    }

    /// Replaces the geojson data of the bound source
    pub fn replace_data(&self, source: serde_json::Value) -> Result<()> {
        self.mounted
            .with_binding(|binding, engine| binding.replace_data(engine, source))
    }

    /// Removes the layer, then the source
    pub fn unmount(self) -> Result<()> {
        self.mounted.unmount()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::MapOptions;
    use crate::engine::memory::{EngineCall, MemoryEngine};
    use serde_json::json;

    fn engine() -> MemoryEngine {
        MemoryEngine::create(&MapOptions::new().resolved()).unwrap()
    }

    fn binding(descriptor: LayerDescriptor, config: LayerConfig) -> LayerBinding {
        LayerBinding::new(descriptor, &config, Emitter::new()).unwrap()
    }

    fn attach(binding: &mut LayerBinding, engine: &mut MemoryEngine) {
        Binding::<MemoryEngine>::attach(binding, engine).unwrap();
    }

    fn detach(binding: &mut LayerBinding, engine: &mut MemoryEngine) {
        Binding::<MemoryEngine>::detach(binding, engine).unwrap();
    }

    #[test]
    fn test_ids_fall_back_to_descriptor_defaults() {
        let raster = binding(descriptors::RASTER, LayerConfig::new(json!({ "tiles": [] })));
        assert_eq!(raster.source_id(), Some("mapbox.gl-raster-source"));
        assert_eq!(raster.layer_id(), "mapbox.gl-raster-layer");

        let overlay = binding(
            descriptors::GEOJSON_OVERLAY,
            LayerConfig::new(json!([])).with_ids("ignored", "shapes"),
        );
        assert_eq!(overlay.source_id(), None);
        assert_eq!(overlay.layer_id(), "shapes");
    }

    #[test]
    fn test_attach_is_idempotent_while_layer_present() {
        let mut engine = engine();
        let mut layer = binding(
            descriptors::GEOJSON,
            LayerConfig::new(json!({ "data": [] })).with_ids("s1", "l1"),
        );
        attach(&mut layer, &mut engine);
        attach(&mut layer, &mut engine);

        assert_eq!(engine.take_calls().len(), 2);
        assert_eq!(
            engine.listeners_on(&EventTarget::Layer("l1".to_string())),
            LAYER_EVENTS.len()
        );
    }

    #[test]
    fn test_attach_rebuilds_pair_dropped_by_engine() {
        let mut engine = engine();
        let mut layer = binding(
            descriptors::GEOJSON,
            LayerConfig::new(json!({ "data": [] })).with_ids("s1", "l1"),
        );
        attach(&mut layer, &mut engine);
        engine.remove_layer("l1").unwrap();
        engine.remove_source("s1").unwrap();
        engine.take_calls();

        attach(&mut layer, &mut engine);
        assert_eq!(
            engine.take_calls(),
            vec![
                EngineCall::AddSource("s1".to_string()),
                EngineCall::AddLayer {
                    id: "l1".to_string(),
                    before: None
                },
            ]
        );
        assert_eq!(
            engine.listeners_on(&EventTarget::Layer("l1".to_string())),
            LAYER_EVENTS.len()
        );
    }

    #[test]
    fn test_detach_unsubscribes_and_reports() {
        let mut engine = engine();
        let events = Emitter::new();
        let config = LayerConfig::new(json!({ "data": [] })).with_ids("s1", "l1");
        let mut layer = LayerBinding::new(descriptors::GEOJSON, &config, events.clone()).unwrap();
        attach(&mut layer, &mut engine);
        events.drain();

        detach(&mut layer, &mut engine);
        detach(&mut layer, &mut engine);
        assert_eq!(engine.listener_count(), 0);
        assert_eq!(events.drain(), vec![BinderEvent::Removed(ObjectKind::Layer)]);
    }

    #[test]
    fn test_failed_detach_keeps_pair_and_listeners() {
        let mut engine = engine();
        let mut layer = binding(
            descriptors::GEOJSON,
            LayerConfig::new(json!({ "data": [] })).with_ids("s1", "l1"),
        );
        attach(&mut layer, &mut engine);
        let target = EventTarget::Layer("l1".to_string());

        engine.reject_removals(true);
        assert!(Binding::<MemoryEngine>::detach(&mut layer, &mut engine).is_err());
        assert!(Binding::<MemoryEngine>::is_attached(&layer));
        assert_eq!(engine.listeners_on(&target), LAYER_EVENTS.len());

        // The next ready edge leaves the existing pair alone
        engine.take_calls();
        attach(&mut layer, &mut engine);
        assert!(engine.calls().is_empty());

        engine.reject_removals(false);
        detach(&mut layer, &mut engine);
        assert_eq!(engine.layer_ids(), Vec::<String>::new());
        assert!(!engine.has_source("s1"));
        assert_eq!(engine.listeners_on(&target), 0);
    }

    #[test]
    fn test_detach_retries_source_left_behind() {
        let mut engine = engine();
        let mut layer = binding(
            descriptors::GEOJSON,
            LayerConfig::new(json!({ "data": [] })).with_ids("s1", "l1"),
        );
        attach(&mut layer, &mut engine);
        // A foreign layer keeps the source busy
        engine
            .add_layer(
                LayerSpec::native("foreign", "s1", &serde_json::Map::new()),
                None,
            )
            .unwrap();

        assert!(Binding::<MemoryEngine>::detach(&mut layer, &mut engine).is_err());
        assert!(!engine.has_layer("l1"));
        assert!(Binding::<MemoryEngine>::is_attached(&layer));

        engine.remove_layer("foreign").unwrap();
        detach(&mut layer, &mut engine);
        assert!(!engine.has_source("s1"));
        assert!(!Binding::<MemoryEngine>::is_attached(&layer));
    }

    #[test]
    fn test_raster_layer_does_not_forward_events() {
        let mut engine = engine();
        let mut layer = binding(descriptors::RASTER, LayerConfig::new(json!({ "tiles": [] })));
        attach(&mut layer, &mut engine);
        assert_eq!(engine.listener_count(), 0);
    }

    #[test]
    fn test_replace_data_before_attach_is_used_later() {
        let mut engine = engine();
        let mut layer = binding(
            descriptors::GEOJSON,
            LayerConfig::new(json!({ "data": [] })).with_ids("s1", "l1"),
        );
        layer
            .replace_data(&mut engine, json!({ "data": { "type": "FeatureCollection", "features": [] } }))
            .unwrap();
        assert!(engine.calls().is_empty());

        attach(&mut layer, &mut engine);
        assert_eq!(
            engine.source("s1").and_then(|source| source.data().cloned()),
            Some(json!({ "type": "FeatureCollection", "features": [] }))
        );
    }

    #[test]
    fn test_replace_data_rejected_for_tiled_sources() {
        let mut engine = engine();
        let mut layer = binding(descriptors::VECTOR, LayerConfig::new(json!({ "url": "x" })));
        assert!(matches!(
            layer.replace_data(&mut engine, json!({})),
            Err(Error::Unsupported(_))
        ));
    }
}
