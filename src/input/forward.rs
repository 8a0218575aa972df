//! Generic "forward these events" helper
//!
//! Binders subscribe a whole [`EventCatalog`] on one target and keep the
//! returned listener ids so the subscription can be undone symmetrically.

use crate::engine::{EventTarget, ListenerId, MapEngine};
use crate::input::events::{EngineEvent, EventCatalog};

/// Listener ids of one catalog subscription
#[derive(Debug, Default)]
pub struct EventForwarder {
    target: Option<EventTarget>,
    listeners: Vec<ListenerId>,
}

impl EventForwarder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes every event of `catalog` on `target` and routes it to `handler`.
    ///
    /// A forwarder holds at most one subscription; installing again while
    /// installed is a no-op. Handlers run inside the engine's dispatch and must
    /// not re-enter the map handle.
    pub fn install<E, H>(
        &mut self,
        engine: &mut E,
        catalog: &EventCatalog,
        target: EventTarget,
        handler: H,
    ) where
        E: MapEngine + ?Sized,
        H: Fn(&EngineEvent) + Clone + Send + 'static,
    {
        if self.is_installed() {
            return;
        }

        for kind in catalog.kinds {
            let handler = handler.clone();
            let id = engine.on(*kind, target.clone(), Box::new(move |event| handler(event)));
            self.listeners.push(id);
        }
        log::debug!(
            "forwarding {} {} events from {:?}",
            catalog.len(),
            catalog.name,
            target
        );
        self.target = Some(target);
    }

    /// Unsubscribes everything installed by [`EventForwarder::install`]
    pub fn remove<E: MapEngine + ?Sized>(&mut self, engine: &mut E) {
        for id in self.listeners.drain(..) {
            if !engine.off(id) {
                log::warn!("listener {:?} was already gone", id);
            }
        }
        self.target = None;
    }

    pub fn is_installed(&self) -> bool {
        !self.listeners.is_empty()
    }

    pub fn target(&self) -> Option<&EventTarget> {
        self.target.as_ref()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::MapOptions;
    use crate::engine::memory::MemoryEngine;
    use crate::input::emitter::Emitter;
    use crate::input::events::{EventKind, LAYER_EVENTS, POPUP_EVENTS};

    fn engine() -> MemoryEngine {
        <MemoryEngine as MapEngine>::create(&MapOptions::new().resolved()).unwrap()
    }

    #[test]
    fn test_install_and_remove_are_symmetric() {
        let mut engine = engine();
        let emitter: Emitter<EventKind> = Emitter::new();
        let mut forwarder = EventForwarder::new();

        let sink = emitter.clone();
        forwarder.install(
            &mut engine,
            &LAYER_EVENTS,
            EventTarget::Layer("l1".to_string()),
            move |event: &EngineEvent| sink.emit(event.kind),
        );
        assert_eq!(forwarder.listener_count(), LAYER_EVENTS.len());
        assert_eq!(engine.listener_count(), LAYER_EVENTS.len());

        engine.fire(&EngineEvent::on_layer(EventKind::Click, "l1"));
        engine.fire(&EngineEvent::on_layer(EventKind::Click, "other"));
        assert_eq!(emitter.drain(), vec![EventKind::Click]);

        forwarder.remove(&mut engine);
        assert!(!forwarder.is_installed());
        assert_eq!(engine.listener_count(), 0);

        engine.fire(&EngineEvent::on_layer(EventKind::Click, "l1"));
        assert!(emitter.drain().is_empty());
    }

    #[test]
    fn test_second_install_is_ignored() {
        let mut engine = engine();
        let mut forwarder = EventForwarder::new();
        forwarder.install(&mut engine, &POPUP_EVENTS, EventTarget::Map, |_: &EngineEvent| {});
        forwarder.install(&mut engine, &POPUP_EVENTS, EventTarget::Map, |_: &EngineEvent| {});
        assert_eq!(engine.listener_count(), POPUP_EVENTS.len());
    }
}
