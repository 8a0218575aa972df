use std::fmt;

use crate::core::{config::MapOptions, handle::MapHandle};
use crate::engine::{EventTarget, ListenerId, MapEngine};
use crate::input::emitter::Emitter;
use crate::input::events::{EngineEvent, EventKind, MAP_EVENTS};
use crate::{Error, Result};

/// What the host re-emits
pub enum HostEvent<E: MapEngine> {
    /// The engine finished its initial load; carries the handle for binders
    Loaded(MapHandle<E>),
    Native(EngineEvent),
}

impl<E: MapEngine> Clone for HostEvent<E> {
    fn clone(&self) -> Self {
        match self {
            HostEvent::Loaded(handle) => HostEvent::Loaded(handle.clone()),
            HostEvent::Native(event) => HostEvent::Native(event.clone()),
        }
    }
}

impl<E: MapEngine> fmt::Debug for HostEvent<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostEvent::Loaded(handle) => f.debug_tuple("Loaded").field(handle).finish(),
            HostEvent::Native(event) => f.debug_tuple("Native").field(event).finish(),
        }
    }
}

/// Owns the engine instance and hands out the handle binders work through
pub struct MapHost<E: MapEngine> {
    handle: Option<MapHandle<E>>,
    container: Option<String>,
    listeners: Vec<(EventKind, ListenerId)>,
    events: Emitter<HostEvent<E>>,
}

impl<E: MapEngine> MapHost<E> {
    pub fn new() -> Self {
        Self::with_events(Emitter::new())
    }

    /// A host whose event queue keeps only the newest `capacity` events.
    /// Suits hosts that call [`MapHost::listen_all`] and drain rarely.
    pub fn with_event_capacity(capacity: usize) -> Self {
        Self::with_events(Emitter::bounded(capacity))
    }

    fn with_events(events: Emitter<HostEvent<E>>) -> Self {
        Self {
            handle: None,
            container: None,
            listeners: Vec::new(),
            events,
        }
    }

    /// Creates the engine. The container defaults to `"map"`.
    pub fn mount(&mut self, options: MapOptions) -> Result<MapHandle<E>> {
        if self.handle.is_some() {
            return Err(Error::AlreadyCreated);
        }

        let options = options.resolved();
        let engine = E::create(&options)?;
        let handle = MapHandle::new(engine);
        log::info!("map created in #{}", options.container_id());

        self.container = Some(options.container_id().to_string());
        self.handle = Some(handle.clone());
        Ok(handle)
    }

    /// Re-emits the given engine events. `load` comes out as
    /// [`HostEvent::Loaded`], everything else verbatim. Kinds already
    /// subscribed are skipped.
    pub fn listen(&mut self, kinds: &[EventKind]) -> Result<()> {
        let handle = self.handle.as_ref().ok_or(Error::NotMounted)?;
        let weak = handle.downgrade();
        let fresh: Vec<EventKind> = kinds
            .iter()
            .copied()
            .filter(|kind| !self.listeners.iter().any(|(existing, _)| existing == kind))
            .collect();

        let registered = handle.with(|engine| {
            fresh
                .iter()
                .map(|kind| {
                    let sink = self.events.clone();
                    let weak = weak.clone();
                    let id = engine.on(
                        *kind,
                        EventTarget::Map,
                        Box::new(move |event: &EngineEvent| {
                            if event.kind == EventKind::Load {
                                if let Some(handle) = weak.upgrade() {
                                    sink.emit(HostEvent::Loaded(handle));
                                    return;
                                }
                            }
                            sink.emit(HostEvent::Native(event.clone()));
                        }),
                    );
                    (*kind, id)
                })
                .collect::<Vec<_>>()
        })?;
        log::debug!("host listening to {} map events", registered.len());
        self.listeners.extend(registered);
        Ok(())
    }

    /// Subscribes the whole map event catalog
    pub fn listen_all(&mut self) -> Result<()> {
        self.listen(MAP_EVENTS.kinds)
    }

    pub fn handle(&self) -> Option<&MapHandle<E>> {
        self.handle.as_ref()
    }

    pub fn is_mounted(&self) -> bool {
        self.handle.is_some()
    }

    /// Id of the element the engine was mounted into
    pub fn container_id(&self) -> Option<&str> {
        self.container.as_deref()
    }

    /// Re-emitted map events. They queue until drained.
    pub fn events(&self) -> &Emitter<HostEvent<E>> {
        &self.events
    }

    /// Unsubscribes, removes the engine and invalidates every handle clone
    pub fn unmount(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let listeners = std::mem::take(&mut self.listeners);

        let removed = handle.with(|engine| {
            for (_, id) in listeners {
                engine.off(id);
            }
            engine.remove();
        });
        handle.destroy();
        log::info!("map removed");
        removed
    }
}

impl<E: MapEngine> Default for MapHost<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: MapEngine> Drop for MapHost<E> {
    fn drop(&mut self) {
        if let Err(err) = self.unmount() {
            log::warn!("map host teardown failed: {}", err);
        }
    }
}

impl<E: MapEngine> fmt::Debug for MapHost<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapHost")
            .field("container", &self.container)
            .field("mounted", &self.is_mounted())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::MemoryEngine;
    use serde_json::json;

    #[test]
    fn test_container_defaults_to_map() {
        let mut host: MapHost<MemoryEngine> = MapHost::new();
        let handle = host.mount(MapOptions::new()).unwrap();
        assert_eq!(host.container_id(), Some("map"));
        assert_eq!(
            handle.with(|engine| engine.options().container.clone()).unwrap(),
            Some("map".to_string())
        );
    }

    #[test]
    fn test_explicit_container_kept() {
        let mut host: MapHost<MemoryEngine> = MapHost::new();
        host.mount(MapOptions::from_value(json!({ "container": "map", "zoom": 3 })).unwrap())
            .unwrap();
        assert_eq!(host.container_id(), Some("map"));

        let mut other: MapHost<MemoryEngine> = MapHost::new();
        other.mount(MapOptions::new().with_container("canvas-1")).unwrap();
        assert_eq!(other.container_id(), Some("canvas-1"));
    }

    #[test]
    fn test_second_mount_rejected() {
        let mut host: MapHost<MemoryEngine> = MapHost::new();
        host.mount(MapOptions::new()).unwrap();
        assert!(matches!(
            host.mount(MapOptions::new()),
            Err(Error::AlreadyCreated)
        ));
    }

    #[test]
    fn test_load_carries_handle_and_other_events_pass_through() {
        let mut host: MapHost<MemoryEngine> = MapHost::new();
        let handle = host.mount(MapOptions::new()).unwrap();
        host.listen(&[EventKind::Load, EventKind::Click]).unwrap();
        host.listen(&[EventKind::Load]).unwrap();

        handle
            .with(|engine| {
                engine.fire(&EngineEvent::on_map(EventKind::Load));
                engine.fire(&EngineEvent::on_map(EventKind::Click));
                engine.fire(&EngineEvent::on_map(EventKind::Zoom));
            })
            .unwrap();

        let events = host.events().drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], HostEvent::Loaded(loaded) if loaded.same_map(&handle)));
        assert!(matches!(&events[1], HostEvent::Native(event) if event.kind == EventKind::Click));
    }

    #[test]
    fn test_unmount_destroys_handle() {
        let mut host: MapHost<MemoryEngine> = MapHost::new();
        let handle = host.mount(MapOptions::new()).unwrap();
        host.listen_all().unwrap();

        host.unmount().unwrap();
        assert!(!host.is_mounted());
        assert!(matches!(
            handle.with(|engine| engine.calls().to_vec()),
            Err(Error::MapDestroyed)
        ));
        assert!(host.events().drain().is_empty());
        assert!(host.listen_all().is_err());
    }

    #[test]
    fn test_bounded_host_keeps_newest_events() {
        let mut host: MapHost<MemoryEngine> = MapHost::with_event_capacity(2);
        let handle = host.mount(MapOptions::new()).unwrap();
        host.listen_all().unwrap();

        handle
            .with(|engine| {
                for _ in 0..10 {
                    engine.fire(&EngineEvent::on_map(EventKind::Render));
                }
                engine.fire(&EngineEvent::on_map(EventKind::Click));
            })
            .unwrap();

        let events = host.events().drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[1], HostEvent::Native(event) if event.kind == EventKind::Click));
    }

    #[test]
    fn test_remount_after_unmount() {
        let mut host: MapHost<MemoryEngine> = MapHost::new();
        let first = host.mount(MapOptions::new()).unwrap();
        host.unmount().unwrap();
        assert!(!first.is_alive());

        let second = host.mount(MapOptions::new()).unwrap();
        assert!(!second.same_map(&first));
    }
}
