// Binders across style swaps, slow styles and early unmounts

#[cfg(test)]
mod style_reload_tests {
    use mapbind::engine::memory::{EngineCall, MemoryEngine};
    use mapbind::prelude::*;
    use mapbind::runtime::delay;
    use serde_json::json;

    fn mounted_host() -> (MapHost<MemoryEngine>, MapHandle<MemoryEngine>) {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut host = MapHost::new();
        let handle = host.mount(MapOptions::new().with_style("mapbox://styles/light")).unwrap();
        (host, handle)
    }

    fn geojson(handle: &MapHandle<MemoryEngine>) -> LayerBinder<MemoryEngine> {
        LayerBinder::geojson(
            handle,
            LayerConfig::new(json!({ "data": { "type": "FeatureCollection", "features": [] } }))
                .with_ids("s1", "l1")
                .with_layer(json!({ "type": "fill" })),
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_layer_comes_back_after_style_swap() {
        let (_host, handle) = mounted_host();
        let layer = geojson(&handle);
        handle.with(|engine| engine.take_calls()).unwrap();
        layer.events().drain();

        handle
            .with(|engine| engine.reload_style([false, false, true]))
            .unwrap();
        delay(Duration::from_secs(2)).await;

        assert_eq!(
            handle.with(|engine| engine.take_calls()).unwrap(),
            vec![
                EngineCall::AddSource("s1".to_string()),
                EngineCall::AddLayer {
                    id: "l1".to_string(),
                    before: None
                },
            ]
        );
        assert_eq!(
            layer.events().drain(),
            vec![
                BinderEvent::Removed(ObjectKind::Layer),
                BinderEvent::Added(ObjectRef::Layer {
                    layer_id: "l1".to_string(),
                    source_id: Some("s1".to_string()),
                }),
            ]
        );
        assert_eq!(
            handle
                .with(|engine| engine.listeners_on(&EventTarget::Layer("l1".to_string())))
                .unwrap(),
            13
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_marker_and_popup_follow_style_swap() {
        let (_host, handle) = mounted_host();
        let marker = MarkerBinder::mount(
            &handle,
            MarkerConfig::new([4.9, 52.37]).with_popup(PopupConfig::new([4.9, 52.37], "hi")),
        )
        .unwrap();
        let first = marker.marker_id().unwrap();

        handle.with(|engine| engine.reload_style([false, true])).unwrap();
        delay(Duration::from_secs(1)).await;

        let second = marker.marker_id().unwrap();
        assert_ne!(first, second);
        let (markers, popups) = handle
            .with(|engine| (engine.marker_count(), engine.popup_count()))
            .unwrap();
        assert_eq!((markers, popups), (1, 1));
        assert_eq!(
            handle
                .with(|engine| engine.popup(marker.popup_id().unwrap()).map(|(_, anchor)| anchor))
                .unwrap(),
            Some(PopupAnchor::Marker(second))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_during_poll_never_attaches() {
        let (_host, handle) = mounted_host();
        handle
            .with(|engine| engine.set_style_loaded(false))
            .unwrap();

        let layer = geojson(&handle);
        delay(Duration::from_millis(450)).await;
        assert!(handle.with(|engine| engine.probe_count()).unwrap() > 1);

        layer.unmount().unwrap();
        handle.with(|engine| engine.set_style_loaded(true)).unwrap();
        let probes = handle.with(|engine| engine.probe_count()).unwrap();
        delay(Duration::from_secs(5)).await;

        assert!(handle.with(|engine| engine.calls().is_empty()).unwrap());
        assert_eq!(handle.with(|engine| engine.probe_count()).unwrap(), probes);
        assert_eq!(handle.with(|engine| engine.listener_count()).unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_reported_once_per_cycle() {
        let (_host, handle) = mounted_host();
        handle
            .with(|engine| engine.set_style_loaded(false))
            .unwrap();

        let layer = LayerBinder::geojson(
            &handle,
            LayerConfig::new(json!({ "data": [] }))
                .with_ids("s1", "l1")
                .with_gate(GateProfile::Bounded(Duration::from_secs(1)).resolve()),
        )
        .unwrap();
        delay(Duration::from_secs(5)).await;

        let timeouts = layer
            .events()
            .drain()
            .into_iter()
            .filter(|event| *event == BinderEvent::StyleTimedOut)
            .count();
        assert_eq!(timeouts, 1);
        assert!(!layer.is_attached());

        // A later style load starts a fresh cycle
        handle.with(|engine| engine.reload_style([true])).unwrap();
        delay(Duration::from_millis(10)).await;
        assert!(layer.is_attached());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_loaded_resolves_on_slow_style() {
        let (_host, handle) = mounted_host();
        handle
            .with(|engine| engine.script_style_probes([false, false, false, true]))
            .unwrap();

        wait_until_loaded(&handle, &GateConfig::default()).await.unwrap();
        assert_eq!(handle.with(|engine| engine.probe_count()).unwrap(), 4);
    }
}
