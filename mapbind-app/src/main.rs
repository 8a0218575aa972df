use mapbind::engine::memory::MemoryEngine;
use mapbind::prelude::*;
use serde_json::json;

/// Mounts a map, puts one of each binder on it, swaps the style and drags
/// the marker, logging everything the binders report.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    let mut host: MapHost<MemoryEngine> = MapHost::new();
    let handle = host.mount(
        MapOptions::new()
            .with_style("mapbox://styles/mapbox/streets-v12")
            .with_center(LngLat::new(4.9041, 52.3676))
            .with_zoom(11.0),
    )?;
    host.listen(&[EventKind::Load, EventKind::Click, EventKind::StyleLoad])?;
    handle.with(|engine| engine.fire(&EngineEvent::on_map(EventKind::Load)))?;

    let controls = [
        ControlBinder::navigation(&handle)?,
        ControlBinder::scale(&handle)?,
        ControlBinder::geolocate(&handle)?,
        ControlBinder::attribution(&handle, Some("© OpenStreetMap contributors"))?,
    ];
    for control in &controls {
        log::info!(
            "{} control at {}",
            control.kind().as_str(),
            control.position().as_str()
        );
    }

    let places = LayerBinder::geojson(
        &handle,
        LayerConfig::new(json!({
            "data": {
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [4.9041, 52.3676] },
                    "properties": { "name": "Amsterdam" }
                }]
            }
        }))
        .with_ids("places", "places-circles")
        .with_layer(json!({ "type": "circle", "paint": { "circle-radius": 6 } })),
    )?;
    let basemap = LayerBinder::raster(
        &handle,
        LayerConfig::new(json!({
            "tiles": ["https://tile.openstreetmap.org/{z}/{x}/{y}.png"],
            "tileSize": 256
        })),
    )?;
    let routes = LayerBinder::arc_overlay(
        &handle,
        LayerConfig::new(json!([{ "source": [4.9041, 52.3676], "target": [2.3522, 48.8566] }]))
            .with_layer(json!({ "getWidth": 2 })),
    )?;

    let marker = MarkerBinder::mount(
        &handle,
        MarkerConfig::new([4.9041, 52.3676])
            .with_options(json!({ "draggable": true }))
            .with_popup(PopupConfig::new([4.9041, 52.3676], "<strong>Amsterdam</strong>")),
    )?;

    // Swap the style; the gate puts every binder back once it has loaded
    handle.with(|engine| engine.reload_style([false, false, true]))?;
    mapbind::runtime::delay(Duration::from_secs(1)).await;

    if let Some(id) = marker.marker_id() {
        handle.try_with(|engine| engine.drag_marker(id, LngLat::new(4.89, 52.37)))?;
    }
    places.replace_data(json!({ "data": { "type": "FeatureCollection", "features": [] } }))?;

    for (name, events) in [
        ("places", places.events()),
        ("basemap", basemap.events()),
        ("routes", routes.events()),
        ("marker", marker.events()),
    ] {
        for event in events.drain() {
            log::info!("{}: {:?}", name, event);
        }
    }
    for event in host.events().drain() {
        log::info!("host: {:?}", event);
    }
    log::info!("marker now at {:?}", marker.coordinates()?);
    log::info!("layers: {:?}", handle.with(|engine| engine.layer_ids())?);

    marker.unmount()?;
    routes.unmount()?;
    basemap.unmount()?;
    places.unmount()?;
    host.unmount()?;

    Ok(())
}
