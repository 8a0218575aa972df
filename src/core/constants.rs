//! Crate-wide defaults shared by the host and the binders.
//! Keeping them in a single place makes it easier to tweak the magic values.

/// Container id used when the map options do not name one.
pub const DEFAULT_CONTAINER_ID: &str = "map";

/// How often the readiness gate asks the engine whether its style finished loading.
pub const STYLE_POLL_INTERVAL_MS: u64 = 200;

/// CSS cursor applied to marker elements when the caller does not pick one.
pub const DEFAULT_MARKER_CURSOR: &str = "pointer";

/// Engine-side name of the geojson source type.
pub const GEOJSON_SOURCE_TYPE: &str = "geojson";
