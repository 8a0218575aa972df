//! Macros that stamp out the per-variant pieces of the layer binder
//!
//! Every variant is a descriptor constant plus a named constructor on
//! [`LayerBinder`](crate::layers::binder::LayerBinder); both lists are
//! generated from one table so they cannot drift apart.

/// Declares descriptor constants and the `ALL` table listing them.
///
/// Usage:
/// ```ignore
/// layer_descriptors! {
///     /// Native geojson source and layer
///     GEOJSON => {
///         name: "geojson",
///         source: Some("mapbox.gl-geojson-source"),
///         layer: "mapbox.gl-geojson-layer",
///         kind: LayerKind::Native(SourceKind::GeoJson),
///         forwards_events: true,
///     },
/// }
/// ```
macro_rules! layer_descriptors {
    ($(
        $(#[$meta:meta])*
        $konst:ident => {
            name: $name:literal,
            source: $source:expr,
            layer: $layer:literal,
            kind: $kind:expr,
            forwards_events: $forwards:literal $(,)?
        }
    ),+ $(,)?) => {
        $(
            $(#[$meta])*
            pub const $konst: LayerDescriptor = LayerDescriptor {
                name: $name,
                default_source_id: $source,
                default_layer_id: $layer,
                kind: $kind,
                forwards_events: $forwards,
            };
        )+

        /// Every layer variant, in declaration order
        pub const ALL: &[LayerDescriptor] = &[$($konst),+];
    };
}

/// Generates one `LayerBinder` constructor per descriptor constant
macro_rules! layer_constructors {
    ($($ctor:ident => $descriptor:ident),+ $(,)?) => {
        $(
            #[doc = concat!("Mounts a `", stringify!($ctor), "` layer binder")]
            pub fn $ctor(handle: &MapHandle<E>, config: LayerConfig) -> Result<Self> {
                Self::mount(handle, descriptors::$descriptor, config)
            }
        )+
    };
}
