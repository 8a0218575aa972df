use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A geographical coordinate in engine order: longitude first, then latitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    /// Creates a new LngLat coordinate
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Finite values with latitude in [-90, 90]. Longitude is not bounded;
    /// the engine wraps it.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite() && (-90.0..=90.0).contains(&self.lat)
    }

    /// Returns the coordinate as an `[lng, lat]` pair
    pub fn to_array(self) -> [f64; 2] {
        [self.lng, self.lat]
    }
}

impl From<[f64; 2]> for LngLat {
    fn from(pair: [f64; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }
}

impl From<LngLat> for [f64; 2] {
    fn from(lng_lat: LngLat) -> Self {
        lng_lat.to_array()
    }
}

impl From<geo_types::Coord<f64>> for LngLat {
    fn from(coord: geo_types::Coord<f64>) -> Self {
        Self::new(coord.x, coord.y)
    }
}

impl From<geo_types::Point<f64>> for LngLat {
    fn from(point: geo_types::Point<f64>) -> Self {
        Self::new(point.x(), point.y())
    }
}

impl From<LngLat> for geo_types::Coord<f64> {
    fn from(lng_lat: LngLat) -> Self {
        geo_types::coord! { x: lng_lat.lng, y: lng_lat.lat }
    }
}

/// Shape a caller used when supplying coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateShape {
    /// `[lng, lat]`
    Pair,
    /// `{ "lng": .., "lat": .. }`
    Named,
}

/// Caller-visible coordinates. The shape the caller picked is kept so that
/// positions reported back (for instance after a marker drag) use the same form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coordinates {
    Pair([f64; 2]),
    Named(LngLat),
}

impl Coordinates {
    pub fn lng_lat(&self) -> LngLat {
        match self {
            Coordinates::Pair(pair) => LngLat::from(*pair),
            Coordinates::Named(lng_lat) => *lng_lat,
        }
    }

    pub fn shape(&self) -> CoordinateShape {
        match self {
            Coordinates::Pair(_) => CoordinateShape::Pair,
            Coordinates::Named(_) => CoordinateShape::Named,
        }
    }

    /// Builds coordinates for `position` in the same shape as `self`
    pub fn reshaped(&self, position: LngLat) -> Coordinates {
        Coordinates::in_shape(self.shape(), position)
    }

    pub fn in_shape(shape: CoordinateShape, position: LngLat) -> Coordinates {
        match shape {
            CoordinateShape::Pair => Coordinates::Pair(position.to_array()),
            CoordinateShape::Named => Coordinates::Named(position),
        }
    }

    pub fn validate(&self) -> Result<LngLat> {
        let lng_lat = self.lng_lat();
        if lng_lat.is_valid() {
            Ok(lng_lat)
        } else {
            Err(Error::InvalidCoordinates(format!(
                "lng {} / lat {} is not a valid position",
                lng_lat.lng, lng_lat.lat
            )))
        }
    }
}

impl From<LngLat> for Coordinates {
    fn from(lng_lat: LngLat) -> Self {
        Coordinates::Named(lng_lat)
    }
}

impl From<[f64; 2]> for Coordinates {
    fn from(pair: [f64; 2]) -> Self {
        Coordinates::Pair(pair)
    }
}
