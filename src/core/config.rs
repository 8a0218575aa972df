//! Configuration for the map host and the readiness gate
//!
//! Engine-facing option objects stay as JSON so they can be forwarded verbatim;
//! only the fields this crate acts on are lifted into typed fields.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{constants::DEFAULT_CONTAINER_ID, geo::Coordinates};
use crate::{Error, Result};

/// Options handed to the engine constructor.
///
/// Only `container` is lifted; every other key (style URL or inline style
/// object, center in either coordinate shape, zoom, ...) stays in `extra` and
/// reaches the engine exactly as given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MapOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses options from an arbitrary JSON object
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::Config("map options must be a JSON object".to_string()));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    /// Sets any engine option by key
    pub fn with(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Style URL; inline style objects go through [`MapOptions::with`]
    pub fn with_style(self, style: impl Into<String>) -> Self {
        let style: String = style.into();
        self.with("style", style.into())
    }

    /// Center in the shape given: a pair stays `[lng, lat]`
    pub fn with_center(self, center: impl Into<Coordinates>) -> Self {
        let center = match center.into() {
            Coordinates::Pair(pair) => serde_json::json!(pair),
            Coordinates::Named(lng_lat) => serde_json::json!({ "lng": lng_lat.lng, "lat": lng_lat.lat }),
        };
        self.with("center", center)
    }

    pub fn with_zoom(self, zoom: f64) -> Self {
        self.with("zoom", zoom.into())
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.extra.get(key)
    }

    /// Typed view of the `center` option, if it is a valid coordinate
    pub fn center(&self) -> Option<Coordinates> {
        self.get("center")
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Id of the element the engine mounts into
    pub fn container_id(&self) -> &str {
        self.container.as_deref().unwrap_or(DEFAULT_CONTAINER_ID)
    }

    /// Returns a copy with the container filled in
    pub fn resolved(&self) -> Self {
        let mut options = self.clone();
        if options.container.is_none() {
            options.container = Some(DEFAULT_CONTAINER_ID.to_string());
        }
        options
    }

    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Polling behaviour of the readiness gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Delay between two `is_style_loaded` probes
    #[serde(with = "millis")]
    pub poll_interval: Duration,
    /// Give up on a style-load cycle after this long. `None` polls forever.
    #[serde(default, with = "opt_millis")]
    pub timeout: Option<Duration>,
}

impl Default for GateConfig {
    fn default() -> Self {
        GateProfile::Standard.resolve()
    }
}

impl GateConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(Error::Config("poll interval must be greater than zero".to_string()));
        }
        if let Some(timeout) = self.timeout {
            if timeout < self.poll_interval {
                return Err(Error::Config(format!(
                    "timeout {:?} is shorter than the poll interval {:?}",
                    timeout, self.poll_interval
                )));
            }
        }
        Ok(())
    }
}

/// Ready-made gate settings
#[derive(Debug, Clone, PartialEq)]
pub enum GateProfile {
    /// 200 ms interval, unbounded
    Standard,
    /// Short interval for hosts that swap styles often
    Eager,
    /// Standard interval, gives up after the given duration
    Bounded(Duration),
    Custom(GateConfig),
}

impl GateProfile {
    pub fn resolve(&self) -> GateConfig {
        match self {
            Self::Standard => GateConfig {
                poll_interval: Duration::from_millis(crate::core::constants::STYLE_POLL_INTERVAL_MS),
                timeout: None,
            },
            Self::Eager => GateConfig {
                poll_interval: Duration::from_millis(50),
                timeout: None,
            },
            Self::Bounded(timeout) => GateConfig {
                poll_interval: Duration::from_millis(crate::core::constants::STYLE_POLL_INTERVAL_MS),
                timeout: Some(*timeout),
            },
            Self::Custom(config) => *config,
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

mod opt_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&(duration.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
