//! Environment-driven configuration with code defaults.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::model::stop::LatLng;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Upper bound on coordinates per routing request. The backend refuses
/// larger requests outright, so the client does not bother sending them.
pub const DEFAULT_OSRM_MAX_COORDS: usize = 70;

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 8;

/// Map behavior that is not worth an environment variable.
#[derive(Debug, Clone)]
pub struct MapDefaults {
    /// Viewport of the blank map shown when a route has no drawable stops.
    pub center: LatLng,
    pub zoom: u8,
    /// Pixel padding applied when fitting the viewport to stop bounds.
    pub fit_padding_px: u32,
    /// Zoom applied when focusing a single stop.
    pub focus_zoom: u8,
}

impl Default for MapDefaults {
    fn default() -> Self {
        MapDefaults {
            // Da Nang city center; the seeded routes all live there.
            center: LatLng::new(16.0544, 108.2022),
            zoom: 13,
            fit_padding_px: 20,
            focus_zoom: 16,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the smartbus backend, without a trailing slash.
    pub base_url: String,
    pub osrm_max_coords: usize,
    pub http_timeout: Duration,
    pub map: MapDefaults,
}

impl AppConfig {
    pub fn from_env() -> AppConfig {
        let base_url = dotenvy::var("SMARTBUS_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        AppConfig {
            base_url,
            osrm_max_coords: env_parse("OSRM_MAX_COORDS", DEFAULT_OSRM_MAX_COORDS),
            http_timeout: Duration::from_secs(env_parse(
                "OSRM_TIMEOUT",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )),
            map: MapDefaults::default(),
        }
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
{
    match dotenvy::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("ignoring unparseable {key}={raw}, using {default}");
                default
            }
        },
        Err(_) => default,
    }
}
