use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::api_model::StopGeo;

/// A latitude/longitude pair in map order.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> LatLng {
        LatLng { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// Componentwise comparison within `epsilon` on both axes.
    pub fn approx_eq(&self, other: &LatLng, epsilon: f64) -> bool {
        (self.lat - other.lat).abs() <= epsilon && (self.lng - other.lng).abs() <= epsilon
    }
}

/// Travel direction of a route, spelled the way the backend spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum Direction {
    /// Outbound leg ("lượt đi").
    #[default]
    #[serde(rename = "DI")]
    Di,
    /// Return leg ("lượt về").
    #[serde(rename = "VE")]
    Ve,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Di => "DI",
            Direction::Ve => "VE",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stop that survived validation: finite coordinates, concrete order.
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub position: LatLng,
    pub name: String,
    pub address: String,
    pub order: i32,
}

impl Stop {
    /// Validates one raw backend row. Rows without finite coordinates are
    /// dropped silently; a missing order sorts first.
    pub fn from_geo(raw: &StopGeo) -> Option<Stop> {
        let (Some(lat), Some(lng)) = (raw.lat, raw.lng) else {
            return None;
        };
        let position = LatLng::new(lat, lng);
        if !position.is_finite() {
            return None;
        }
        Some(Stop {
            position,
            name: raw.name.clone().unwrap_or_default(),
            address: raw.address.clone().unwrap_or_default(),
            order: raw.order.unwrap_or(0),
        })
    }
}

/// Drops rows without usable coordinates and orders the rest for drawing.
/// The sort is stable: equal `order` values keep their input order.
pub fn sanitize_stops(raw: &[StopGeo]) -> Vec<Stop> {
    let mut stops = raw.iter().filter_map(Stop::from_geo).collect_vec();
    stops.sort_by_key(|s| s.order);
    stops
}
