//! GeoJSON geometry as returned by the routing backend.

use serde::{Deserialize, Serialize};

use crate::model::stop::LatLng;

/// A GeoJSON `LineString`. Coordinates are `[lng, lat]` pairs on the wire
/// and have to be flipped before a map can use them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LineString {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub coordinates: Vec<[f64; 2]>,
}

impl LineString {
    pub const KIND: &'static str = "LineString";

    pub fn from_points(points: &[LatLng]) -> LineString {
        LineString {
            kind: LineString::KIND.to_string(),
            coordinates: points.iter().map(|p| [p.lng, p.lat]).collect(),
        }
    }

    /// Decodes the geometry into map points, flipping `[lng, lat]` to
    /// `(lat, lng)`. Anything that is not a `LineString` decodes to an
    /// empty sequence rather than an error.
    pub fn line_points(&self) -> Vec<LatLng> {
        if self.kind != LineString::KIND {
            return Vec::new();
        }
        self.coordinates
            .iter()
            .map(|c| LatLng::new(c[1], c[0]))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }
}
