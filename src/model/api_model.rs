//! Wire models for the smartbus backend and its routing proxy.

use serde::{Deserialize, Serialize};

use crate::geometry::LineString;

/// One row of `GET /api/routes/{id}/stops_geo`. Coordinates can be missing
/// on stops that were never geocoded; such rows still show up in the stop
/// list and the KPI totals, they just cannot be drawn.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StopGeo {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub order: Option<i32>,
    /// "DI", "VE", or missing on rows predating per-direction stops.
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub route_code: Option<String>,
}

/// Request body of `POST /api/osrm/route`. Coordinates travel as
/// `[lat, lng]`; the proxy flips them for OSRM itself.
#[derive(Debug, Serialize)]
pub struct RouteRequest {
    pub coords: Vec<[f64; 2]>,
}

/// Response envelope of `POST /api/osrm/route`. A declined request carries
/// `ok == false` and the backend's message in `error`.
#[derive(Debug, Deserialize)]
pub struct RouteEnvelope {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub distance_m: Option<f64>,
    #[serde(default)]
    pub duration_s: Option<f64>,
    #[serde(default)]
    pub geometry: Option<LineString>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A successful routing answer, ready for drawing.
#[derive(Debug, Clone)]
pub struct RouteQueryResult {
    pub distance_m: f64,
    pub duration_s: f64,
    pub geometry: LineString,
}

/// The two `data_status` labels the backend emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataStatus {
    /// Enough stops and coordinates to draw the route ("Đủ").
    Complete,
    /// Route data is incomplete ("Thiếu").
    Missing,
}

impl DataStatus {
    pub fn label(&self) -> &'static str {
        match self {
            DataStatus::Complete => "Đủ",
            DataStatus::Missing => "Thiếu",
        }
    }

    /// Anything that is not the exact "Đủ" label counts as missing, which
    /// is also how the dashboard badges treat it.
    pub fn from_label(label: Option<&str>) -> Option<DataStatus> {
        match label {
            Some("Đủ") => Some(DataStatus::Complete),
            Some(_) => Some(DataStatus::Missing),
            None => None,
        }
    }
}

/// Per-direction slice of a route summary.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DirectionStats {
    #[serde(default)]
    pub stops: u32,
    #[serde(default)]
    pub with_geo: u32,
    #[serde(default)]
    pub percent_with_geo: f64,
    /// Absent on older backends; see [`DirectionStats::shape_ok`].
    #[serde(default)]
    pub has_enough_shape: Option<bool>,
}

impl DirectionStats {
    /// Whether this direction can be drawn. Falls back to the
    /// two-stops-with-two-coordinates rule when the backend did not say.
    pub fn shape_ok(&self) -> bool {
        self.has_enough_shape
            .unwrap_or(self.stops >= 2 && self.with_geo >= 2)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DirectionSummaries {
    #[serde(rename = "DI", default)]
    pub di: DirectionStats,
    #[serde(rename = "VE", default)]
    pub ve: DirectionStats,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SummaryTotals {
    #[serde(default)]
    pub stops: u32,
    #[serde(default)]
    pub with_geo: u32,
    #[serde(default)]
    pub percent_with_geo: f64,
}

/// `GET /api/routes/{id}/summary`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RouteSummary {
    #[serde(default)]
    pub route_id: i64,
    #[serde(default)]
    pub route_code: Option<String>,
    #[serde(default)]
    pub route_name: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub directions: DirectionSummaries,
    #[serde(default)]
    pub totals: SummaryTotals,
    #[serde(default)]
    pub data_status: Option<String>,
}

impl RouteSummary {
    pub fn status(&self) -> Option<DataStatus> {
        DataStatus::from_label(self.data_status.as_deref())
    }
}
