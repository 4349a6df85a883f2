//! The headless map document: what the browser kept inside its map widget,
//! reduced to plain state a display layer can draw.

use serde_json::{Value, json};

use crate::model::stop::LatLng;

pub const TILE_URL_TEMPLATE: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const TILE_ATTRIBUTION: &str = "&copy; OpenStreetMap contributors";
pub const TILE_MAX_ZOOM: u8 = 19;

/// Tolerance for matching a focused coordinate to a cached marker.
pub const MARKER_MATCH_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    pub url_template: String,
    pub attribution: String,
    pub max_zoom: u8,
}

impl Default for TileLayer {
    fn default() -> Self {
        TileLayer {
            url_template: TILE_URL_TEMPLATE.to_string(),
            attribution: TILE_ATTRIBUTION.to_string(),
            max_zoom: TILE_MAX_ZOOM,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub position: LatLng,
    /// Popup title, `"{1-based position}. {name}"`.
    pub label: String,
    pub address: String,
}

/// How a drawn path was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSource {
    /// Geometry decoded from a routing response.
    Routed,
    /// Straight-line fallback between two stops.
    Straight,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathLayer {
    pub points: Vec<LatLng>,
    pub source: PathSource,
}

/// South-west/north-east envelope of a set of points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl Bounds {
    pub fn from_points(points: &[LatLng]) -> Option<Bounds> {
        let first = points.first()?;
        let mut bounds = Bounds {
            south_west: *first,
            north_east: *first,
        };
        for p in &points[1..] {
            bounds.south_west.lat = bounds.south_west.lat.min(p.lat);
            bounds.south_west.lng = bounds.south_west.lng.min(p.lng);
            bounds.north_east.lat = bounds.north_east.lat.max(p.lat);
            bounds.north_east.lng = bounds.north_east.lng.max(p.lng);
        }
        Some(bounds)
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
        )
    }
}

/// One live map for one container. Instances are destroyed and rebuilt on
/// every redraw, never patched, so nothing stale can survive a reload.
#[derive(Debug, Clone)]
pub struct MapInstance {
    center: LatLng,
    zoom: u8,
    tile_layer: Option<TileLayer>,
    markers: Vec<Marker>,
    paths: Vec<PathLayer>,
    fitted: Option<(Bounds, u32)>,
    open_popup: Option<usize>,
}

impl MapInstance {
    /// A blank map: just a viewport, nothing drawn.
    pub fn blank(center: LatLng, zoom: u8) -> MapInstance {
        MapInstance {
            center,
            zoom,
            tile_layer: None,
            markers: Vec::new(),
            paths: Vec::new(),
            fitted: None,
            open_popup: None,
        }
    }

    pub fn add_tile_layer(&mut self, layer: TileLayer) {
        self.tile_layer = Some(layer);
    }

    pub fn add_marker(&mut self, marker: Marker) {
        self.markers.push(marker);
    }

    pub fn add_path(&mut self, points: Vec<LatLng>, source: PathSource) {
        self.paths.push(PathLayer { points, source });
    }

    /// Centers the view on the envelope of `points`. Skipped when there is
    /// nothing to enclose.
    pub fn fit_bounds(&mut self, points: &[LatLng], padding_px: u32) {
        if let Some(bounds) = Bounds::from_points(points) {
            self.center = bounds.center();
            self.fitted = Some((bounds, padding_px));
        }
    }

    pub fn set_view(&mut self, center: LatLng, zoom: u8) {
        self.center = center;
        self.zoom = zoom;
    }

    /// Index of the first marker within `epsilon` of `position` on both axes.
    pub fn find_marker_near(&self, position: LatLng, epsilon: f64) -> Option<usize> {
        self.markers
            .iter()
            .position(|m| m.position.approx_eq(&position, epsilon))
    }

    pub fn open_popup(&mut self, marker: usize) {
        if marker < self.markers.len() {
            self.open_popup = Some(marker);
        }
    }

    pub fn center(&self) -> LatLng {
        self.center
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn tile_layer(&self) -> Option<&TileLayer> {
        self.tile_layer.as_ref()
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn paths(&self) -> &[PathLayer] {
        &self.paths
    }

    pub fn fitted_bounds(&self) -> Option<Bounds> {
        self.fitted.map(|(bounds, _)| bounds)
    }

    pub fn opened_popup(&self) -> Option<usize> {
        self.open_popup
    }

    /// The whole document as a GeoJSON FeatureCollection: markers as points,
    /// drawn paths as line strings tagged with how they were obtained.
    pub fn to_geojson(&self) -> Value {
        let mut features = Vec::new();
        for (idx, marker) in self.markers.iter().enumerate() {
            features.push(json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [marker.position.lng, marker.position.lat],
                },
                "properties": {
                    "label": marker.label,
                    "address": marker.address,
                    "popup_open": self.open_popup == Some(idx),
                },
            }));
        }
        for path in &self.paths {
            features.push(json!({
                "type": "Feature",
                "geometry": {
                    "type": "LineString",
                    "coordinates": path
                        .points
                        .iter()
                        .map(|p| [p.lng, p.lat])
                        .collect::<Vec<_>>(),
                },
                "properties": {
                    "source": match path.source {
                        PathSource::Routed => "routed",
                        PathSource::Straight => "straight",
                    },
                },
            }));
        }
        json!({
            "type": "FeatureCollection",
            "features": features,
            "properties": {
                "center": [self.center.lat, self.center.lng],
                "zoom": self.zoom,
                "generated_at": chrono::Utc::now().to_rfc3339(),
            },
        })
    }
}
