//! Redraw state machine for a route map: reset, populate, fit, then draw
//! the path with a fixed ladder of strategies.

use tracing::{debug, info, warn};

use crate::config::MapDefaults;
use crate::map::instance::{MARKER_MATCH_EPSILON, MapInstance, Marker, PathSource, TileLayer};
use crate::map::registry::MapRegistry;
use crate::model::api_model::StopGeo;
use crate::model::stop::{LatLng, sanitize_stops};
use crate::routing::{RoutingApi, RoutingError};

/// Path drawing strategies, tried in order. The last rung cannot fail, so a
/// route with two or more stops always ends up with a visible path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathStrategy {
    /// One routing request across the whole stop sequence.
    FullRoute,
    /// One routing request per consecutive pair, straight lines where even
    /// that fails.
    PerSegment,
}

const PATH_STRATEGIES: [PathStrategy; 2] = [PathStrategy::FullRoute, PathStrategy::PerSegment];

/// Drives redraws of route maps. Owns the registry of live instances; no
/// caller touches an instance except through [`RouteRenderer::focus_stop`]
/// and the registry's read-side.
pub struct RouteRenderer<R> {
    routing: R,
    registry: MapRegistry,
    defaults: MapDefaults,
}

impl<R: RoutingApi> RouteRenderer<R> {
    pub fn new(routing: R, defaults: MapDefaults) -> RouteRenderer<R> {
        RouteRenderer {
            routing,
            registry: MapRegistry::new(),
            defaults,
        }
    }

    pub fn registry(&self) -> &MapRegistry {
        &self.registry
    }

    /// Redraws `container` from scratch for `stops`.
    ///
    /// Routing trouble only degrades the drawing and is logged as a
    /// warning; the map always ends up showing something.
    #[tracing::instrument(skip(self, stops), fields(stops = stops.len()))]
    pub async fn render(&self, stops: &[StopGeo], container: &str) {
        let stops = sanitize_stops(stops);

        self.registry.destroy(container);

        let mut map = MapInstance::blank(self.defaults.center, self.defaults.zoom);
        map.add_tile_layer(TileLayer::default());

        if stops.is_empty() {
            self.registry.insert(container, map);
            debug!("no drawable stops, blank map installed");
            return;
        }

        for (idx, stop) in stops.iter().enumerate() {
            map.add_marker(Marker {
                position: stop.position,
                label: format!("{}. {}", idx + 1, stop.name),
                address: stop.address.clone(),
            });
        }

        let points: Vec<LatLng> = stops.iter().map(|s| s.position).collect();
        map.fit_bounds(&points, self.defaults.fit_padding_px);

        self.registry.insert(container, map);

        if points.len() >= 2 {
            self.draw_path(container, &points).await;
        }
    }

    async fn draw_path(&self, container: &str, points: &[LatLng]) {
        for strategy in PATH_STRATEGIES {
            match strategy {
                PathStrategy::FullRoute => {
                    match self.draw_full_route(container, points).await {
                        Ok(()) => return,
                        Err(e) => warn!("full route failed, falling back pairwise: {e}"),
                    }
                }
                PathStrategy::PerSegment => {
                    self.draw_per_segment(container, points).await;
                    return;
                }
            }
        }
    }

    async fn draw_full_route(
        &self,
        container: &str,
        points: &[LatLng],
    ) -> Result<(), RoutingError> {
        let result = self.routing.query_route(points).await?;
        let line = result.geometry.line_points();
        if !line.is_empty() {
            self.registry
                .with_map(container, |map| map.add_path(line, PathSource::Routed));
        }
        info!(
            distance_m = result.distance_m,
            duration_s = result.duration_s,
            "drew full route"
        );
        Ok(())
    }

    /// Segment attempts are sequential and independent: a failed pair gets a
    /// straight line instead of a gap, and never aborts the pairs after it.
    async fn draw_per_segment(&self, container: &str, points: &[LatLng]) {
        for pair in points.windows(2) {
            let line = match self.routing.query_route(pair).await {
                Ok(result) => {
                    let line = result.geometry.line_points();
                    if line.is_empty() { None } else { Some(line) }
                }
                Err(e) => {
                    warn!("segment failed, using straight line: {e}");
                    None
                }
            };
            self.registry.with_map(container, |map| match line {
                Some(line) => map.add_path(line, PathSource::Routed),
                None => map.add_path(pair.to_vec(), PathSource::Straight),
            });
        }
    }

    /// Re-centers `container` on `position` and opens the popup of the
    /// marker cached there, if one matches within the epsilon tolerance.
    /// A coordinate matching no marker still re-centers; a container with
    /// no live map does nothing.
    pub fn focus_stop(&self, container: &str, position: LatLng, zoom: u8) {
        let focused = self.registry.with_map(container, |map| {
            map.set_view(position, zoom);
            if let Some(idx) = map.find_marker_near(position, MARKER_MATCH_EPSILON) {
                map.open_popup(idx);
            }
        });
        if focused.is_none() {
            debug!("focus ignored, no live map for {container}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::geometry::LineString;
    use crate::model::api_model::RouteQueryResult;

    #[derive(Default)]
    struct ScriptedRouter {
        outcomes: Mutex<VecDeque<Result<RouteQueryResult, RoutingError>>>,
        calls: Mutex<Vec<Vec<LatLng>>>,
    }

    impl ScriptedRouter {
        fn scripted(
            outcomes: Vec<Result<RouteQueryResult, RoutingError>>,
        ) -> ScriptedRouter {
            ScriptedRouter {
                outcomes: Mutex::new(outcomes.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Vec<LatLng>> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl RoutingApi for &ScriptedRouter {
        async fn query_route(
            &self,
            points: &[LatLng],
        ) -> Result<RouteQueryResult, RoutingError> {
            self.calls.lock().unwrap().push(points.to_vec());
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(RoutingError::Backend("unscripted call".to_string())))
        }
    }

    fn routed(points: &[LatLng]) -> Result<RouteQueryResult, RoutingError> {
        Ok(RouteQueryResult {
            distance_m: 1000.0,
            duration_s: 120.0,
            geometry: LineString::from_points(points),
        })
    }

    fn declined() -> Result<RouteQueryResult, RoutingError> {
        Err(RoutingError::Backend("OSRM không trả route".to_string()))
    }

    fn stop(lat: f64, lng: f64, order: i32, name: &str) -> StopGeo {
        StopGeo {
            lat: Some(lat),
            lng: Some(lng),
            order: Some(order),
            name: Some(name.to_string()),
            address: Some(format!("{name} street")),
            ..StopGeo::default()
        }
    }

    fn renderer(router: &ScriptedRouter) -> RouteRenderer<&ScriptedRouter> {
        RouteRenderer::new(router, MapDefaults::default())
    }

    #[tokio::test]
    async fn no_stops_installs_a_blank_map_without_routing() {
        let router = ScriptedRouter::default();
        let renderer = renderer(&router);

        renderer.render(&[], "route-map").await;

        let map = renderer.registry().snapshot("route-map").unwrap();
        assert!(map.markers().is_empty());
        assert!(map.paths().is_empty());
        assert_eq!(map.center(), MapDefaults::default().center);
        assert_eq!(map.zoom(), MapDefaults::default().zoom);
        assert!(router.calls().is_empty());
    }

    #[tokio::test]
    async fn invalid_only_stops_count_as_empty() {
        let router = ScriptedRouter::default();
        let renderer = renderer(&router);
        let rows = vec![StopGeo {
            lat: None,
            lng: Some(108.2),
            ..StopGeo::default()
        }];

        renderer.render(&rows, "route-map").await;

        let map = renderer.registry().snapshot("route-map").unwrap();
        assert!(map.markers().is_empty());
        assert!(router.calls().is_empty());
    }

    #[tokio::test]
    async fn single_stop_places_one_marker_and_never_routes() {
        let router = ScriptedRouter::default();
        let renderer = renderer(&router);

        renderer
            .render(&[stop(16.06, 108.21, 1, "Chợ Hàn")], "route-map")
            .await;

        let map = renderer.registry().snapshot("route-map").unwrap();
        assert_eq!(map.markers().len(), 1);
        assert_eq!(map.markers()[0].label, "1. Chợ Hàn");
        assert!(map.paths().is_empty());
        assert!(map.fitted_bounds().is_some());
        assert!(router.calls().is_empty());
    }

    #[tokio::test]
    async fn markers_follow_order_with_stable_ties() {
        let router = ScriptedRouter::scripted(vec![routed(&[
            LatLng::new(16.0, 108.0),
            LatLng::new(16.2, 108.2),
        ])]);
        let renderer = renderer(&router);
        let rows = vec![
            stop(16.2, 108.2, 2, "tie a"),
            stop(16.0, 108.0, 1, "first"),
            stop(16.3, 108.3, 2, "tie b"),
        ];

        renderer.render(&rows, "route-map").await;

        let map = renderer.registry().snapshot("route-map").unwrap();
        let labels: Vec<&str> = map.markers().iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["1. first", "2. tie a", "3. tie b"]);
    }

    #[tokio::test]
    async fn full_route_success_draws_one_path_and_stops_there() {
        let line = [
            LatLng::new(16.06, 108.21),
            LatLng::new(16.065, 108.215),
            LatLng::new(16.07, 108.22),
        ];
        let router = ScriptedRouter::scripted(vec![routed(&line)]);
        let renderer = renderer(&router);
        let rows = vec![
            stop(16.06, 108.21, 1, "a"),
            stop(16.07, 108.22, 2, "b"),
            stop(16.08, 108.23, 3, "c"),
        ];

        renderer.render(&rows, "route-map").await;

        let map = renderer.registry().snapshot("route-map").unwrap();
        assert_eq!(router.calls().len(), 1);
        assert_eq!(router.calls()[0].len(), 3);
        assert_eq!(map.paths().len(), 1);
        assert_eq!(map.paths()[0].source, PathSource::Routed);
        assert_eq!(map.paths()[0].points, line.to_vec());
    }

    #[tokio::test]
    async fn full_route_success_with_empty_geometry_still_terminates() {
        let router = ScriptedRouter::scripted(vec![Ok(RouteQueryResult {
            distance_m: 0.0,
            duration_s: 0.0,
            geometry: LineString::default(),
        })]);
        let renderer = renderer(&router);
        let rows = vec![stop(16.06, 108.21, 1, "a"), stop(16.07, 108.22, 2, "b")];

        renderer.render(&rows, "route-map").await;

        let map = renderer.registry().snapshot("route-map").unwrap();
        assert_eq!(router.calls().len(), 1);
        assert!(map.paths().is_empty());
    }

    #[tokio::test]
    async fn full_route_failure_falls_back_to_one_call_per_pair() {
        let p = [
            LatLng::new(16.06, 108.21),
            LatLng::new(16.07, 108.22),
            LatLng::new(16.08, 108.23),
        ];
        let router = ScriptedRouter::scripted(vec![
            declined(),
            routed(&[p[0], p[1]]),
            routed(&[p[1], p[2]]),
        ]);
        let renderer = renderer(&router);
        let rows = vec![
            stop(16.06, 108.21, 1, "a"),
            stop(16.07, 108.22, 2, "b"),
            stop(16.08, 108.23, 3, "c"),
        ];

        renderer.render(&rows, "route-map").await;

        let calls = router.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1], vec![p[0], p[1]]);
        assert_eq!(calls[2], vec![p[1], p[2]]);

        let map = renderer.registry().snapshot("route-map").unwrap();
        assert_eq!(map.paths().len(), 2);
        assert!(map.paths().iter().all(|p| p.source == PathSource::Routed));
        // Segment order follows stop order.
        assert_eq!(map.paths()[0].points.first(), Some(&p[0]));
        assert_eq!(map.paths()[1].points.first(), Some(&p[1]));
    }

    #[tokio::test]
    async fn failed_segment_degrades_to_a_straight_line_without_skipping() {
        let p = [
            LatLng::new(16.06, 108.21),
            LatLng::new(16.07, 108.22),
            LatLng::new(16.08, 108.23),
            LatLng::new(16.09, 108.24),
        ];
        let router = ScriptedRouter::scripted(vec![
            declined(),
            routed(&[p[0], p[1]]),
            declined(),
            routed(&[p[2], p[3]]),
        ]);
        let renderer = renderer(&router);
        let rows = vec![
            stop(16.06, 108.21, 1, "a"),
            stop(16.07, 108.22, 2, "b"),
            stop(16.08, 108.23, 3, "c"),
            stop(16.09, 108.24, 4, "d"),
        ];

        renderer.render(&rows, "route-map").await;

        let map = renderer.registry().snapshot("route-map").unwrap();
        assert_eq!(map.paths().len(), 3);
        assert_eq!(map.paths()[0].source, PathSource::Routed);
        assert_eq!(map.paths()[1].source, PathSource::Straight);
        assert_eq!(map.paths()[1].points, vec![p[1], p[2]]);
        assert_eq!(map.paths()[2].source, PathSource::Routed);
    }

    #[tokio::test]
    async fn segment_success_with_empty_geometry_draws_a_straight_line() {
        let router = ScriptedRouter::scripted(vec![
            declined(),
            Ok(RouteQueryResult {
                distance_m: 0.0,
                duration_s: 0.0,
                geometry: LineString::default(),
            }),
        ]);
        let renderer = renderer(&router);
        let rows = vec![stop(16.06, 108.21, 1, "a"), stop(16.07, 108.22, 2, "b")];

        renderer.render(&rows, "route-map").await;

        let map = renderer.registry().snapshot("route-map").unwrap();
        assert_eq!(map.paths().len(), 1);
        assert_eq!(map.paths()[0].source, PathSource::Straight);
    }

    #[tokio::test]
    async fn redraw_destroys_the_previous_instance() {
        let router = ScriptedRouter::default();
        let renderer = renderer(&router);

        renderer
            .render(&[stop(16.06, 108.21, 1, "old")], "route-map")
            .await;
        renderer
            .render(&[stop(16.09, 108.24, 1, "new")], "route-map")
            .await;

        assert_eq!(renderer.registry().len(), 1);
        let map = renderer.registry().snapshot("route-map").unwrap();
        assert_eq!(map.markers().len(), 1);
        assert_eq!(map.markers()[0].label, "1. new");
    }

    #[tokio::test]
    async fn focus_opens_the_popup_of_a_matching_marker() {
        let router = ScriptedRouter::default();
        let renderer = renderer(&router);
        renderer
            .render(&[stop(16.06, 108.21, 1, "a")], "route-map")
            .await;

        renderer.focus_stop("route-map", LatLng::new(16.06, 108.21), 16);

        let map = renderer.registry().snapshot("route-map").unwrap();
        assert_eq!(map.center(), LatLng::new(16.06, 108.21));
        assert_eq!(map.zoom(), 16);
        assert_eq!(map.opened_popup(), Some(0));
    }

    #[tokio::test]
    async fn focus_without_a_matching_marker_only_recenters() {
        let router = ScriptedRouter::default();
        let renderer = renderer(&router);
        renderer
            .render(&[stop(16.06, 108.21, 1, "a")], "route-map")
            .await;

        renderer.focus_stop("route-map", LatLng::new(16.5, 108.5), 16);

        let map = renderer.registry().snapshot("route-map").unwrap();
        assert_eq!(map.center(), LatLng::new(16.5, 108.5));
        assert_eq!(map.opened_popup(), None);
    }

    #[tokio::test]
    async fn focus_is_a_no_op_without_a_live_map() {
        let router = ScriptedRouter::default();
        let renderer = renderer(&router);

        renderer.focus_stop("route-map", LatLng::new(16.06, 108.21), 16);

        assert!(renderer.registry().is_empty());
    }
}
