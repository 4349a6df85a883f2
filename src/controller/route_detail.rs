//! Route-detail page: direction toggle, stop panel, KPI block and the map.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use super::{LoadOutcome, StatusVariant};
use crate::backend::RouteDataApi;
use crate::model::api_model::{DataStatus, StopGeo};
use crate::model::stop::{Direction, LatLng};
use crate::render::RouteRenderer;
use crate::routing::RoutingApi;

/// KPI block of the detail page, computed over the raw stop rows: rows
/// without coordinates still count toward the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopKpis {
    pub total: usize,
    pub with_geo: usize,
    pub status: DataStatus,
}

impl StopKpis {
    pub fn compute(stops: &[StopGeo]) -> StopKpis {
        let total = stops.len();
        let with_geo = stops
            .iter()
            .filter(|s| s.lat.is_some() && s.lng.is_some())
            .count();
        let status = if total >= 2 && with_geo >= 2 {
            DataStatus::Complete
        } else {
            DataStatus::Missing
        };
        StopKpis {
            total,
            with_geo,
            status,
        }
    }
}

/// The page surface the controller writes to.
pub trait DetailView {
    fn set_active_direction(&self, dir: Direction);
    fn show_status(&self, message: &str, variant: StatusVariant);
    fn set_loading(&self, loading: bool);
    /// Clears the stop list and zeroes the KPI block.
    fn reset_panel(&self);
    /// Rows arrive already sorted by `order`.
    fn render_stop_list(&self, stops: &[StopGeo]);
    fn update_kpis(&self, kpis: StopKpis);
}

pub struct RouteDetailController<A, R, V> {
    api: A,
    renderer: RouteRenderer<R>,
    view: V,
    route_id: i64,
    container: String,
    focus_zoom: u8,
    current_dir: Mutex<Direction>,
    generation: AtomicU64,
}

impl<A, R, V> RouteDetailController<A, R, V>
where
    A: RouteDataApi,
    R: RoutingApi,
    V: DetailView,
{
    pub fn new(
        api: A,
        renderer: RouteRenderer<R>,
        view: V,
        route_id: i64,
        container: impl Into<String>,
        focus_zoom: u8,
    ) -> Self {
        RouteDetailController {
            api,
            renderer,
            view,
            route_id,
            container: container.into(),
            focus_zoom,
            current_dir: Mutex::new(Direction::default()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn renderer(&self) -> &RouteRenderer<R> {
        &self.renderer
    }

    pub fn current_direction(&self) -> Direction {
        *self.current_dir.lock().unwrap()
    }

    /// Loads and shows one direction of the route.
    ///
    /// Every call supersedes the ones before it: a response that comes back
    /// after a newer call was issued is dropped without touching the page
    /// or the map, so the visible state always belongs to the latest
    /// toggle.
    #[tracing::instrument(skip(self), fields(route_id = self.route_id))]
    pub async fn load_stops(&self, dir: Direction) -> LoadOutcome {
        *self.current_dir.lock().unwrap() = dir;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        self.view.set_active_direction(dir);
        self.view
            .show_status("Loading stops…", StatusVariant::Info);
        self.view.set_loading(true);
        self.view.reset_panel();
        self.renderer.render(&[], &self.container).await;

        let fetched = self.api.stops_by_direction(self.route_id, dir).await;

        if generation != self.generation.load(Ordering::SeqCst) {
            debug!("discarding stale stop response for {dir}");
            return LoadOutcome::Stale;
        }

        let mut stops = match fetched {
            Ok(stops) => stops,
            Err(e) => {
                warn!("could not load stops: {e}");
                self.view.show_status(
                    "Could not load stops. Check the route data or the API.",
                    StatusVariant::Warning,
                );
                self.view.reset_panel();
                self.renderer.render(&[], &self.container).await;
                self.view.set_loading(false);
                return LoadOutcome::Failed;
            }
        };

        stops.sort_by_key(|s| s.order.unwrap_or(0));

        self.view.render_stop_list(&stops);
        self.view.update_kpis(StopKpis::compute(&stops));

        self.renderer.render(&stops, &self.container).await;

        if stops.is_empty() {
            self.view.show_status(
                "No stops recorded for this direction yet.",
                StatusVariant::Secondary,
            );
        } else {
            self.view.show_status(
                "Route drawn, with pairwise fallback where needed.",
                StatusVariant::Success,
            );
        }
        self.view.set_loading(false);

        LoadOutcome::Applied
    }

    /// Reloads the direction shown last.
    pub async fn reload(&self) -> LoadOutcome {
        let dir = self.current_direction();
        self.load_stops(dir).await
    }

    /// Stop-row click: recenter on the stop and open its popup. Rows
    /// without usable coordinates are inert.
    pub fn focus_stop(&self, position: LatLng) {
        if !position.is_finite() {
            return;
        }
        self.renderer
            .focus_stop(&self.container, position, self.focus_zoom);
    }
}
