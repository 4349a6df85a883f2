//! Dashboard page: route table filtering, selection, and the KPI summary
//! panel.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use itertools::Itertools;
use tracing::{debug, warn};

use super::LoadOutcome;
use crate::backend::RouteDataApi;
use crate::model::api_model::{DataStatus, RouteSummary};

/// One row of the route table.
#[derive(Debug, Clone)]
pub struct RouteRow {
    pub route_id: i64,
    pub code: String,
    pub name: String,
    pub start: String,
    pub end: String,
    /// Known data status, back-filled once a summary for the row loaded.
    pub status: Option<DataStatus>,
}

impl RouteRow {
    /// The text the search box matches against.
    fn search_text(&self) -> String {
        format!("{} {} {} {}", self.code, self.name, self.start, self.end).to_lowercase()
    }
}

/// Status chip above the table. Rows whose status is still unknown only
/// show up under [`StatusFilter::All`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    /// Only rows whose loaded summary said "Đủ".
    Complete,
    /// Only rows whose loaded summary said "Thiếu".
    Missing,
}

impl StatusFilter {
    fn matches(&self, row: &RouteRow) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Complete => row.status == Some(DataStatus::Complete),
            StatusFilter::Missing => row.status == Some(DataStatus::Missing),
        }
    }
}

/// The page surface the controller writes to.
pub trait DashboardView {
    fn show_summary_loading(&self);
    fn render_summary(&self, summary: &RouteSummary);
    /// Zeroes the KPI panel and badges.
    fn reset_summary(&self);
    fn set_summary_error(&self, visible: bool);
    /// Highlight, title and detail link for the selected row.
    fn set_selected(&self, row: Option<&RouteRow>);
    /// Visible rows after filtering, in table order. Empty means the
    /// empty-state placeholder shows.
    fn set_visible_rows(&self, route_ids: &[i64]);
}

pub struct DashboardController<A, V> {
    api: A,
    view: V,
    rows: Mutex<Vec<RouteRow>>,
    query: Mutex<String>,
    status_filter: Mutex<StatusFilter>,
    selected: Mutex<Option<i64>>,
    generation: AtomicU64,
}

impl<A, V> DashboardController<A, V>
where
    A: RouteDataApi,
    V: DashboardView,
{
    pub fn new(api: A, view: V, rows: Vec<RouteRow>) -> Self {
        DashboardController {
            api,
            view,
            rows: Mutex::new(rows),
            query: Mutex::new(String::new()),
            status_filter: Mutex::new(StatusFilter::default()),
            selected: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Picks the starting selection (the requested row if it exists, else
    /// the first row) and applies the initial, unfiltered view.
    pub async fn init(&self, requested: Option<i64>) {
        let initial = {
            let rows = self.rows.lock().unwrap();
            requested
                .filter(|id| rows.iter().any(|r| r.route_id == *id))
                .or_else(|| rows.first().map(|r| r.route_id))
        };
        match initial {
            Some(route_id) => self.select_route(route_id).await,
            None => {
                self.view.set_selected(None);
                self.view.reset_summary();
            }
        }
        self.apply_filter().await;
    }

    /// Row click or select change.
    pub async fn select_route(&self, route_id: i64) {
        *self.selected.lock().unwrap() = Some(route_id);
        let row = self.row(route_id);
        self.view.set_selected(row.as_ref());
        self.load_summary(route_id).await;
    }

    pub fn selected(&self) -> Option<i64> {
        *self.selected.lock().unwrap()
    }

    fn row(&self, route_id: i64) -> Option<RouteRow> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.route_id == route_id)
            .cloned()
    }

    /// Loads the KPI summary for `route_id`. Superseded calls are dropped
    /// without touching the panel, so it always shows the latest selection.
    #[tracing::instrument(skip(self))]
    pub async fn load_summary(&self, route_id: i64) -> LoadOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.view.show_summary_loading();

        let fetched = self.api.route_summary(route_id).await;

        if generation != self.generation.load(Ordering::SeqCst) {
            debug!("discarding stale summary for route {route_id}");
            return LoadOutcome::Stale;
        }

        match fetched {
            Ok(summary) => {
                self.view.render_summary(&summary);
                self.view.set_summary_error(false);
                if let Some(status) = summary.status() {
                    // Back-fill the row so the status chips can see it.
                    if let Some(row) = self
                        .rows
                        .lock()
                        .unwrap()
                        .iter_mut()
                        .find(|r| r.route_id == route_id)
                    {
                        row.status = Some(status);
                    }
                }
                LoadOutcome::Applied
            }
            Err(e) => {
                warn!("could not load summary for route {route_id}: {e}");
                self.view.reset_summary();
                self.view.set_summary_error(true);
                LoadOutcome::Failed
            }
        }
    }

    pub async fn set_query(&self, query: &str) {
        *self.query.lock().unwrap() = query.trim().to_lowercase();
        self.apply_filter().await;
    }

    pub async fn set_status_filter(&self, filter: StatusFilter) {
        *self.status_filter.lock().unwrap() = filter;
        self.apply_filter().await;
    }

    /// Recomputes row visibility. When the current selection got filtered
    /// out, selection moves to the first visible row and its summary loads;
    /// with nothing visible the selection stays put.
    async fn apply_filter(&self) {
        let (visible, selection_visible) = {
            let rows = self.rows.lock().unwrap();
            let query = self.query.lock().unwrap();
            let filter = *self.status_filter.lock().unwrap();
            let visible = rows
                .iter()
                .filter(|r| {
                    (query.is_empty() || r.search_text().contains(query.as_str()))
                        && filter.matches(r)
                })
                .map(|r| r.route_id)
                .collect_vec();
            let selection_visible = match *self.selected.lock().unwrap() {
                Some(id) => visible.contains(&id),
                None => false,
            };
            (visible, selection_visible)
        };

        self.view.set_visible_rows(&visible);

        if !selection_visible {
            if let Some(first) = visible.first().copied() {
                self.select_route(first).await;
            }
        }
    }
}
