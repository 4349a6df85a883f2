//! Clients for the stop and summary endpoints of the smartbus backend.

use tracing::{Instrument, info, info_span};

use crate::config::AppConfig;
use crate::model::api_model::{RouteSummary, StopGeo};
use crate::model::stop::Direction;

#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("error fetching data")]
    Network(#[from] reqwest::Error),

    #[error("error parsing the response")]
    Malformed(#[from] serde_json::Error),
}

/// Seam between the page controllers and the backend.
#[allow(async_fn_in_trait)]
pub trait RouteDataApi {
    async fn stops_by_direction(
        &self,
        route_id: i64,
        dir: Direction,
    ) -> Result<Vec<StopGeo>, BackendError>;

    async fn route_summary(&self, route_id: i64) -> Result<RouteSummary, BackendError>;
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(http: reqwest::Client, config: &AppConfig) -> BackendClient {
        BackendClient {
            http,
            base_url: config.base_url.clone(),
        }
    }

    fn stops_url(&self, route_id: i64, dir: Direction) -> String {
        format!(
            "{}/api/routes/{}/stops_geo?dir={}",
            self.base_url, route_id, dir
        )
    }

    fn summary_url(&self, route_id: i64) -> String {
        format!("{}/api/routes/{}/summary", self.base_url, route_id)
    }
}

impl RouteDataApi for BackendClient {
    #[tracing::instrument(skip(self), err)]
    async fn stops_by_direction(
        &self,
        route_id: i64,
        dir: Direction,
    ) -> Result<Vec<StopGeo>, BackendError> {
        let response = self
            .http
            .get(self.stops_url(route_id, dir))
            .send()
            .instrument(info_span!("Fetching stops"))
            .await?
            .error_for_status()?;

        let text = response
            .text()
            .instrument(info_span!("Reading body of response"))
            .await?;

        let stops: Vec<StopGeo> = serde_json::from_str(&text)?;

        info!("got {} stops", stops.len());

        Ok(stops)
    }

    #[tracing::instrument(skip(self), err)]
    async fn route_summary(&self, route_id: i64) -> Result<RouteSummary, BackendError> {
        let response = self
            .http
            .get(self.summary_url(route_id))
            .send()
            .instrument(info_span!("Fetching summary"))
            .await?
            .error_for_status()?;

        let text = response
            .text()
            .instrument(info_span!("Reading body of response"))
            .await?;

        let summary: RouteSummary = serde_json::from_str(&text)?;

        info!("got summary for route {route_id}");

        Ok(summary)
    }
}
