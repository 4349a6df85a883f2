//! Client for the backend's OSRM routing proxy.

use reqwest::StatusCode;
use tracing::{Instrument, info_span};

use crate::config::AppConfig;
use crate::model::api_model::{RouteEnvelope, RouteQueryResult, RouteRequest};
use crate::model::stop::LatLng;

#[derive(thiserror::Error, Debug)]
pub enum RoutingError {
    #[error("a route request needs at least 2 points")]
    NotEnoughPoints,

    #[error("too many points for one route request: {0}, limit {1}")]
    TooManyPoints(usize, usize),

    #[error("routing backend declined: {0}")]
    Backend(String),

    #[error("error reaching the routing backend")]
    Network(#[from] reqwest::Error),

    #[error("error parsing the routing response")]
    Malformed(#[from] serde_json::Error),
}

/// Seam between the renderer and the routing backend.
///
/// Retry policy does not live here: a client makes exactly one attempt per
/// call, and the renderer decides what a failure degrades to.
#[allow(async_fn_in_trait)]
pub trait RoutingApi {
    /// Requests a driving path through `points`, in order.
    async fn query_route(&self, points: &[LatLng]) -> Result<RouteQueryResult, RoutingError>;
}

/// Talks to `POST {base}/api/osrm/route`.
#[derive(Debug, Clone)]
pub struct OsrmClient {
    http: reqwest::Client,
    url: String,
    max_coords: usize,
}

impl OsrmClient {
    pub fn new(http: reqwest::Client, config: &AppConfig) -> OsrmClient {
        OsrmClient {
            http,
            url: format!("{}/api/osrm/route", config.base_url),
            max_coords: config.osrm_max_coords,
        }
    }
}

impl RoutingApi for OsrmClient {
    #[tracing::instrument(skip(self, points), fields(points = points.len()), err)]
    async fn query_route(&self, points: &[LatLng]) -> Result<RouteQueryResult, RoutingError> {
        if points.len() < 2 {
            return Err(RoutingError::NotEnoughPoints);
        }
        if points.len() > self.max_coords {
            return Err(RoutingError::TooManyPoints(points.len(), self.max_coords));
        }

        let body = serde_json::to_string(&RouteRequest {
            coords: points.iter().map(|p| [p.lat, p.lng]).collect(),
        })?;

        let response = self
            .http
            .post(&self.url)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .instrument(info_span!("Requesting route"))
            .await?;

        let status = response.status();
        let text = response
            .text()
            .instrument(info_span!("Reading body of response"))
            .await?;

        interpret(status, &text)
    }
}

/// Maps a raw proxy response to the routing contract: any non-2xx status or
/// `ok == false` envelope is a backend failure carrying its message. A
/// successful envelope without geometry decodes as an empty line.
fn interpret(status: StatusCode, body: &str) -> Result<RouteQueryResult, RoutingError> {
    let envelope: RouteEnvelope = serde_json::from_str(body)?;

    if !status.is_success() || !envelope.ok {
        return Err(RoutingError::Backend(
            envelope
                .error
                .unwrap_or_else(|| "routing backend failed".to_string()),
        ));
    }

    Ok(RouteQueryResult {
        distance_m: envelope.distance_m.unwrap_or(0.0),
        duration_s: envelope.duration_s.unwrap_or(0.0),
        geometry: envelope.geometry.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_body_keeps_lat_lng_order() {
        let body = serde_json::to_value(RouteRequest {
            coords: vec![[16.0678, 108.2208], [16.0614, 108.2244]],
        })
        .unwrap();

        assert_eq!(
            body,
            json!({"coords": [[16.0678, 108.2208], [16.0614, 108.2244]]})
        );
    }

    #[test]
    fn interprets_success() {
        let body = r#"{
            "ok": true, "distance_m": 2450.3, "duration_s": 312.8,
            "geometry": {"type": "LineString", "coordinates": [[108.22, 16.06], [108.23, 16.05]]}
        }"#;

        let result = interpret(StatusCode::OK, body).unwrap();

        assert_eq!(result.distance_m, 2450.3);
        assert_eq!(result.geometry.line_points().len(), 2);
    }

    #[test]
    fn interprets_declined_envelope_with_its_message() {
        let body = r#"{"ok": false, "error": "OSRM không trả route"}"#;

        let err = interpret(StatusCode::BAD_GATEWAY, body).unwrap_err();

        match err {
            RoutingError::Backend(message) => assert_eq!(message, "OSRM không trả route"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn declined_envelope_without_message_gets_a_generic_one() {
        let err = interpret(StatusCode::OK, r#"{"ok": false}"#).unwrap_err();

        match err {
            RoutingError::Backend(message) => assert_eq!(message, "routing backend failed"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_success_status_fails_even_when_envelope_says_ok() {
        let err = interpret(StatusCode::INTERNAL_SERVER_ERROR, r#"{"ok": true}"#).unwrap_err();

        assert!(matches!(err, RoutingError::Backend(_)));
    }

    #[test]
    fn unreadable_body_is_malformed() {
        let err = interpret(StatusCode::OK, "<html>gateway timeout</html>").unwrap_err();

        assert!(matches!(err, RoutingError::Malformed(_)));
    }

    #[test]
    fn missing_geometry_on_success_is_an_empty_line() {
        let result = interpret(StatusCode::OK, r#"{"ok": true}"#).unwrap();

        assert!(result.geometry.line_points().is_empty());
        assert_eq!(result.distance_m, 0.0);
    }
}
