use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::models::location::GeoPoint;

#[derive(Debug, Clone, PartialEq)]
pub struct RouteEstimate {
    pub duration_sec: f64,
    pub distance_m: f64,
    pub geometry: Option<String>,
}

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("routing request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("routing service returned no route")]
    NoRoute,
}

/// External route planner. Best-effort: callers degrade gracefully when
/// this fails and must never surface the error past their own boundary.
#[async_trait]
pub trait RoutingService: Send + Sync {
    async fn route(&self, from: GeoPoint, to: GeoPoint) -> Result<RouteEstimate, RoutingError>;
}

/// HTTP client for an OSRM-compatible routing service.
pub struct OsrmClient {
    http: reqwest::Client,
    base_url: String,
}

impl OsrmClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[derive(Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    duration: f64,
    distance: f64,
    geometry: Option<String>,
}

#[async_trait]
impl RoutingService for OsrmClient {
    async fn route(&self, from: GeoPoint, to: GeoPoint) -> Result<RouteEstimate, RoutingError> {
        // OSRM takes lng,lat pairs.
        let url = format!(
            "{}/route/v1/driving/{},{};{},{}?overview=false",
            self.base_url.trim_end_matches('/'),
            from.lng,
            from.lat,
            to.lng,
            to.lat
        );

        let response = self.http.get(&url).send().await?.error_for_status()?;
        let body: OsrmResponse = response.json().await?;

        if body.code != "Ok" {
            return Err(RoutingError::NoRoute);
        }

        let route = body.routes.into_iter().next().ok_or(RoutingError::NoRoute)?;
        Ok(RouteEstimate {
            duration_sec: route.duration,
            distance_m: route.distance,
            geometry: route.geometry,
        })
    }
}
