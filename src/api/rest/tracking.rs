use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;

use crate::error::AppError;
use crate::geo;
use crate::geo::export;
use crate::models::location::{EtaData, LocationEntry};
use crate::state::AppState;
use crate::tracker::LocationReport;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/locations", post(record_location))
        .route("/locations/latest", get(list_latest))
        .route("/orders/:id/location", get(get_location))
        .route("/orders/:id/location/history", get(get_history))
        .route("/orders/:id/eta", get(get_eta))
        .route("/orders/:id/track/summary", get(track_summary))
        .route("/orders/:id/track/export.csv", get(export_csv))
        .route("/orders/:id/track/export.gpx", get(export_gpx))
}

async fn record_location(
    State(state): State<Arc<AppState>>,
    Json(report): Json<LocationReport>,
) -> Result<Json<LocationEntry>, AppError> {
    Ok(Json(state.tracker.record(report).await?))
}

async fn list_latest(State(state): State<Arc<AppState>>) -> Json<Vec<LocationEntry>> {
    Json(state.tracker.latest_all())
}

async fn get_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<LocationEntry>, AppError> {
    state
        .tracker
        .latest(id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no location for order {id}")))
}

async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Json<Vec<LocationEntry>> {
    Json(state.tracker.history(id))
}

async fn get_eta(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<EtaData>, AppError> {
    state
        .tracker
        .eta(id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no eta for order {id}")))
}

async fn track_summary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Json<geo::TrackSummary> {
    Json(geo::summarize_track(&state.tracker.history(id)))
}

async fn export_csv(State(state): State<Arc<AppState>>, Path(id): Path<u64>) -> impl IntoResponse {
    let body = export::track_csv(&state.tracker.history(id));
    (
        StatusCode::OK,
        [("content-type", "text/csv; charset=utf-8")],
        body,
    )
}

async fn export_gpx(State(state): State<Arc<AppState>>, Path(id): Path<u64>) -> impl IntoResponse {
    let body = export::track_gpx(id, &state.tracker.history(id));
    (
        StatusCode::OK,
        [("content-type", "application/gpx+xml; charset=utf-8")],
        body,
    )
}
