use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;

use crate::analytics::{self, DriverRow, MetricsQuery, MetricsResult, StoreRow};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/analytics/summary", get(summary))
        .route("/analytics/rankings", get(rankings))
}

async fn summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MetricsQuery>,
) -> Json<MetricsResult> {
    Json(analytics::compute(&state.store.list(), &query))
}

#[derive(Serialize)]
struct RankingsResponse {
    store_ranking: Vec<StoreRow>,
    driver_ranking: Vec<DriverRow>,
}

async fn rankings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MetricsQuery>,
) -> Json<RankingsResponse> {
    let result = analytics::compute(&state.store.list(), &query);

    Json(RankingsResponse {
        store_ranking: analytics::store_ranking(result.stores),
        driver_ranking: analytics::driver_ranking(result.drivers),
    })
}
