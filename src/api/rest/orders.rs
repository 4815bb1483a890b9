use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::order::{Driver, Order, OrderItem, OrderStatus, ProofOfDelivery};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/confirm", post(confirm_order))
        .route("/orders/:id/assign", post(assign_driver))
        .route("/orders/:id/status", post(update_status))
        .route("/orders/:id/alerts/clear", post(clear_alerts))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItem>,
    pub total: i64,
    pub merchant_id: Option<u64>,
    pub client: Option<String>,
}

#[derive(Deserialize)]
pub struct AssignDriverRequest {
    pub id: Option<Uuid>,
    pub name: String,
    pub vehicle: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    pub pod: Option<ProofOfDelivery>,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("items cannot be empty".to_string()));
    }

    if payload.total < 0 {
        return Err(AppError::BadRequest("total cannot be negative".to_string()));
    }

    let order = state.store.create(
        payload.items,
        payload.total,
        payload.merchant_id,
        payload.client,
    )?;

    Ok(Json(order))
}

async fn list_orders(State(state): State<Arc<AppState>>) -> Json<Vec<Order>> {
    Json(state.store.list())
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.store.get(id)?))
}

async fn confirm_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.store.confirm(id)?))
}

async fn assign_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(payload): Json<AssignDriverRequest>,
) -> Result<Json<Order>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "driver name cannot be empty".to_string(),
        ));
    }

    let driver = Driver {
        id: payload.id.unwrap_or_else(Uuid::new_v4),
        name: payload.name,
        vehicle: payload.vehicle,
    };

    Ok(Json(state.store.assign_driver(id, driver)?))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.store.update_status(
        id,
        payload.status,
        payload.pod,
    )?))
}

async fn clear_alerts(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Value>, AppError> {
    // 404 for ids the store has never seen keeps operator tooling honest.
    state.store.get(id)?;
    state.alerts.clear(id);

    Ok(Json(json!({ "order_id": id, "cleared": true })))
}
