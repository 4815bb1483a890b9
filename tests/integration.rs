use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use dispatch_core::api::rest::router;
use dispatch_core::config::Config;
use dispatch_core::models::location::GeoPoint;
use dispatch_core::routing::{RouteEstimate, RoutingError, RoutingService};
use dispatch_core::state::AppState;
use dispatch_core::store::journal::MemoryJournal;

/// Routing stub answering every request with the same estimate.
struct FixedRouting;

#[async_trait]
impl RoutingService for FixedRouting {
    async fn route(&self, _from: GeoPoint, _to: GeoPoint) -> Result<RouteEstimate, RoutingError> {
        Ok(RouteEstimate {
            duration_sec: 540.0,
            distance_m: 3_200.0,
            geometry: None,
        })
    }
}

fn test_config() -> Config {
    Config {
        http_port: 0,
        log_level: "info".to_string(),
        event_buffer_size: 1024,
        data_path: "unused-in-tests".to_string(),
        routing_url: "http://unused-in-tests".to_string(),
        sla_breach_minutes: 45,
        driver_stopped_minutes: 8,
        driver_stopped_radius_m: 50.0,
        location_history_cap: 200,
        retention_minutes: 120,
        retention_sweep_secs: 60,
    }
}

fn setup() -> axum::Router {
    let state = AppState::new(
        &test_config(),
        Arc::new(MemoryJournal::default()),
        Arc::new(FixedRouting),
    )
    .expect("app state");
    router(Arc::new(state))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn order_body(merchant_id: u64) -> Value {
    json!({
        "items": [
            { "id": 1, "name": "pad thai", "unit_price": 1250, "quantity": 1, "merchant_id": merchant_id }
        ],
        "total": 1250,
        "merchant_id": merchant_id,
        "client": "web"
    })
}

async fn create_order(app: &axum::Router, merchant_id: u64) -> Value {
    let response = app
        .clone()
        .oneshot(json_request("POST", "/orders", order_body(merchant_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["orders"], 0);
    assert_eq!(body["tracked"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("orders_created_total"));
    assert!(body.contains("locations_recorded_total"));
}

#[tokio::test]
async fn create_order_starts_paid_with_pin() {
    let app = setup();
    let order = create_order(&app, 1).await;

    assert_eq!(order["id"], 1);
    assert_eq!(order["status"], "PAID");
    assert_eq!(order["timeline"].as_array().unwrap().len(), 1);
    assert_eq!(order["timeline"][0]["status"], "PAID");
    assert_eq!(order["pin_delivery"].as_str().unwrap().len(), 4);
    assert!(order["driver"].is_null());
    assert!(order["eta_min"].is_null());
}

#[tokio::test]
async fn create_order_with_no_items_returns_400() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/orders",
            json!({ "items": [], "total": 0 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_nonexistent_order_returns_404() {
    let app = setup();
    let response = app.oneshot(get_request("/orders/999")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_orders_is_newest_first() {
    let app = setup();
    create_order(&app, 1).await;
    create_order(&app, 2).await;

    let response = app.oneshot(get_request("/orders")).await.unwrap();
    let body = body_json(response).await;
    let orders = body.as_array().unwrap();

    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0]["id"], 2);
    assert_eq!(orders[1]["id"], 1);
}

#[tokio::test]
async fn skipping_a_status_returns_409() {
    let app = setup();
    let order = create_order(&app, 1).await;
    let id = order["id"].as_u64().unwrap();

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/orders/{id}/status"),
            json!({ "status": "PICKED_UP" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn assign_before_confirm_returns_409() {
    let app = setup();
    let order = create_order(&app, 1).await;
    let id = order["id"].as_u64().unwrap();

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/orders/{id}/assign"),
            json!({ "name": "Dana", "vehicle": "bike" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn full_delivery_flow_with_pin_proof() {
    let app = setup();
    let order = create_order(&app, 1).await;
    let id = order["id"].as_u64().unwrap();
    let pin = order["pin_delivery"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{id}/confirm"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "CONFIRMED");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{id}/assign"),
            json!({ "name": "Dana", "vehicle": "bike" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let assigned = body_json(response).await;
    assert_eq!(assigned["status"], "ASSIGNED");
    assert_eq!(assigned["driver"]["name"], "Dana");
    assert!(assigned["eta_min"].as_i64().unwrap() > 0);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{id}/status"),
            json!({ "status": "PICKED_UP" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Wrong PIN must not advance the order.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{id}/status"),
            json!({ "status": "DELIVERED", "pod": { "kind": "pin", "code": "wrong" } }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(get_request(&format!("/orders/{id}")))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["status"], "PICKED_UP");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{id}/status"),
            json!({ "status": "DELIVERED", "pod": { "kind": "pin", "code": pin } }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let delivered = body_json(response).await;
    assert_eq!(delivered["status"], "DELIVERED");
    assert_eq!(delivered["pod"]["kind"], "pin");
    assert_eq!(delivered["pod"]["code"], "####");

    let timeline = delivered["timeline"].as_array().unwrap();
    assert_eq!(timeline.len(), 5);
    assert_eq!(timeline.last().unwrap()["status"], "DELIVERED");
}

#[tokio::test]
async fn record_location_updates_position_and_eta() {
    let app = setup();
    let order = create_order(&app, 1).await;
    let id = order["id"].as_u64().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/locations",
            json!({
                "order_id": id,
                "lat": 52.51,
                "lng": 13.39,
                "speed": 21.5,
                "heading": 80.0,
                "driver_id": "00000000-0000-0000-0000-000000000007",
                "dropoff": { "lat": 52.54, "lng": 13.42 }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request(&format!("/orders/{id}/location")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let location = body_json(response).await;
    assert_eq!(location["lat"], 52.51);
    assert_eq!(location["lng"], 13.39);

    // 540 seconds from the routing stub round to 9 minutes.
    let response = app
        .clone()
        .oneshot(get_request(&format!("/orders/{id}/eta")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let eta = body_json(response).await;
    assert_eq!(eta["eta_min"], 9);
    assert_eq!(eta["distance_m"], 3200.0);

    let response = app
        .clone()
        .oneshot(get_request(&format!("/orders/{id}")))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["eta_min"], 9);

    let response = app
        .clone()
        .oneshot(get_request(&format!("/orders/{id}/location/history")))
        .await
        .unwrap();
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);

    let response = app
        .oneshot(get_request("/locations/latest"))
        .await
        .unwrap();
    let latest = body_json(response).await;
    assert_eq!(latest.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn record_location_with_bad_latitude_returns_400() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/locations",
            json!({ "order_id": 1, "lat": 95.0, "lng": 13.39 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn eta_for_untracked_order_returns_404() {
    let app = setup();
    let response = app.oneshot(get_request("/orders/1/eta")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn track_export_is_csv_with_fixed_header() {
    let app = setup();
    let order = create_order(&app, 1).await;
    let id = order["id"].as_u64().unwrap();

    app.clone()
        .oneshot(json_request(
            "POST",
            "/locations",
            json!({ "order_id": id, "lat": 52.51, "lng": 13.39 }),
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(get_request(&format!("/orders/{id}/track/export.csv")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/csv"));

    let body = body_string(response).await;
    let mut lines = body.lines();
    assert_eq!(lines.next(), Some("recorded_at;lat;lng;speed;heading"));
    assert!(lines.next().unwrap().contains("52.51;13.39"));
}

#[tokio::test]
async fn analytics_summary_counts_filtered_orders() {
    let app = setup();
    create_order(&app, 1).await;
    create_order(&app, 1).await;
    create_order(&app, 2).await;

    let response = app
        .clone()
        .oneshot(get_request("/analytics/summary"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["kpi"]["total"], 3);
    assert_eq!(body["kpi"]["delivered"], 0);
    assert_eq!(body["kpi"]["completion_rate"], 0);
    assert_eq!(body["stores"].as_array().unwrap().len(), 2);

    let response = app
        .oneshot(get_request("/analytics/summary?merchant_id=1"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["kpi"]["total"], 2);
    assert_eq!(body["stores"].as_array().unwrap().len(), 1);
    assert_eq!(body["stores"][0]["merchant_id"], 1);
}

#[tokio::test]
async fn rankings_endpoint_returns_both_lists() {
    let app = setup();
    create_order(&app, 1).await;

    let response = app
        .oneshot(get_request("/analytics/rankings"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["store_ranking"].is_array());
    assert!(body["driver_ranking"].is_array());
}

#[tokio::test]
async fn clear_alerts_for_unknown_order_returns_404() {
    let app = setup();
    let response = app
        .oneshot(json_request("POST", "/orders/42/alerts/clear", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn clear_alerts_for_known_order_succeeds() {
    let app = setup();
    let order = create_order(&app, 1).await;
    let id = order["id"].as_u64().unwrap();

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/orders/{id}/alerts/clear"),
            json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["cleared"], true);
}
