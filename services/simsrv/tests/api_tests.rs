//! Control API integration tests

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

use sensim_model::{FixedTimeProvider, PointDefinition, Registry, SimulationClock};
use sensim_protocols::TelemetrySwitch;
use sensim_routing::ProjectionMaps;
use simsrv::api::{create_api_routes, AppState};

const T0: i64 = 1_700_000_000_000;

struct TestApp {
    router: axum::Router,
    clock: Arc<SimulationClock>,
    switch: Arc<TelemetrySwitch>,
}

fn create_test_app() -> TestApp {
    let defs = vec![
        PointDefinition::analog("temp", "C", 20.0, 0.0, 100.0)
            .with_writable(true)
            .with_noise(0.0),
        PointDefinition::analog("outdoor", "C", 10.0, -40.0, 60.0).with_noise(0.0),
    ];
    let registry = Arc::new(Registry::from_definitions(&defs, T0, 1));
    let clock = Arc::new(SimulationClock::new(
        registry.clone(),
        Arc::new(FixedTimeProvider::new(T0)),
        Duration::from_secs(1),
    ));
    let switch = Arc::new(TelemetrySwitch::default());
    let labels = ProjectionMaps::defaults(&defs).protocol_labels();

    let state = AppState::new(registry, clock.clone(), switch.clone(), labels);
    TestApp {
        router: create_api_routes(state),
        clock,
        switch,
    }
}

/// Helper to make JSON requests
async fn json_request(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = if let Some(json) = body {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap()
    } else {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    };

    let response = app.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let body: Value = if body_bytes.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(json!({}))
    };

    (status, body)
}

async fn point_value(app: &TestApp, name: &str) -> f64 {
    let (status, body) = json_request(&app.router, "GET", &format!("/points/{}", name), None).await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["value"].as_f64().unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app();
    let (status, body) = json_request(&app.router, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["service"], "simsrv");
}

#[tokio::test]
async fn test_status_counts_ticks() {
    let app = create_test_app();
    app.clock.tick();
    app.clock.tick();

    let (status, body) = json_request(&app.router, "GET", "/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["points"], 2);
    assert_eq!(body["data"]["ticks"], 2);
    assert_eq!(body["data"]["tick_ms"], 1000);
}

#[tokio::test]
async fn test_list_points_sorted_with_labels() {
    let app = create_test_app();
    let (status, body) = json_request(&app.router, "GET", "/points", None).await;

    assert_eq!(status, StatusCode::OK);
    let points = body["data"].as_array().unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0]["name"], "outdoor");
    assert_eq!(points[1]["name"], "temp");
    assert_eq!(points[1]["writable"], true);
    assert!(!points[1]["protocols"].as_array().unwrap().is_empty());
    assert_eq!(body["metadata"]["total"], 2);
}

#[tokio::test]
async fn test_unknown_point_is_404() {
    let app = create_test_app();

    let (status, body) = json_request(&app.router, "GET", "/points/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], 404);

    let (status, _) =
        json_request(&app.router, "POST", "/points/nope", Some(json!({"value": 1.0}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = json_request(
        &app.router,
        "POST",
        "/points/nope/fault",
        Some(json!({"type": "freeze"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_write_rejections_are_400() {
    let app = create_test_app();

    let (status, _) = json_request(
        &app.router,
        "POST",
        "/points/outdoor",
        Some(json!({"value": 5.0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for priority in [0, 17] {
        let (status, _) = json_request(
            &app.router,
            "POST",
            "/points/temp",
            Some(json!({"value": 5.0, "priority": priority})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_wide_priorities_get_error_envelope() {
    let app = create_test_app();

    for priority in [300, -1, 70_000] {
        let (status, body) = json_request(
            &app.router,
            "POST",
            "/points/temp",
            Some(json!({"value": 5.0, "priority": priority})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], 400);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains(&priority.to_string()));
    }

    let (status, body) =
        json_request(&app.router, "DELETE", "/points/temp/priority/300", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"]["message"].as_str().unwrap().contains("300"));

    let (status, body) =
        json_request(&app.router, "DELETE", "/points/temp/priority/high", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["field_errors"]["level"].is_array());

    let (_, body) = json_request(&app.router, "GET", "/points/temp", None).await;
    assert!(body["data"]["active_priority"].is_null());
}

#[tokio::test]
async fn test_priority_scenario() {
    let app = create_test_app();

    let (status, body) = json_request(
        &app.router,
        "POST",
        "/points/temp",
        Some(json!({"value": 50.0, "priority": 8})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["priority"], 8);
    app.clock.tick();
    assert_eq!(point_value(&app, "temp").await, 50.0);

    json_request(
        &app.router,
        "POST",
        "/points/temp",
        Some(json!({"value": 30.0, "priority": 10})),
    )
    .await;
    app.clock.tick();
    assert_eq!(point_value(&app, "temp").await, 50.0);

    let (status, body) = json_request(&app.router, "GET", "/points/temp", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["active_priority"], 8);
    assert_eq!(body["data"]["priority_array"][7], 50.0);
    assert_eq!(body["data"]["priority_array"][9], 30.0);

    let (status, _) = json_request(&app.router, "DELETE", "/points/temp/priority/8", None).await;
    assert_eq!(status, StatusCode::OK);
    app.clock.tick();
    assert_eq!(point_value(&app, "temp").await, 30.0);
}

#[tokio::test]
async fn test_default_write_priority_is_16() {
    let app = create_test_app();
    let (status, body) =
        json_request(&app.router, "POST", "/points/temp", Some(json!({"value": 42.0}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["priority"], 16);

    app.clock.tick();
    let (_, body) = json_request(&app.router, "GET", "/points/temp", None).await;
    assert_eq!(body["data"]["active_priority"], 16);
    assert_eq!(body["data"]["value"], 42.0);
}

#[tokio::test]
async fn test_fault_lifecycle() {
    let app = create_test_app();

    let (status, body) = json_request(
        &app.router,
        "POST",
        "/points/temp/fault",
        Some(json!({"type": "freeze", "value": 77.0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["fault"]["type"], "freeze");

    // Freeze outranks commands
    json_request(
        &app.router,
        "POST",
        "/points/temp",
        Some(json!({"value": 10.0, "priority": 1})),
    )
    .await;
    app.clock.tick();
    assert_eq!(point_value(&app, "temp").await, 77.0);

    let (status, _) = json_request(&app.router, "DELETE", "/points/temp/fault", None).await;
    assert_eq!(status, StatusCode::OK);
    app.clock.tick();
    assert_eq!(point_value(&app, "temp").await, 10.0);
}

#[tokio::test]
async fn test_unknown_fault_kind_is_400() {
    let app = create_test_app();
    let (status, body) = json_request(
        &app.router,
        "POST",
        "/points/temp/fault",
        Some(json!({"type": "melt"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 400);

    let (_, body) = json_request(&app.router, "GET", "/points/temp", None).await;
    assert!(body["data"]["fault"].is_null());
}

#[tokio::test]
async fn test_telemetry_toggle() {
    let app = create_test_app();

    let (status, body) = json_request(&app.router, "GET", "/telemetry", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["enabled"], true);

    let (status, body) =
        json_request(&app.router, "PUT", "/telemetry", Some(json!({"enabled": false}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["enabled"], false);
    assert_eq!(body["metadata"]["previous"], true);
    assert!(!app.switch.is_enabled());
}

#[tokio::test]
async fn test_empty_log_level_rejected() {
    let app = create_test_app();
    let (status, _) = json_request(
        &app.router,
        "PUT",
        "/admin/log-level",
        Some(json!({"level": "  "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
