//! HTTP API tests driven through the router without binding a socket

mod support;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use nucleares_exporter::{AppState, router};
use serde_json::{Value, json};
use std::sync::Arc;
use support::{FakeUpstream, SAMPLE_ROOT, exporter_with};
use tower::ServiceExt;

async fn app_with(upstream: Arc<FakeUpstream>, discover: bool) -> Router {
    let exporter = exporter_with(upstream);
    if discover {
        exporter.run_discovery().await.unwrap();
    }
    router(AppState::new(exporter), "public")
}

fn sample_upstream() -> Arc<FakeUpstream> {
    let upstream = FakeUpstream::new(SAMPLE_ROOT);
    upstream.set_value("PUMP_1_ON", "true");
    upstream.set_value("TEMP_1", "300,5");
    upstream
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, text) = send(app, request).await;
    (status, serde_json::from_str(&text).unwrap())
}

#[tokio::test]
async fn test_post_variables_listing() {
    let app = app_with(sample_upstream(), true).await;

    let (status, body) = get(&app, "/api/post-variables").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body, json!({ "variables": ["SET_PUMP_1", "SET_TEMP_1"] }));
}

#[tokio::test]
async fn test_post_variables_empty_before_discovery() {
    let app = app_with(sample_upstream(), false).await;

    let (_, body) = get(&app, "/api/post-variables").await;
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body, json!({ "variables": [] }));
}

#[tokio::test]
async fn test_post_variable_requires_both_fields() {
    let upstream = sample_upstream();
    let app = app_with(upstream.clone(), true).await;

    for body in [
        json!({ "variable": "SET_PUMP_1" }),
        json!({ "value": 1 }),
        json!({ "variable": "", "value": 1 }),
    ] {
        let (status, response) = post_json(&app, "/api/post-variable", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["ok"], json!(false));
        assert_eq!(response["error"], json!("variable and value are required"));
    }

    // Missing body entirely
    let (status, _) = send(
        &app,
        Request::post("/api/post-variable")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(upstream.writes().is_empty());
}

#[tokio::test]
async fn test_post_variable_forwards_value_text() {
    let upstream = sample_upstream();
    let app = app_with(upstream.clone(), true).await;

    let (status, response) = post_json(
        &app,
        "/api/post-variable",
        json!({ "variable": "SET_PUMP_1", "value": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({ "ok": true }));

    post_json(
        &app,
        "/api/post-variable",
        json!({ "variable": "SET_TEMP_1", "value": "55,5" }),
    )
    .await;

    // An explicit null is forwarded as text
    let (status, _) = post_json(
        &app,
        "/api/post-variable",
        json!({ "variable": "SET_TEMP_1", "value": null }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(
        upstream.writes(),
        vec![
            ("SET_PUMP_1".to_string(), "true".to_string()),
            ("SET_TEMP_1".to_string(), "55,5".to_string()),
            ("SET_TEMP_1".to_string(), "null".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_post_variable_upstream_rejection() {
    let upstream = sample_upstream();
    upstream.reject_writes_with(404);
    let app = app_with(upstream, true).await;

    let (status, response) = post_json(
        &app,
        "/api/post-variable",
        json!({ "variable": "READ_ONLY", "value": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response["ok"], json!(false));
    assert!(response["error"].as_str().unwrap().contains("404"));
}

#[tokio::test]
async fn test_reactor_state_and_control() {
    let app = app_with(sample_upstream(), false).await;

    let (status, body) = get(&app, "/api/state").await;
    assert_eq!(status, StatusCode::OK);
    let state: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(state["powerLevel"], json!(0.75));
    assert_eq!(state["status"], json!("nominal"));

    let (status, response) =
        post_json(&app, "/api/control", json!({ "powerLevel": 1.4 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["ok"], json!(true));
    assert_eq!(response["reactorState"]["powerLevel"], json!(1.0));
    assert_eq!(response["reactorState"]["status"], json!("adjusting"));

    let (_, body) = get(&app, "/api/state").await;
    let state: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(state["powerLevel"], json!(1.0));
}

#[tokio::test]
async fn test_control_rejects_non_numeric_power_level() {
    let app = app_with(sample_upstream(), false).await;

    for body in [json!({ "powerLevel": "high" }), json!({})] {
        let (status, response) = post_json(&app, "/api/control", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"], json!("Invalid powerLevel"));
    }
}

#[tokio::test]
async fn test_metrics_scrape_refreshes_gauges() {
    let upstream = sample_upstream();
    let app = app_with(upstream.clone(), true).await;

    upstream.set_value("TEMP_1", "301,25");
    get(&app, "/api/post-variables").await;

    let (status, body) = get(&app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("# TYPE nucleares_pump_1_on gauge"));
    assert!(body.contains(r#"nucleares_pump_1_on{variable="PUMP_1_ON"} 1"#));
    assert!(body.contains(r#"nucleares_temp_1{variable="TEMP_1"} 301.25"#));
    assert!(body.contains(
        r#"nucleares_http_requests_total{method="GET",route="/api/post-variables",status="200"} 1"#
    ));
}

#[tokio::test]
async fn test_metrics_content_type() {
    let app = app_with(sample_upstream(), false).await;

    let response = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("application/openmetrics-text"));
}

#[tokio::test]
async fn test_metrics_scrape_while_offline() {
    let upstream = sample_upstream();
    let app = app_with(upstream.clone(), true).await;

    upstream.set_offline(true);
    upstream.set_value("TEMP_1", "999");

    let (status, body) = get(&app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"nucleares_temp_1{variable="TEMP_1"} 300.5"#));
}

#[tokio::test]
async fn test_discovery_endpoints() {
    let upstream = sample_upstream();
    let app = app_with(upstream.clone(), false).await;

    let (_, body) = get(&app, "/api/discovery").await;
    let status: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(status["initialised"], json!(false));
    assert_eq!(status["status"]["state"], json!("pending"));

    let (code, response) = post_json(&app, "/api/discover", json!({})).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(response["variables"], json!(["PUMP_1_ON", "TEMP_1"]));
    assert_eq!(response["postVariables"], json!(["SET_PUMP_1", "SET_TEMP_1"]));

    let (_, body) = get(&app, "/api/discovery").await;
    let status: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(status["initialised"], json!(true));
    assert_eq!(status["status"]["state"], json!("ready"));
    assert_eq!(status["status"]["get_variables"], json!(2));

    upstream.set_offline(true);
    let (code, _) = post_json(&app, "/api/discover", json!({})).await;
    assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_variables_listing() {
    let app = app_with(sample_upstream(), true).await;

    let (_, body) = get(&app, "/api/variables").await;
    let body: Value = serde_json::from_str(&body).unwrap();
    let variables = body["variables"].as_array().unwrap();
    assert_eq!(variables.len(), 2);
    assert_eq!(variables[0]["name"], json!("PUMP_1_ON"));
    assert_eq!(variables[0]["kind"], json!("boolean"));
    assert_eq!(variables[1]["metric_name"], json!("nucleares_temp_1"));
    assert_eq!(variables[1]["value"], json!(300.5));
}

#[tokio::test]
async fn test_unknown_path_falls_through_to_static_files() {
    let app = app_with(sample_upstream(), false).await;

    let (status, _) = get(&app, "/no-such-asset.js").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = get(&app, "/metrics").await;
    assert!(!body.contains(r#"route="/no-such-asset.js""#));
}
