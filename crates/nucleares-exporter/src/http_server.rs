//! HTTP front door: metrics endpoint, control API and static files.

use crate::control::ReactorState;
use crate::exporter::Exporter;
use crate::metrics::MetricsRegistry;
use crate::types::DiscoveryOutcome;
use axum::{
    Json, Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub exporter: Arc<Exporter>,
    pub metrics: Arc<MetricsRegistry>,
    pub reactor: Arc<Mutex<ReactorState>>,
}

impl AppState {
    /// Create handler state around an exporter
    pub fn new(exporter: Arc<Exporter>) -> Self {
        let metrics = exporter.metrics().clone();
        Self {
            exporter,
            metrics,
            reactor: Arc::new(Mutex::new(ReactorState::default())),
        }
    }
}

/// Body of `POST /api/post-variable`
#[derive(Debug, Deserialize)]
pub struct SetVariableRequest {
    pub variable: Option<String>,
    /// `None` only when the key is absent; an explicit `null` is kept
    #[serde(default, deserialize_with = "present")]
    pub value: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Body of `POST /api/control`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlRequest {
    pub power_level: Option<Value>,
}

/// HTTP server for the exporter
pub struct HttpServer {
    state: AppState,
    listen_addr: String,
    static_dir: String,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(state: AppState, listen_addr: String, static_dir: String) -> Self {
        Self {
            state,
            listen_addr,
            static_dir,
        }
    }

    /// Run the HTTP server until Ctrl-C
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let app = router(self.state, &self.static_dir);

        let listener = TcpListener::bind(&self.listen_addr).await?;
        info!(listen_addr = %self.listen_addr, "Nucleares exporter and control server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

/// Build the router
pub fn router(state: AppState, static_dir: &str) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/api/state", get(get_state_handler))
        .route("/api/control", post(control_handler))
        .route("/api/post-variables", get(post_variables_handler))
        .route("/api/post-variable", post(set_variable_handler))
        .route("/api/variables", get(variables_handler))
        .route("/api/discovery", get(discovery_status_handler))
        .route("/api/discover", post(discover_handler))
        // Static files are not counted
        .route_layer(middleware::from_fn_with_state(state.clone(), count_requests))
        .fallback_service(ServeDir::new(static_dir))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Count every request once its response is ready
async fn count_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let route = request.uri().path().to_string();

    let response = next.run(request).await;
    state
        .metrics
        .record_request(&method, &route, response.status().as_u16());
    response
}

/// Handler for /metrics endpoint
async fn metrics_handler(State(state): State<AppState>) -> Response {
    state.exporter.refresh().await;

    match state.metrics.encode() {
        Ok(buffer) => (
            StatusCode::OK,
            [(
                "content-type",
                "application/openmetrics-text; version=1.0.0; charset=utf-8",
            )],
            buffer,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
                .into_response()
        }
    }
}

async fn get_state_handler(State(state): State<AppState>) -> Json<ReactorState> {
    let mut reactor = state
        .reactor
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    reactor.touch();
    Json(reactor.clone())
}

async fn control_handler(
    State(state): State<AppState>,
    body: Option<Json<ControlRequest>>,
) -> Response {
    let power_level = body.and_then(|Json(request)| request.power_level.and_then(|v| v.as_f64()));
    let Some(power_level) = power_level else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "ok": false, "error": "Invalid powerLevel" })),
        )
            .into_response();
    };

    let mut reactor = state
        .reactor
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    reactor.set_power_level(power_level);
    Json(json!({ "ok": true, "reactorState": *reactor })).into_response()
}

async fn post_variables_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "variables": state.exporter.post_variables() }))
}

async fn set_variable_handler(
    State(state): State<AppState>,
    body: Option<Json<SetVariableRequest>>,
) -> Response {
    let (variable, value) = match body {
        Some(Json(SetVariableRequest {
            variable: Some(variable),
            value: Some(value),
        })) if !variable.is_empty() => (variable, value_text(&value)),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "ok": false, "error": "variable and value are required" })),
            )
                .into_response();
        }
    };

    match state.exporter.set_variable(&variable, &value).await {
        Ok(()) => Json(json!({ "ok": true })).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "ok": false, "error": e.to_string() })),
        )
            .into_response(),
    }
}

async fn variables_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "variables": state.exporter.variables() }))
}

async fn discovery_status_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "initialised": state.exporter.is_initialised(),
        "status": state.exporter.discovery_status(),
    }))
}

async fn discover_handler(State(state): State<AppState>) -> Response {
    match state.exporter.run_discovery().await {
        Ok(DiscoveryOutcome::Completed(report)) => Json(json!({
            "ok": true,
            "variables": report.registered,
            "failed": report.failed,
            "postVariables": state.exporter.post_variables(),
        }))
        .into_response(),
        Ok(DiscoveryOutcome::Offline) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "ok": false, "error": "Nucleares webserver offline" })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "ok": false, "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// Text form of a JSON value as sent upstream
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
