//! Nucleares exporter
//!
//! Polls the Nucleares webserver's plain-text variable endpoint and
//! republishes every discovered variable as a Prometheus gauge, next to a
//! small control API for writing variables back.
//!
//! # Components
//!
//! - **Exporter**: owns discovered variables, POST names and readiness state;
//!   runs discovery, refresh and control writes
//! - **MetricsRegistry**: request counter plus runtime-registered variable gauges
//! - **HttpServer**: `/metrics`, `/api/*` and static files
//!
//! There is no background polling loop. Discovery runs once at startup, and
//! each `/metrics` scrape refreshes every known variable before encoding.

pub mod config;
pub mod control;
pub mod exporter;
pub mod http_server;
pub mod metrics;
pub mod server;
pub mod telemetry;
pub mod types;

pub use config::{Config, ConfigError};
pub use exporter::Exporter;
pub use http_server::{AppState, HttpServer, router};
pub use metrics::MetricsRegistry;
pub use server::{ExporterServer, spawn_discovery};
pub use telemetry::{TelemetryGuard, init_telemetry, setup_tracing_with_otel};
pub use types::{
    DiscoveryOutcome, DiscoveryReport, DiscoveryStatus, ExporterSettings, RefreshOutcome,
    VariableSnapshot,
};
