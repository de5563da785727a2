//! Main exporter server implementation.

use crate::exporter::Exporter;
use crate::http_server::{AppState, HttpServer};
use crate::metrics::MetricsRegistry;
use crate::types::ExporterSettings;
use nucleares::HttpUpstream;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Nucleares exporter server
pub struct ExporterServer {
    settings: ExporterSettings,
}

impl ExporterServer {
    /// Create a new exporter server
    pub fn new(settings: ExporterSettings) -> Self {
        Self { settings }
    }

    /// Build the shared exporter context
    pub fn build_exporter(&self) -> common::Result<Arc<Exporter>> {
        let upstream = HttpUpstream::new(
            self.settings.upstream_url.clone(),
            self.settings.probe_timeout,
            self.settings.request_timeout,
        )?;
        let metrics = Arc::new(MetricsRegistry::new());

        Ok(Arc::new(Exporter::new(
            Arc::new(upstream),
            metrics,
            self.settings.probe_before_refresh,
        )))
    }

    /// Run the server
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!(upstream = %self.settings.upstream_url, "Starting Nucleares exporter");

        let exporter = self.build_exporter()?;
        let _discovery = spawn_discovery(exporter.clone());

        let server = HttpServer::new(
            AppState::new(exporter),
            self.settings.listen_addr.clone(),
            self.settings.static_dir.clone(),
        );
        server.run().await?;

        info!("Nucleares exporter stopped");
        Ok(())
    }
}

/// Run discovery once in the background.
///
/// The outcome lands in [`Exporter::discovery_status`].
pub fn spawn_discovery(exporter: Arc<Exporter>) -> JoinHandle<()> {
    tokio::spawn(async move {
        // Failures are logged and recorded by run_discovery
        let _ = exporter.run_discovery().await;
    })
}
