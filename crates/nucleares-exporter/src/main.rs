//! Nucleares exporter binary

use nucleares_exporter::{Config, ExporterServer, setup_tracing_with_otel};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration first (needed for logging settings)
    let (config, fallback) = match Config::load() {
        Ok(cfg) => (cfg, None),
        Err(e) => {
            // Can't use tracing yet - not initialized
            eprintln!("Configuration error: {}", e);
            let (upstream_url, port) = Config::env_overrides();
            let (cfg, rejected) = Config::fallback(upstream_url, port);
            for err in &rejected {
                eprintln!("Ignoring override: {}", err);
            }
            (cfg, Some(e))
        }
    };

    let log_level = config.logging.level.as_deref().unwrap_or("info");

    let _telemetry_guard = setup_tracing_with_otel(
        &config.telemetry.service_name,
        &config.telemetry.otlp_endpoint,
        config.telemetry.enabled,
        log_level,
        config.logging.is_json(),
    )?;

    if let Some(e) = fallback {
        tracing::warn!(
            error = %e,
            upstream = %config.upstream.url,
            listen_addr = %config.http.listen_addr,
            "Using default configuration with environment overrides"
        );
    }

    let server = ExporterServer::new(config.to_exporter_settings());
    server.run().await?;

    // Telemetry guard will flush spans on drop

    Ok(())
}
