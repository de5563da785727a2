//! Tracing setup with optional OpenTelemetry export
//!
//! Logs always go to stdout through `tracing-subscriber`. When telemetry is
//! enabled, spans are additionally exported to an OTLP collector over gRPC.

use opentelemetry::{KeyValue, trace::TracerProvider as _};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource, runtime,
    trace::{RandomIdGenerator, Sampler, Tracer, TracerProvider},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// OpenTelemetry tracer guard
///
/// When dropped, flushes all pending spans and shuts down the tracer
pub struct TelemetryGuard;

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        opentelemetry::global::shutdown_tracer_provider();
    }
}

/// Initialize OpenTelemetry tracing with OTLP exporter
///
/// # Arguments
///
/// * `service_name` - Name of the service (e.g., "nucleares-exporter")
/// * `otlp_endpoint` - OTLP collector endpoint (e.g., "http://localhost:4317")
/// * `enabled` - Whether to enable OpenTelemetry tracing
///
/// # Returns
///
/// The guard and the tracer to plug into the subscriber. The guard must be
/// kept alive for the duration of the program.
pub fn init_telemetry(
    service_name: &str,
    otlp_endpoint: &str,
    enabled: bool,
) -> Result<Option<(TelemetryGuard, Tracer)>, Box<dyn std::error::Error>> {
    if !enabled {
        return Ok(None);
    }

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(otlp_endpoint)
        .build()?;

    let resource = Resource::new(vec![
        KeyValue::new("service.name", service_name.to_string()),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION").to_string()),
    ]);

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_config(
            opentelemetry_sdk::trace::Config::default()
                .with_sampler(Sampler::AlwaysOn)
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(resource),
        )
        .build();

    let tracer = provider.tracer("nucleares-exporter");
    opentelemetry::global::set_tracer_provider(provider);

    Ok(Some((TelemetryGuard, tracer)))
}

/// Setup tracing-subscriber, with an OpenTelemetry layer when enabled
pub fn setup_tracing_with_otel(
    service_name: &str,
    otlp_endpoint: &str,
    enabled: bool,
    log_level: &str,
    json: bool,
) -> Result<Option<TelemetryGuard>, Box<dyn std::error::Error>> {
    let Some((guard, tracer)) = init_telemetry(service_name, otlp_endpoint, enabled)? else {
        if json {
            common::logging::init_json(log_level);
        } else {
            common::logging::init(log_level);
        }
        tracing::info!("Tracing initialized without OpenTelemetry");
        return Ok(None);
    };

    let (text_layer, json_layer) = if json {
        (None, Some(fmt::layer().json()))
    } else {
        (Some(fmt::layer()), None)
    };

    tracing_subscriber::registry()
        .with(common::logging::env_filter(log_level))
        .with(text_layer)
        .with(json_layer)
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .init();

    tracing::info!(
        service_name = service_name,
        otlp_endpoint = otlp_endpoint,
        "Tracing initialized with OpenTelemetry integration"
    );

    Ok(Some(guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_disabled() {
        let result = init_telemetry("test-service", "http://localhost:4317", false);
        assert!(result.is_ok());
        assert!(result.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_telemetry_enabled_builds_tracer() {
        // The gRPC channel connects lazily, so no collector is needed
        let result = init_telemetry("test-service", "http://127.0.0.1:4317", true).unwrap();
        let (guard, _tracer) = result.expect("telemetry should be enabled");

        // Shutting down would try to flush to the missing collector
        std::mem::forget(guard);
    }
}
