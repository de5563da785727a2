//! Prometheus metrics for the Nucleares exporter.
//!
//! Variable gauges are discovered at runtime, so they live outside the
//! static [`Registry`] and are encoded by a [`Collector`] on every scrape.
//! Process metrics are sampled the same way.

use dashmap::DashMap;
use nucleares::metric_name;
use prometheus_client::collector::Collector;
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{
    DescriptorEncoder, EncodeLabelSet, EncodeLabelValue, EncodeMetric, LabelValueEncoder,
};
use prometheus_client::metrics::MetricType;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::{ConstGauge, Gauge};
use prometheus_client::registry::Registry;
use std::fmt::{self, Write};
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Labels for the request counter
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    /// HTTP method
    pub method: String,
    /// Request path
    pub route: String,
    /// Response status code
    pub status: String,
}

/// Labels for variable gauges
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct VariableLabels {
    /// Raw Nucleares variable name
    pub variable: VariableName,
}

/// Variable name as a label value, escaped on encode
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct VariableName(pub String);

impl EncodeLabelValue for VariableName {
    fn encode(&self, encoder: &mut LabelValueEncoder) -> Result<(), fmt::Error> {
        encoder.write_str(&escape_text(&self.0))
    }
}

/// Escape backslash, double quote and line feed for the exposition format.
///
/// Names are percent-decoded from the root document, so they may contain
/// any of these.
pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Gauge handle for one Nucleares variable
pub type VariableGauge = Family<VariableLabels, Gauge<f64, AtomicU64>>;

#[derive(Debug, Clone)]
struct RegisteredGauge {
    help: String,
    gauge: VariableGauge,
}

/// Variable gauges keyed by metric name.
///
/// Append-only. Registering a name again replaces the previous gauge.
#[derive(Debug, Default)]
struct VariableCollector {
    gauges: DashMap<String, RegisteredGauge>,
}

impl Collector for VariableCollector {
    fn encode(&self, mut encoder: DescriptorEncoder) -> Result<(), fmt::Error> {
        let mut gauges: Vec<(String, RegisteredGauge)> = self
            .gauges
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        gauges.sort_by(|a, b| a.0.cmp(&b.0));

        for (name, registered) in &gauges {
            let metric_encoder =
                encoder.encode_descriptor(name, &registered.help, None, MetricType::Gauge)?;
            registered.gauge.encode(metric_encoder)?;
        }

        Ok(())
    }
}

/// Metrics registry with all exporter metrics
pub struct MetricsRegistry {
    /// Prometheus registry
    pub registry: Registry,

    /// Requests served by the HTTP front door
    http_requests_total: Family<RequestLabels, Counter>,

    /// Runtime-registered variable gauges
    variables: Arc<VariableCollector>,
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("variable_gauges", &self.variables.gauges.len())
            .finish()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Shares one collector between the registry and the exporter.
#[derive(Debug)]
struct SharedCollector(Arc<VariableCollector>);

impl Collector for SharedCollector {
    fn encode(&self, encoder: DescriptorEncoder) -> Result<(), fmt::Error> {
        self.0.encode(encoder)
    }
}

impl MetricsRegistry {
    /// Create a new metrics registry
    pub fn new() -> Self {
        let mut registry = Registry::default();

        // Text encoding appends the `_total` suffix
        let http_requests_total = Family::<RequestLabels, Counter>::default();
        registry.register(
            "nucleares_http_requests",
            "Total number of HTTP requests",
            http_requests_total.clone(),
        );

        let variables = Arc::new(VariableCollector::default());
        registry.register_collector(Box::new(SharedCollector(variables.clone())));
        registry.register_collector(Box::new(ProcessCollector::new()));

        Self {
            registry,
            http_requests_total,
            variables,
        }
    }

    /// Record a served HTTP request
    pub fn record_request(&self, method: &str, route: &str, status: u16) {
        self.http_requests_total
            .get_or_create(&RequestLabels {
                method: method.to_string(),
                route: route.to_string(),
                status: status.to_string(),
            })
            .inc();
    }

    /// Register a fresh gauge for a variable and return its handle.
    ///
    /// A later registration under the same metric name (the same variable,
    /// or another one that sanitizes identically) silently replaces this one.
    pub fn register_variable(&self, variable: &str) -> VariableGauge {
        let gauge = VariableGauge::default();
        self.variables.gauges.insert(
            metric_name(variable),
            RegisteredGauge {
                help: format!("Nucleares variable {}.", escape_text(variable)),
                gauge: gauge.clone(),
            },
        );
        gauge
    }

    /// Number of distinct variable metric names
    pub fn variable_metric_count(&self) -> usize {
        self.variables.gauges.len()
    }

    /// Encode every metric in the text exposition format
    pub fn encode(&self) -> Result<String, fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

/// Set a variable gauge's value
pub fn set_variable_gauge(gauge: &VariableGauge, variable: &str, value: f64) {
    gauge
        .get_or_create(&VariableLabels {
            variable: VariableName(variable.to_string()),
        })
        .set(value);
}

/// Resource usage of the exporter process, sampled on every scrape.
///
/// Linux, macOS and Windows are covered; elsewhere nothing is emitted.
struct ProcessCollector {
    pid: Option<Pid>,
    system: Mutex<System>,
}

impl ProcessCollector {
    fn new() -> Self {
        Self {
            pid: sysinfo::get_current_pid().ok(),
            system: Mutex::new(System::new()),
        }
    }
}

impl fmt::Debug for ProcessCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessCollector")
            .field("pid", &self.pid)
            .finish()
    }
}

impl Collector for ProcessCollector {
    fn encode(&self, mut encoder: DescriptorEncoder) -> Result<(), fmt::Error> {
        let Some(pid) = self.pid else {
            return Ok(());
        };

        let mut system = self
            .system
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            ProcessRefreshKind::new().with_cpu().with_memory(),
        );
        let Some(process) = system.process(pid) else {
            return Ok(());
        };

        let samples = [
            (
                "process_cpu_usage_percent",
                "CPU usage of the process since the previous scrape.",
                f64::from(process.cpu_usage()),
            ),
            (
                "process_resident_memory_bytes",
                "Resident memory size in bytes.",
                process.memory() as f64,
            ),
            (
                "process_virtual_memory_bytes",
                "Virtual memory size in bytes.",
                process.virtual_memory() as f64,
            ),
            (
                "process_start_time_seconds",
                "Start time of the process since unix epoch in seconds.",
                process.start_time() as f64,
            ),
        ];

        for (name, help, value) in samples {
            let metric_encoder = encoder.encode_descriptor(name, help, None, MetricType::Gauge)?;
            ConstGauge::new(value).encode(metric_encoder)?;
        }

        Ok(())
    }
}
