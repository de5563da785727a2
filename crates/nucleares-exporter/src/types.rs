//! Types for the exporter service.

use nucleares::VariableKind;
use serde::Serialize;
use std::time::Duration;

/// Runtime settings for the exporter service
#[derive(Debug, Clone)]
pub struct ExporterSettings {
    /// Base URL of the Nucleares webserver
    pub upstream_url: String,

    /// Deadline for liveness probes
    pub probe_timeout: Duration,

    /// Deadline for data and control requests
    pub request_timeout: Duration,

    /// Probe the webserver before each refresh cycle
    pub probe_before_refresh: bool,

    /// HTTP listen address
    pub listen_addr: String,

    /// Directory served for unmatched paths
    pub static_dir: String,
}

impl Default for ExporterSettings {
    fn default() -> Self {
        Self {
            upstream_url: "http://localhost:8785".to_string(),
            probe_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(8),
            probe_before_refresh: true,
            listen_addr: "0.0.0.0:3000".to_string(),
            static_dir: "public".to_string(),
        }
    }
}

/// Outcome of the most recent discovery run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DiscoveryStatus {
    /// Discovery has not finished yet
    Pending,
    /// GET processing completed
    Ready {
        get_variables: usize,
        post_variables: usize,
    },
    /// The webserver did not answer the probe
    Offline,
    /// Discovery aborted
    Failed { error: String },
}

/// Result of a discovery run that reached the webserver
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryOutcome {
    /// Probe failed; nothing was changed
    Offline,
    /// GET section processed
    Completed(DiscoveryReport),
}

/// Summary of a completed discovery run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryReport {
    /// Names found in the GET section, in order
    pub found: Vec<String>,

    /// Names whose registration succeeded
    pub registered: Vec<String>,

    /// Names whose initial fetch failed
    pub failed: Vec<String>,

    /// POST names, when a POST section was present
    pub post_variables: Option<Vec<String>>,
}

/// Result of one refresh cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Discovery has never completed or found nothing
    NotReady,
    /// Probe failed; gauges keep their last values
    Offline,
    /// Every variable was polled
    Refreshed {
        updated: usize,
        skipped: usize,
        failed: usize,
    },
}

/// Point-in-time view of a discovered variable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableSnapshot {
    pub name: String,
    pub metric_name: String,
    pub kind: VariableKind,
    pub value: Option<f64>,
}
