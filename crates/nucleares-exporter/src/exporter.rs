//! Exporter context: variable discovery, metric refresh and control writes.

use crate::metrics::{MetricsRegistry, VariableGauge, set_variable_gauge};
use crate::types::{
    DiscoveryOutcome, DiscoveryReport, DiscoveryStatus, RefreshOutcome, VariableSnapshot,
};
use common::Result;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::join_all;
use nucleares::{ParsedValue, Upstream, VariableKind, metric_name, parse_root_document, parse_value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// State for a single discovered variable
struct RemoteVariable {
    metric_name: String,
    kind: VariableKind,
    gauge: VariableGauge,
    value: Option<f64>,
}

impl RemoteVariable {
    fn set(&mut self, name: &str, value: f64) {
        set_variable_gauge(&self.gauge, name, value);
        self.value = Some(value);
    }

    /// Apply a new reading. Returns whether the gauge changed.
    ///
    /// A boolean variable that reads as a number is upgraded to number for
    /// good; it never goes back to boolean.
    fn apply(&mut self, name: &str, reading: &ParsedValue) -> bool {
        match (self.kind, reading) {
            (VariableKind::Boolean, ParsedValue::Boolean(b)) => {
                self.set(name, if *b { 1.0 } else { 0.0 });
                true
            }
            (VariableKind::Boolean, ParsedValue::Number(n)) => {
                info!(variable = %name, value = *n, "Upgrading Nucleares variable from boolean to number");
                self.kind = VariableKind::Number;
                self.set(name, *n);
                true
            }
            (VariableKind::Number, ParsedValue::Number(n)) => {
                self.set(name, *n);
                true
            }
            _ => false,
        }
    }
}

/// Owns all discovery and refresh state
pub struct Exporter {
    upstream: Arc<dyn Upstream>,
    metrics: Arc<MetricsRegistry>,
    variables: DashMap<String, RemoteVariable>,
    post_variables: RwLock<Vec<String>>,
    initialised: AtomicBool,
    status: RwLock<DiscoveryStatus>,
    probe_before_refresh: bool,
}

impl Exporter {
    /// Create a new exporter
    pub fn new(
        upstream: Arc<dyn Upstream>,
        metrics: Arc<MetricsRegistry>,
        probe_before_refresh: bool,
    ) -> Self {
        Self {
            upstream,
            metrics,
            variables: DashMap::new(),
            post_variables: RwLock::new(Vec::new()),
            initialised: AtomicBool::new(false),
            status: RwLock::new(DiscoveryStatus::Pending),
            probe_before_refresh,
        }
    }

    /// Metrics registry shared with the HTTP layer
    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Whether GET discovery has completed at least once
    pub fn is_initialised(&self) -> bool {
        self.initialised.load(Ordering::Acquire)
    }

    /// Outcome of the most recent [`Exporter::run_discovery`]
    pub fn discovery_status(&self) -> DiscoveryStatus {
        self.status
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Writable variable names from the last POST section seen
    pub fn post_variables(&self) -> Vec<String> {
        self.post_variables
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of known GET variables
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Current view of one variable
    pub fn variable(&self, name: &str) -> Option<VariableSnapshot> {
        self.variables.get(name).map(|entry| VariableSnapshot {
            name: name.to_string(),
            metric_name: entry.metric_name.clone(),
            kind: entry.kind,
            value: entry.value,
        })
    }

    /// Current view of every variable, sorted by name
    pub fn variables(&self) -> Vec<VariableSnapshot> {
        let mut snapshots: Vec<VariableSnapshot> = self
            .variables
            .iter()
            .map(|entry| VariableSnapshot {
                name: entry.key().clone(),
                metric_name: entry.metric_name.clone(),
                kind: entry.kind,
                value: entry.value,
            })
            .collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }

    /// Discover variables from the root document.
    ///
    /// Per-variable failures are logged and skipped. Errors are returned only
    /// when the root document cannot be fetched or has no GET section; prior
    /// state is untouched in that case.
    pub async fn discover(&self) -> Result<DiscoveryOutcome> {
        if !self.upstream.probe().await {
            warn!("Nucleares webserver offline, skipping discovery");
            return Ok(DiscoveryOutcome::Offline);
        }

        let text = self.upstream.fetch_root().await?;
        let document = parse_root_document(&text)?;

        let mut report = DiscoveryReport {
            found: document.get_variables.clone(),
            ..Default::default()
        };

        for name in document.get_variables {
            match self.register_variable(&name).await {
                Ok(kind) => {
                    debug!(variable = %name, kind = %kind, "Registered Nucleares variable");
                    report.registered.push(name);
                }
                Err(e) => {
                    warn!(variable = %name, error = %e, "Failed to register Nucleares variable");
                    report.failed.push(name);
                }
            }
        }

        if let Some(post_variables) = document.post_variables {
            *self
                .post_variables
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner()) = post_variables.clone();
            report.post_variables = Some(post_variables);
        }

        self.initialised.store(true, Ordering::Release);

        info!(
            get_variables = self.variables.len(),
            post_variables = report.post_variables.as_ref().map_or(0, Vec::len),
            failed = report.failed.len(),
            "Discovered Nucleares variables"
        );

        Ok(DiscoveryOutcome::Completed(report))
    }

    /// Run discovery and record its outcome in [`Exporter::discovery_status`].
    pub async fn run_discovery(&self) -> Result<DiscoveryOutcome> {
        let result = self.discover().await;

        let status = match &result {
            Ok(DiscoveryOutcome::Completed(_)) => DiscoveryStatus::Ready {
                get_variables: self.variables.len(),
                post_variables: self.post_variables().len(),
            },
            Ok(DiscoveryOutcome::Offline) => DiscoveryStatus::Offline,
            Err(e) => {
                warn!(error = %e, "Nucleares variable discovery failed");
                DiscoveryStatus::Failed {
                    error: e.to_string(),
                }
            }
        };

        *self
            .status
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = status;

        result
    }

    /// Fetch a variable's value, register its gauge and record its kind.
    ///
    /// A variable that is already known keeps its gauge and kind; the reading
    /// is applied to it like a refresh, so an upgrade to number sticks.
    async fn register_variable(&self, name: &str) -> Result<VariableKind> {
        let text = self.upstream.fetch_variable(name).await?;
        let reading = parse_value(&text);

        match self.variables.entry(name.to_string()) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().apply(name, &reading);
                Ok(entry.get().kind)
            }
            Entry::Vacant(entry) => {
                let gauge = self.metrics.register_variable(name);
                let mut variable = RemoteVariable {
                    metric_name: metric_name(name),
                    kind: reading.kind(),
                    gauge,
                    value: None,
                };
                if let Some(value) = reading.gauge_value() {
                    variable.set(name, value);
                }

                let kind = variable.kind;
                entry.insert(variable);
                Ok(kind)
            }
        }
    }

    /// Poll every known variable and update its gauge.
    ///
    /// Fetches run concurrently; one failure never affects the others.
    pub async fn refresh(&self) -> RefreshOutcome {
        if !self.is_initialised() || self.variables.is_empty() {
            return RefreshOutcome::NotReady;
        }

        if self.probe_before_refresh && !self.upstream.probe().await {
            debug!("Nucleares webserver offline, keeping last known values");
            return RefreshOutcome::Offline;
        }

        let names: Vec<String> = self
            .variables
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        let readings = join_all(names.into_iter().map(|name| async move {
            let result = self.upstream.fetch_variable(&name).await;
            (name, result)
        }))
        .await;

        let (mut updated, mut skipped, mut failed) = (0, 0, 0);
        for (name, result) in readings {
            match result {
                Ok(text) => {
                    let reading = parse_value(&text);
                    let changed = self
                        .variables
                        .get_mut(&name)
                        .map(|mut variable| variable.apply(&name, &reading))
                        .unwrap_or(false);
                    if changed {
                        updated += 1;
                    } else {
                        skipped += 1;
                    }
                }
                Err(e) => {
                    warn!(variable = %name, error = %e, "Failed to refresh Nucleares variable");
                    failed += 1;
                }
            }
        }

        debug!(updated, skipped, failed, "Refreshed Nucleares metrics");
        RefreshOutcome::Refreshed {
            updated,
            skipped,
            failed,
        }
    }

    /// Forward a write to the webserver. No retries.
    pub async fn set_variable(&self, name: &str, value: &str) -> Result<()> {
        match self.upstream.set_variable(name, value).await {
            Ok(()) => {
                info!(variable = %name, value = %value, "Set Nucleares variable");
                Ok(())
            }
            Err(e) => {
                warn!(variable = %name, error = %e, "Failed to set Nucleares variable");
                Err(e)
            }
        }
    }
}
