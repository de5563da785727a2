//! Shared test helpers: a scriptable in-memory Nucleares webserver

#![allow(dead_code)]

use async_trait::async_trait;
use common::{Error, Result};
use nucleares::Upstream;
use nucleares_exporter::{Exporter, MetricsRegistry};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const SAMPLE_ROOT: &str = r#"<html><body>
<h2>==== GET ====</h2>
<a href="/?variable=PUMP_1_ON">PUMP_1_ON</a><br>
<a href="/?variable=TEMP_1">TEMP_1</a><br>
<h2>==== POST ====</h2>
<b>SET_PUMP_1</b><br>
<b>SET_TEMP_1</b><br>
</body></html>"#;

/// In-memory upstream whose answers can be changed between calls
#[derive(Default)]
pub struct FakeUpstream {
    offline: AtomicBool,
    root: Mutex<String>,
    /// `None` makes the fetch fail with a 500
    values: Mutex<HashMap<String, Option<String>>>,
    write_status: Mutex<Option<u16>>,
    writes: Mutex<Vec<(String, String)>>,
    fetches: AtomicUsize,
}

impl FakeUpstream {
    pub fn new(root: &str) -> Arc<Self> {
        let fake = Self::default();
        *fake.root.lock().unwrap() = root.to_string();
        Arc::new(fake)
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_root(&self, root: &str) {
        *self.root.lock().unwrap() = root.to_string();
    }

    pub fn set_value(&self, name: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(name.to_string(), Some(value.to_string()));
    }

    pub fn fail_variable(&self, name: &str) {
        self.values.lock().unwrap().insert(name.to_string(), None);
    }

    pub fn reject_writes_with(&self, status: u16) {
        *self.write_status.lock().unwrap() = Some(status);
    }

    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn url(name: &str) -> String {
        format!("http://fake-nucleares/?variable={}", name)
    }
}

#[async_trait]
impl Upstream for FakeUpstream {
    async fn probe(&self) -> bool {
        !self.offline.load(Ordering::SeqCst)
    }

    async fn fetch_root(&self) -> Result<String> {
        Ok(self.root.lock().unwrap().clone())
    }

    async fn fetch_variable(&self, name: &str) -> Result<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.values.lock().unwrap().get(name) {
            Some(Some(value)) => Ok(value.clone()),
            Some(None) => Err(Error::status(Self::url(name), 500, "Internal Server Error")),
            None => Err(Error::status(Self::url(name), 404, "Not Found")),
        }
    }

    async fn set_variable(&self, name: &str, value: &str) -> Result<()> {
        if let Some(status) = *self.write_status.lock().unwrap() {
            return Err(Error::status(Self::url(name), status, "Not Found"));
        }
        self.writes
            .lock()
            .unwrap()
            .push((name.to_string(), value.to_string()));
        Ok(())
    }
}

/// Exporter wired to a fake upstream with probing enabled
pub fn exporter_with(upstream: Arc<FakeUpstream>) -> Arc<Exporter> {
    Arc::new(Exporter::new(
        upstream,
        Arc::new(MetricsRegistry::new()),
        true,
    ))
}
