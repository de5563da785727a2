//! Upstream access to the Nucleares webserver.

use async_trait::async_trait;
use common::{Error, Result};
use reqwest::{RequestBuilder, Response};
use std::time::Duration;
use tracing::{debug, warn};

/// Default deadline for liveness probes
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Default deadline for data and control requests
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

/// Operations the exporter needs from the Nucleares webserver
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Whether the webserver answers at all
    async fn probe(&self) -> bool;

    /// Fetch the root document listing every variable
    async fn fetch_root(&self) -> Result<String>;

    /// Fetch the raw text value of one variable
    async fn fetch_variable(&self, name: &str) -> Result<String>;

    /// Write one variable
    async fn set_variable(&self, name: &str, value: &str) -> Result<()>;
}

/// reqwest-backed upstream
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    base_url: String,
    probe_timeout: Duration,
    request_timeout: Duration,
    client: reqwest::Client,
}

impl HttpUpstream {
    /// Create a new upstream client.
    ///
    /// Trailing slashes on `base_url` are ignored.
    pub fn new(
        base_url: impl Into<String>,
        probe_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder().build().map_err(Error::client)?;

        Ok(Self {
            base_url,
            probe_timeout,
            request_timeout,
            client,
        })
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn root_url(&self) -> String {
        format!("{}/", self.base_url)
    }

    /// Send a request and check its status, wrapping failures with the final URL.
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request = request
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| Error::request(self.root_url(), e))?;
        let url = request.url().to_string();

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| Error::request(url.clone(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::status(
                url,
                status.as_u16(),
                status.canonical_reason().unwrap_or(""),
            ));
        }

        Ok(response)
    }

    async fn fetch_text(&self, request: RequestBuilder) -> Result<String> {
        let response = self.send(request).await?;
        let url = response.url().to_string();
        response.text().await.map_err(|e| Error::request(url, e))
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn probe(&self) -> bool {
        let url = self.root_url();
        match self
            .client
            .get(&url)
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) => {
                debug!(url = %url, status = response.status().as_u16(), "Nucleares probe answered");
                true
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Nucleares webserver unreachable");
                false
            }
        }
    }

    async fn fetch_root(&self) -> Result<String> {
        self.fetch_text(self.client.get(self.root_url())).await
    }

    async fn fetch_variable(&self, name: &str) -> Result<String> {
        let request = self.client.get(self.root_url()).query(&[("variable", name)]);
        self.fetch_text(request).await
    }

    async fn set_variable(&self, name: &str, value: &str) -> Result<()> {
        let request = self
            .client
            .post(self.root_url())
            .query(&[("variable", name), ("value", value)]);
        self.send(request).await?;
        debug!(variable = %name, value = %value, "Nucleares variable written");
        Ok(())
    }
}
