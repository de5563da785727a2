//! Configuration loading and validation for the exporter

use crate::types::ExporterSettings;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Environment variable overriding `upstream.url`
pub const ENV_UPSTREAM_URL: &str = "NUCLEARES_URL";

/// Environment variable overriding the port of `http.listen_addr`
pub const ENV_PORT: &str = "PORT";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Invalid {name} override: {value}")]
    InvalidOverride { name: &'static str, value: String },
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub upstream: UpstreamSettings,

    #[serde(default)]
    pub http: HttpSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Validate for Config {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        self.upstream.validate()?;
        self.http.validate()?;
        Ok(())
    }
}

/// Nucleares webserver settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct UpstreamSettings {
    #[validate(length(min = 1), custom = "validate_upstream_url")]
    pub url: String,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_timeout")]
    pub probe_timeout: Duration,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_timeout")]
    pub request_timeout: Duration,

    pub probe_before_refresh: bool,
}

/// HTTP front door settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct HttpSettings {
    #[validate(custom = "validate_listen_addr")]
    pub listen_addr: String,

    #[validate(length(min = 1))]
    pub static_dir: String,
}

/// Logging settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: Option<String>,
    pub format: Option<String>,
}

impl LoggingSettings {
    /// Whether logs should be emitted as JSON
    pub fn is_json(&self) -> bool {
        self.format
            .as_deref()
            .is_some_and(|format| format.eq_ignore_ascii_case("json"))
    }
}

/// OpenTelemetry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    pub enabled: bool,
    pub service_name: String,
    pub otlp_endpoint: String,
}

// Default implementations

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:8785".to_string(),
            probe_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(8),
            probe_before_refresh: true,
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            static_dir: "public".to_string(),
        }
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            service_name: "nucleares-exporter".to_string(),
            otlp_endpoint: "http://localhost:4317".to_string(),
        }
    }
}

// Custom validators

fn validate_upstream_url(url: &str) -> Result<(), ValidationError> {
    let trimmed = url.trim();
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        return Err(ValidationError::new("upstream_url_invalid_scheme"));
    }
    Ok(())
}

fn validate_timeout(timeout: &Duration) -> Result<(), ValidationError> {
    let millis = timeout.as_millis();
    if !(100..=60_000).contains(&millis) {
        return Err(ValidationError::new("timeout_out_of_range"));
    }
    Ok(())
}

fn validate_listen_addr(addr: &str) -> Result<(), ValidationError> {
    addr.parse::<SocketAddr>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("listen_addr_invalid"))
}

// Configuration loading implementation

impl Config {
    /// Load configuration from default search paths, then apply environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                tracing::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(&path)?
            }
            None => {
                tracing::info!("No configuration file found, using defaults");
                Self::default()
            }
        };

        let (upstream_url, port) = Self::env_overrides();
        config.apply_overrides(upstream_url, port)?;
        config.validate()?;
        Ok(config)
    }

    /// Values of the override environment variables
    pub fn env_overrides() -> (Option<String>, Option<String>) {
        (
            std::env::var(ENV_UPSTREAM_URL).ok(),
            std::env::var(ENV_PORT).ok(),
        )
    }

    /// Defaults with every usable override applied.
    ///
    /// For when the configuration file cannot be loaded. Rejected overrides
    /// are returned so the caller can report them.
    pub fn fallback(upstream_url: Option<String>, port: Option<String>) -> (Self, Vec<ConfigError>) {
        let mut config = Self::default();
        let mut rejected = Vec::new();

        if let Err(e) = config.apply_overrides(upstream_url, None) {
            rejected.push(e);
        }
        if let Err(e) = config.upstream.validate() {
            config.upstream.url = UpstreamSettings::default().url;
            rejected.push(e.into());
        }
        if let Err(e) = config.apply_overrides(None, port) {
            rejected.push(e);
        }

        (config, rejected)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply upstream URL and port overrides
    pub fn apply_overrides(
        &mut self,
        upstream_url: Option<String>,
        port: Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = upstream_url.filter(|url| !url.trim().is_empty()) {
            self.upstream.url = url.trim().to_string();
        }

        if let Some(port) = port.filter(|port| !port.trim().is_empty()) {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidOverride {
                    name: ENV_PORT,
                    value: port.clone(),
                })?;
            let mut addr: SocketAddr =
                self.http
                    .listen_addr
                    .parse()
                    .map_err(|_| ConfigError::InvalidOverride {
                        name: ENV_PORT,
                        value: self.http.listen_addr.clone(),
                    })?;
            addr.set_port(port);
            self.http.listen_addr = addr.to_string();
        }

        Ok(())
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/nucleares/exporter.yaml")];

        if let Some(home_path) = Self::home_config_path() {
            paths.push(home_path);
        }

        paths.push(PathBuf::from("./nucleares-exporter.yaml"));

        paths.into_iter().find(|p: &PathBuf| p.exists() && p.is_file())
    }

    /// Get home directory config path
    fn home_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/nucleares/exporter.yaml"))
    }

    /// Convert to runtime settings
    pub fn to_exporter_settings(&self) -> ExporterSettings {
        ExporterSettings {
            upstream_url: self.upstream.url.clone(),
            probe_timeout: self.upstream.probe_timeout,
            request_timeout: self.upstream.request_timeout,
            probe_before_refresh: self.upstream.probe_before_refresh,
            listen_addr: self.http.listen_addr.clone(),
            static_dir: self.http.static_dir.clone(),
        }
    }
}
