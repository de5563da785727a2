//! Common error types for the Nucleares exporter components.

use std::fmt;

/// A specialized Result type for exporter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for exporter operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request never produced a response (connect failure, timeout, body read).
    #[error("fetch failed for {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The upstream answered with a non-success status.
    #[error("request to {url} failed: {status} {reason}")]
    Status {
        url: String,
        status: u16,
        reason: String,
    },

    #[error("could not find \"{marker}\" section in root document")]
    MissingMarker { marker: &'static str },

    #[error("HTTP client error: {0}")]
    Client(String),

}

impl Error {
    /// Wrap a transport failure with the URL that was being fetched.
    pub fn request(url: impl Into<String>, source: reqwest::Error) -> Self {
        Error::Request {
            url: url.into(),
            source,
        }
    }

    /// Create an upstream status error.
    pub fn status(url: impl Into<String>, status: u16, reason: impl Into<String>) -> Self {
        Error::Status {
            url: url.into(),
            status,
            reason: reason.into(),
        }
    }

    /// Create a new HTTP client construction error.
    pub fn client(msg: impl fmt::Display) -> Self {
        Error::Client(msg.to_string())
    }

    /// Upstream status code, if this error came from a non-success response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the underlying request hit its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Request { source, .. } if source.is_timeout())
    }
}
