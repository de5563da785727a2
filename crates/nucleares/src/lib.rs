//! Client library for the Nucleares webserver.
//!
//! The webserver exposes every simulation variable as plain text:
//! - `GET /` lists readable variables as links and writable ones as bold labels
//! - `GET /?variable=NAME` returns the current value
//! - `POST /?variable=NAME&value=VALUE` writes a value
//!
//! Values are untyped strings, so this crate also classifies readings into
//! booleans, numbers and opaque strings, and derives metric-safe names.
//!
//! # Example
//!
//! ```no_run
//! use nucleares::{HttpUpstream, Upstream, parse_root_document, parse_value};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let upstream = HttpUpstream::new(
//!     "http://localhost:8785",
//!     Duration::from_secs(3),
//!     Duration::from_secs(8),
//! )?;
//!
//! let doc = parse_root_document(&upstream.fetch_root().await?)?;
//! for name in &doc.get_variables {
//!     let reading = parse_value(&upstream.fetch_variable(name).await?);
//!     println!("{name}: {:?}", reading);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod document;
pub mod types;
pub mod value;

pub use client::{DEFAULT_PROBE_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, HttpUpstream, Upstream};
pub use document::{GET_MARKER, POST_MARKER, parse_root_document};
pub use types::{ParsedValue, RootDocument, VariableKind};
pub use value::{METRIC_PREFIX, metric_name, parse_value, sanitize_metric_name};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_kind_display() {
        assert_eq!(VariableKind::Boolean.to_string(), "boolean");
        assert_eq!(VariableKind::Number.to_string(), "number");
        assert_eq!(VariableKind::String.to_string(), "string");
    }

    #[test]
    fn test_parsed_value_kind() {
        assert_eq!(parse_value("true").kind(), VariableKind::Boolean);
        assert_eq!(parse_value("0,5").kind(), VariableKind::Number);
        assert_eq!(parse_value("OPEN").kind(), VariableKind::String);
    }
}
