//! Common utilities and types shared across the Nucleares exporter crates.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
