//! Nucleares variable types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type inferred for a variable from its scraped value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    /// `true` / `false` in any letter case
    Boolean,
    /// Finite decimal number, comma or period separated
    Number,
    /// Anything else; not convertible to a metric value
    String,
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableKind::Boolean => write!(f, "boolean"),
            VariableKind::Number => write!(f, "number"),
            VariableKind::String => write!(f, "string"),
        }
    }
}

/// A classified variable reading
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedValue {
    Boolean(bool),
    Number(f64),
    String(String),
}

impl ParsedValue {
    /// Kind of this reading
    pub fn kind(&self) -> VariableKind {
        match self {
            ParsedValue::Boolean(_) => VariableKind::Boolean,
            ParsedValue::Number(_) => VariableKind::Number,
            ParsedValue::String(_) => VariableKind::String,
        }
    }

    /// Value as it would be exported on a gauge (booleans as 1/0)
    pub fn gauge_value(&self) -> Option<f64> {
        match self {
            ParsedValue::Boolean(true) => Some(1.0),
            ParsedValue::Boolean(false) => Some(0.0),
            ParsedValue::Number(n) => Some(*n),
            ParsedValue::String(_) => None,
        }
    }
}

/// Variable names scraped from the upstream root document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootDocument {
    /// Readable variables, in order of appearance (duplicates kept)
    pub get_variables: Vec<String>,

    /// Writable variables; `None` when the document has no POST section
    pub post_variables: Option<Vec<String>>,
}
