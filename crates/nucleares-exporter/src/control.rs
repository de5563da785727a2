//! In-memory reactor state backing the control UI's demo endpoints.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Placeholder reactor state; not connected to the webserver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactorState {
    pub power_level: f64,
    pub temperature: f64,
    pub status: String,
    pub last_updated: String,
}

impl Default for ReactorState {
    fn default() -> Self {
        Self {
            power_level: 0.75,
            temperature: 320.0,
            status: "nominal".to_string(),
            last_updated: now_rfc3339(),
        }
    }
}

impl ReactorState {
    /// Refresh the timestamp
    pub fn touch(&mut self) {
        self.last_updated = now_rfc3339();
    }

    /// Apply a new power level, clamped to `[0, 1]`
    pub fn set_power_level(&mut self, power_level: f64) {
        self.power_level = power_level.clamp(0.0, 1.0);
        self.status = "adjusting".to_string();
        self.touch();
    }
}

fn now_rfc3339() -> String {
    humantime::format_rfc3339_millis(SystemTime::now()).to_string()
}
