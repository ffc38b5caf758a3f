//! Signal kinds and their folders under the root directory

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of telemetry buffered in a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalType {
    Spans,
    Logs,
    Metrics,
}

impl SignalType {
    /// Every signal kind, in folder order.
    pub const ALL: [SignalType; 3] = [SignalType::Spans, SignalType::Logs, SignalType::Metrics];

    /// Subdirectory name under the root directory.
    pub fn folder_name(&self) -> &'static str {
        match self {
            SignalType::Spans => "spans",
            SignalType::Logs => "logs",
            SignalType::Metrics => "metrics",
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.folder_name())
    }
}

impl FromStr for SignalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spans" => Ok(SignalType::Spans),
            "logs" => Ok(SignalType::Logs),
            "metrics" => Ok(SignalType::Metrics),
            other => Err(format!(
                "Unknown signal type: '{}'. Must be 'spans', 'logs' or 'metrics'.",
                other
            )),
        }
    }
}
