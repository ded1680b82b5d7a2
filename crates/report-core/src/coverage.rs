//! Market-data coverage check results

use crate::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result of a market coverage check
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    /// Resolved start of the window
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub start: Option<DateTime<Utc>>,
    /// Resolved end of the window
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub end: Option<DateTime<Utc>>,
    /// Symbols the check looked at
    #[serde(default)]
    pub symbols: Vec<String>,
    /// Whether market data covers the whole request
    pub has_market: bool,
    /// Per-key coverage details
    #[serde(default)]
    pub coverage: Map<String, Value>,
    /// Per-key gaps
    #[serde(default)]
    pub missing: Map<String, Value>,
    /// Free-text notes from the backend
    #[serde(default)]
    pub notes: Vec<String>,
}

impl CoverageReport {
    /// Keys with missing coverage, in key order
    pub fn missing_keys(&self) -> Vec<&str> {
        self.missing.keys().map(String::as_str).collect()
    }
}
