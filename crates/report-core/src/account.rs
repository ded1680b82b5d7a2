//! Exchange accounts a report can be scoped to

use serde::{Deserialize, Serialize};

/// An exchange account known to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub exchange_id: String,
    pub label: String,
    #[serde(default)]
    pub account_types: Vec<String>,
    #[serde(default = "enabled_by_default")]
    pub is_enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}
