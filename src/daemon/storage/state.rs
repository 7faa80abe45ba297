use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single day of accumulated usage cannot legally exceed 24 hours. Anything
/// above it is treated as corruption and repaired, not saturated.
pub const DAY_CEILING_MS: u64 = 24 * 60 * 60 * 1000;

/// The whole persistent state of the application. Serialized as one JSON
/// document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    /// Domain -> milliseconds accumulated today.
    #[serde(default)]
    pub usage: HashMap<String, u64>,
    /// Domain -> limit in milliseconds. Survives the daily reset. The field
    /// name matches the schema the popup side reads and writes.
    #[serde(default, rename = "timeLimits")]
    pub limits: HashMap<String, u64>,
    /// Domain -> moment the last limit notification was shown.
    #[serde(default)]
    pub cooldowns: HashMap<String, DateTime<Utc>>,
}

impl StoreState {
    pub fn total_usage_ms(&self) -> u64 {
        self.usage.values().sum()
    }
}
