//! Queue configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// File journal locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Inbound order journal.
    #[serde(default = "default_inbound_path")]
    pub inbound_path: String,
    /// Outbound result journal.
    #[serde(default = "default_outbound_path")]
    pub outbound_path: String,
    /// Committed read offset of the inbound journal.
    #[serde(default = "default_offset_path")]
    pub offset_path: String,
    /// Wait between polls at the end of the inbound journal.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            inbound_path: default_inbound_path(),
            outbound_path: default_outbound_path(),
            offset_path: default_offset_path(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl QueueConfig {
    /// Poll interval as a duration.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_inbound_path() -> String {
    "data/orders.jsonl".to_string()
}

fn default_outbound_path() -> String {
    "data/results.jsonl".to_string()
}

fn default_offset_path() -> String {
    "data/orders.offset".to_string()
}

const fn default_poll_interval_ms() -> u64 {
    200
}
