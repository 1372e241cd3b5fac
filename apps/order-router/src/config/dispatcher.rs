//! Dispatcher and resolver configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::services::DispatcherSettings;

/// Dispatch lane configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Pause between the end of one venue call and the start of the next.
    #[serde(default = "default_pause_ms")]
    pub pause_ms: u64,
    /// Requests that may wait in the queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Upper bound on a single venue call.
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            pause_ms: default_pause_ms(),
            queue_capacity: default_queue_capacity(),
            operation_timeout_ms: default_operation_timeout_ms(),
        }
    }
}

impl DispatcherConfig {
    /// Convert to dispatcher settings.
    #[must_use]
    pub const fn to_settings(&self) -> DispatcherSettings {
        DispatcherSettings {
            pause: Duration::from_millis(self.pause_ms),
            capacity: self.queue_capacity,
            operation_timeout: Duration::from_millis(self.operation_timeout_ms),
        }
    }
}

/// Resolver pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Commands resolved concurrently.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
        }
    }
}

const fn default_pause_ms() -> u64 {
    100
}

const fn default_queue_capacity() -> usize {
    64
}

const fn default_operation_timeout_ms() -> u64 {
    10_000
}

const fn default_max_in_flight() -> usize {
    4
}
