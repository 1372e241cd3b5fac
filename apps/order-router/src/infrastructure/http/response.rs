//! HTTP response DTOs.

use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` while the dispatcher accepts work, `draining` after.
    pub status: String,
    /// Application version.
    pub version: String,
    /// Venue adapter name.
    pub venue: String,
}

/// Dispatcher status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherStatusResponse {
    /// Whether the dispatcher refuses new work.
    pub closed: bool,
    /// Pause between venue calls, in milliseconds.
    pub pause_ms: u64,
    /// Request queue capacity.
    pub capacity: usize,
    /// Per-call timeout, in milliseconds.
    pub operation_timeout_ms: u64,
    /// Requests waiting.
    pub pending: u64,
    /// Requests accepted.
    pub enqueued: u64,
    /// Operations run to completion.
    pub executed: u64,
    /// Operations that succeeded.
    pub succeeded: u64,
    /// Operations that failed at the venue.
    pub failed: u64,
    /// Operations cut off by the timeout.
    pub timed_out: u64,
    /// Requests refused because the dispatcher was closed.
    pub rejected: u64,
}
