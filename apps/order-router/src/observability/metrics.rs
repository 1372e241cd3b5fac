//! Prometheus metrics for the order router.
//!
//! Covers the dispatch lane, order resolution and the inbound queue.
//!
//! # Example
//!
//! ```ignore
//! use order_router::observability::{init_metrics, MetricsConfig};
//!
//! init_metrics(&MetricsConfig::default())?;
//! record_dispatch("succeeded", 0.042);
//! ```

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{Ipv4Addr, SocketAddr};

/// Configuration for the metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
    /// Histogram buckets for latency measurements (in seconds).
    pub latency_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 9090)),
            // Venue round trips: 1ms to 30s
            latency_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
            ],
        }
    }
}

impl MetricsConfig {
    /// Create a new metrics configuration with custom address.
    #[must_use]
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            listen_addr: addr,
            ..Default::default()
        }
    }
}

/// Initialize the Prometheus metrics exporter.
///
/// Starts an HTTP listener that exposes metrics at `/metrics`.
///
/// # Errors
///
/// Returns an error if the exporter fails to start (e.g., port already in use).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .set_buckets(&config.latency_buckets)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(addr = %config.listen_addr, "Prometheus metrics exporter started");

    Ok(())
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

// ============================================================================
// Dispatch Lane Metrics
// ============================================================================

/// Record one executed dispatch.
///
/// # Arguments
///
/// * `outcome` - `"succeeded"`, `"failed"` or `"timed_out"`
/// * `latency_seconds` - Execution time of the venue call
pub fn record_dispatch(outcome: &'static str, latency_seconds: f64) {
    counter!("order_router_dispatches_total", "outcome" => outcome).increment(1);
    histogram!("order_router_dispatch_latency_seconds").record(latency_seconds);
}

/// Record requests refused because the dispatcher closed.
pub fn record_dispatch_rejected(count: u64) {
    counter!("order_router_dispatches_total", "outcome" => "closed").increment(count);
}

/// Update the dispatcher pending queue depth.
pub fn set_dispatch_queue_depth(depth: u64) {
    gauge!("order_router_dispatch_queue_depth").set(depth as f64);
}

// ============================================================================
// Resolution Metrics
// ============================================================================

/// Record a resolved order command.
///
/// # Arguments
///
/// * `action` - Wire action, or `"unknown"` when it did not parse
/// * `outcome` - Resolution outcome name
pub fn record_order_result(action: &str, outcome: &'static str) {
    counter!(
        "order_router_orders_total",
        "action" => action.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a failure to publish a result.
pub fn record_emit_failure() {
    counter!("order_router_emit_failures_total").increment(1);
}

// ============================================================================
// Queue Metrics
// ============================================================================

/// Record a committed read position.
pub fn record_queue_commit() {
    counter!("order_router_queue_commits_total").increment(1);
}

/// Update the number of commands being resolved concurrently.
pub fn set_in_flight_orders(count: usize) {
    gauge!("order_router_in_flight_orders").set(count as f64);
}
