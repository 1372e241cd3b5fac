//! Observability module for metrics.
//!
//! Prometheus export of dispatch, resolution and queue metrics. Tracing
//! setup lives in [`crate::telemetry`].

mod metrics;

pub use self::metrics::{
    MetricsConfig, MetricsError, init_metrics, record_dispatch, record_dispatch_rejected,
    record_emit_failure, record_order_result, record_queue_commit, set_dispatch_queue_depth,
    set_in_flight_orders,
};
