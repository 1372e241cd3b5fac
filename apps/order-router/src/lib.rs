// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Order Router - Rust Core Library
//!
//! Forwards order commands from a durable queue to a trading venue.
//!
//! # Architecture (Clean Architecture + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: order entity, lifecycle status, edit saga, identifiers
//!
//! - **Application**: use cases and orchestration
//!   - `ports`: `VenuePort`, `OrderSourcePort`, `ResultEmitterPort`
//!   - `services`: `OrderDispatcher`, the single rate-limited venue lane
//!   - `use_cases`: `OrderActionResolver` (place / cancel / edit) and
//!     `ProcessOrdersUseCase` (queue → resolver → results, ordered commits)
//!   - `dto`: queue wire record and resolution results
//!
//! - **Infrastructure**: adapters
//!   - `venue`: Binance Spot REST, paper venue
//!   - `queue`: file journal, in-process channels
//!   - `http`: operator API

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Order model with no external dependencies.
pub mod domain;

/// Application layer - Use cases, services and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Cross-cutting
// =============================================================================

/// Configuration loading and validation.
pub mod config;

/// Error types for the HTTP boundary.
pub mod error;

/// Prometheus metrics.
pub mod observability;

/// Tracing setup.
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use application::dto::{OrderMessage, OrderResult, ResolutionOutcome};
pub use application::ports::{OrderSourcePort, ResultEmitterPort, VenueError, VenuePort};
pub use application::services::{DispatchError, DispatcherSettings, OrderDispatcher};
pub use application::use_cases::{OrderActionResolver, ProcessOrdersUseCase};
pub use domain::order::{Order, OrderAction, OrderSide, OrderStatus};
pub use error::{ErrorCode, RouterError};
