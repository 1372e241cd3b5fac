//! Shared Kernel
//!
//! Identifiers used across the order domain.

mod identifiers;

pub use identifiers::{ClientOrderId, OrderId, StrategyId, VenueOrderId};
