//! Domain Layer
//!
//! Core order model with no knowledge of queues, venues or transports.
//!
//! - `order`: Order entity, side, action, lifecycle status, edit saga
//! - `shared`: Strongly-typed identifiers

pub mod order;
pub mod shared;
