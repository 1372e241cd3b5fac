//! Data Transfer Objects (DTOs)
//!
//! The queue wire record and the resolution results built from it.

mod order_message;
mod order_result;

pub use order_message::OrderMessage;
pub use order_result::{OrderResult, ResolutionOutcome, ResolutionStep, StepKind};
