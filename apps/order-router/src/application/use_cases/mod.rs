//! Use Cases
//!
//! Application-specific business rules orchestrating domain logic.

mod process_orders;
mod resolve_order;

pub use process_orders::{PipelineReport, ProcessOrdersUseCase};
pub use resolve_order::OrderActionResolver;
