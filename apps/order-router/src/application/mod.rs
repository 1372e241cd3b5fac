//! Application Layer
//!
//! Orchestrates the domain through:
//!
//! - **Ports**: interfaces to the venue, the inbound queue and the result channel
//! - **Services**: the rate-limited dispatch lane
//! - **Use Cases**: resolving one command, and the queue-driven pipeline
//! - **DTOs**: the queue wire record and resolution results

pub mod dto;
pub mod ports;
pub mod services;
pub mod use_cases;

pub use dto::*;
pub use ports::*;
pub use services::*;
pub use use_cases::*;
