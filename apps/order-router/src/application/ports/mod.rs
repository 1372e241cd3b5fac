//! Application Ports (Driver and Driven)
//!
//! - **Driver Ports** (Inbound): the order queue feeding the router
//! - **Driven Ports** (Outbound): the venue and the result channel

mod order_source_port;
mod result_emitter_port;
mod venue_port;

pub use order_source_port::{Delivery, DeliveryReceipt, OrderSourcePort, QueueError};
pub use result_emitter_port::{EmitError, NoOpResultEmitter, ResultEmitterPort};
pub use venue_port::{CancelOrderRequest, PlaceOrderRequest, VenueError, VenuePort};
