//! Infrastructure Layer
//!
//! Adapters implementing the application ports.
//!
//! - `venue`: Binance REST adapter and the in-process paper venue
//! - `queue`: file journal and in-process channel queues
//! - `http`: operator REST API

pub mod http;
pub mod queue;
pub mod venue;
