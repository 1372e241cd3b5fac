//! Application Services
//!
//! Long-running services shared by the use cases.

mod dispatcher;

pub use dispatcher::{DispatchError, DispatcherSettings, DispatcherStats, OrderDispatcher};
