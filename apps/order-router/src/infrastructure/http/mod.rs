//! HTTP/REST API adapter.

mod controller;
mod response;

pub use controller::{AppState, create_router};
pub use response::{DispatcherStatusResponse, HealthResponse};
