//! Binance Spot Venue Adapter
//!
//! Implementation of `VenuePort` for the Binance Spot REST API:
//! - HMAC-SHA256 signed requests
//! - Testnet / production environments with an optional base URL override
//! - Exchange error codes classified into venue errors
//!
//! Requests are never retried here; a failed call is reported as-is and the
//! dispatcher decides what happens next.

mod adapter;
mod api_types;
mod config;
mod error;
mod http_client;
mod signer;

pub use adapter::BinanceVenueAdapter;
pub use config::{BinanceConfig, BinanceEnvironment, TimeInForce};
pub use error::BinanceError;
