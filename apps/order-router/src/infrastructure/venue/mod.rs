//! Venue Adapters
//!
//! Implementations of `VenuePort`.

pub mod binance;
mod paper;

pub use binance::{BinanceConfig, BinanceEnvironment, BinanceError, BinanceVenueAdapter};
pub use paper::{PaperOrder, PaperVenue};
