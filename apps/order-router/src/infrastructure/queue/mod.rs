//! Queue Adapters
//!
//! Implementations of `OrderSourcePort` and `ResultEmitterPort`.

mod channel;
mod journal;

pub use channel::{ChannelOrderSource, ChannelResultEmitter};
pub use journal::{DEFAULT_POLL_INTERVAL, JournalOrderSource, JournalResultEmitter};
