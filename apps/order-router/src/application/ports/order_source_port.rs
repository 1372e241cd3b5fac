//! Order Source Port (Driver Port)
//!
//! Delivers raw order commands in queue order. Read progress is committed
//! explicitly, and only after the command reached a terminal state, which
//! gives at-least-once delivery: anything delivered but not committed is
//! delivered again after a restart.

use async_trait::async_trait;

/// Position of a delivery in its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeliveryReceipt {
    /// Position of the message.
    pub offset: u64,
    /// Position right after the message; committing stores this.
    pub next_offset: u64,
}

/// One raw command taken off the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Where the command came from.
    pub receipt: DeliveryReceipt,
    /// Undecoded message body.
    pub payload: Vec<u8>,
}

/// Queue error.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Underlying storage failed.
    #[error("queue I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored offset could not be read back.
    #[error("corrupt committed offset: {message}")]
    CorruptOffset {
        /// Error details.
        message: String,
    },

    /// Source has been closed.
    #[error("queue closed")]
    Closed,
}

/// Port for the inbound command queue.
#[async_trait]
pub trait OrderSourcePort: Send + Sync {
    /// Wait for the next command. `None` means the source is exhausted.
    ///
    /// Must be cancel-safe: dropping the future before it completes must not
    /// lose or skip a message.
    async fn next(&self) -> Result<Option<Delivery>, QueueError>;

    /// Record that everything up to and including `receipt` is done.
    async fn commit(&self, receipt: DeliveryReceipt) -> Result<(), QueueError>;
}
