//! In-process channel queue.
//!
//! Inbound commands and outbound results travel over bounded `tokio::mpsc`
//! channels. Offsets are sequence numbers assigned on receipt; nothing is
//! redelivered, so commits only move the reported watermark.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use crate::application::dto::OrderResult;
use crate::application::ports::{
    Delivery, DeliveryReceipt, EmitError, OrderSourcePort, QueueError, ResultEmitterPort,
};

/// Order source fed by an mpsc channel of raw payloads.
#[derive(Debug)]
pub struct ChannelOrderSource {
    receiver: Mutex<mpsc::Receiver<Vec<u8>>>,
    next_offset: AtomicU64,
    committed: AtomicU64,
}

impl ChannelOrderSource {
    /// Create a source and the sender that feeds it.
    #[must_use]
    pub fn channel(capacity: usize) -> (mpsc::Sender<Vec<u8>>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self::new(rx))
    }

    /// Wrap an existing receiver.
    #[must_use]
    pub fn new(receiver: mpsc::Receiver<Vec<u8>>) -> Self {
        Self {
            receiver: Mutex::new(receiver),
            next_offset: AtomicU64::new(0),
            committed: AtomicU64::new(0),
        }
    }

    /// Highest committed `next_offset`.
    #[must_use]
    pub fn committed_offset(&self) -> u64 {
        self.committed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderSourcePort for ChannelOrderSource {
    async fn next(&self) -> Result<Option<Delivery>, QueueError> {
        let mut receiver = self.receiver.lock().await;
        let Some(payload) = receiver.recv().await else {
            return Ok(None);
        };
        let offset = self.next_offset.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Delivery {
            receipt: DeliveryReceipt {
                offset,
                next_offset: offset + 1,
            },
            payload,
        }))
    }

    async fn commit(&self, receipt: DeliveryReceipt) -> Result<(), QueueError> {
        self.committed.fetch_max(receipt.next_offset, Ordering::SeqCst);
        Ok(())
    }
}

/// Result emitter sending results down an mpsc channel.
#[derive(Debug, Clone)]
pub struct ChannelResultEmitter {
    sender: mpsc::Sender<OrderResult>,
}

impl ChannelResultEmitter {
    /// Create an emitter and the receiver of its results.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OrderResult>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { sender: tx }, rx)
    }
}

#[async_trait]
impl ResultEmitterPort for ChannelResultEmitter {
    async fn emit(&self, result: &OrderResult) -> Result<(), EmitError> {
        self.sender
            .send(result.clone())
            .await
            .map_err(|_| EmitError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dto::OrderMessage;
    use crate::domain::order::OrderValidationError;

    #[tokio::test]
    async fn assigns_sequential_offsets_until_senders_drop() {
        let (tx, source) = ChannelOrderSource::channel(4);
        tx.send(b"a".to_vec()).await.unwrap();
        tx.send(b"b".to_vec()).await.unwrap();
        drop(tx);

        let first = source.next().await.unwrap().unwrap();
        let second = source.next().await.unwrap().unwrap();
        assert_eq!(first.receipt.offset, 0);
        assert_eq!(second.receipt.offset, 1);
        assert_eq!(second.payload, b"b");
        assert!(source.next().await.unwrap().is_none());

        source.commit(second.receipt).await.unwrap();
        source.commit(first.receipt).await.unwrap();
        assert_eq!(source.committed_offset(), 2);
    }

    #[tokio::test]
    async fn emitter_reports_closed_receiver() {
        let (emitter, mut rx) = ChannelResultEmitter::channel(1);
        let result = OrderResult::rejected(OrderMessage::default(), &OrderValidationError::MissingSymbol);

        emitter.emit(&result).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().order_id(), 0);

        drop(rx);
        assert!(matches!(emitter.emit(&result).await, Err(EmitError::Closed)));
    }
}
