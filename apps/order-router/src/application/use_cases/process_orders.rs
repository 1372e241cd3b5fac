//! Process Orders Use Case
//!
//! Pulls commands off the inbound queue, resolves them, publishes the
//! results and commits read progress.
//!
//! Up to `max_in_flight` commands are resolved concurrently; they still
//! reach the venue one call at a time through the dispatcher. Results are
//! published and committed strictly in queue order, so a committed offset
//! never skips a command that is still being worked on. Two commands for
//! the same order id are never in flight together.
//!
//! On shutdown the pipeline stops pulling, lets in-flight commands reach a
//! terminal state, commits them and returns.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream::FuturesOrdered;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::OrderActionResolver;
use crate::application::dto::{OrderMessage, OrderResult};
use crate::application::ports::{
    Delivery, DeliveryReceipt, OrderSourcePort, QueueError, ResultEmitterPort, VenuePort,
};
use crate::observability;

/// Counters returned when the pipeline stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    /// Commands resolved.
    pub processed: u64,
    /// Read positions committed.
    pub committed: u64,
    /// Results that could not be published.
    pub emit_failures: u64,
}

/// Use case driving the queue → resolver → emitter pipeline.
pub struct ProcessOrdersUseCase<V, S, E>
where
    V: VenuePort + ?Sized + 'static,
    S: OrderSourcePort + ?Sized,
    E: ResultEmitterPort + ?Sized,
{
    resolver: OrderActionResolver<V>,
    source: Arc<S>,
    emitter: Arc<E>,
    max_in_flight: usize,
}

impl<V, S, E> ProcessOrdersUseCase<V, S, E>
where
    V: VenuePort + ?Sized + 'static,
    S: OrderSourcePort + ?Sized,
    E: ResultEmitterPort + ?Sized,
{
    /// Create a new `ProcessOrdersUseCase`. `max_in_flight` is at least 1.
    pub fn new(
        resolver: OrderActionResolver<V>,
        source: Arc<S>,
        emitter: Arc<E>,
        max_in_flight: usize,
    ) -> Self {
        Self {
            resolver,
            source,
            emitter,
            max_in_flight: max_in_flight.max(1),
        }
    }

    /// Run until the source is exhausted or `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Returns the first pull or commit error. Commands still in flight at
    /// that point are not committed and will be delivered again.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<PipelineReport, QueueError> {
        let mut report = PipelineReport::default();
        let mut in_flight = FuturesOrdered::new();
        let mut in_flight_ids: HashMap<u64, usize> = HashMap::new();
        // Delivery held back until its order id is no longer in flight.
        let mut held: Option<(u64, Delivery)> = None;
        let mut pulling = true;

        tracing::info!(max_in_flight = self.max_in_flight, "Order pipeline started");

        loop {
            let held_is_free = held
                .as_ref()
                .is_some_and(|(order_id, _)| !in_flight_ids.contains_key(order_id));
            if held_is_free && let Some((order_id, delivery)) = held.take() {
                *in_flight_ids.entry(order_id).or_insert(0) += 1;
                in_flight.push_back(self.process(order_id, delivery));
            }
            observability::set_in_flight_orders(in_flight.len());

            if !pulling && in_flight.is_empty() {
                break;
            }

            let can_pull = pulling && held.is_none() && in_flight.len() < self.max_in_flight;

            tokio::select! {
                biased;

                Some((order_id, receipt, result)) = in_flight.next(), if !in_flight.is_empty() => {
                    release(&mut in_flight_ids, order_id);
                    self.finish(receipt, &result, &mut report).await?;
                }

                () = shutdown.cancelled(), if pulling => {
                    tracing::info!(in_flight = in_flight.len(), "Order pipeline draining");
                    pulling = false;
                    // Held delivery is not committed and will be redelivered.
                    held = None;
                }

                delivery = self.source.next(), if can_pull => {
                    match delivery? {
                        Some(delivery) => {
                            let order_id = OrderMessage::salvage_id(&delivery.payload);
                            if in_flight_ids.contains_key(&order_id) {
                                tracing::debug!(order_id, "Order already in flight, holding command");
                                held = Some((order_id, delivery));
                            } else {
                                *in_flight_ids.entry(order_id).or_insert(0) += 1;
                                in_flight.push_back(self.process(order_id, delivery));
                            }
                        }
                        None => {
                            tracing::info!("Order source exhausted");
                            pulling = false;
                        }
                    }
                }

                else => break,
            }
        }

        observability::set_in_flight_orders(0);
        tracing::info!(
            processed = report.processed,
            committed = report.committed,
            emit_failures = report.emit_failures,
            "Order pipeline stopped"
        );
        Ok(report)
    }

    async fn process(&self, order_id: u64, delivery: Delivery) -> (u64, DeliveryReceipt, OrderResult) {
        let result = match OrderMessage::decode(&delivery.payload) {
            Ok(message) => self.resolver.resolve(message).await,
            Err(e) => {
                tracing::warn!(
                    offset = delivery.receipt.offset,
                    error = %e,
                    "Malformed order command"
                );
                observability::record_order_result("unknown", "rejected");
                OrderResult::malformed(&delivery.payload, &e)
            }
        };
        (order_id, delivery.receipt, result)
    }

    async fn finish(
        &self,
        receipt: DeliveryReceipt,
        result: &OrderResult,
        report: &mut PipelineReport,
    ) -> Result<(), QueueError> {
        report.processed += 1;

        if let Err(e) = self.emitter.emit(result).await {
            report.emit_failures += 1;
            observability::record_emit_failure();
            tracing::error!(
                order_id = result.order_id(),
                offset = receipt.offset,
                error = %e,
                "Failed to publish order result"
            );
        }

        self.source.commit(receipt).await?;
        report.committed += 1;
        observability::record_queue_commit();
        tracing::debug!(
            order_id = result.order_id(),
            queue_offset = receipt.next_offset,
            "Read position committed"
        );
        Ok(())
    }
}

fn release(in_flight_ids: &mut HashMap<u64, usize>, order_id: u64) {
    if let Some(count) = in_flight_ids.get_mut(&order_id) {
        *count -= 1;
        if *count == 0 {
            in_flight_ids.remove(&order_id);
        }
    }
}
