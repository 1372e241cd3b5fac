//! Resolve Order Use Case
//!
//! Turns one order command into venue calls and a terminal status.
//!
//! Every venue call goes through the shared [`OrderDispatcher`], one call at
//! a time per order: an order's second call is only submitted once the
//! first one's result is known. Commands for the same order id are resolved
//! one after another, whichever entry point submits them.
//!
//! | action | calls | success | failure |
//! |---|---|---|---|
//! | place  | place | `Placed`, venue id set | `Failed`, no venue id |
//! | cancel | cancel | `Cancelled`, venue id cleared | `Failed`, venue id kept |
//! | edit   | cancel, then place | `Placed`, new venue id | cancel failed: `Placed`, old id kept; old order unknown: `Failed`, old id kept; place failed: `Cancelled`, venue id cleared |
//!
//! A placement the venue refuses is looked up by its client id. If an open
//! order already carries that id, the command was redelivered and resolves
//! to that order. An edit whose old order is unknown to the venue is looked
//! up the same way by its replacement client id.
//!
//! Cancelling an order the venue no longer knows counts as already
//! cancelled, and so does a Cancel for a command already reported as
//! `CANCELLED` (no call is made).

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use crate::application::dto::{
    OrderMessage, OrderResult, ResolutionOutcome, ResolutionStep, StepKind,
};
use crate::application::ports::{CancelOrderRequest, PlaceOrderRequest, VenueError, VenuePort};
use crate::application::services::{DispatchError, OrderDispatcher};
use crate::domain::order::{EditSaga, Order, OrderAction, OrderStatus, OrderValidationError};
use crate::domain::shared::{ClientOrderId, OrderId, VenueOrderId};
use crate::observability;

/// Use case for resolving order commands against the venue.
pub struct OrderActionResolver<V>
where
    V: VenuePort + ?Sized + 'static,
{
    venue: Arc<V>,
    dispatcher: OrderDispatcher,
    turns: Arc<OrderTurns>,
}

impl<V> Clone for OrderActionResolver<V>
where
    V: VenuePort + ?Sized + 'static,
{
    fn clone(&self) -> Self {
        Self {
            venue: Arc::clone(&self.venue),
            dispatcher: self.dispatcher.clone(),
            turns: Arc::clone(&self.turns),
        }
    }
}

impl<V> OrderActionResolver<V>
where
    V: VenuePort + ?Sized + 'static,
{
    /// Create a new `OrderActionResolver`.
    pub fn new(venue: Arc<V>, dispatcher: OrderDispatcher) -> Self {
        Self {
            venue,
            dispatcher,
            turns: Arc::new(OrderTurns::default()),
        }
    }

    /// The dispatch lane this resolver submits to.
    pub const fn dispatcher(&self) -> &OrderDispatcher {
        &self.dispatcher
    }

    /// Name of the venue behind this resolver.
    pub fn venue_name(&self) -> &'static str {
        self.venue.name()
    }

    /// Resolve one decoded command to its terminal result.
    ///
    /// Never fails: every error ends up on the returned result. A command
    /// waits for any earlier command with the same order id, on this
    /// resolver or a clone of it, to finish first.
    pub async fn resolve(&self, inbound: OrderMessage) -> OrderResult {
        self.turns.run(inbound.id, self.resolve_now(inbound)).await
    }

    async fn resolve_now(&self, inbound: OrderMessage) -> OrderResult {
        let action_label = inbound
            .action
            .parse::<OrderAction>()
            .map_or("unknown", |a| a.as_wire_str());

        let result = match inbound.to_command().and_then(Order::receive) {
            Ok(order) => match order.action() {
                OrderAction::Place => self.place(inbound, order).await,
                OrderAction::Cancel => self.cancel(inbound, order).await,
                OrderAction::Edit => self.edit(inbound, order).await,
            },
            Err(e) => {
                tracing::warn!(
                    order_id = inbound.id,
                    action = %inbound.action,
                    error = %e,
                    "Order command rejected"
                );
                OrderResult::rejected(inbound, &e)
            }
        };

        observability::record_order_result(action_label, result.outcome.as_str());
        tracing::info!(
            order_id = result.order_id(),
            action = action_label,
            outcome = %result.outcome,
            status = %result.record.status,
            venue_order_id = ?result.venue_order_id(),
            "Order resolved"
        );

        result
    }

    async fn place(&self, inbound: OrderMessage, mut order: Order) -> OrderResult {
        let mut steps = Vec::with_capacity(2);

        checked(order.id(), order.begin_dispatch());
        let placed = self
            .place_or_recover(&order, order.place_client_id(), &mut steps)
            .await;

        match placed {
            Ok(venue_order_id) => {
                checked(order.id(), order.mark_placed(venue_order_id));
                OrderResult::resolved(inbound, &order, ResolutionOutcome::Placed, None, steps)
            }
            Err(e) => {
                tracing::warn!(order_id = %order.id(), error = %e, "Place failed");
                checked(order.id(), order.mark_failed());
                OrderResult::resolved(
                    inbound,
                    &order,
                    ResolutionOutcome::PlaceFailed,
                    Some(e.to_string()),
                    steps,
                )
            }
        }
    }

    async fn cancel(&self, inbound: OrderMessage, mut order: Order) -> OrderResult {
        if order.reported_status() == OrderStatus::Cancelled {
            tracing::debug!(order_id = %order.id(), "Cancel of cancelled order, nothing to do");
            checked(order.id(), order.mark_cancelled());
            return OrderResult::resolved(
                inbound,
                &order,
                ResolutionOutcome::AlreadyCancelled,
                None,
                Vec::new(),
            );
        }
        let Some(venue_order_id) = order.venue_order_id() else {
            return OrderResult::rejected(
                inbound,
                &OrderValidationError::MissingVenueOrderId {
                    action: OrderAction::Cancel,
                },
            );
        };

        let mut steps = Vec::with_capacity(1);
        checked(order.id(), order.begin_dispatch());
        let cancelled = self
            .cancel_step(&order, venue_order_id, &mut steps)
            .await;

        match cancelled {
            Ok(()) => {
                checked(order.id(), order.mark_cancelled());
                OrderResult::resolved(inbound, &order, ResolutionOutcome::Cancelled, None, steps)
            }
            Err(e) if is_not_found(&e) => {
                tracing::info!(
                    order_id = %order.id(),
                    venue_order_id = %venue_order_id,
                    "Venue order already gone, treating cancel as done"
                );
                checked(order.id(), order.mark_cancelled());
                OrderResult::resolved(
                    inbound,
                    &order,
                    ResolutionOutcome::AlreadyCancelled,
                    None,
                    steps,
                )
            }
            Err(e) => {
                tracing::warn!(
                    order_id = %order.id(),
                    venue_order_id = %venue_order_id,
                    error = %e,
                    "Cancel failed"
                );
                checked(order.id(), order.mark_failed());
                OrderResult::resolved(
                    inbound,
                    &order,
                    ResolutionOutcome::CancelFailed,
                    Some(e.to_string()),
                    steps,
                )
            }
        }
    }

    async fn edit(&self, inbound: OrderMessage, mut order: Order) -> OrderResult {
        let Some(old_venue_order_id) = order.venue_order_id() else {
            return OrderResult::rejected(
                inbound,
                &OrderValidationError::MissingVenueOrderId {
                    action: OrderAction::Edit,
                },
            );
        };

        let mut saga = EditSaga::begin(old_venue_order_id);
        let mut steps = Vec::with_capacity(3);
        let replacement_id = order.replacement_client_id(old_venue_order_id);

        checked(order.id(), order.begin_dispatch());
        match self.cancel_step(&order, old_venue_order_id, &mut steps).await {
            Ok(()) => checked(order.id(), saga.old_cancelled()),
            Err(e) if is_not_found(&e) => {
                if let Some(new_venue_order_id) =
                    self.lookup_step(&order, &replacement_id, &mut steps).await
                {
                    tracing::info!(
                        order_id = %order.id(),
                        old_venue_order_id = %old_venue_order_id,
                        venue_order_id = %new_venue_order_id,
                        "Edit already applied, replacement is resting"
                    );
                    checked(order.id(), saga.old_cancelled());
                    checked(order.id(), saga.place_new_started());
                    checked(order.id(), saga.replaced(new_venue_order_id));
                    checked(order.id(), order.mark_placed(new_venue_order_id));
                    return OrderResult::resolved(
                        inbound,
                        &order,
                        ResolutionOutcome::Replaced,
                        None,
                        steps,
                    )
                    .with_saga(saga.history());
                }

                tracing::warn!(
                    order_id = %order.id(),
                    venue_order_id = %old_venue_order_id,
                    "Edit stopped: order being replaced is not open at the venue"
                );
                checked(order.id(), saga.cancel_old_failed());
                checked(order.id(), order.mark_failed());
                return OrderResult::resolved(
                    inbound,
                    &order,
                    ResolutionOutcome::CancelOldFailed,
                    Some(format!(
                        "order {old_venue_order_id} is not open at the venue, it may have filled: {e}"
                    )),
                    steps,
                )
                .with_saga(saga.history());
            }
            Err(e) => {
                tracing::warn!(
                    order_id = %order.id(),
                    venue_order_id = %old_venue_order_id,
                    error = %e,
                    "Edit stopped: cancel of old order failed"
                );
                // The old order still rests, so it stays placed.
                checked(order.id(), saga.cancel_old_failed());
                checked(order.id(), order.mark_placed(old_venue_order_id));
                return OrderResult::resolved(
                    inbound,
                    &order,
                    ResolutionOutcome::CancelOldFailed,
                    Some(format!("cancel of order {old_venue_order_id} failed: {e}")),
                    steps,
                )
                .with_saga(saga.history());
            }
        }

        tracing::debug!(
            order_id = %order.id(),
            venue_order_id = %old_venue_order_id,
            saga_state = %saga.state(),
            "Old order cancelled, placing replacement"
        );
        checked(order.id(), saga.place_new_started());
        checked(order.id(), order.begin_dispatch());
        let placed = self
            .place_or_recover(&order, replacement_id, &mut steps)
            .await;

        let result = match placed {
            Ok(new_venue_order_id) => {
                checked(order.id(), saga.replaced(new_venue_order_id));
                checked(order.id(), order.mark_placed(new_venue_order_id));
                OrderResult::resolved(inbound, &order, ResolutionOutcome::Replaced, None, steps)
            }
            Err(e) => {
                tracing::error!(
                    order_id = %order.id(),
                    old_venue_order_id = %old_venue_order_id,
                    error = %e,
                    "Edit partially failed: old order cancelled, replacement not placed"
                );
                checked(order.id(), saga.replacement_failed());
                checked(order.id(), order.mark_cancelled());
                OrderResult::resolved(
                    inbound,
                    &order,
                    ResolutionOutcome::ReplaceFailedAfterCancel,
                    Some(format!(
                        "order {old_venue_order_id} cancelled but replacement failed: {e}"
                    )),
                    steps,
                )
            }
        };

        result.with_saga(saga.history())
    }

    /// Place, and if the venue refuses, check whether an open order already
    /// carries `client_order_id`. That order is the one a previous delivery
    /// of this command placed.
    async fn place_or_recover(
        &self,
        order: &Order,
        client_order_id: ClientOrderId,
        steps: &mut Vec<ResolutionStep>,
    ) -> Result<VenueOrderId, DispatchError> {
        let error = match self.place_step(order, client_order_id.clone(), steps).await {
            Ok(venue_order_id) => return Ok(venue_order_id),
            Err(e) if e.venue_error().is_some_and(VenueError::is_rejection) => e,
            Err(e) => return Err(e),
        };

        match self.lookup_step(order, &client_order_id, steps).await {
            Some(venue_order_id) => {
                tracing::info!(
                    order_id = %order.id(),
                    client_order_id = %client_order_id,
                    venue_order_id = %venue_order_id,
                    "Placement already resting, recovered venue id"
                );
                Ok(venue_order_id)
            }
            None => Err(error),
        }
    }

    async fn place_step(
        &self,
        order: &Order,
        client_order_id: ClientOrderId,
        steps: &mut Vec<ResolutionStep>,
    ) -> Result<VenueOrderId, DispatchError> {
        let request = PlaceOrderRequest::limit(
            client_order_id,
            order.symbol().to_string(),
            order.side(),
            order.quantity(),
            order.price(),
        );
        let venue = Arc::clone(&self.venue);

        let started = Instant::now();
        let result = self
            .dispatcher
            .dispatch(move || async move { venue.place_order(request).await })
            .await;

        steps.push(ResolutionStep {
            kind: StepKind::Place,
            venue_order_id: result.as_ref().ok().map(|id| id.value()),
            error: result.as_ref().err().map(ToString::to_string),
            elapsed_ms: started.elapsed().as_millis() as u64,
        });
        result
    }

    async fn cancel_step(
        &self,
        order: &Order,
        venue_order_id: VenueOrderId,
        steps: &mut Vec<ResolutionStep>,
    ) -> Result<(), DispatchError> {
        let request = CancelOrderRequest::new(order.symbol().to_string(), venue_order_id);
        let venue = Arc::clone(&self.venue);

        let started = Instant::now();
        let result = self
            .dispatcher
            .dispatch(move || async move { venue.cancel_order(request).await })
            .await;

        steps.push(ResolutionStep {
            kind: StepKind::Cancel,
            venue_order_id: Some(venue_order_id.value()),
            error: result.as_ref().err().map(ToString::to_string),
            elapsed_ms: started.elapsed().as_millis() as u64,
        });
        result
    }

    async fn lookup_step(
        &self,
        order: &Order,
        client_order_id: &ClientOrderId,
        steps: &mut Vec<ResolutionStep>,
    ) -> Option<VenueOrderId> {
        let symbol = order.symbol().to_string();
        let client_order_id = client_order_id.clone();
        let venue = Arc::clone(&self.venue);

        let started = Instant::now();
        let result = self
            .dispatcher
            .dispatch(move || async move {
                venue.find_open_order(&symbol, &client_order_id).await
            })
            .await;

        steps.push(ResolutionStep {
            kind: StepKind::Lookup,
            venue_order_id: result.as_ref().ok().copied().flatten().map(|id| id.value()),
            error: result.as_ref().err().map(ToString::to_string),
            elapsed_ms: started.elapsed().as_millis() as u64,
        });

        match result {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(order_id = %order.id(), error = %e, "Order lookup failed");
                None
            }
        }
    }
}

fn is_not_found(error: &DispatchError) -> bool {
    error.venue_error().is_some_and(VenueError::is_order_not_found)
}

// Resolver drives every transition itself, so a refused step is a bug.
fn checked<E: Display>(order_id: OrderId, step: Result<(), E>) {
    if let Err(e) = &step {
        tracing::error!(order_id = %order_id, error = %e, "Order lifecycle step refused");
    }
    debug_assert!(step.is_ok(), "lifecycle step refused for order {order_id}");
}

/// One turn at a time per order id.
#[derive(Debug, Default)]
struct OrderTurns {
    slots: parking_lot::Mutex<HashMap<u64, Arc<tokio::sync::Mutex<()>>>>,
}

impl OrderTurns {
    async fn run<F: Future>(&self, order_id: u64, work: F) -> F::Output {
        let slot = Arc::clone(self.slots.lock().entry(order_id).or_default());
        let output = {
            let _turn = slot.lock().await;
            work.await
        };

        // Only the map and this call still hold the slot: nobody is waiting.
        let mut slots = self.slots.lock();
        if Arc::strong_count(&slot) == 2 {
            slots.remove(&order_id);
        }
        output
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::DispatcherSettings;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Place(String),
        Cancel(i64),
        Lookup(String),
    }

    // Venue that answers from a script and records every call.
    #[derive(Default)]
    struct MockVenue {
        place_results: Mutex<VecDeque<Result<i64, VenueError>>>,
        cancel_results: Mutex<VecDeque<Result<(), VenueError>>>,
        open_by_client_id: Mutex<HashMap<String, i64>>,
        calls: Mutex<Vec<Call>>,
    }

    impl MockVenue {
        fn with_places(self, results: Vec<Result<i64, VenueError>>) -> Self {
            *self.place_results.lock() = results.into();
            self
        }

        fn with_cancels(self, results: Vec<Result<(), VenueError>>) -> Self {
            *self.cancel_results.lock() = results.into();
            self
        }

        fn with_open(self, client_order_id: &str, venue_order_id: i64) -> Self {
            self.open_by_client_id
                .lock()
                .insert(client_order_id.to_string(), venue_order_id);
            self
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl VenuePort for MockVenue {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn place_order(&self, request: PlaceOrderRequest) -> Result<VenueOrderId, VenueError> {
            self.calls
                .lock()
                .push(Call::Place(request.client_order_id.to_string()));
            self.place_results
                .lock()
                .pop_front()
                .unwrap_or(Ok(1))
                .map(VenueOrderId::new)
        }

        async fn cancel_order(&self, request: CancelOrderRequest) -> Result<(), VenueError> {
            self.calls
                .lock()
                .push(Call::Cancel(request.venue_order_id.value()));
            self.cancel_results.lock().pop_front().unwrap_or(Ok(()))
        }

        async fn find_open_order(
            &self,
            _symbol: &str,
            client_order_id: &ClientOrderId,
        ) -> Result<Option<VenueOrderId>, VenueError> {
            self.calls
                .lock()
                .push(Call::Lookup(client_order_id.to_string()));
            Ok(self
                .open_by_client_id
                .lock()
                .get(client_order_id.as_str())
                .copied()
                .map(VenueOrderId::new))
        }
    }

    fn resolver(venue: MockVenue) -> (OrderActionResolver<MockVenue>, Arc<MockVenue>) {
        let venue = Arc::new(venue);
        let dispatcher = OrderDispatcher::start(DispatcherSettings {
            pause: Duration::from_millis(1),
            capacity: 8,
            operation_timeout: Duration::from_secs(1),
        })
        .unwrap();
        (OrderActionResolver::new(Arc::clone(&venue), dispatcher), venue)
    }

    fn message(action: &str, venue_order_id: Option<i64>) -> OrderMessage {
        OrderMessage {
            id: 42,
            symbol: "BTCUSDT".to_string(),
            side: "BUY".to_string(),
            quantity: rust_decimal_macros::dec!(0.001),
            price: rust_decimal_macros::dec!(50000),
            status: String::new(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            venue_order_id,
            strategy_id: 7,
            action: action.to_string(),
            order_api_status: String::new(),
            error: None,
        }
    }

    fn rejected() -> VenueError {
        VenueError::Rejected {
            code: Some(-2010),
            reason: "insufficient balance".to_string(),
        }
    }

    fn duplicate() -> VenueError {
        VenueError::Rejected {
            code: Some(-2010),
            reason: "Duplicate order sent.".to_string(),
        }
    }

    fn not_found() -> VenueError {
        VenueError::OrderNotFound {
            venue_order_id: "123".to_string(),
        }
    }

    #[tokio::test]
    async fn place_records_venue_id() {
        let (resolver, venue) = resolver(MockVenue::default().with_places(vec![Ok(123)]));

        let result = resolver.resolve(message("place_order", None)).await;

        assert_eq!(result.outcome, ResolutionOutcome::Placed);
        assert_eq!(result.status(), OrderStatus::Placed);
        assert_eq!(result.venue_order_id(), Some(123));
        assert_eq!(result.error(), None);
        assert_eq!(result.record.order_api_status, "placed");
        assert_eq!(venue.calls(), vec![Call::Place("or-7-42-p".to_string())]);
    }

    #[tokio::test]
    async fn place_failure_has_no_venue_id() {
        let (resolver, venue) = resolver(MockVenue::default().with_places(vec![Err(rejected())]));

        let result = resolver.resolve(message("place_order", None)).await;

        assert_eq!(result.outcome, ResolutionOutcome::PlaceFailed);
        assert_eq!(result.status(), OrderStatus::Failed);
        assert_eq!(result.venue_order_id(), None);
        assert!(result.error().unwrap().contains("insufficient balance"));
        assert_eq!(
            venue.calls(),
            vec![
                Call::Place("or-7-42-p".to_string()),
                Call::Lookup("or-7-42-p".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn redelivered_place_recovers_resting_order() {
        let (resolver, _) = resolver(
            MockVenue::default()
                .with_places(vec![Err(duplicate())])
                .with_open("or-7-42-p", 555),
        );

        let result = resolver.resolve(message("place_order", None)).await;

        assert_eq!(result.outcome, ResolutionOutcome::Placed);
        assert_eq!(result.status(), OrderStatus::Placed);
        assert_eq!(result.venue_order_id(), Some(555));
        assert_eq!(result.error(), None);
        let kinds: Vec<_> = result.steps.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![StepKind::Place, StepKind::Lookup]);
        assert!(!result.steps[0].succeeded());
        assert_eq!(result.steps[1].venue_order_id, Some(555));
    }

    #[tokio::test]
    async fn transport_failure_on_place_skips_lookup() {
        let (resolver, venue) = resolver(MockVenue::default().with_places(vec![Err(
            VenueError::Transport {
                message: "connection reset".to_string(),
            },
        )]));

        let result = resolver.resolve(message("place_order", None)).await;

        assert_eq!(result.outcome, ResolutionOutcome::PlaceFailed);
        assert_eq!(venue.calls(), vec![Call::Place("or-7-42-p".to_string())]);
    }

    #[tokio::test]
    async fn cancel_clears_venue_id() {
        let (resolver, venue) = resolver(MockVenue::default());

        let result = resolver.resolve(message("cancel_orders", Some(123))).await;

        assert_eq!(result.outcome, ResolutionOutcome::Cancelled);
        assert_eq!(result.status(), OrderStatus::Cancelled);
        assert_eq!(result.venue_order_id(), None);
        assert_eq!(venue.calls(), vec![Call::Cancel(123)]);
    }

    #[tokio::test]
    async fn cancel_failure_keeps_venue_id() {
        let (resolver, _) = resolver(
            MockVenue::default().with_cancels(vec![Err(VenueError::Transport {
                message: "connection reset".to_string(),
            })]),
        );

        let result = resolver.resolve(message("cancel_orders", Some(123))).await;

        assert_eq!(result.outcome, ResolutionOutcome::CancelFailed);
        assert_eq!(result.status(), OrderStatus::Failed);
        assert_eq!(result.venue_order_id(), Some(123));
        assert!(result.error().unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn cancel_of_unknown_order_is_already_cancelled() {
        let (resolver, _) = resolver(MockVenue::default().with_cancels(vec![Err(not_found())]));

        let result = resolver.resolve(message("cancel_orders", Some(123))).await;

        assert_eq!(result.outcome, ResolutionOutcome::AlreadyCancelled);
        assert_eq!(result.status(), OrderStatus::Cancelled);
        assert_eq!(result.venue_order_id(), None);
        assert_eq!(result.error(), None);
    }

    #[tokio::test]
    async fn cancel_of_cancelled_command_makes_no_call() {
        let (resolver, venue) = resolver(MockVenue::default());
        let mut msg = message("cancel_orders", Some(123));
        msg.status = "CANCELLED".to_string();

        let result = resolver.resolve(msg).await;

        assert_eq!(result.outcome, ResolutionOutcome::AlreadyCancelled);
        assert_eq!(result.status(), OrderStatus::Cancelled);
        assert_eq!(result.venue_order_id(), None);
        assert!(venue.calls().is_empty());
    }

    #[tokio::test]
    async fn edit_replaces_order() {
        let (resolver, venue) = resolver(MockVenue::default().with_places(vec![Ok(456)]));

        let result = resolver.resolve(message("edit_order", Some(123))).await;

        assert_eq!(result.outcome, ResolutionOutcome::Replaced);
        assert_eq!(result.status(), OrderStatus::Placed);
        assert_eq!(result.venue_order_id(), Some(456));
        assert_eq!(
            venue.calls(),
            vec![Call::Cancel(123), Call::Place("or-7-42-e123".to_string())]
        );
        assert_eq!(result.steps.len(), 2);
        assert!(result.steps.iter().all(ResolutionStep::succeeded));
    }

    #[tokio::test]
    async fn edit_stops_when_cancel_fails() {
        let (resolver, venue) = resolver(MockVenue::default().with_cancels(vec![Err(rejected())]));

        let result = resolver.resolve(message("edit_order", Some(123))).await;

        assert_eq!(result.outcome, ResolutionOutcome::CancelOldFailed);
        assert_eq!(result.status(), OrderStatus::Placed);
        assert_eq!(result.venue_order_id(), Some(123));
        assert!(result.error().unwrap().contains("cancel of order 123 failed"));
        assert_eq!(
            result.saga.last(),
            Some(&crate::domain::order::EditSagaState::CancelOldFailed)
        );
        assert_eq!(venue.calls(), vec![Call::Cancel(123)]);
    }

    #[tokio::test]
    async fn edit_partial_failure_is_cancelled_with_error() {
        let (resolver, _) = resolver(MockVenue::default().with_places(vec![Err(rejected())]));

        let result = resolver.resolve(message("edit_order", Some(123))).await;

        assert_eq!(result.outcome, ResolutionOutcome::ReplaceFailedAfterCancel);
        assert_eq!(result.status(), OrderStatus::Cancelled);
        assert_eq!(result.venue_order_id(), None);
        assert!(result.error().unwrap().contains("123 cancelled"));
        assert!(
            result
                .saga
                .contains(&crate::domain::order::EditSagaState::OldCancelled)
        );
    }

    #[tokio::test]
    async fn edit_stops_when_old_order_already_gone() {
        let (resolver, venue) = resolver(
            MockVenue::default()
                .with_cancels(vec![Err(not_found())])
                .with_places(vec![Ok(789)]),
        );

        let result = resolver.resolve(message("edit_order", Some(123))).await;

        assert_eq!(result.outcome, ResolutionOutcome::CancelOldFailed);
        assert_eq!(result.status(), OrderStatus::Failed);
        assert_eq!(result.venue_order_id(), Some(123));
        assert!(result.error().unwrap().contains("not open at the venue"));
        assert_eq!(
            venue.calls(),
            vec![Call::Cancel(123), Call::Lookup("or-7-42-e123".to_string())]
        );
    }

    #[tokio::test]
    async fn redelivered_edit_resolves_to_resting_replacement() {
        let (resolver, venue) = resolver(
            MockVenue::default()
                .with_cancels(vec![Err(not_found())])
                .with_open("or-7-42-e123", 789),
        );

        let result = resolver.resolve(message("edit_order", Some(123))).await;

        assert_eq!(result.outcome, ResolutionOutcome::Replaced);
        assert_eq!(result.status(), OrderStatus::Placed);
        assert_eq!(result.venue_order_id(), Some(789));
        assert_eq!(
            venue.calls(),
            vec![Call::Cancel(123), Call::Lookup("or-7-42-e123".to_string())]
        );
        assert_eq!(
            result.saga.last(),
            Some(&crate::domain::order::EditSagaState::Replaced {
                venue_order_id: VenueOrderId::new(789)
            })
        );
    }

    #[tokio::test]
    async fn commands_for_one_order_run_one_after_another() {
        let (resolver, venue) = resolver(MockVenue::default().with_places(vec![Ok(124), Ok(125)]));

        let (first, second) = tokio::join!(
            resolver.resolve(message("edit_order", Some(123))),
            resolver.resolve(message("edit_order", Some(124))),
        );

        assert_eq!(first.venue_order_id(), Some(124));
        assert_eq!(second.venue_order_id(), Some(125));
        assert_eq!(
            venue.calls(),
            vec![
                Call::Cancel(123),
                Call::Place("or-7-42-e123".to_string()),
                Call::Cancel(124),
                Call::Place("or-7-42-e124".to_string()),
            ]
        );
        assert_eq!(resolver.turns.len(), 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "lifecycle step refused")]
    fn refused_lifecycle_step_fails_loudly() {
        checked(OrderId::new(42), Err("placed -> received"));
    }

    #[tokio::test]
    async fn unknown_action_is_rejected_without_dispatch() {
        let (resolver, venue) = resolver(MockVenue::default());

        let result = resolver.resolve(message("close_position", Some(123))).await;

        assert_eq!(result.outcome, ResolutionOutcome::Rejected);
        assert_eq!(result.status(), OrderStatus::Failed);
        assert!(result.error().unwrap().contains("unrecognized action"));
        assert!(venue.calls().is_empty());
        assert_eq!(resolver.dispatcher().stats().enqueued, 0);
    }

    #[tokio::test]
    async fn invalid_place_is_rejected_without_dispatch() {
        let (resolver, venue) = resolver(MockVenue::default());
        let mut msg = message("place_order", None);
        msg.quantity = rust_decimal::Decimal::ZERO;

        let result = resolver.resolve(msg).await;

        assert_eq!(result.outcome, ResolutionOutcome::Rejected);
        assert!(venue.calls().is_empty());
    }

    #[tokio::test]
    async fn closed_dispatcher_fails_the_order() {
        let (resolver, venue) = resolver(MockVenue::default());
        resolver.dispatcher().shutdown().await;

        let result = resolver.resolve(message("place_order", None)).await;

        assert_eq!(result.outcome, ResolutionOutcome::PlaceFailed);
        assert_eq!(result.error(), Some("dispatcher closed"));
        assert!(venue.calls().is_empty());
    }
}
