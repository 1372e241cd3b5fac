//! Paper venue.
//!
//! In-process simulated venue. Placements get sequential venue ids and stay
//! open until cancelled; nothing ever fills. A client order id is refused
//! while another open order carries it, as on the real exchange; once that
//! order is cancelled the id may be used again.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::application::ports::{CancelOrderRequest, PlaceOrderRequest, VenueError, VenuePort};
use crate::domain::order::OrderSide;
use crate::domain::shared::{ClientOrderId, VenueOrderId};

/// A resting paper order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperOrder {
    /// Venue id.
    pub venue_order_id: VenueOrderId,
    /// Client id sent on placement.
    pub client_order_id: String,
    /// Symbol.
    pub symbol: String,
    /// Side.
    pub side: OrderSide,
    /// Quantity.
    pub quantity: Decimal,
    /// Limit price.
    pub price: Decimal,
}

#[derive(Debug, Default)]
struct Book {
    open: HashMap<VenueOrderId, PaperOrder>,
    open_client_ids: HashMap<String, VenueOrderId>,
}

/// Simulated venue.
#[derive(Debug)]
pub struct PaperVenue {
    next_id: AtomicI64,
    book: Mutex<Book>,
}

impl Default for PaperVenue {
    fn default() -> Self {
        Self::new()
    }
}

impl PaperVenue {
    /// Create a paper venue whose first order gets id 1.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Create a paper venue whose first order gets `first_id`.
    #[must_use]
    pub fn starting_at(first_id: i64) -> Self {
        Self {
            next_id: AtomicI64::new(first_id),
            book: Mutex::new(Book::default()),
        }
    }

    /// Open orders, by venue id.
    #[must_use]
    pub fn open_orders(&self) -> Vec<PaperOrder> {
        let mut orders: Vec<_> = self.book.lock().open.values().cloned().collect();
        orders.sort_by_key(|o| o.venue_order_id);
        orders
    }

    /// Whether `venue_order_id` is resting.
    #[must_use]
    pub fn is_open(&self, venue_order_id: VenueOrderId) -> bool {
        self.book.lock().open.contains_key(&venue_order_id)
    }
}

#[async_trait]
impl VenuePort for PaperVenue {
    fn name(&self) -> &'static str {
        "paper"
    }

    async fn place_order(&self, request: PlaceOrderRequest) -> Result<VenueOrderId, VenueError> {
        let mut book = self.book.lock();
        if book.open_client_ids.contains_key(request.client_order_id.as_str()) {
            return Err(VenueError::Rejected {
                code: Some(-2010),
                reason: format!("duplicate client order id {}", request.client_order_id),
            });
        }

        let venue_order_id = VenueOrderId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        book.open_client_ids
            .insert(request.client_order_id.as_str().to_string(), venue_order_id);
        book.open.insert(
            venue_order_id,
            PaperOrder {
                venue_order_id,
                client_order_id: request.client_order_id.as_str().to_string(),
                symbol: request.symbol,
                side: request.side,
                quantity: request.quantity,
                price: request.price,
            },
        );
        drop(book);

        tracing::debug!(venue_order_id = %venue_order_id, "Paper order opened");
        Ok(venue_order_id)
    }

    async fn cancel_order(&self, request: CancelOrderRequest) -> Result<(), VenueError> {
        let mut book = self.book.lock();
        let found = book
            .open
            .get(&request.venue_order_id)
            .is_some_and(|order| order.symbol == request.symbol);
        if !found {
            return Err(VenueError::OrderNotFound {
                venue_order_id: request.venue_order_id.to_string(),
            });
        }

        if let Some(order) = book.open.remove(&request.venue_order_id) {
            book.open_client_ids.remove(&order.client_order_id);
        }
        drop(book);

        tracing::debug!(venue_order_id = %request.venue_order_id, "Paper order cancelled");
        Ok(())
    }

    async fn find_open_order(
        &self,
        symbol: &str,
        client_order_id: &ClientOrderId,
    ) -> Result<Option<VenueOrderId>, VenueError> {
        let book = self.book.lock();
        Ok(book
            .open_client_ids
            .get(client_order_id.as_str())
            .copied()
            .filter(|id| book.open.get(id).is_some_and(|order| order.symbol == symbol)))
    }
}
