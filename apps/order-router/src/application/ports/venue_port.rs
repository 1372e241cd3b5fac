//! Venue Port (Driven Port)
//!
//! The narrow capability surface the router needs from a trading venue:
//! place a limit order, cancel a resting order, find an open order by its
//! client id, and a couple of connectivity checks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order::OrderSide;
use crate::domain::shared::{ClientOrderId, VenueOrderId};

/// Request to place a limit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    /// Deterministic client id; duplicates are refused by the venue.
    pub client_order_id: ClientOrderId,
    /// Symbol to trade.
    pub symbol: String,
    /// Order side.
    pub side: OrderSide,
    /// Quantity.
    pub quantity: Decimal,
    /// Limit price.
    pub price: Decimal,
}

impl PlaceOrderRequest {
    /// Create a limit order request.
    #[must_use]
    pub const fn limit(
        client_order_id: ClientOrderId,
        symbol: String,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            client_order_id,
            symbol,
            side,
            quantity,
            price,
        }
    }
}

/// Request to cancel a resting order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrderRequest {
    /// Symbol the order rests on.
    pub symbol: String,
    /// Venue order id.
    pub venue_order_id: VenueOrderId,
}

impl CancelOrderRequest {
    /// Create a cancel request.
    #[must_use]
    pub const fn new(symbol: String, venue_order_id: VenueOrderId) -> Self {
        Self {
            symbol,
            venue_order_id,
        }
    }
}

/// Venue port error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VenueError {
    /// Network or HTTP failure.
    #[error("venue transport error: {message}")]
    Transport {
        /// Error details.
        message: String,
    },

    /// Order refused by the venue.
    #[error("order rejected: {reason}")]
    Rejected {
        /// Venue error code, if one was returned.
        code: Option<i64>,
        /// Rejection reason.
        reason: String,
    },

    /// The venue does not know the order.
    #[error("order not found: {venue_order_id}")]
    OrderNotFound {
        /// The missing order id.
        venue_order_id: String,
    },

    /// Venue-side rate limit hit.
    #[error("rate limited by venue")]
    RateLimited,

    /// Credentials refused.
    #[error("venue authentication failed: {message}")]
    Authentication {
        /// Error details.
        message: String,
    },

    /// Anything else.
    #[error("venue error: {message}")]
    Unknown {
        /// Error details.
        message: String,
    },
}

impl VenueError {
    /// Whether the venue refused the request outright.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// Whether the venue reported the order as unknown.
    #[must_use]
    pub const fn is_order_not_found(&self) -> bool {
        matches!(self, Self::OrderNotFound { .. })
    }
}

/// Port for venue interactions.
#[async_trait]
pub trait VenuePort: Send + Sync {
    /// Short name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Place a limit order; returns the venue-assigned id.
    async fn place_order(&self, request: PlaceOrderRequest) -> Result<VenueOrderId, VenueError>;

    /// Cancel a resting order.
    async fn cancel_order(&self, request: CancelOrderRequest) -> Result<(), VenueError>;

    /// Venue id of the open order placed with `client_order_id`, if any.
    ///
    /// Used to recover the id of an order whose placement is redelivered.
    async fn find_open_order(
        &self,
        _symbol: &str,
        _client_order_id: &ClientOrderId,
    ) -> Result<Option<VenueOrderId>, VenueError> {
        Ok(None)
    }

    /// Check the venue is reachable.
    async fn ping(&self) -> Result<(), VenueError> {
        Ok(())
    }

    /// Venue clock.
    async fn server_time(&self) -> Result<DateTime<Utc>, VenueError> {
        Ok(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::{OrderId, StrategyId};
    use rust_decimal_macros::dec;

    #[test]
    fn limit_request_carries_client_id() {
        let request = PlaceOrderRequest::limit(
            ClientOrderId::for_place(StrategyId::new(1), OrderId::new(2)),
            "BTCUSDT".to_string(),
            OrderSide::Buy,
            dec!(0.001),
            dec!(50000),
        );
        assert_eq!(request.client_order_id.as_str(), "or-1-2-p");
        assert_eq!(request.price, dec!(50000));
    }

    #[test]
    fn not_found_is_detected() {
        let err = VenueError::OrderNotFound {
            venue_order_id: "123".to_string(),
        };
        assert!(err.is_order_not_found());
        assert!(!VenueError::RateLimited.is_order_not_found());
        assert!(!err.is_rejection());
        assert_eq!(err.to_string(), "order not found: 123");
    }

    struct Bare;

    #[async_trait]
    impl VenuePort for Bare {
        fn name(&self) -> &'static str {
            "bare"
        }

        async fn place_order(&self, _: PlaceOrderRequest) -> Result<VenueOrderId, VenueError> {
            Ok(VenueOrderId::new(1))
        }

        async fn cancel_order(&self, _: CancelOrderRequest) -> Result<(), VenueError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn venue_without_lookup_finds_nothing() {
        let id = ClientOrderId::for_place(StrategyId::new(1), OrderId::new(2));
        assert_eq!(Bare.find_open_order("BTCUSDT", &id).await, Ok(None));
    }
}
