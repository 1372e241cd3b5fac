//! Order domain errors.

use rust_decimal::Decimal;
use thiserror::Error;

use super::{OrderAction, OrderStatus};

/// Reasons a command is rejected before any dispatch is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderValidationError {
    /// Message could not be decoded.
    #[error("malformed order command: {0}")]
    Malformed(String),

    /// Action value is not one of the known wire strings.
    #[error("unrecognized action: {0:?}")]
    UnrecognizedAction(String),

    /// Side is neither BUY nor SELL.
    #[error("invalid side: {0:?}")]
    InvalidSide(String),

    /// Symbol is empty.
    #[error("symbol is required")]
    MissingSymbol,

    /// Quantity must be strictly positive.
    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(Decimal),

    /// Price must be strictly positive.
    #[error("price must be positive, got {0}")]
    NonPositivePrice(Decimal),

    /// Cancel and edit need a resting venue order.
    #[error("{action} requires a venue order id")]
    MissingVenueOrderId {
        /// The requested action.
        action: OrderAction,
    },
}

/// Illegal lifecycle move on an [`Order`](super::Order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid status transition {from} -> {to}")]
pub struct InvalidTransition {
    /// Current status.
    pub from: OrderStatus,
    /// Requested status.
    pub to: OrderStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_descriptive() {
        let err = OrderValidationError::MissingVenueOrderId {
            action: OrderAction::Cancel,
        };
        assert_eq!(err.to_string(), "cancel_orders requires a venue order id");

        let err = OrderValidationError::UnrecognizedAction("close".to_string());
        assert_eq!(err.to_string(), "unrecognized action: \"close\"");
    }

    #[test]
    fn invalid_transition_display() {
        let err = InvalidTransition {
            from: OrderStatus::Placed,
            to: OrderStatus::Dispatching,
        };
        assert_eq!(err.to_string(), "invalid status transition PLACED -> DISPATCHING");
    }
}
