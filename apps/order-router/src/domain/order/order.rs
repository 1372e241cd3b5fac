//! Order entity.
//!
//! One order command as the resolver sees it. The resolver owns the order
//! exclusively while processing it; every status change goes through the
//! transition methods below so the venue id invariant cannot be broken:
//! a venue order id is present iff a Place succeeded and no Cancel has
//! succeeded since.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::errors::{InvalidTransition, OrderValidationError};
use super::{OrderAction, OrderSide, OrderStatus};
use crate::domain::shared::{ClientOrderId, OrderId, StrategyId, VenueOrderId};

/// Decoded order command, prior to validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCommand {
    /// Router-side order id.
    pub id: OrderId,
    /// Venue symbol, e.g. `BTCUSDT`.
    pub symbol: String,
    /// Buy or sell.
    pub side: OrderSide,
    /// Order quantity.
    pub quantity: Decimal,
    /// Limit price.
    pub price: Decimal,
    /// Requested action.
    pub action: OrderAction,
    /// Resting venue order, if any.
    pub venue_order_id: Option<VenueOrderId>,
    /// Strategy correlation id.
    pub strategy_id: StrategyId,
    /// Timestamp carried on the message, passed through untouched.
    pub timestamp: String,
    /// Status the message carried when it was read.
    pub reported_status: OrderStatus,
}

impl OrderCommand {
    /// Validate the command parameters.
    ///
    /// # Errors
    ///
    /// Returns the first rule the command breaks.
    pub fn validate(&self) -> Result<(), OrderValidationError> {
        if self.symbol.trim().is_empty() {
            return Err(OrderValidationError::MissingSymbol);
        }

        if self.action.places_order() {
            if self.quantity <= Decimal::ZERO {
                return Err(OrderValidationError::NonPositiveQuantity(self.quantity));
            }
            if self.price <= Decimal::ZERO {
                return Err(OrderValidationError::NonPositivePrice(self.price));
            }
        }

        if self.action.requires_venue_id()
            && self.venue_order_id.is_none()
            && !self.is_redundant_cancel()
        {
            return Err(OrderValidationError::MissingVenueOrderId {
                action: self.action,
            });
        }

        Ok(())
    }

    /// A Cancel for an order already reported as cancelled.
    #[must_use]
    pub fn is_redundant_cancel(&self) -> bool {
        self.action == OrderAction::Cancel && self.reported_status == OrderStatus::Cancelled
    }
}

/// Order entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    symbol: String,
    side: OrderSide,
    quantity: Decimal,
    price: Decimal,
    action: OrderAction,
    venue_order_id: Option<VenueOrderId>,
    strategy_id: StrategyId,
    timestamp: String,
    status: OrderStatus,
    reported_status: OrderStatus,
}

impl Order {
    /// Accept a command into the router.
    ///
    /// A Place never starts out owning a venue order; any id on the message
    /// is dropped.
    ///
    /// # Errors
    ///
    /// Returns error if command validation fails.
    pub fn receive(cmd: OrderCommand) -> Result<Self, OrderValidationError> {
        cmd.validate()?;

        let venue_order_id = match cmd.action {
            OrderAction::Place => None,
            OrderAction::Cancel | OrderAction::Edit => cmd.venue_order_id,
        };

        Ok(Self {
            id: cmd.id,
            symbol: cmd.symbol.trim().to_ascii_uppercase(),
            side: cmd.side,
            quantity: cmd.quantity,
            price: cmd.price,
            action: cmd.action,
            venue_order_id,
            strategy_id: cmd.strategy_id,
            timestamp: cmd.timestamp,
            status: OrderStatus::Received,
            reported_status: cmd.reported_status,
        })
    }

    /// Get the order ID.
    #[must_use]
    pub const fn id(&self) -> OrderId {
        self.id
    }

    /// Get the symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Get the order side.
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        self.side
    }

    /// Get the quantity.
    #[must_use]
    pub const fn quantity(&self) -> Decimal {
        self.quantity
    }

    /// Get the limit price.
    #[must_use]
    pub const fn price(&self) -> Decimal {
        self.price
    }

    /// Get the requested action.
    #[must_use]
    pub const fn action(&self) -> OrderAction {
        self.action
    }

    /// Get the resting venue order id.
    #[must_use]
    pub const fn venue_order_id(&self) -> Option<VenueOrderId> {
        self.venue_order_id
    }

    /// Get the strategy correlation id.
    #[must_use]
    pub const fn strategy_id(&self) -> StrategyId {
        self.strategy_id
    }

    /// Get the message timestamp.
    #[must_use]
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Get the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Status the command carried on arrival.
    #[must_use]
    pub const fn reported_status(&self) -> OrderStatus {
        self.reported_status
    }

    /// Client id for placing this order.
    #[must_use]
    pub fn place_client_id(&self) -> ClientOrderId {
        ClientOrderId::for_place(self.strategy_id, self.id)
    }

    /// Client id for the replacement leg of an edit of the order resting as
    /// `replaced`.
    #[must_use]
    pub fn replacement_client_id(&self, replaced: VenueOrderId) -> ClientOrderId {
        ClientOrderId::for_replacement(self.strategy_id, self.id, replaced)
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// A venue call is about to be issued on behalf of this order.
    ///
    /// # Errors
    ///
    /// Returns error if the order already reached a terminal status.
    pub fn begin_dispatch(&mut self) -> Result<(), InvalidTransition> {
        self.transition(OrderStatus::Dispatching)
    }

    /// The venue accepted a placement.
    ///
    /// # Errors
    ///
    /// Returns error unless the order is dispatching.
    pub fn mark_placed(&mut self, venue_order_id: VenueOrderId) -> Result<(), InvalidTransition> {
        self.transition(OrderStatus::Placed)?;
        self.venue_order_id = Some(venue_order_id);
        Ok(())
    }

    /// The resting venue order is gone. Clears the venue id.
    ///
    /// # Errors
    ///
    /// Returns error if the order already reached a terminal status.
    pub fn mark_cancelled(&mut self) -> Result<(), InvalidTransition> {
        self.transition(OrderStatus::Cancelled)?;
        self.venue_order_id = None;
        Ok(())
    }

    /// The command failed. The venue id is left as it was.
    ///
    /// # Errors
    ///
    /// Returns error if the order already reached a terminal status.
    pub fn mark_failed(&mut self) -> Result<(), InvalidTransition> {
        self.transition(OrderStatus::Failed)
    }

    fn transition(&mut self, to: OrderStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(to) {
            return Err(InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}
