//! Queue wire record.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::order::{OrderAction, OrderCommand, OrderSide, OrderStatus, OrderValidationError};
use crate::domain::shared::{OrderId, StrategyId, VenueOrderId};

/// Order command as carried on the inbound and outbound queues.
///
/// Inbound and outbound share one shape; the router only rewrites `status`,
/// `venue_order_id`, `order_api_status` and `error`. Field values are kept
/// as loose strings so that a bad value becomes a reported validation error
/// rather than an undecodable message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderMessage {
    /// Router-side order id.
    pub id: u64,
    /// Symbol.
    #[serde(default)]
    pub symbol: String,
    /// Side, `BUY` or `SELL`.
    #[serde(default)]
    pub side: String,
    /// Quantity.
    #[serde(default, with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
    /// Limit price.
    #[serde(default, with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Lifecycle status.
    #[serde(default)]
    pub status: String,
    /// Producer timestamp, passed through.
    #[serde(default)]
    pub timestamp: String,
    /// Venue order id; `0` and `null` both mean none.
    #[serde(
        default,
        alias = "binance_id",
        deserialize_with = "zero_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub venue_order_id: Option<i64>,
    /// Strategy correlation id.
    #[serde(default)]
    pub strategy_id: i64,
    /// `place_order`, `cancel_orders` or `edit_order`.
    #[serde(default)]
    pub action: String,
    /// Resolution outcome, for reporting.
    #[serde(default)]
    pub order_api_status: String,
    /// Error text, when the command did not succeed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn zero_as_none<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(deserializer)?.filter(|id| *id != 0))
}

impl OrderMessage {
    /// Decode a raw queue payload.
    ///
    /// # Errors
    ///
    /// Returns [`OrderValidationError::Malformed`] if the payload is not a
    /// valid record.
    pub fn decode(payload: &[u8]) -> Result<Self, OrderValidationError> {
        serde_json::from_slice(payload).map_err(|e| OrderValidationError::Malformed(e.to_string()))
    }

    /// Best-effort id of an undecodable payload, `0` when none can be found.
    #[must_use]
    pub fn salvage_id(payload: &[u8]) -> u64 {
        serde_json::from_slice::<serde_json::Value>(payload)
            .ok()
            .and_then(|v| v.get("id").and_then(serde_json::Value::as_u64))
            .unwrap_or(0)
    }

    /// Parse into a domain command. Field rules are checked later, when the
    /// command is received as an [`Order`](crate::domain::order::Order).
    ///
    /// The action is parsed first so that an unknown action is always
    /// reported as such.
    ///
    /// # Errors
    ///
    /// Returns the first field that fails to parse.
    pub fn to_command(&self) -> Result<OrderCommand, OrderValidationError> {
        let action: OrderAction = self.action.parse()?;
        let side = match self.side.parse::<OrderSide>() {
            Ok(side) => side,
            // A cancel never sends the side to the venue.
            Err(_) if !action.places_order() => OrderSide::Buy,
            Err(e) => return Err(e),
        };
        let reported_status: OrderStatus = self
            .status
            .parse()
            .map_err(OrderValidationError::Malformed)?;

        Ok(OrderCommand {
            id: OrderId::new(self.id),
            symbol: self.symbol.clone(),
            side,
            quantity: self.quantity,
            price: self.price,
            action,
            venue_order_id: self.venue_order_id.map(VenueOrderId::new),
            strategy_id: StrategyId::new(self.strategy_id),
            timestamp: self.timestamp.clone(),
            reported_status,
        })
    }
}
