//! Requested action on an order command.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::OrderValidationError;

/// What the command asks the router to do with the order.
///
/// Parsed from the queue's wire strings; anything else is rejected with
/// [`OrderValidationError::UnrecognizedAction`] before a dispatch happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderAction {
    /// Place a new order at the venue.
    #[serde(rename = "place_order")]
    Place,
    /// Cancel the resting venue order.
    #[serde(rename = "cancel_orders")]
    Cancel,
    /// Replace the resting venue order (cancel, then place).
    #[serde(rename = "edit_order")]
    Edit,
}

impl OrderAction {
    /// Wire value used on the queue.
    #[must_use]
    pub const fn as_wire_str(&self) -> &'static str {
        match self {
            Self::Place => "place_order",
            Self::Cancel => "cancel_orders",
            Self::Edit => "edit_order",
        }
    }

    /// Whether the action needs an existing venue order id.
    #[must_use]
    pub const fn requires_venue_id(&self) -> bool {
        matches!(self, Self::Cancel | Self::Edit)
    }

    /// Whether the action submits a priced order to the venue.
    #[must_use]
    pub const fn places_order(&self) -> bool {
        matches!(self, Self::Place | Self::Edit)
    }
}

impl FromStr for OrderAction {
    type Err = OrderValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "place_order" => Ok(Self::Place),
            "cancel_orders" => Ok(Self::Cancel),
            "edit_order" => Ok(Self::Edit),
            other => Err(OrderValidationError::UnrecognizedAction(other.to_string())),
        }
    }
}

impl fmt::Display for OrderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire_str())
    }
}
