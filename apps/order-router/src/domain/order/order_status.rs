//! Order status in the routing lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of an order command inside the router.
///
/// `Received → Dispatching → {Placed | Cancelled | Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Command taken off the queue, nothing sent yet.
    Received,
    /// At least one venue call issued, outcome pending.
    Dispatching,
    /// A venue order is resting.
    Placed,
    /// The venue order is gone.
    Cancelled,
    /// The command could not be carried out.
    Failed,
}

impl OrderStatus {
    /// Returns true if the status ends processing of a command.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Placed | Self::Cancelled | Self::Failed)
    }

    /// Whether moving to `next` is a legal lifecycle step.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Received, Self::Dispatching | Self::Failed | Self::Cancelled)
                | (Self::Dispatching, Self::Dispatching)
                | (
                    Self::Dispatching,
                    Self::Placed | Self::Cancelled | Self::Failed
                )
        )
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "RECEIVED" | "NEW" => Ok(Self::Received),
            "DISPATCHING" => Ok(Self::Dispatching),
            "PLACED" => Ok(Self::Placed),
            "CANCELLED" | "CANCELED" => Ok(Self::Cancelled),
            "FAILED" => Ok(Self::Failed),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => write!(f, "RECEIVED"),
            Self::Dispatching => write!(f, "DISPATCHING"),
            Self::Placed => write!(f, "PLACED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}
