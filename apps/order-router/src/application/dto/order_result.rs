//! Resolution result DTOs.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::OrderMessage;
use crate::domain::order::{EditSagaState, Order, OrderStatus, OrderValidationError};

/// How a command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionOutcome {
    /// Place succeeded.
    Placed,
    /// Place failed; nothing rests at the venue.
    PlaceFailed,
    /// Cancel succeeded.
    Cancelled,
    /// Order was already gone; nothing to do.
    AlreadyCancelled,
    /// Cancel failed; the order still rests.
    CancelFailed,
    /// Edit succeeded; the replacement rests.
    Replaced,
    /// Edit stopped at its cancel step; the old order still rests.
    CancelOldFailed,
    /// Edit cancelled the old order but could not place the replacement.
    ReplaceFailedAfterCancel,
    /// Command refused before any dispatch.
    Rejected,
}

impl ResolutionOutcome {
    /// Stable name, used for `order_api_status` and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Placed => "placed",
            Self::PlaceFailed => "place_failed",
            Self::Cancelled => "cancelled",
            Self::AlreadyCancelled => "already_cancelled",
            Self::CancelFailed => "cancel_failed",
            Self::Replaced => "replaced",
            Self::CancelOldFailed => "cancel_old_failed",
            Self::ReplaceFailedAfterCancel => "replace_failed_after_cancel",
            Self::Rejected => "rejected",
        }
    }

    /// Whether the command did what it asked for.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Placed | Self::Cancelled | Self::AlreadyCancelled | Self::Replaced
        )
    }
}

impl fmt::Display for ResolutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of venue call made for a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Place order.
    Place,
    /// Cancel order.
    Cancel,
    /// Look up an open order by client id.
    Lookup,
}

/// One dispatched venue call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionStep {
    /// Call kind.
    pub kind: StepKind,
    /// Venue id cancelled, assigned by a place, or found by a lookup.
    pub venue_order_id: Option<i64>,
    /// Error text if the call failed.
    pub error: Option<String>,
    /// Time from submission to result, queueing included.
    pub elapsed_ms: u64,
}

impl ResolutionStep {
    /// Whether the call succeeded.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Final state of one command, ready to publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResult {
    /// Outbound record.
    pub record: OrderMessage,
    /// How the command ended.
    pub outcome: ResolutionOutcome,
    /// Venue calls made, in order.
    pub steps: Vec<ResolutionStep>,
    /// Edit saga states visited, for edits that were dispatched.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub saga: Vec<EditSagaState>,
}

impl OrderResult {
    /// Result for a command that went through the resolver.
    #[must_use]
    pub fn resolved(
        inbound: OrderMessage,
        order: &Order,
        outcome: ResolutionOutcome,
        error: Option<String>,
        steps: Vec<ResolutionStep>,
    ) -> Self {
        let record = OrderMessage {
            symbol: order.symbol().to_string(),
            status: order.status().to_string(),
            venue_order_id: order.venue_order_id().map(|id| id.value()),
            order_api_status: outcome.as_str().to_string(),
            error,
            ..inbound
        };
        Self {
            record,
            outcome,
            steps,
            saga: Vec::new(),
        }
    }

    /// Result for a command refused before dispatch.
    #[must_use]
    pub fn rejected(inbound: OrderMessage, error: &OrderValidationError) -> Self {
        let record = OrderMessage {
            status: OrderStatus::Failed.to_string(),
            order_api_status: ResolutionOutcome::Rejected.as_str().to_string(),
            error: Some(error.to_string()),
            ..inbound
        };
        Self {
            record,
            outcome: ResolutionOutcome::Rejected,
            steps: Vec::new(),
            saga: Vec::new(),
        }
    }

    /// Result for a payload that could not be decoded at all.
    #[must_use]
    pub fn malformed(payload: &[u8], error: &OrderValidationError) -> Self {
        let inbound = OrderMessage {
            id: OrderMessage::salvage_id(payload),
            ..OrderMessage::default()
        };
        Self::rejected(inbound, error)
    }

    /// Attach the edit saga history.
    #[must_use]
    pub fn with_saga(mut self, history: &[EditSagaState]) -> Self {
        self.saga = history.to_vec();
        self
    }

    /// Order id.
    #[must_use]
    pub const fn order_id(&self) -> u64 {
        self.record.id
    }

    /// Final status.
    #[must_use]
    pub fn status(&self) -> OrderStatus {
        self.record.status.parse().unwrap_or(OrderStatus::Failed)
    }

    /// Final venue id.
    #[must_use]
    pub const fn venue_order_id(&self) -> Option<i64> {
        self.record.venue_order_id
    }

    /// Error text.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.record.error.as_deref()
    }
}
