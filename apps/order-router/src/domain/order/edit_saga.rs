//! Edit saga: replace a resting venue order by cancelling it and placing a new one.
//!
//! The two venue calls are not atomic. The saga records every step so the
//! window between "old order cancelled" and "new order placed" is an
//! observable state rather than something hidden inside a single call.
//!
//! ```text
//! CancelOldInFlight ──fail──▶ CancelOldFailed            (old order untouched)
//!        │ ok
//!        ▼
//!   OldCancelled ──▶ PlaceNewInFlight ──fail──▶ ReplacementFailed  (old gone, no new)
//!                           │ ok
//!                           ▼
//!                        Replaced
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::shared::VenueOrderId;

/// A step of the edit saga.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum EditSagaState {
    /// Cancel of the old venue order submitted.
    CancelOldInFlight,
    /// Old venue order no longer rests at the venue.
    OldCancelled,
    /// Placement of the replacement submitted.
    PlaceNewInFlight,
    /// Replacement rests at the venue.
    Replaced {
        /// Venue id of the replacement.
        venue_order_id: VenueOrderId,
    },
    /// Cancel failed; the old order is still live.
    CancelOldFailed,
    /// Old order cancelled but the replacement was not placed.
    ReplacementFailed,
}

impl EditSagaState {
    /// Whether the saga has finished.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Replaced { .. } | Self::CancelOldFailed | Self::ReplacementFailed
        )
    }

    const fn name(&self) -> &'static str {
        match self {
            Self::CancelOldInFlight => "cancel_old_in_flight",
            Self::OldCancelled => "old_cancelled",
            Self::PlaceNewInFlight => "place_new_in_flight",
            Self::Replaced { .. } => "replaced",
            Self::CancelOldFailed => "cancel_old_failed",
            Self::ReplacementFailed => "replacement_failed",
        }
    }
}

impl fmt::Display for EditSagaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Step requested out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("edit saga cannot move from {from} to {to}")]
pub struct SagaStepError {
    /// State the saga was in.
    pub from: EditSagaState,
    /// State that was requested.
    pub to: EditSagaState,
}

/// Progress record of one edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditSaga {
    old_venue_order_id: VenueOrderId,
    history: Vec<EditSagaState>,
}

impl EditSaga {
    /// Begin an edit of the given resting order; the cancel is in flight.
    #[must_use]
    pub fn begin(old_venue_order_id: VenueOrderId) -> Self {
        Self {
            old_venue_order_id,
            history: vec![EditSagaState::CancelOldInFlight],
        }
    }

    /// Venue id of the order being replaced.
    #[must_use]
    pub const fn old_venue_order_id(&self) -> VenueOrderId {
        self.old_venue_order_id
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> EditSagaState {
        // history always holds at least the initial state
        self.history
            .last()
            .copied()
            .unwrap_or(EditSagaState::CancelOldInFlight)
    }

    /// Every state visited, oldest first.
    #[must_use]
    pub fn history(&self) -> &[EditSagaState] {
        &self.history
    }

    /// Whether the old order was cancelled and nothing replaced it.
    #[must_use]
    pub fn is_partial_failure(&self) -> bool {
        self.state() == EditSagaState::ReplacementFailed
    }

    /// Cancel of the old order confirmed.
    pub fn old_cancelled(&mut self) -> Result<(), SagaStepError> {
        self.advance(EditSagaState::OldCancelled)
    }

    /// Cancel of the old order failed.
    pub fn cancel_old_failed(&mut self) -> Result<(), SagaStepError> {
        self.advance(EditSagaState::CancelOldFailed)
    }

    /// Replacement placement submitted.
    pub fn place_new_started(&mut self) -> Result<(), SagaStepError> {
        self.advance(EditSagaState::PlaceNewInFlight)
    }

    /// Replacement placed.
    pub fn replaced(&mut self, venue_order_id: VenueOrderId) -> Result<(), SagaStepError> {
        self.advance(EditSagaState::Replaced { venue_order_id })
    }

    /// Replacement placement failed after the old order was cancelled.
    pub fn replacement_failed(&mut self) -> Result<(), SagaStepError> {
        self.advance(EditSagaState::ReplacementFailed)
    }

    fn advance(&mut self, to: EditSagaState) -> Result<(), SagaStepError> {
        let from = self.state();
        let allowed = matches!(
            (from, to),
            (
                EditSagaState::CancelOldInFlight,
                EditSagaState::OldCancelled | EditSagaState::CancelOldFailed
            ) | (EditSagaState::OldCancelled, EditSagaState::PlaceNewInFlight)
                | (
                    EditSagaState::PlaceNewInFlight,
                    EditSagaState::Replaced { .. } | EditSagaState::ReplacementFailed
                )
        );
        if !allowed {
            return Err(SagaStepError { from, to });
        }
        self.history.push(to);
        Ok(())
    }
}
