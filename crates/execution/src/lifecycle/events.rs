//! Lifecycle states and transitions.

use serde::{Deserialize, Serialize};
use study_planner_protocols::ConfirmationEvent;

/// Status of a tracked transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Nothing tracked.
    #[default]
    Idle,
    /// Accepted by the ledger client, hash assigned.
    Submitted,
    /// Being watched for inclusion.
    Confirming,
    /// Included; terminal.
    Confirmed,
    /// Reverted, dropped or timed out; terminal.
    Failed,
}

impl TransactionStatus {
    /// Returns true for `Confirmed` and `Failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed)
    }

    /// Returns the status reached by applying `event`, or `None` when the
    /// event does not move the machine forward.
    #[must_use]
    pub fn next(self, event: &ConfirmationEvent) -> Option<Self> {
        match (self, event) {
            (Self::Idle, _) | (Self::Confirmed | Self::Failed, _) => None,
            (_, ConfirmationEvent::Pending) => None,
            (Self::Submitted, ConfirmationEvent::Confirming) => Some(Self::Confirming),
            (Self::Confirming, ConfirmationEvent::Confirming) => None,
            (_, ConfirmationEvent::Confirmed) => Some(Self::Confirmed),
            (_, ConfirmationEvent::Failed { .. }) => Some(Self::Failed),
        }
    }
}

/// A recorded status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    /// Status entered.
    pub status: TransactionStatus,
    /// When it was entered.
    pub at: chrono::DateTime<chrono::Utc>,
}

impl StatusChange {
    /// Records entering `status` now.
    #[must_use]
    pub fn now(status: TransactionStatus) -> Self {
        Self {
            status,
            at: chrono::Utc::now(),
        }
    }
}
