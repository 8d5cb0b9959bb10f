//! Per-transaction record.

use super::{StatusChange, TransactionStatus};
use study_planner_protocols::{ConfirmationEvent, ContractCall, TxHash};
use tracing::debug;

/// A submitted transaction and its lifecycle so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    /// Transaction hash.
    pub hash: TxHash,
    /// The contract call it carries.
    pub call: ContractCall,
    /// Current status.
    pub status: TransactionStatus,
    /// Failure reason once `Failed`.
    pub error: Option<String>,
    /// Every status entered, oldest first.
    pub history: Vec<StatusChange>,
}

impl TransactionRecord {
    /// Creates a record for a transaction the ledger just accepted.
    #[must_use]
    pub fn submitted(hash: TxHash, call: ContractCall) -> Self {
        Self {
            hash,
            call,
            status: TransactionStatus::Submitted,
            error: None,
            history: vec![StatusChange::now(TransactionStatus::Submitted)],
        }
    }

    /// Applies a confirmation event. Returns true if the status changed.
    pub fn apply(&mut self, event: &ConfirmationEvent) -> bool {
        let Some(next) = self.status.next(event) else {
            debug!(
                hash = %self.hash,
                status = ?self.status,
                event = ?event,
                "Ignoring confirmation event"
            );
            return false;
        };

        if let ConfirmationEvent::Failed { reason } = event {
            self.error = Some(reason.clone());
        }
        self.status = next;
        self.history.push(StatusChange::now(next));
        true
    }

    /// Marks the record failed without a ledger event, e.g. when watching
    /// could not continue.
    pub fn abandon(&mut self, reason: &str) {
        if self.status.is_terminal() {
            return;
        }
        self.error = Some(reason.to_string());
        self.status = TransactionStatus::Failed;
        self.history.push(StatusChange::now(TransactionStatus::Failed));
    }

    /// Returns true once confirmed or failed.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
