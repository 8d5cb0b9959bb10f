use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

/// Hash identifying a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(String);

impl TxHash {
    /// Wraps a hash string as returned by the ledger.
    #[must_use]
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// Returns the hash as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State-mutating contract functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractCall {
    /// `addTask(title, dueDate)`; a due date of `0` means none.
    AddTask {
        /// Task label.
        title: String,
        /// Unix seconds.
        due_date: u64,
    },
    /// `markCompleted(id)`.
    MarkCompleted {
        /// Task id.
        id: u64,
    },
    /// `deleteTask(id)`.
    DeleteTask {
        /// Task id.
        id: u64,
    },
}

impl ContractCall {
    /// Returns the contract function name.
    #[must_use]
    pub fn function_name(&self) -> &'static str {
        match self {
            Self::AddTask { .. } => "addTask",
            Self::MarkCompleted { .. } => "markCompleted",
            Self::DeleteTask { .. } => "deleteTask",
        }
    }
}

/// Opaque reference to a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionHandle {
    /// Transaction hash.
    pub hash: TxHash,
}

/// Progress notification for a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmationEvent {
    /// Accepted by the node, not yet picked up.
    Pending,
    /// Waiting for inclusion.
    Confirming,
    /// Durably included.
    Confirmed,
    /// Reverted, dropped or timed out.
    Failed {
        /// Reason reported by the client.
        reason: String,
    },
}

impl ConfirmationEvent {
    /// Returns true for `Confirmed` and `Failed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed { .. })
    }
}

/// Cancellable stream of confirmation events.
///
/// Dropping the subscription detaches it from the ledger client.
#[derive(Debug)]
pub struct ConfirmationSubscription {
    rx: mpsc::Receiver<ConfirmationEvent>,
}

impl ConfirmationSubscription {
    /// Wraps the receiving half of an event channel.
    #[must_use]
    pub fn new(rx: mpsc::Receiver<ConfirmationEvent>) -> Self {
        Self { rx }
    }

    /// Waits for the next event; `None` once the client closed the stream.
    pub async fn next(&mut self) -> Option<ConfirmationEvent> {
        self.rx.recv().await
    }
}
