use study_planner_domain::NormalizationError;
use study_planner_protocols::{LedgerError, TxHash};
use thiserror::Error;

/// Propagation class of a [`SyncError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Reading or decoding remote state failed; never thrown to callers.
    Read,
    /// A mutating request failed before producing a hash; thrown to the caller.
    Submission,
    /// A submitted transaction failed on-chain; recorded only.
    Confirmation,
}

/// Errors surfaced by the synchronization layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// An action was invoked while no address is active.
    #[error("no active address")]
    NotActive,
    /// Task count or task list could not be read.
    #[error("failed to read tasks: {0}")]
    Read(LedgerError),
    /// The ledger returned malformed task data.
    #[error("malformed task data: {0}")]
    Normalization(NormalizationError),
    /// The mutating request was rejected before a hash was assigned.
    #[error("transaction submission failed: {0}")]
    Submission(LedgerError),
    /// The transaction reverted, was dropped or timed out.
    #[error("transaction {hash} failed: {reason}")]
    Confirmation {
        /// Transaction hash.
        hash: TxHash,
        /// Reason reported by the ledger client.
        reason: String,
    },
    /// The confirmation stream ended without a final result.
    #[error("lost track of transaction {hash} before it settled")]
    WatchClosed {
        /// Transaction hash.
        hash: TxHash,
    },
}

impl SyncError {
    /// Returns the propagation class of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Read(_) | Self::Normalization(_) => ErrorKind::Read,
            Self::NotActive | Self::Submission(_) => ErrorKind::Submission,
            Self::Confirmation { .. } | Self::WatchClosed { .. } => ErrorKind::Confirmation,
        }
    }
}
