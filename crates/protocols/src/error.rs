use thiserror::Error;

/// Failures reported by a ledger client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Transport or node failure.
    #[error("connection error: {0}")]
    Connection(String),
    /// The contract reverted the call.
    #[error("execution reverted: {0}")]
    Reverted(String),
    /// The request was refused before a hash was produced, e.g. by the wallet.
    #[error("request rejected: {0}")]
    Rejected(String),
    /// No transaction with this hash is known to the client.
    #[error("unknown transaction {0}")]
    UnknownTransaction(String),
}
