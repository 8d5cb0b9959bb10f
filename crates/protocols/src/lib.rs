//! Ledger client boundary for the Study Planner contract.
//!
//! Defines the capability the synchronization layer consumes (reads, writes
//! and confirmation watching) and an in-process implementation of the
//! contract used by tests and the terminal front end.

/// Ledger client errors.
pub mod error;
/// In-process Study Planner ledger.
pub mod memory;
/// Prelude module for convenient imports.
pub mod prelude;
/// Contract calls, transaction handles and confirmation streams.
pub mod transaction;

use async_trait::async_trait;
use study_planner_domain::{Address, RawTask};

pub use error::LedgerError;
pub use transaction::{
    ConfirmationEvent, ConfirmationSubscription, ContractCall, TransactionHandle, TxHash,
};

/// Read, write and watch access to the Study Planner contract.
///
/// Implementations own wallet, RPC and retry concerns; callers only see
/// typed calls and asynchronous results.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Reads `getMyTaskCount` for `owner`.
    async fn read_task_count(&self, owner: &Address) -> Result<u64, LedgerError>;

    /// Reads `getMyTasks` for `owner` in ledger order, undecoded.
    async fn read_tasks(&self, owner: &Address) -> Result<Vec<RawTask>, LedgerError>;

    /// Submits a state-mutating call signed by `owner`.
    async fn submit(
        &self,
        owner: &Address,
        call: ContractCall,
    ) -> Result<TransactionHandle, LedgerError>;

    /// Subscribes to confirmation progress of a submitted transaction.
    async fn watch_confirmation(
        &self,
        handle: &TransactionHandle,
    ) -> Result<ConfirmationSubscription, LedgerError>;
}
