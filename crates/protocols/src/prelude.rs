//! Prelude module for convenient imports.
//!
//! ```rust
//! use study_planner_protocols::prelude::*;
//! ```

pub use crate::LedgerClient;
pub use crate::error::LedgerError;
pub use crate::memory::{
    ConfirmationMode, DeletionMode, InMemoryLedger, InMemoryLedgerConfig, ReadStats,
};
pub use crate::transaction::{
    ConfirmationEvent, ConfirmationSubscription, ContractCall, TransactionHandle, TxHash,
};
