//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types from the crate.
//!
//! # Example
//!
//! ```rust
//! use study_planner_execution::prelude::*;
//! ```

// Errors
pub use crate::error::{ErrorKind, SyncError};

// Lifecycle
pub use crate::lifecycle::{StatusChange, TransactionRecord, TransactionStatus};

// Sync
pub use crate::sync::{ContractData, ContractState, SyncManager, SyncManagerConfig, SyncSnapshot};
