//! Contract-state synchronization and transaction lifecycle management.
//!
//! This crate sits between a presentation layer and the Study Planner ledger
//! contract:
//! - Cached task count and task list for the active address
//! - Dispatch of `addTask`, `markCompleted` and `deleteTask`
//! - Confirmation tracking of submitted transactions
//! - Automatic refetch once a transaction is confirmed
//! - Error retention for display

/// Prelude module for convenient imports.
pub mod prelude;

/// Synchronization errors.
pub mod error;
/// Transaction lifecycle tracking.
pub mod lifecycle;
/// State synchronization.
pub mod sync;
