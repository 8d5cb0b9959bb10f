//! State synchronization with the Study Planner contract.
//!
//! Provides:
//! - Cached task count and task list per active address
//! - Transaction dispatch and confirmation watching
//! - Refetch of remote state once a transaction is confirmed

mod manager;
mod state;

pub use manager::*;
pub use state::*;
