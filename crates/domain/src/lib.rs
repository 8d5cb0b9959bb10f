//! Domain model for the Study Planner ledger contract.
//!
//! Holds the task records as the client sees them, the owner address type and
//! the normalization rules that turn raw contract return values into tasks.

/// Task entities.
pub mod entities;
/// Domain errors.
pub mod errors;
/// Raw contract data and normalization into tasks.
pub mod normalization;
/// Value objects.
pub mod value_objects;

pub use entities::task::{Task, TaskSet};
pub use errors::{DomainError, NormalizationError};
pub use normalization::{RawTask, RawTaskFields, normalize_task, normalize_tasks};
pub use value_objects::address::Address;
pub use value_objects::due_date::due_date_from_iso;
