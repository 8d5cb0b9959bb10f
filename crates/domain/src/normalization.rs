//! Normalization of raw `getMyTasks` return values.
//!
//! The contract client may hand back each task either as a named struct or as
//! a positional tuple in the order `[id, title, dueDate, completed, exists]`.
//! Absent or null fields fall back to defaults, except `id` which must always
//! coerce to a non-negative integer.

use crate::entities::task::{Task, TaskSet};
use crate::errors::NormalizationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const ID: usize = 0;
const TITLE: usize = 1;
const DUE_DATE: usize = 2;
const COMPLETED: usize = 3;
const EXISTS: usize = 4;

/// Named shape of a raw task record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTaskFields {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub title: Option<Value>,
    #[serde(default, rename = "dueDate", alias = "due_date")]
    pub due_date: Option<Value>,
    #[serde(default)]
    pub completed: Option<Value>,
    #[serde(default)]
    pub exists: Option<Value>,
}

/// A task record as returned by the ledger client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTask {
    /// Tuple in `[id, title, dueDate, completed, exists]` order.
    Positional(Vec<Value>),
    /// Object with named fields.
    Named(RawTaskFields),
}

impl RawTask {
    /// Looks a field up by its tuple position; null counts as absent.
    fn field(&self, position: usize) -> Option<&Value> {
        let value = match self {
            Self::Positional(values) => values.get(position),
            Self::Named(fields) => match position {
                ID => fields.id.as_ref(),
                TITLE => fields.title.as_ref(),
                DUE_DATE => fields.due_date.as_ref(),
                COMPLETED => fields.completed.as_ref(),
                EXISTS => fields.exists.as_ref(),
                _ => None,
            },
        };
        value.filter(|v| !v.is_null())
    }
}

fn coerce_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
                s.parse().ok()
            } else {
                None
            }
        }
        _ => None,
    }
}

fn invalid_field(index: usize, field: &'static str, value: &Value) -> NormalizationError {
    NormalizationError::InvalidField {
        index,
        field,
        value: value.to_string(),
    }
}

fn bool_field(
    raw: &RawTask,
    index: usize,
    name: &'static str,
    position: usize,
    default: bool,
) -> Result<bool, NormalizationError> {
    match raw.field(position) {
        None => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(invalid_field(index, name, other)),
    }
}

fn normalize_at(raw: &RawTask, index: usize) -> Result<Task, NormalizationError> {
    let id = match raw.field(ID) {
        Some(value) => coerce_u64(value).ok_or_else(|| NormalizationError::InvalidId {
            index,
            value: value.to_string(),
        })?,
        None => {
            return Err(NormalizationError::InvalidId {
                index,
                value: Value::Null.to_string(),
            });
        }
    };

    let title = match raw.field(TITLE) {
        None => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => v.to_string(),
        Some(other) => return Err(invalid_field(index, "title", other)),
    };

    let due_date = match raw.field(DUE_DATE) {
        None => 0,
        Some(value) => coerce_u64(value).ok_or_else(|| invalid_field(index, "dueDate", value))?,
    };

    Ok(Task {
        id,
        title,
        due_date,
        completed: bool_field(raw, index, "completed", COMPLETED, false)?,
        exists: bool_field(raw, index, "exists", EXISTS, true)?,
    })
}

/// Normalizes a single raw record.
///
/// # Errors
/// Returns a [`NormalizationError`] if `id` does not coerce to an integer or
/// another field has an incompatible type.
pub fn normalize_task(raw: &RawTask) -> Result<Task, NormalizationError> {
    normalize_at(raw, 0)
}

/// Normalizes a full `getMyTasks` result, preserving ledger order.
///
/// A single malformed record fails the whole batch; no record is dropped
/// silently.
///
/// # Errors
/// Returns the [`NormalizationError`] of the first malformed record.
pub fn normalize_tasks(raw: &[RawTask]) -> Result<TaskSet, NormalizationError> {
    raw.iter()
        .enumerate()
        .map(|(index, record)| normalize_at(record, index))
        .collect()
}
