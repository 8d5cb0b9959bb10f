use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A study task owned by one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Identifier, unique within the owner's task set.
    pub id: u64,
    /// Task label.
    pub title: String,
    /// Unix timestamp in seconds, `0` when there is no due date.
    pub due_date: u64,
    /// Whether the task was marked completed.
    pub completed: bool,
    /// Tombstone flag, `false` once the slot was deleted.
    pub exists: bool,
}

/// Tasks of one owner in ledger return order.
pub type TaskSet = Vec<Task>;

impl Task {
    /// Returns true when the task carries a due date.
    #[must_use]
    pub fn has_due_date(&self) -> bool {
        self.due_date != 0
    }

    /// Returns the due date as a UTC timestamp.
    #[must_use]
    pub fn due_date_utc(&self) -> Option<DateTime<Utc>> {
        if !self.has_due_date() {
            return None;
        }
        i64::try_from(self.due_date)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    /// Returns true unless the task was tombstoned.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.exists
    }
}
