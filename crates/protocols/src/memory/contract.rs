//! Study Planner contract storage.

use crate::transaction::ContractCall;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use study_planner_domain::{Address, RawTask, Task};

/// How `deleteTask` treats the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeletionMode {
    /// Keep the slot with `exists = false`.
    #[default]
    Tombstone,
    /// Drop the record from the owner's list.
    Remove,
}

#[derive(Debug, Default)]
struct OwnerTasks {
    tasks: Vec<Task>,
    next_id: u64,
}

/// Per-owner task storage with the contract's mutation rules.
#[derive(Debug, Default)]
pub(crate) struct StudyPlannerContract {
    owners: HashMap<Address, OwnerTasks>,
    deletion: DeletionMode,
}

impl StudyPlannerContract {
    pub(crate) fn new(deletion: DeletionMode) -> Self {
        Self {
            owners: HashMap::new(),
            deletion,
        }
    }

    /// `getMyTaskCount`: tasks not deleted.
    pub(crate) fn task_count(&self, owner: &Address) -> u64 {
        self.owners.get(owner).map_or(0, |o| {
            o.tasks.iter().filter(|t| t.exists).count() as u64
        })
    }

    /// `getMyTasks`, encoded as positional tuples.
    pub(crate) fn raw_tasks(&self, owner: &Address) -> Vec<RawTask> {
        self.owners
            .get(owner)
            .map(|o| o.tasks.iter().map(encode_tuple).collect())
            .unwrap_or_default()
    }

    /// Applies a mined call, returning the revert reason on failure.
    pub(crate) fn apply(&mut self, owner: &Address, call: &ContractCall) -> Result<(), String> {
        match call {
            ContractCall::AddTask { title, due_date } => {
                if title.is_empty() {
                    return Err("Title cannot be empty".to_string());
                }
                let entry = self.owners.entry(owner.clone()).or_default();
                let id = entry.next_id;
                entry.next_id += 1;
                entry.tasks.push(Task {
                    id,
                    title: title.clone(),
                    due_date: *due_date,
                    completed: false,
                    exists: true,
                });
                Ok(())
            }
            ContractCall::MarkCompleted { id } => {
                let task = self.live_task_mut(owner, *id)?;
                if task.completed {
                    return Err("Task already completed".to_string());
                }
                task.completed = true;
                Ok(())
            }
            ContractCall::DeleteTask { id } => {
                let deletion = self.deletion;
                let task = self.live_task_mut(owner, *id)?;
                task.exists = false;
                if deletion == DeletionMode::Remove {
                    if let Some(entry) = self.owners.get_mut(owner) {
                        entry.tasks.retain(|t| t.exists);
                    }
                }
                Ok(())
            }
        }
    }

    fn live_task_mut(&mut self, owner: &Address, id: u64) -> Result<&mut Task, String> {
        self.owners
            .get_mut(owner)
            .and_then(|o| o.tasks.iter_mut().find(|t| t.id == id && t.exists))
            .ok_or_else(|| "Task does not exist".to_string())
    }
}

fn encode_tuple(task: &Task) -> RawTask {
    RawTask::Positional(vec![
        Value::from(task.id),
        Value::from(task.title.clone()),
        Value::from(task.due_date),
        Value::from(task.completed),
        Value::from(task.exists),
    ])
}
