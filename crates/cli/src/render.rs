//! Text rendering of manager snapshots.

use std::fmt::Write;
use study_planner_domain::Task;
use study_planner_execution::prelude::SyncSnapshot;

/// Renders one task line.
pub fn task_line(task: &Task) -> String {
    let due = task.due_date_utc().map_or_else(
        || "No due date".to_string(),
        |d| format!("Due: {}", d.format("%Y-%m-%d")),
    );
    let mark = if task.completed { "x" } else { " " };
    let deleted = if task.exists { "" } else { " (deleted)" };
    format!("[{mark}] #{} {}{deleted}  {due}", task.id, task.title)
}

/// Renders the task count and list.
pub fn tasks(snapshot: &SyncSnapshot) -> String {
    let mut out = format!("Your task count: {}\n", snapshot.data.my_task_count);
    let live: Vec<&Task> = snapshot.data.tasks.iter().filter(|t| t.exists).collect();
    if live.is_empty() {
        out.push_str("No tasks found. Add your first study task with `add`.");
        return out;
    }
    for task in live {
        let _ = writeln!(out, "{}", task_line(task));
    }
    out.trim_end().to_string()
}

/// Renders transaction progress and the retained error.
pub fn status(snapshot: &SyncSnapshot) -> String {
    let mut out = String::new();
    let state = &snapshot.state;
    if let Some(hash) = &state.hash {
        let _ = writeln!(out, "Transaction hash: {hash}");
        if state.is_pending {
            let _ = writeln!(out, "Submitted, waiting to be picked up...");
        }
        if state.is_confirming {
            let _ = writeln!(out, "Waiting for confirmation...");
        }
        if state.is_confirmed {
            let _ = writeln!(out, "Transaction confirmed!");
        }
    }
    if let Some(error) = &state.error {
        let _ = writeln!(out, "Error: {error}");
    }
    if out.is_empty() {
        out.push_str("Idle.");
    }
    out.trim_end().to_string()
}
