use serde::{Deserialize, Serialize};

use crate::models::{Task, Timestamp};

/// "Due soon" means a deadline within the next 24 hours.
pub const DUE_SOON_WINDOW_SECS: Timestamp = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FilterMode {
    #[default]
    All,
    Active,
    Completed,
    DueSoon,
}

impl std::str::FromStr for FilterMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "all" => Ok(FilterMode::All),
            "active" => Ok(FilterMode::Active),
            "completed" => Ok(FilterMode::Completed),
            "due-soon" => Ok(FilterMode::DueSoon),
            other => Err(format!("unknown filter mode: {other:?}")),
        }
    }
}

/// Pure read-time projection: keeps the surviving tasks in their original
/// insertion order, never mutates anything.
pub fn filter_tasks(tasks: &[Task], mode: FilterMode, now: Timestamp) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| matches_filter(task, mode, now))
        .cloned()
        .collect()
}

fn matches_filter(task: &Task, mode: FilterMode, now: Timestamp) -> bool {
    match mode {
        FilterMode::All => true,
        FilterMode::Active => !task.completed,
        FilterMode::Completed => task.completed,
        FilterMode::DueSoon => match task.due {
            Some(due) => due > now && due - now <= DUE_SOON_WINDOW_SECS,
            None => false,
        },
    }
}
