use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::PathBuf;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Task, Timestamp};

const SNAPSHOT_FILE: &str = "tasks.json";

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::Json(err) => write!(f, "json error: {err}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        StorageError::Io(value)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        StorageError::Json(value)
    }
}

/// On-disk record shape: timestamps travel as strings, flags default to
/// false, so snapshots written by older or foreign builds still decode.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    id: String,
    title: String,
    #[serde(default)]
    desc: String,
    #[serde(default)]
    due: Option<String>,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    notified: bool,
    created_at: String,
}

impl TaskRecord {
    fn from_task(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            desc: task.desc.clone(),
            due: task.due.map(format_timestamp),
            completed: task.completed,
            notified: task.notified,
            created_at: format_timestamp(task.created_at),
        }
    }

    /// Strict decode: a record without a usable id, title or creation time is
    /// rejected. A malformed `due` is normalized to "no deadline".
    fn into_task(self) -> Option<Task> {
        if self.id.trim().is_empty() || self.title.trim().is_empty() {
            return None;
        }
        let created_at = parse_timestamp(&self.created_at)?;
        let due = match self.due {
            Some(raw) => match parse_timestamp(&raw) {
                Some(ts) => Some(ts),
                None => {
                    log::warn!("task {}: unreadable due value {raw:?}, dropping deadline", self.id);
                    None
                }
            },
            None => None,
        };
        Some(Task {
            id: self.id,
            title: self.title,
            desc: self.desc,
            due,
            completed: self.completed,
            notified: self.notified,
            created_at,
        })
    }
}

fn format_timestamp(ts: Timestamp) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}

/// Accepts RFC3339, plus the naive `YYYY-MM-DDTHH:MM[:SS]` layout that
/// datetime form inputs produce. Naive values are read as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).timestamp());
    }
    for layout in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, layout) {
            return Some(naive.and_utc().timestamp());
        }
    }
    None
}

pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Reads the snapshot. A missing or unparsable snapshot loads as the
    /// empty collection; individual malformed records are dropped with a
    /// warning. This never fails the caller.
    pub fn load_tasks(&self) -> Vec<Task> {
        let path = self.root.join(SNAPSHOT_FILE);
        let mut buf = String::new();
        match File::open(&path) {
            Ok(mut file) => {
                if let Err(err) = file.read_to_string(&mut buf) {
                    log::warn!("failed to read {}: {err}", path.display());
                    return Vec::new();
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                log::warn!("failed to open {}: {err}", path.display());
                return Vec::new();
            }
        }

        let values: Vec<serde_json::Value> = match serde_json::from_str(&buf) {
            Ok(values) => values,
            Err(err) => {
                log::warn!("snapshot is not a task array, starting empty: {err}");
                return Vec::new();
            }
        };

        let mut tasks = Vec::with_capacity(values.len());
        for value in values {
            let decoded = serde_json::from_value::<TaskRecord>(value)
                .ok()
                .and_then(TaskRecord::into_task);
            match decoded {
                Some(task) => tasks.push(task),
                None => log::warn!("dropping malformed task record from snapshot"),
            }
        }
        tasks
    }

    /// Serializes the full collection and overwrites the snapshot atomically.
    pub fn save_tasks(&self, tasks: &[Task]) -> Result<(), StorageError> {
        let records: Vec<TaskRecord> = tasks.iter().map(TaskRecord::from_task).collect();
        let json = serde_json::to_vec_pretty(&records)?;
        let path = self.root.join(SNAPSHOT_FILE);
        let temp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(temp_path, path)?;
        Ok(())
    }
}
