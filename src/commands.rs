use std::path::PathBuf;

use chrono::Utc;

use crate::events::StatePayload;
use crate::filter::{filter_tasks, FilterMode};
use crate::models::{Task, Timestamp};
use crate::state::TaskStore;
use crate::storage::{Storage, StorageError};

/// Host environment for the command layer: where the snapshot lives, how the
/// view hears about state changes, and the local notification primitive.
pub trait CommandCtx {
    fn data_dir(&self) -> Result<PathBuf, StorageError>;
    fn emit_state_updated(&self, payload: StatePayload);
    /// Permission check for the local alert channel.
    fn notifications_allowed(&self) -> bool;
    /// One-shot local alert. Only called when the permission check passed.
    fn dispatch_notification(&self, title: &str, body: &str);
}

#[derive(Debug, serde::Serialize)]
pub struct CommandResult<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

fn ok<T>(data: T) -> CommandResult<T> {
    CommandResult {
        ok: true,
        data: Some(data),
        error: None,
    }
}

fn err<T>(message: &str) -> CommandResult<T> {
    CommandResult {
        ok: false,
        data: None,
        error: Some(message.to_string()),
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ValidationError {
    EmptyTitle,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyTitle => write!(f, "task title must not be empty"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Input for `create_task`; the only way a task enters the collection.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub due: Option<Timestamp>,
}

fn persist(ctx: &impl CommandCtx, state: &TaskStore) -> Result<(), StorageError> {
    let storage = Storage::new(ctx.data_dir()?);
    storage.ensure_dirs()?;
    storage.save_tasks(&state.tasks())
}

/// Persist-and-notify step run after every mutation. A failed write is a
/// warning, not a command failure: in-memory state stays authoritative for
/// the rest of the session.
pub(crate) fn persist_and_emit(ctx: &impl CommandCtx, state: &TaskStore) {
    if let Err(error) = persist(ctx, state) {
        log::warn!("failed to persist tasks, keeping in-memory state: {error}");
    }
    ctx.emit_state_updated(StatePayload {
        tasks: state.tasks(),
    });
}

/// Loads the stored snapshot into the store. A missing or corrupt snapshot
/// loads as the empty collection.
pub fn load_state(ctx: &impl CommandCtx, state: &TaskStore) -> CommandResult<Vec<Task>> {
    let root = match ctx.data_dir() {
        Ok(path) => path,
        Err(e) => return err(&format!("data_dir error: {e}")),
    };
    let storage = Storage::new(root);
    if let Err(error) = storage.ensure_dirs() {
        return err(&format!("storage error: {error}"));
    }
    let tasks = storage.load_tasks();
    state.replace_tasks(tasks.clone());
    ok(tasks)
}

/// Validates the title, appends a fresh task to the end of the collection,
/// persists and emits. Fails only on an empty/whitespace title.
pub fn create_task(
    ctx: &impl CommandCtx,
    state: &TaskStore,
    new_task: NewTask,
) -> CommandResult<Task> {
    let title = new_task.title.trim();
    if title.is_empty() {
        return err(&ValidationError::EmptyTitle.to_string());
    }
    let task = Task::new(
        title.to_string(),
        new_task.desc.trim().to_string(),
        new_task.due,
        Utc::now().timestamp(),
    );
    state.add_task(task.clone());
    persist_and_emit(ctx, state);
    ok(task)
}

/// Flips `completed` on the matching task. An unknown id is a soft no-op
/// reported as `data = false`.
pub fn toggle_task(ctx: &impl CommandCtx, state: &TaskStore, task_id: &str) -> CommandResult<bool> {
    let found = state.toggle_completed(task_id).is_some();
    if found {
        persist_and_emit(ctx, state);
    }
    ok(found)
}

/// Permanently removes the matching task. An unknown id is a soft no-op
/// reported as `data = false`.
pub fn delete_task(ctx: &impl CommandCtx, state: &TaskStore, task_id: &str) -> CommandResult<bool> {
    let removed = state.remove_task(task_id);
    if removed {
        persist_and_emit(ctx, state);
    }
    ok(removed)
}

/// Filtered read for the view; pure, no persistence.
pub fn list_tasks(state: &TaskStore, mode: FilterMode, now: Timestamp) -> CommandResult<Vec<Task>> {
    ok(filter_tasks(&state.tasks(), mode, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;

    struct TestCtx {
        root: tempfile::TempDir,
        data_dir_error: Option<String>,
        emitted: Mutex<Vec<StatePayload>>,
        notifications: Mutex<Vec<(String, String)>>,
        allow_notifications: bool,
    }

    impl TestCtx {
        fn new() -> Self {
            Self {
                root: tempfile::tempdir().unwrap(),
                data_dir_error: None,
                emitted: Mutex::new(Vec::new()),
                notifications: Mutex::new(Vec::new()),
                allow_notifications: true,
            }
        }

        fn with_data_dir_error(message: &str) -> Self {
            let mut ctx = Self::new();
            ctx.data_dir_error = Some(message.to_string());
            ctx
        }

        fn emitted_count(&self) -> usize {
            self.emitted.lock().unwrap().len()
        }
    }

    impl CommandCtx for TestCtx {
        fn data_dir(&self) -> Result<PathBuf, StorageError> {
            if let Some(message) = &self.data_dir_error {
                return Err(StorageError::Io(std::io::Error::other(message.clone())));
            }
            Ok(self.root.path().to_path_buf())
        }

        fn emit_state_updated(&self, payload: StatePayload) {
            self.emitted.lock().unwrap().push(payload);
        }

        fn notifications_allowed(&self) -> bool {
            self.allow_notifications
        }

        fn dispatch_notification(&self, title: &str, body: &str) {
            self.notifications
                .lock()
                .unwrap()
                .push((title.to_string(), body.to_string()));
        }
    }

    fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            desc: String::new(),
            due: None,
        }
    }

    #[test]
    fn create_task_appends_persists_and_emits() {
        let ctx = TestCtx::new();
        let state = TaskStore::new(Vec::new());
        let before = Utc::now().timestamp();

        let result = create_task(&ctx, &state, new_task("  write report  "));
        assert!(result.ok);
        let task = result.data.unwrap();
        assert_eq!(task.title, "write report");
        assert!(!task.completed);
        assert!(!task.notified);
        assert!(task.created_at >= before);
        assert!(task.created_at <= Utc::now().timestamp());

        // Persisted: a fresh load from the same directory sees the task.
        let storage = Storage::new(ctx.root.path().to_path_buf());
        let on_disk = storage.load_tasks();
        assert_eq!(on_disk.len(), 1);
        assert_eq!(on_disk[0].id, task.id);

        // Emitted exactly once, with the current collection.
        let emitted = ctx.emitted.lock().unwrap();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].tasks.len(), 1);
    }

    #[test]
    fn create_task_rejects_blank_title_and_changes_nothing() {
        let ctx = TestCtx::new();
        let state = TaskStore::new(Vec::new());

        let result = create_task(&ctx, &state, new_task("   "));
        assert!(!result.ok);
        assert_eq!(result.error.as_deref(), Some("task title must not be empty"));
        assert!(state.tasks().is_empty());
        assert_eq!(ctx.emitted_count(), 0);
        assert!(!ctx.root.path().join("tasks.json").exists());
    }

    #[test]
    fn created_tasks_keep_insertion_order_and_unique_ids() {
        let ctx = TestCtx::new();
        let state = TaskStore::new(Vec::new());
        for title in ["first", "second", "third"] {
            assert!(create_task(&ctx, &state, new_task(title)).ok);
        }
        let tasks = state.tasks();
        let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["first", "second", "third"]);

        let mut ids: Vec<_> = tasks.iter().map(|t| t.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn create_task_survives_persist_failure_in_memory() {
        // data_dir errors make every save fail; the command still succeeds
        // and the in-memory collection stays authoritative.
        let ctx = TestCtx::with_data_dir_error("disk on fire");
        let state = TaskStore::new(Vec::new());

        let result = create_task(&ctx, &state, new_task("kept in memory"));
        assert!(result.ok);
        assert_eq!(state.tasks().len(), 1);
        // The changed signal still reaches the view.
        assert_eq!(ctx.emitted_count(), 1);
    }

    #[test]
    fn toggle_task_flips_and_double_toggle_restores() {
        let ctx = TestCtx::new();
        let state = TaskStore::new(Vec::new());
        let task = create_task(&ctx, &state, new_task("flip me")).data.unwrap();

        let result = toggle_task(&ctx, &state, &task.id);
        assert!(result.ok);
        assert_eq!(result.data, Some(true));
        assert!(state.tasks()[0].completed);

        toggle_task(&ctx, &state, &task.id);
        assert!(!state.tasks()[0].completed);

        // Both toggles persisted.
        let storage = Storage::new(ctx.root.path().to_path_buf());
        assert!(!storage.load_tasks()[0].completed);
    }

    #[test]
    fn toggle_unknown_id_is_a_soft_noop() {
        let ctx = TestCtx::new();
        let state = TaskStore::new(Vec::new());

        let result = toggle_task(&ctx, &state, "missing");
        assert!(result.ok);
        assert_eq!(result.data, Some(false));
        assert_eq!(ctx.emitted_count(), 0);
    }

    #[test]
    fn delete_task_removes_and_repeat_delete_is_noop() {
        let ctx = TestCtx::new();
        let state = TaskStore::new(Vec::new());
        let task = create_task(&ctx, &state, new_task("remove me")).data.unwrap();
        create_task(&ctx, &state, new_task("keep me"));

        let result = delete_task(&ctx, &state, &task.id);
        assert!(result.ok);
        assert_eq!(result.data, Some(true));
        assert_eq!(state.tasks().len(), 1);

        let again = delete_task(&ctx, &state, &task.id);
        assert_eq!(again.data, Some(false));
        assert_eq!(state.tasks().len(), 1);

        let storage = Storage::new(ctx.root.path().to_path_buf());
        let on_disk = storage.load_tasks();
        assert_eq!(on_disk.len(), 1);
        assert_eq!(on_disk[0].title, "keep me");
    }

    #[test]
    fn load_state_replaces_the_collection_from_disk() {
        let ctx = TestCtx::new();
        let state = TaskStore::new(Vec::new());
        create_task(&ctx, &state, new_task("saved earlier"));

        // A second session starts empty and loads the snapshot.
        let fresh = TaskStore::new(Vec::new());
        let result = load_state(&ctx, &fresh);
        assert!(result.ok);
        assert_eq!(fresh.tasks().len(), 1);
        assert_eq!(fresh.tasks()[0].title, "saved earlier");
    }

    #[test]
    fn load_state_with_no_snapshot_yields_empty_collection() {
        let ctx = TestCtx::new();
        let state = TaskStore::new(Vec::new());
        let result = load_state(&ctx, &state);
        assert!(result.ok);
        assert_eq!(result.data, Some(Vec::new()));
    }

    #[test]
    fn load_state_with_corrupt_snapshot_yields_empty_collection() {
        let ctx = TestCtx::new();
        fs::write(ctx.root.path().join("tasks.json"), "][ nope").unwrap();
        let state = TaskStore::new(Vec::new());
        let result = load_state(&ctx, &state);
        assert!(result.ok);
        assert_eq!(result.data, Some(Vec::new()));
    }

    #[test]
    fn load_state_reports_data_dir_errors() {
        let ctx = TestCtx::with_data_dir_error("nope");
        let state = TaskStore::new(Vec::new());
        let result = load_state(&ctx, &state);
        assert!(!result.ok);
        assert!(result.error.unwrap().contains("data_dir error"));
    }

    #[test]
    fn list_tasks_applies_the_filter_engine() {
        let ctx = TestCtx::new();
        let state = TaskStore::new(Vec::new());
        create_task(&ctx, &state, new_task("active one"));
        let done = create_task(&ctx, &state, new_task("done one")).data.unwrap();
        toggle_task(&ctx, &state, &done.id);

        let now = Utc::now().timestamp();
        let active = list_tasks(&state, FilterMode::Active, now).data.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].title, "active one");

        let completed = list_tasks(&state, FilterMode::Completed, now).data.unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].title, "done one");
    }
}
