use std::sync::{Arc, Mutex};

use crate::models::Task;

/// Owns the canonical in-memory task collection. Order is insertion order;
/// nothing here ever reorders, filtering happens at read time.
#[derive(Clone)]
pub struct TaskStore {
    inner: Arc<Mutex<Vec<Task>>>,
}

impl TaskStore {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(tasks)),
        }
    }

    /// Read-only view for the filter engine and the reminder scheduler.
    pub fn tasks(&self) -> Vec<Task> {
        let guard = self.inner.lock().expect("state poisoned");
        guard.clone()
    }

    pub fn add_task(&self, task: Task) {
        let mut guard = self.inner.lock().expect("state poisoned");
        guard.push(task);
    }

    pub fn replace_tasks(&self, tasks: Vec<Task>) {
        let mut guard = self.inner.lock().expect("state poisoned");
        *guard = tasks;
    }

    /// Flips `completed`; returns the updated task, or None for an unknown id
    /// (deletion races are expected, not an error).
    pub fn toggle_completed(&self, task_id: &str) -> Option<Task> {
        let mut guard = self.inner.lock().expect("state poisoned");
        let task = guard.iter_mut().find(|t| t.id == task_id)?;
        task.completed = !task.completed;
        Some(task.clone())
    }

    /// Removes the task if present; returns whether anything was removed.
    pub fn remove_task(&self, task_id: &str) -> bool {
        let mut guard = self.inner.lock().expect("state poisoned");
        let before = guard.len();
        guard.retain(|task| task.id != task_id);
        guard.len() != before
    }

    /// One-way transition: sets `notified` on the matching task. Returns
    /// whether a task was updated.
    pub fn mark_notified(&self, task_id: &str) -> bool {
        let mut guard = self.inner.lock().expect("state poisoned");
        match guard.iter_mut().find(|t| t.id == task_id) {
            Some(task) => {
                task.notified = true;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Task;

    fn make_task(id: &str) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task-{id}"),
            desc: String::new(),
            due: None,
            completed: false,
            notified: false,
            created_at: 1,
        }
    }

    #[test]
    fn add_preserves_insertion_order() {
        let store = TaskStore::new(Vec::new());
        store.add_task(make_task("a"));
        store.add_task(make_task("b"));
        store.add_task(make_task("c"));
        let ids: Vec<_> = store.tasks().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn toggle_completed_is_its_own_inverse() {
        let store = TaskStore::new(vec![make_task("a")]);

        let toggled = store.toggle_completed("a").expect("task exists");
        assert!(toggled.completed);
        let toggled = store.toggle_completed("a").expect("task exists");
        assert!(!toggled.completed);

        // Unknown id is a soft no-op.
        assert!(store.toggle_completed("missing").is_none());
    }

    #[test]
    fn remove_task_shrinks_by_exactly_one() {
        let store = TaskStore::new(vec![make_task("a"), make_task("b")]);
        assert!(store.remove_task("a"));
        assert_eq!(store.tasks().len(), 1);

        // Removing again is a no-op and reports false.
        assert!(!store.remove_task("a"));
        assert_eq!(store.tasks().len(), 1);
    }

    #[test]
    fn operations_after_delete_are_noops() {
        let store = TaskStore::new(vec![make_task("a")]);
        assert!(store.remove_task("a"));
        assert!(store.toggle_completed("a").is_none());
        assert!(!store.mark_notified("a"));
        assert!(store.tasks().is_empty());
    }

    #[test]
    fn mark_notified_sets_flag_once() {
        let store = TaskStore::new(vec![make_task("a")]);
        assert!(store.mark_notified("a"));
        assert!(store.tasks()[0].notified);

        // Idempotent: the flag never resets.
        assert!(store.mark_notified("a"));
        assert!(store.tasks()[0].notified);
    }

    #[test]
    fn replace_tasks_swaps_the_collection() {
        let store = TaskStore::new(vec![make_task("a")]);
        store.replace_tasks(vec![make_task("x"), make_task("y")]);
        let ids: Vec<_> = store.tasks().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, ["x", "y"]);
    }
}
