use std::time::Duration;

use chrono::Utc;

use crate::commands::{persist_and_emit, CommandCtx};
use crate::models::{Task, Timestamp};
use crate::state::TaskStore;

/// A reminder may fire during the hour leading up to the due time.
pub const REMINDER_LEAD_SECS: Timestamp = 60 * 60;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Recurring reminder scan; lives for the whole session and is cancelled
/// only by process teardown.
pub async fn run_scheduler<C: CommandCtx>(ctx: C, state: TaskStore, tick: Duration) {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        let now = Utc::now().timestamp();
        let fired = run_reminder_tick(&ctx, &state, now);
        if fired > 0 {
            log::info!("reminder tick fired {fired} notification(s)");
        }
    }
}

/// One scan: fire a single notification per task inside its reminder window,
/// flip `notified`, persist once for the batch. Returns how many fired.
///
/// `notified` is set even when the permission check fails: delivery is gated
/// by the flag alone, the permission only silences the dispatch primitive.
pub fn run_reminder_tick(ctx: &impl CommandCtx, state: &TaskStore, now: Timestamp) -> usize {
    let pending = collect_pending_reminders(state, now);
    if pending.is_empty() {
        return 0;
    }
    let allowed = ctx.notifications_allowed();
    for task in &pending {
        if allowed {
            ctx.dispatch_notification(
                "Task Reminder",
                &format!("Task \"{}\" is due soon.", task.title),
            );
        }
        state.mark_notified(&task.id);
    }
    persist_and_emit(ctx, state);
    pending.len()
}

/// Tasks whose reminder window `[due - lead, due)` contains `now`. A window
/// that passed unobserved (app closed) never fires retroactively.
fn collect_pending_reminders(state: &TaskStore, now: Timestamp) -> Vec<Task> {
    let mut pending = Vec::new();
    for task in state.tasks() {
        if task.completed || task.notified {
            continue;
        }
        let due = match task.due {
            Some(due) => due,
            None => continue,
        };
        let reminder_time = due - REMINDER_LEAD_SECS;
        if now >= reminder_time && now < due {
            pending.push(task);
        }
    }
    pending
}
