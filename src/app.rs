//! Console view glue: a thin line-oriented front end over the command layer.
//! All task logic lives in the library modules; this file only wires stdin
//! commands to store operations and renders their output.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::commands::{self, CommandCtx, NewTask};
use crate::events::{StatePayload, EVENT_REMINDER, EVENT_STATE_UPDATED};
use crate::filter::FilterMode;
use crate::models::Task;
use crate::scheduler::{run_scheduler, DEFAULT_TICK_INTERVAL};
use crate::state::TaskStore;
use crate::storage::{self, StorageError};

#[derive(Clone)]
struct AppCtx {
    data_dir: PathBuf,
    notifications_allowed: bool,
}

impl CommandCtx for AppCtx {
    fn data_dir(&self) -> Result<PathBuf, StorageError> {
        Ok(self.data_dir.clone())
    }

    fn emit_state_updated(&self, payload: StatePayload) {
        log::debug!("{EVENT_STATE_UPDATED}: {} task(s)", payload.tasks.len());
    }

    fn notifications_allowed(&self) -> bool {
        self.notifications_allowed
    }

    fn dispatch_notification(&self, title: &str, body: &str) {
        log::info!("{EVENT_REMINDER}: {body}");
        // Terminal bell plus a banner line is our local one-shot alert.
        println!("\x07\n*** [{title}] {body}");
    }
}

fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("DUETICK_DATA_DIR") {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::data_dir()
        .map(|base| base.join("duetick"))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn run() {
    let data_dir = resolve_data_dir();
    if let Err(error) = crate::logging::init_logging(&data_dir) {
        eprintln!("warning: logging unavailable: {error}");
    }

    let ctx = AppCtx {
        data_dir,
        notifications_allowed: std::env::var_os("DUETICK_NO_NOTIFY").is_none(),
    };
    let state = TaskStore::new(Vec::new());
    let loaded = commands::load_state(&ctx, &state);
    if !loaded.ok {
        eprintln!(
            "warning: could not open task storage: {}",
            loaded.error.unwrap_or_default()
        );
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_time()
        .build()
        .expect("failed to build tokio runtime");
    runtime.spawn(run_scheduler(
        ctx.clone(),
        state.clone(),
        DEFAULT_TICK_INTERVAL,
    ));

    println!("duetick — local task tracker. Type `help` for commands.");
    let mut mode = FilterMode::All;
    render(&state, mode);

    // One locked handle for the whole session; the delete confirmation
    // reads from the same handle.
    let mut stdin = io::stdin().lock();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim().to_string();
        if input.is_empty() {
            continue;
        }
        let (command, rest) = match input.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (input.as_str(), ""),
        };
        match command {
            "add" => handle_add(&ctx, &state, rest),
            "toggle" => handle_toggle(&ctx, &state, rest),
            "delete" => handle_delete(&ctx, &state, rest, &mut stdin),
            "filter" => match rest.parse::<FilterMode>() {
                Ok(parsed) => mode = parsed,
                Err(error) => {
                    println!("{error} (expected all, active, completed or due-soon)");
                    continue;
                }
            },
            "list" => {}
            "help" => {
                print_help();
                continue;
            }
            "quit" | "exit" => break,
            other => {
                println!("unknown command: {other:?} (try `help`)");
                continue;
            }
        }
        render(&state, mode);
    }
}

fn print_help() {
    println!("  add <title> [@ <YYYY-MM-DDTHH:MM>] [: <description>]");
    println!("  toggle <id-prefix>     flip a task between active and completed");
    println!("  delete <id-prefix>     remove a task (asks for confirmation)");
    println!("  filter <mode>          all | active | completed | due-soon");
    println!("  list                   show tasks under the current filter");
    println!("  quit");
}

/// `add Buy milk @ 2026-09-01T09:00 : from the corner shop`
fn handle_add(ctx: &AppCtx, state: &TaskStore, rest: &str) {
    let (head, desc) = match rest.split_once(" : ") {
        Some((head, desc)) => (head, desc.trim()),
        None => (rest, ""),
    };
    let (title, due_raw) = match head.split_once(" @ ") {
        Some((title, due)) => (title, Some(due.trim())),
        None => (head, None),
    };
    let due = match due_raw {
        Some(raw) => match storage::parse_timestamp(raw) {
            Some(ts) => Some(ts),
            None => {
                println!("unreadable due time: {raw:?}");
                return;
            }
        },
        None => None,
    };

    let result = commands::create_task(
        ctx,
        state,
        NewTask {
            title: title.to_string(),
            desc: desc.to_string(),
            due,
        },
    );
    match result.data {
        Some(task) => println!("added {}", short_id(&task.id)),
        None => println!("{}", result.error.unwrap_or_default()),
    }
}

fn handle_toggle(ctx: &AppCtx, state: &TaskStore, rest: &str) {
    let id = match resolve_id(state, rest) {
        Some(id) => id,
        None => return,
    };
    let result = commands::toggle_task(ctx, state, &id);
    if result.data != Some(true) {
        println!("task disappeared: {}", short_id(&id));
    }
}

fn handle_delete(ctx: &AppCtx, state: &TaskStore, rest: &str, stdin: &mut impl BufRead) {
    let id = match resolve_id(state, rest) {
        Some(id) => id,
        None => return,
    };
    print!("delete task {}? [y/N] ", short_id(&id));
    let _ = io::stdout().flush();
    let mut answer = String::new();
    if stdin.read_line(&mut answer).is_err() {
        return;
    }
    if !answer.trim().eq_ignore_ascii_case("y") {
        println!("kept.");
        return;
    }
    commands::delete_task(ctx, state, &id);
}

/// The view accepts any unambiguous id prefix so users don't have to type
/// whole UUIDs.
fn resolve_id(state: &TaskStore, input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        println!("which task? give an id prefix from `list`");
        return None;
    }
    let tasks = state.tasks();
    let mut matches = tasks.iter().filter(|task| task.id.starts_with(input));
    match (matches.next(), matches.next()) {
        (Some(task), None) => Some(task.id.clone()),
        (Some(_), Some(_)) => {
            println!("ambiguous id prefix: {input:?}");
            None
        }
        (None, _) => {
            println!("no task matches {input:?}");
            None
        }
    }
}

fn render(state: &TaskStore, mode: FilterMode) {
    let now = Utc::now().timestamp();
    let tasks = commands::list_tasks(state, mode, now).data.unwrap_or_default();
    if tasks.is_empty() {
        println!("No tasks found.");
        return;
    }
    for task in tasks {
        println!("{}", render_line(&task));
    }
}

fn render_line(task: &Task) -> String {
    let mark = if task.completed { 'x' } else { ' ' };
    let due = match task.due {
        Some(ts) => DateTime::<Utc>::from_timestamp(ts, 0)
            .map(|dt| format!("due {}", dt.format("%Y-%m-%d %H:%M")))
            .unwrap_or_else(|| format!("due @{ts}")),
        None => "no due date".to_string(),
    };
    let mut line = format!("[{mark}] {}  {}  ({due})", short_id(&task.id), task.title);
    if !task.desc.is_empty() {
        line.push_str(&format!(" — {}", task.desc));
    }
    line
}

fn short_id(id: &str) -> &str {
    &id[..id.len().min(8)]
}
