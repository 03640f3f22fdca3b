//! Task list commands for CLI.

use aurora_core::{Config, Identity, PlanStore, Priority, StoredTask, Task, TaskPatch};
use chrono::NaiveDate;
use clap::Subcommand;
use serde::Serialize;

use super::{open_db, IdentityArgs};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task (starts a new session when no identity is given)
    Add {
        /// Task title
        title: String,
        /// Estimated duration in minutes
        #[arg(long)]
        minutes: u32,
        /// low, medium, or high (default: medium)
        #[arg(long, default_value = "medium")]
        priority: Priority,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,
        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
        /// Task ID (default: generated)
        #[arg(long)]
        id: Option<String>,
        #[command(flatten)]
        identity: IdentityArgs,
    },
    /// List tasks, earliest due date first
    List {
        /// Include completed tasks
        #[arg(long)]
        all: bool,
        #[command(flatten)]
        identity: IdentityArgs,
    },
    /// Update a task
    Update {
        /// Task ID
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New duration in minutes
        #[arg(long)]
        minutes: Option<u32>,
        /// New priority
        #[arg(long)]
        priority: Option<Priority>,
        /// New due date (YYYY-MM-DD)
        #[arg(long, conflicts_with = "no_due")]
        due: Option<NaiveDate>,
        /// Remove the due date
        #[arg(long)]
        no_due: bool,
        /// New notes; an empty string removes them
        #[arg(long)]
        notes: Option<String>,
        /// Set completed status
        #[arg(long)]
        completed: Option<bool>,
        #[command(flatten)]
        identity: IdentityArgs,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
        #[command(flatten)]
        identity: IdentityArgs,
    },
}

#[derive(Serialize)]
struct AddedView {
    identity: Identity,
    task: StoredTask,
}

fn require(identity: &IdentityArgs) -> Result<Identity, Box<dyn std::error::Error>> {
    Ok(identity
        .identity()
        .ok_or("either --session or --user is required")?)
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = open_db(&config)?;

    match action {
        TaskAction::Add {
            title,
            minutes,
            priority,
            due,
            notes,
            id,
            identity,
        } => {
            let who = identity.identity().unwrap_or_else(Identity::new_session);
            let mut task = Task::new(id.unwrap_or_default(), title, minutes).with_priority(priority);
            task.due_date = due;
            let stored = db.create_task(&who, &task, notes.as_deref())?;
            let view = AddedView {
                identity: who,
                task: stored,
            };
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        TaskAction::List { all, identity } => {
            let tasks = db.list_tasks(&require(&identity)?, all)?;
            println!("{}", serde_json::to_string_pretty(&tasks)?);
        }
        TaskAction::Update {
            id,
            title,
            minutes,
            priority,
            due,
            no_due,
            notes,
            completed,
            identity,
        } => {
            let who = require(&identity)?;
            let patch = TaskPatch {
                title,
                duration_minutes: minutes,
                due_date: if no_due { Some(None) } else { due.map(Some) },
                priority,
                notes: notes.map(|n| Some(n).filter(|n| !n.trim().is_empty())),
                completed,
            };
            if patch.is_empty() {
                return Err("nothing to update".into());
            }
            let task = db
                .update_task(&who, &id, &patch)?
                .ok_or(format!("task not found: {id}"))?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::Delete { id, identity } => {
            if !db.delete_task(&require(&identity)?, &id)? {
                return Err(format!("task not found: {id}").into());
            }
            println!("Task deleted: {id}");
        }
    }
    Ok(())
}
