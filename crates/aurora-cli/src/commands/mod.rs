pub mod config;
pub mod history;
pub mod plan;
pub mod prompt;
pub mod task;

use std::io::Read;

use aurora_core::{Config, Identity, ScheduleDb, Task};
use clap::Args;
use serde::Deserialize;

/// `--session` / `--user` pair shared by commands that touch stored plans.
#[derive(Args, Debug, Clone)]
pub struct IdentityArgs {
    /// Anonymous session id
    #[arg(long, conflicts_with = "user")]
    pub session: Option<String>,
    /// Authenticated user id
    #[arg(long)]
    pub user: Option<String>,
}

impl IdentityArgs {
    pub fn identity(&self) -> Option<Identity> {
        match (&self.session, &self.user) {
            (_, Some(user)) => Some(Identity::User(user.clone())),
            (Some(session), None) => Some(Identity::Session(session.clone())),
            (None, None) => None,
        }
    }
}

/// A task file is either a bare array or `{ "tasks": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum TaskFile {
    List(Vec<Task>),
    Wrapped { tasks: Vec<Task> },
}

/// Read tasks from a JSON file, or stdin when `source` is `-`.
pub fn read_tasks(source: &str) -> Result<Vec<Task>, Box<dyn std::error::Error>> {
    let content = if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(source).map_err(|e| format!("cannot read {source}: {e}"))?
    };
    let file: TaskFile =
        serde_json::from_str(&content).map_err(|e| format!("invalid task file {source}: {e}"))?;
    Ok(match file {
        TaskFile::List(tasks) | TaskFile::Wrapped { tasks } => tasks,
    })
}

pub fn open_db(config: &Config) -> Result<ScheduleDb, Box<dyn std::error::Error>> {
    Ok(ScheduleDb::open_at(&config.database_path()?)?)
}
