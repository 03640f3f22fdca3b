//! Persistence collaborator interface.
//!
//! The engine never looks at identities; they are carried through so every
//! stored plan, profile and task is attributed to exactly one session or user.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::preferences::Preferences;
use crate::schedule::BlockSequence;
use crate::synthesis::{Strategy, SynthesisOutcome};
use crate::task::{Priority, Task};

/// Owner of stored plans: an anonymous session or an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Identity {
    Session(String),
    User(String),
}

impl Identity {
    /// Fresh anonymous session.
    pub fn new_session() -> Self {
        Identity::Session(Uuid::new_v4().to_string())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Identity::Session(_) => "session",
            Identity::User(_) => "user",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Identity::Session(id) | Identity::User(id) => id,
        }
    }

    /// Rebuild from a stored `(kind, id)` pair.
    ///
    /// # Errors
    /// `Corrupt` for an unknown kind.
    pub fn from_parts(kind: &str, id: String) -> Result<Self, DatabaseError> {
        match kind {
            "session" => Ok(Identity::Session(id)),
            "user" => Ok(Identity::User(id)),
            other => Err(DatabaseError::Corrupt(format!("unknown identity kind '{other}'"))),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

/// A persisted day plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSchedule {
    pub id: i64,
    pub identity: Identity,
    pub sequence: BlockSequence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_text: Option<String>,
    pub strategy: Strategy,
    pub created_at: DateTime<Utc>,
}

/// A task kept in the store between planning runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTask {
    #[serde(flatten)]
    pub task: Task,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Partial update for a stored task. `None` leaves a field as it is; the
/// nested options clear the due date or notes when set to `Some(None)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub duration_minutes: Option<u32>,
    pub due_date: Option<Option<NaiveDate>>,
    pub priority: Option<Priority>,
    pub notes: Option<Option<String>>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }

    pub fn apply(&self, stored: &mut StoredTask) {
        if let Some(title) = &self.title {
            stored.task.title = title.clone();
        }
        if let Some(minutes) = self.duration_minutes {
            stored.task.duration_minutes = minutes;
        }
        if let Some(due) = self.due_date {
            stored.task.due_date = due;
        }
        if let Some(priority) = self.priority {
            stored.task.priority = priority;
        }
        if let Some(notes) = &self.notes {
            stored.notes = notes.clone();
        }
        if let Some(completed) = self.completed {
            stored.completed = completed;
        }
    }
}

/// Storage for synthesized plans, per-identity preferences and task lists.
pub trait PlanStore {
    /// Store an accepted outcome for `identity`.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    fn save_schedule(
        &self,
        identity: &Identity,
        outcome: &SynthesisOutcome,
        free_text: Option<&str>,
    ) -> Result<StoredSchedule, DatabaseError>;

    /// Most recently stored plan for `identity`.
    ///
    /// # Errors
    /// Returns an error if the read fails or the record cannot be decoded.
    fn latest_schedule(&self, identity: &Identity) -> Result<Option<StoredSchedule>, DatabaseError>;

    /// Insert or replace the preference profile for `identity`.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    fn save_preferences(
        &self,
        identity: &Identity,
        preferences: &Preferences,
    ) -> Result<(), DatabaseError>;

    /// # Errors
    /// Returns an error if the read fails or the record cannot be decoded.
    fn load_preferences(&self, identity: &Identity) -> Result<Option<Preferences>, DatabaseError>;

    /// Add a task to the identity's list. An empty id is replaced by a fresh one.
    ///
    /// # Errors
    /// `Invalid` for a task the planner would reject, `QueryFailed` if the id
    /// is already taken.
    fn create_task(
        &self,
        identity: &Identity,
        task: &Task,
        notes: Option<&str>,
    ) -> Result<StoredTask, DatabaseError>;

    /// The identity's tasks, earliest due date first, undated last.
    ///
    /// # Errors
    /// Returns an error if the read fails or a row cannot be decoded.
    fn list_tasks(
        &self,
        identity: &Identity,
        include_completed: bool,
    ) -> Result<Vec<StoredTask>, DatabaseError>;

    /// Apply `patch` to one task; `None` if the identity has no such task.
    ///
    /// # Errors
    /// `Invalid` if the patched task would be rejected by the planner.
    fn update_task(
        &self,
        identity: &Identity,
        id: &str,
        patch: &TaskPatch,
    ) -> Result<Option<StoredTask>, DatabaseError>;

    /// Returns `false` if the identity has no such task.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    fn delete_task(&self, identity: &Identity, id: &str) -> Result<bool, DatabaseError>;
}
