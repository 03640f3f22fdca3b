//! SQLite-based storage for day plans, preference profiles and task lists.

use std::path::Path;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::data_dir;
use super::plan_store::{Identity, PlanStore, StoredSchedule, StoredTask, TaskPatch};
use crate::error::{CoreError, DatabaseError};
use crate::preferences::Preferences;
use crate::schedule::BlockSequence;
use crate::synthesis::{Strategy, SynthesisOutcome};
use crate::task::{validate_tasks, Priority, Task};

/// Parse datetime from RFC3339 string
fn parse_datetime(dt_str: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(dt_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Corrupt(format!("bad timestamp '{dt_str}': {e}")))
}

/// Fixed-width timestamps so text ordering matches time ordering.
fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Raw `schedules` row before decoding.
struct ScheduleRow {
    id: i64,
    kind: String,
    identity_id: String,
    blocks: String,
    free_text: Option<String>,
    strategy: String,
    created_at: String,
}

impl ScheduleRow {
    fn from_row(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get(0)?,
            kind: row.get(1)?,
            identity_id: row.get(2)?,
            blocks: row.get(3)?,
            free_text: row.get(4)?,
            strategy: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn decode(self) -> Result<StoredSchedule, DatabaseError> {
        let sequence: BlockSequence = serde_json::from_str(&self.blocks)
            .map_err(|e| DatabaseError::Corrupt(format!("schedule {}: {e}", self.id)))?;
        let strategy: Strategy = self
            .strategy
            .parse()
            .map_err(|e| DatabaseError::Corrupt(format!("schedule {}: {e}", self.id)))?;
        Ok(StoredSchedule {
            id: self.id,
            identity: Identity::from_parts(&self.kind, self.identity_id)?,
            sequence,
            free_text: self.free_text,
            strategy,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

const TASK_COLUMNS: &str = "id, title, minutes, due, priority, notes, completed, created_at";

/// Raw `tasks` row before decoding.
struct TaskRow {
    id: String,
    title: String,
    minutes: i64,
    due: Option<String>,
    priority: String,
    notes: Option<String>,
    completed: bool,
    created_at: String,
}

impl TaskRow {
    fn from_row(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            minutes: row.get(2)?,
            due: row.get(3)?,
            priority: row.get(4)?,
            notes: row.get(5)?,
            completed: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    fn decode(self) -> Result<StoredTask, DatabaseError> {
        let corrupt = |what: &str| DatabaseError::Corrupt(format!("task {}: {what}", self.id));
        let minutes = u32::try_from(self.minutes).map_err(|_| corrupt("bad duration"))?;
        let priority = self
            .priority
            .parse::<Priority>()
            .map_err(|_| corrupt("bad priority"))?;
        let due_date = match &self.due {
            Some(due) => Some(
                NaiveDate::parse_from_str(due, "%Y-%m-%d").map_err(|_| corrupt("bad due date"))?,
            ),
            None => None,
        };
        let created_at = parse_datetime(&self.created_at)?;
        Ok(StoredTask {
            task: Task {
                id: self.id,
                title: self.title,
                duration_minutes: minutes,
                due_date,
                priority,
            },
            notes: self.notes,
            completed: self.completed,
            created_at,
        })
    }
}

fn format_due(due: Option<NaiveDate>) -> Option<String> {
    due.map(|d| d.format("%Y-%m-%d").to_string())
}

/// SQLite database for plan storage.
///
/// Stores synthesized schedules, per-identity preference profiles and tasks.
pub struct ScheduleDb {
    conn: Connection,
}

impl ScheduleDb {
    /// Open the schedule database at `~/.config/aurora/aurora.db`.
    ///
    /// Creates tables if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the database
    /// cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("aurora.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) a database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if SQLite cannot allocate the database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schedules (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                identity_kind  TEXT NOT NULL,
                identity_id    TEXT NOT NULL,
                blocks         TEXT NOT NULL,
                free_text      TEXT,
                strategy       TEXT NOT NULL,
                created_at     TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_schedules_identity
                ON schedules(identity_kind, identity_id, created_at);

            CREATE TABLE IF NOT EXISTS profiles (
                identity_kind  TEXT NOT NULL,
                identity_id    TEXT NOT NULL,
                preferences    TEXT NOT NULL,
                updated_at     TEXT NOT NULL,
                PRIMARY KEY (identity_kind, identity_id)
            );

            CREATE TABLE IF NOT EXISTS tasks (
                identity_kind  TEXT NOT NULL,
                identity_id    TEXT NOT NULL,
                id             TEXT NOT NULL,
                title          TEXT NOT NULL,
                minutes        INTEGER NOT NULL,
                due            TEXT,
                priority       TEXT NOT NULL,
                notes          TEXT,
                completed      INTEGER NOT NULL DEFAULT 0,
                created_at     TEXT NOT NULL,
                PRIMARY KEY (identity_kind, identity_id, id)
            );",
        )
    }

    fn get_task(&self, identity: &Identity, id: &str) -> Result<Option<StoredTask>, DatabaseError> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {TASK_COLUMNS} FROM tasks
                     WHERE identity_kind = ?1 AND identity_id = ?2 AND id = ?3"
                ),
                params![identity.kind(), identity.id(), id],
                TaskRow::from_row,
            )
            .optional()?;
        row.map(TaskRow::decode).transpose()
    }

    /// Number of schedules stored for `identity`.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn count_schedules(&self, identity: &Identity) -> Result<usize, DatabaseError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM schedules WHERE identity_kind = ?1 AND identity_id = ?2",
            params![identity.kind(), identity.id()],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

impl PlanStore for ScheduleDb {
    fn save_schedule(
        &self,
        identity: &Identity,
        outcome: &SynthesisOutcome,
        free_text: Option<&str>,
    ) -> Result<StoredSchedule, DatabaseError> {
        let blocks = serde_json::to_string(&outcome.sequence)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        let created_at = Utc::now();
        self.conn.execute(
            "INSERT INTO schedules (identity_kind, identity_id, blocks, free_text, strategy, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                identity.kind(),
                identity.id(),
                blocks,
                free_text,
                outcome.strategy.as_str(),
                format_datetime(created_at),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(%identity, id, "stored schedule");

        // Same precision as the stored text.
        Ok(StoredSchedule {
            id,
            identity: identity.clone(),
            sequence: outcome.sequence.clone(),
            free_text: free_text.map(str::to_string),
            strategy: outcome.strategy,
            created_at: parse_datetime(&format_datetime(created_at))?,
        })
    }

    fn latest_schedule(&self, identity: &Identity) -> Result<Option<StoredSchedule>, DatabaseError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, identity_kind, identity_id, blocks, free_text, strategy, created_at
                 FROM schedules
                 WHERE identity_kind = ?1 AND identity_id = ?2
                 ORDER BY created_at DESC, id DESC
                 LIMIT 1",
                params![identity.kind(), identity.id()],
                ScheduleRow::from_row,
            )
            .optional()?;
        row.map(ScheduleRow::decode).transpose()
    }

    fn save_preferences(
        &self,
        identity: &Identity,
        preferences: &Preferences,
    ) -> Result<(), DatabaseError> {
        let json = serde_json::to_string(preferences)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        self.conn.execute(
            "INSERT INTO profiles (identity_kind, identity_id, preferences, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(identity_kind, identity_id)
             DO UPDATE SET preferences = excluded.preferences, updated_at = excluded.updated_at",
            params![
                identity.kind(),
                identity.id(),
                json,
                format_datetime(Utc::now()),
            ],
        )?;
        Ok(())
    }

    fn load_preferences(&self, identity: &Identity) -> Result<Option<Preferences>, DatabaseError> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT preferences FROM profiles WHERE identity_kind = ?1 AND identity_id = ?2",
                params![identity.kind(), identity.id()],
                |row| row.get(0),
            )
            .optional()?;
        json.map(|j| {
            serde_json::from_str(&j)
                .map_err(|e| DatabaseError::Corrupt(format!("profile for {identity}: {e}")))
        })
        .transpose()
    }

    fn create_task(
        &self,
        identity: &Identity,
        task: &Task,
        notes: Option<&str>,
    ) -> Result<StoredTask, DatabaseError> {
        validate_tasks(std::slice::from_ref(task))?;
        let mut task = task.clone();
        if task.id.trim().is_empty() {
            task.id = Uuid::new_v4().to_string();
        }
        let created_at = Utc::now();
        self.conn.execute(
            "INSERT INTO tasks (identity_kind, identity_id, id, title, minutes, due, priority, notes, completed, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9)",
            params![
                identity.kind(),
                identity.id(),
                task.id,
                task.title,
                task.duration_minutes,
                format_due(task.due_date),
                task.priority.as_str(),
                notes,
                format_datetime(created_at),
            ],
        )?;
        tracing::debug!(%identity, task = %task.id, "stored task");

        Ok(StoredTask {
            task,
            notes: notes.map(str::to_string),
            completed: false,
            created_at: parse_datetime(&format_datetime(created_at))?,
        })
    }

    fn list_tasks(
        &self,
        identity: &Identity,
        include_completed: bool,
    ) -> Result<Vec<StoredTask>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE identity_kind = ?1 AND identity_id = ?2 AND (?3 OR completed = 0)
             ORDER BY due IS NULL, due ASC, created_at ASC, id ASC"
        ))?;
        let rows = stmt
            .query_map(
                params![identity.kind(), identity.id(), include_completed],
                TaskRow::from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(TaskRow::decode).collect()
    }

    fn update_task(
        &self,
        identity: &Identity,
        id: &str,
        patch: &TaskPatch,
    ) -> Result<Option<StoredTask>, DatabaseError> {
        let Some(mut stored) = self.get_task(identity, id)? else {
            return Ok(None);
        };
        patch.apply(&mut stored);
        validate_tasks(std::slice::from_ref(&stored.task))?;

        self.conn.execute(
            "UPDATE tasks
             SET title = ?1, minutes = ?2, due = ?3, priority = ?4, notes = ?5, completed = ?6
             WHERE identity_kind = ?7 AND identity_id = ?8 AND id = ?9",
            params![
                stored.task.title,
                stored.task.duration_minutes,
                format_due(stored.task.due_date),
                stored.task.priority.as_str(),
                stored.notes,
                stored.completed,
                identity.kind(),
                identity.id(),
                id,
            ],
        )?;
        Ok(Some(stored))
    }

    fn delete_task(&self, identity: &Identity, id: &str) -> Result<bool, DatabaseError> {
        let removed = self.conn.execute(
            "DELETE FROM tasks WHERE identity_kind = ?1 AND identity_id = ?2 AND id = ?3",
            params![identity.kind(), identity.id(), id],
        )?;
        Ok(removed > 0)
    }
}
