//! Task input for day planning.
//!
//! Tasks are owned by the caller and are read-only to the engine. They arrive
//! from several front ends, so deserialization accepts the field spellings
//! those front ends use (`minutes`, `due`, `durationMinutes`, `dueDate`).

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::InputError;

/// Task priority. Ordering is low < medium < high.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[serde(alias = "Low", alias = "LOW")]
    Low,
    #[default]
    #[serde(alias = "Medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "High", alias = "HIGH")]
    High,
}

impl Priority {
    /// Numeric rank, higher is more important.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(InputError::UnknownValue {
                field: "priority",
                value: other.to_string(),
            }),
        }
    }
}

/// A unit of work to place on the day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(alias = "minutes", alias = "durationMinutes")]
    pub duration_minutes: u32,
    #[serde(
        default,
        alias = "due",
        alias = "dueDate",
        deserialize_with = "deserialize_due_date"
    )]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub priority: Priority,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>, duration_minutes: u32) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            duration_minutes,
            due_date: None,
            priority: Priority::Medium,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Identifier used in error messages; falls back to the title for id-less tasks.
    fn label(&self) -> &str {
        if self.id.is_empty() {
            &self.title
        } else {
            &self.id
        }
    }
}

/// Reject malformed task input.
///
/// # Errors
/// Returns the first problem found: an empty title, a zero duration, or a
/// repeated non-empty id.
pub fn validate_tasks(tasks: &[Task]) -> Result<(), InputError> {
    let mut seen = HashSet::new();
    for task in tasks {
        if task.title.trim().is_empty() {
            return Err(InputError::EmptyTitle {
                task_id: task.id.clone(),
            });
        }
        if task.duration_minutes == 0 {
            return Err(InputError::NonPositiveDuration {
                task_id: task.label().to_string(),
            });
        }
        if !task.id.is_empty() && !seen.insert(task.id.as_str()) {
            return Err(InputError::DuplicateTaskId(task.id.clone()));
        }
    }
    Ok(())
}

// Front ends store a missing due date as "".
fn deserialize_due_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => {
            // Accept full timestamps by keeping only the date part.
            let date_part = s.get(..10).unwrap_or(s);
            NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
                .map(Some)
                .map_err(serde::de::Error::custom)
        }
    }
}
