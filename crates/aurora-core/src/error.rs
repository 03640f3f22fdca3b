//! Core error types for aurora-core.
//!
//! Every concern gets its own thiserror enum; `CoreError` composes them for
//! callers that just want a single error type.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Core error type for aurora-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed task or preference input
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Block sequence failed validation
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// Generative model or its output failed
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Malformed task or preference input. Always fatal; never guessed around.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("task '{task_id}' has an empty title")]
    EmptyTitle { task_id: String },

    #[error("task '{task_id}' has non-positive duration")]
    NonPositiveDuration { task_id: String },

    #[error("duplicate task id '{0}'")]
    DuplicateTaskId(String),

    #[error("daily focus capacity must be a finite number of hours, got {0}")]
    InvalidCapacity(f64),

    #[error("intensity scalar must be within 0..=100, got {0}")]
    IntensityOutOfRange(f64),

    #[error("unknown {field} '{value}'")]
    UnknownValue { field: &'static str, value: String },
}

/// A single violated block invariant.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Start or end could not be normalized to a minute of day
    #[error("block #{index} ('{title}'): invalid time '{value}'")]
    InvalidTime {
        index: usize,
        title: String,
        value: String,
    },

    #[error("block #{index} has an empty title")]
    EmptyTitle { index: usize },

    /// start >= end
    #[error("block '{title}': start {start} is not before end {end}")]
    InvertedRange {
        title: String,
        start: String,
        end: String,
    },

    /// Block leaves the [00:00, 24:00) day
    #[error("block '{title}' ({start}-{end}) falls outside the day")]
    OutOfDay {
        title: String,
        start: String,
        end: String,
    },

    /// Two blocks overlap
    #[error("'{first}' ({first_range}) overlaps '{second}' ({second_range})")]
    Conflict {
        first: String,
        first_range: String,
        second: String,
        second_range: String,
    },

    /// Focus block longer than the single-session cap
    #[error("focus block '{title}' runs {minutes} min, over the {cap} min session cap")]
    SessionTooLong { title: String, minutes: u32, cap: u32 },

    /// Total focus minutes over the daily budget
    #[error("total focus time {total} min exceeds the daily capacity of {budget} min")]
    CapacityExceeded { total: u32, budget: u32 },
}

/// Every violation found in one candidate.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    /// Whether any violation is an overlap.
    pub fn has_conflict(&self) -> bool {
        self.0
            .iter()
            .any(|e| matches!(e, ValidationError::Conflict { .. }))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

impl From<ValidationError> for ValidationErrors {
    fn from(err: ValidationError) -> Self {
        ValidationErrors(vec![err])
    }
}

/// Structured generation failures.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// The model answered, but not in the agreed schema
    #[error("malformed model output: {0}")]
    Format(String),

    /// The model could not be reached or refused the request
    #[error("model request failed: {0}")]
    Model(String),

    /// The caller-imposed deadline elapsed
    #[error("model did not answer within {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// No credentials for the configured model
    #[error("generative model not configured: {0}")]
    NotConfigured(String),
}

impl GenerationError {
    /// True for the schema-mismatch case (`GenerationFormatError`).
    pub fn is_format(&self) -> bool {
        matches!(self, GenerationError::Format(_))
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        GenerationError::Model(err.to_string())
    }
}

/// Errors surfaced by the synthesis facade.
#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error(transparent)]
    Input(#[from] InputError),

    /// A deterministic plan failed validation. Never expected; indicates a planner bug.
    #[error("engine defect: heuristic plan failed validation: {0}")]
    Defect(ValidationErrors),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Stored payload could not be decoded
    #[error("Corrupt stored record: {0}")]
    Corrupt(String),

    /// Record rejected before it was written
    #[error("Invalid record: {0}")]
    Invalid(#[from] InputError),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Home/config directory could not be prepared
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
