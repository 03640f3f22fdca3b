//! # Aurora Core Library
//!
//! This library provides the schedule synthesis engine behind the Aurora day
//! planner: it turns a task list plus coarse preferences into a validated,
//! non-overlapping sequence of time blocks for a single day. The `aurora` CLI
//! is a thin layer over the same library.
//!
//! ## Architecture
//!
//! - **Block Model & Validator**: the shared block contract and the invariant
//!   gate every plan passes through
//! - **Heuristic Planner**: deterministic greedy packer driven by data tables
//! - **Structured Generation**: prompt + JSON-schema round trip to a generative
//!   model, converted into raw blocks without repair
//! - **Synthesis Facade**: strategy selection, validation, and fallback
//! - **Storage**: TOML configuration and SQLite persistence of plans,
//!   profiles and task lists
//!
//! ## Key Components
//!
//! - [`Synthesizer`]: Entry point for producing a day plan
//! - [`HeuristicPlanner`]: Rule-based strategy
//! - [`StructuredGenerator`]: AI-assisted strategy over a [`GenerativeModel`]
//! - [`Validator`]: Day invariant checker
//! - [`ScheduleDb`]: Plan and profile persistence

pub mod error;
pub mod generation;
pub mod preferences;
pub mod schedule;
pub mod scheduler;
pub mod storage;
pub mod synthesis;
pub mod task;

pub use error::{
    ConfigError, CoreError, DatabaseError, GenerationError, InputError, SynthesisError,
    ValidationError, ValidationErrors,
};
pub use generation::{GenerativeModel, OpenAiModel, StructuredGenerator};
pub use preferences::{Intensity, Preferences, TimeOfDay};
pub use schedule::{Block, BlockCategory, BlockSequence, RawBlock, TimeSpec, Validator};
pub use scheduler::{HeuristicPlanner, PlannerConfig};
pub use storage::{
    Config, Identity, PlanStore, ScheduleDb, StoredSchedule, StoredTask, TaskPatch,
};
pub use synthesis::{FallbackReason, Strategy, SynthesisOutcome, SynthesisRequest, Synthesizer};
pub use task::{Priority, Task};
