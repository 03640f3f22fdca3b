mod config;
pub mod plan_store;
pub mod schedule_db;

pub use config::{AnchorSettings, Config, GenerationSettings, MultiplierSettings, PlannerSettings};
pub use plan_store::{Identity, PlanStore, StoredSchedule, StoredTask, TaskPatch};
pub use schedule_db::ScheduleDb;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/aurora[-dev]/` based on AURORA_ENV.
///
/// Set AURORA_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("AURORA_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("aurora-dev")
    } else {
        base_dir.join("aurora")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
