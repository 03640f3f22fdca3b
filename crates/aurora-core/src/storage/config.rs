//! TOML-based application configuration.
//!
//! Stores:
//! - Planner tables (anchor times, intensity multipliers, capacity bounds)
//! - Session bounds and the fixed lead-in / wrap-up blocks
//! - Generative model settings (endpoint, model, key variable, deadline)
//! - Optional database location
//!
//! Configuration is stored at `~/.config/aurora/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::data_dir;
use crate::error::{ConfigError, GenerationError};
use crate::generation::{openai, GenerationRules, OpenAiModel, StructuredGenerator};
use crate::preferences::CapacityBounds;
use crate::schedule::{parse_hhmm, BlockCategory, MINUTES_PER_DAY};
use crate::scheduler::{AnchorTable, FixedBlock, HeuristicPlanner, IntensityTable, PlannerConfig};
use crate::synthesis::Synthesizer;

/// Anchor clock times per time-of-day preference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorSettings {
    #[serde(default = "default_morning")]
    pub morning: String,
    #[serde(default = "default_afternoon")]
    pub afternoon: String,
    #[serde(default = "default_evening")]
    pub evening: String,
}

/// Duration multipliers per intensity level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiplierSettings {
    #[serde(default = "default_light")]
    pub light: f64,
    #[serde(default = "default_balanced")]
    pub balanced: f64,
    #[serde(default = "default_intense")]
    pub intense: f64,
}

/// Heuristic planner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerSettings {
    #[serde(default)]
    pub anchors: AnchorSettings,
    #[serde(default)]
    pub multipliers: MultiplierSettings,
    #[serde(default = "default_capacity_min")]
    pub capacity_min_hours: f64,
    #[serde(default = "default_capacity_max")]
    pub capacity_max_hours: f64,
    #[serde(default = "default_min_session")]
    pub min_session_minutes: u32,
    #[serde(default = "default_max_session")]
    pub max_session_minutes: u32,
    #[serde(default = "default_break_minutes")]
    pub break_minutes: u32,
    #[serde(default = "default_break_title")]
    pub break_title: String,
    #[serde(default = "default_lead_in")]
    pub lead_in: FixedBlock,
    #[serde(default = "default_wrap_up")]
    pub wrap_up: FixedBlock,
    #[serde(default = "default_max_blocks")]
    pub max_blocks: usize,
}

/// Generative model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_workday_start")]
    pub workday_start: String,
    #[serde(default = "default_workday_end")]
    pub workday_end: String,
    #[serde(default = "default_split_over")]
    pub split_over_minutes: u32,
    #[serde(default = "default_break_min")]
    pub break_min_minutes: u32,
    #[serde(default = "default_break_max")]
    pub break_max_minutes: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/aurora/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// SQLite file; defaults to `aurora.db` in the data directory.
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default)]
    pub planner: PlannerSettings,
    #[serde(default)]
    pub generation: GenerationSettings,
}

// Default functions
fn default_morning() -> String {
    "08:00".into()
}
fn default_afternoon() -> String {
    "13:00".into()
}
fn default_evening() -> String {
    "18:00".into()
}
fn default_light() -> f64 {
    0.9
}
fn default_balanced() -> f64 {
    1.0
}
fn default_intense() -> f64 {
    1.15
}
fn default_capacity_min() -> f64 {
    2.0
}
fn default_capacity_max() -> f64 {
    8.0
}
fn default_min_session() -> u32 {
    20
}
fn default_max_session() -> u32 {
    180
}
fn default_break_minutes() -> u32 {
    10
}
fn default_break_title() -> String {
    "Break".into()
}
fn default_lead_in() -> FixedBlock {
    FixedBlock::new("Plan & Setup", 10, BlockCategory::Admin)
}
fn default_wrap_up() -> FixedBlock {
    FixedBlock::new("Wrap up & Review", 15, BlockCategory::Admin)
}
fn default_max_blocks() -> usize {
    12
}
fn default_endpoint() -> String {
    openai::DEFAULT_ENDPOINT.into()
}
fn default_model() -> String {
    openai::DEFAULT_MODEL.into()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_workday_start() -> String {
    "09:00".into()
}
fn default_workday_end() -> String {
    "18:00".into()
}
fn default_split_over() -> u32 {
    90
}
fn default_break_min() -> u32 {
    10
}
fn default_break_max() -> u32 {
    15
}

impl Default for AnchorSettings {
    fn default() -> Self {
        Self {
            morning: default_morning(),
            afternoon: default_afternoon(),
            evening: default_evening(),
        }
    }
}

impl Default for MultiplierSettings {
    fn default() -> Self {
        Self {
            light: default_light(),
            balanced: default_balanced(),
            intense: default_intense(),
        }
    }
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            anchors: AnchorSettings::default(),
            multipliers: MultiplierSettings::default(),
            capacity_min_hours: default_capacity_min(),
            capacity_max_hours: default_capacity_max(),
            min_session_minutes: default_min_session(),
            max_session_minutes: default_max_session(),
            break_minutes: default_break_minutes(),
            break_title: default_break_title(),
            lead_in: default_lead_in(),
            wrap_up: default_wrap_up(),
            max_blocks: default_max_blocks(),
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            workday_start: default_workday_start(),
            workday_end: default_workday_end(),
            split_over_minutes: default_split_over(),
            break_min_minutes: default_break_min(),
            break_max_minutes: default_break_max(),
        }
    }
}

fn clock(key: &str, value: &str) -> Result<u32, ConfigError> {
    parse_hhmm(value)
        .filter(|m| *m < MINUTES_PER_DAY)
        .ok_or_else(|| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{value}' is not an HH:MM time"),
        })
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

impl TryFrom<&PlannerSettings> for PlannerConfig {
    type Error = ConfigError;

    fn try_from(s: &PlannerSettings) -> Result<Self, Self::Error> {
        let anchors = AnchorTable {
            morning: clock("planner.anchors.morning", &s.anchors.morning)?,
            afternoon: clock("planner.anchors.afternoon", &s.anchors.afternoon)?,
            evening: clock("planner.anchors.evening", &s.anchors.evening)?,
        };
        for (key, value) in [
            ("planner.multipliers.light", s.multipliers.light),
            ("planner.multipliers.balanced", s.multipliers.balanced),
            ("planner.multipliers.intense", s.multipliers.intense),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(key, "multiplier must be a positive number"));
            }
        }
        if !(s.capacity_min_hours.is_finite() && s.capacity_max_hours.is_finite())
            || s.capacity_min_hours <= 0.0
            || s.capacity_min_hours > s.capacity_max_hours
        {
            return Err(invalid(
                "planner.capacity_min_hours",
                "capacity bounds must satisfy 0 < min <= max",
            ));
        }
        if s.min_session_minutes == 0 || s.min_session_minutes > s.max_session_minutes {
            return Err(invalid(
                "planner.min_session_minutes",
                "session bounds must satisfy 0 < min <= max",
            ));
        }
        for (key, block) in [("planner.lead_in", &s.lead_in), ("planner.wrap_up", &s.wrap_up)] {
            if block.category == BlockCategory::Focus {
                return Err(invalid(key, "fixed blocks cannot be focus time"));
            }
        }
        if s.lead_in.minutes.saturating_add(s.wrap_up.minutes) > MINUTES_PER_DAY {
            return Err(invalid(
                "planner.lead_in",
                "lead-in and wrap-up together must fit in one day",
            ));
        }
        if s.break_minutes > MINUTES_PER_DAY {
            return Err(invalid("planner.break_minutes", "break cannot exceed one day"));
        }

        Ok(PlannerConfig {
            anchors,
            multipliers: IntensityTable {
                light: s.multipliers.light,
                balanced: s.multipliers.balanced,
                intense: s.multipliers.intense,
            },
            capacity: CapacityBounds {
                min_hours: s.capacity_min_hours,
                max_hours: s.capacity_max_hours,
            },
            min_session_minutes: s.min_session_minutes,
            max_session_minutes: s.max_session_minutes,
            break_minutes: s.break_minutes,
            break_title: s.break_title.clone(),
            lead_in: s.lead_in.clone(),
            wrap_up: s.wrap_up.clone(),
            max_blocks: s.max_blocks,
        })
    }
}

impl GenerationSettings {
    /// Prompt rules from the configured workday and break guidance.
    ///
    /// # Errors
    /// Returns `InvalidValue` for unparseable workday bounds.
    pub fn rules(&self) -> Result<GenerationRules, ConfigError> {
        let workday_start = clock("generation.workday_start", &self.workday_start)?;
        let workday_end = clock("generation.workday_end", &self.workday_end)?;
        if workday_start >= workday_end {
            return Err(invalid(
                "generation.workday_start",
                "workday must start before it ends",
            ));
        }
        Ok(GenerationRules {
            workday_start,
            workday_end,
            split_over_minutes: self.split_over_minutes,
            break_min_minutes: self.break_min_minutes,
            break_max_minutes: self.break_max_minutes.max(self.break_min_minutes),
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// HTTP model client; the key is read from `api_key_env`.
    ///
    /// # Errors
    /// `NotConfigured` if the key variable is unset or the endpoint is invalid.
    pub fn build_model(&self) -> Result<OpenAiModel, GenerationError> {
        OpenAiModel::from_env(&self.endpoint, &self.api_key_env, &self.model)
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(key, e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| {
                                    invalid(key, format!("cannot parse '{value}' as number"))
                                })?
                        } else {
                            return Err(invalid(key, format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(key, e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing defaults on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults there if it does not exist.
    ///
    /// # Errors
    /// See [`load`](Self::load).
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let load_failed = |message: String| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message,
        };
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| load_failed(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(load_failed(e.to_string())),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// # Errors
    /// See [`save`](Self::save).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Update a value in memory by dot-separated key, type-checked against
    /// the current value and re-validated as a whole.
    ///
    /// # Errors
    /// Returns `UnknownKey` or `InvalidValue`; the config is left unchanged on error.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(key, e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| invalid(key, e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and persist. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Check that every section converts into its runtime form.
    ///
    /// # Errors
    /// The first `InvalidValue` found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.planner_config()?;
        self.generation.rules()?;
        Ok(())
    }

    /// # Errors
    /// See [`validate`](Self::validate).
    pub fn planner_config(&self) -> Result<PlannerConfig, ConfigError> {
        PlannerConfig::try_from(&self.planner)
    }

    /// Configured database file.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.database_path {
            Some(p) if !p.trim().is_empty() => Ok(PathBuf::from(p)),
            _ => Ok(data_dir()?.join("aurora.db")),
        }
    }

    /// Facade wired from this config. The generative strategy is attached only
    /// when its API key is available.
    ///
    /// # Errors
    /// Returns `InvalidValue` for a malformed planner or generation section.
    pub fn synthesizer(&self) -> Result<Synthesizer, ConfigError> {
        let planner = HeuristicPlanner::with_config(self.planner_config()?);
        let rules = self.generation.rules()?;
        let synth = Synthesizer::new(planner).with_timeout(self.generation.timeout());
        match self.generation.build_model() {
            Ok(model) => Ok(synth.with_generator(StructuredGenerator::with_rules(
                Arc::new(model),
                rules,
            ))),
            Err(e) => {
                tracing::debug!(error = %e, "generative strategy disabled");
                Ok(synth)
            }
        }
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.planner.anchors.morning, "08:00");
        assert_eq!(parsed.planner.wrap_up.title, "Wrap up & Review");
        assert_eq!(parsed.generation.model, "gpt-4o");
        assert!(parsed.database_path.is_none());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [planner.anchors]
            morning = "09:00"

            [generation]
            timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(parsed.planner.anchors.morning, "09:00");
        assert_eq!(parsed.planner.anchors.evening, "18:00");
        assert_eq!(parsed.planner.max_blocks, 12);
        assert_eq!(parsed.generation.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn default_settings_match_planner_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.planner_config().unwrap(), PlannerConfig::default());
        assert_eq!(cfg.generation.rules().unwrap(), GenerationRules::default());
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("planner.anchors.afternoon").as_deref(), Some("13:00"));
        assert_eq!(cfg.get("planner.max_session_minutes").as_deref(), Some("180"));
        assert_eq!(cfg.get("planner.multipliers.intense").as_deref(), Some("1.15"));
        assert!(cfg.get("planner.missing_key").is_none());
    }

    #[test]
    fn apply_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.apply("planner.anchors.morning", "07:30").unwrap();
        cfg.apply("planner.break_minutes", "15").unwrap();
        cfg.apply("planner.capacity_max_hours", "6.5").unwrap();
        assert_eq!(cfg.planner.anchors.morning, "07:30");
        assert_eq!(cfg.planner.break_minutes, 15);
        assert_eq!(cfg.planner.capacity_max_hours, 6.5);
        assert_eq!(cfg.planner_config().unwrap().anchors.morning, 450);
    }

    #[test]
    fn apply_sets_optional_database_path() {
        let mut cfg = Config::default();
        cfg.apply("database_path", "/tmp/plans.db").unwrap();
        assert_eq!(cfg.database_path().unwrap(), PathBuf::from("/tmp/plans.db"));
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.apply("planner.nonexistent_key", "1").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(_)));
        assert!(matches!(cfg.apply("", "1"), Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn apply_rejects_invalid_values_and_keeps_old_config() {
        let mut cfg = Config::default();
        assert!(cfg.apply("planner.max_blocks", "many").is_err());
        assert!(cfg.apply("planner.anchors.evening", "7pm").is_err());
        assert!(cfg.apply("planner.capacity_min_hours", "9").is_err());
        assert!(cfg.apply("generation.workday_end", "08:00").is_err());
        assert_eq!(cfg.planner.anchors.evening, "18:00");
        assert_eq!(cfg.planner.capacity_min_hours, 2.0);
    }

    #[test]
    fn apply_rejects_focus_fixed_blocks() {
        let mut cfg = Config::default();
        let err = cfg
            .apply("planner.lead_in", r#"{"title": "Setup", "minutes": 10, "category": "focus"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("planner.lead_in"), "{err}");
        assert!(cfg.apply("planner.wrap_up.category", "focus").is_err());
        assert_eq!(cfg.planner.lead_in.category, BlockCategory::Admin);
        assert_eq!(cfg.planner.wrap_up.category, BlockCategory::Admin);

        cfg.apply("planner.wrap_up.category", "health").unwrap();
        assert_eq!(cfg.planner.wrap_up.category, BlockCategory::Health);
    }

    #[test]
    fn apply_rejects_fixed_blocks_longer_than_the_day() {
        let mut cfg = Config::default();
        assert!(cfg.apply("planner.lead_in.minutes", "1500").is_err());
        cfg.apply("planner.wrap_up.minutes", "720").unwrap();
        assert!(cfg.apply("planner.lead_in.minutes", "721").is_err());
        cfg.apply("planner.lead_in.minutes", "720").unwrap();
        assert_eq!(cfg.planner.lead_in.minutes, 720);
    }

    #[test]
    fn apply_rejects_unbounded_break() {
        let mut cfg = Config::default();
        let err = cfg.apply("planner.break_minutes", "4294967295").unwrap_err();
        assert!(err.to_string().contains("planner.break_minutes"), "{err}");
        assert_eq!(cfg.planner.break_minutes, 10);
    }

    #[test]
    fn accepted_planner_settings_keep_heuristic_plans_valid() {
        use crate::preferences::{Intensity, Preferences, TimeOfDay};
        use crate::synthesis::SynthesisRequest;
        use crate::task::Task;

        let mut cfg = Config::default();
        cfg.apply("planner.lead_in.minutes", "600").unwrap();
        cfg.apply("planner.break_minutes", "1440").unwrap();
        let request = SynthesisRequest::new(
            vec![Task::new("1", "Report", 60), Task::new("2", "Notes", 60)],
            Preferences::new(TimeOfDay::Morning, Intensity::Balanced, 2.0),
        );
        let outcome = cfg.synthesizer().unwrap().synthesize_heuristic(&request).unwrap();
        assert!(outcome.sequence.focus_minutes() <= 120);
    }

    #[test]
    fn load_from_writes_defaults_then_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let first = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(first.planner.max_blocks, 12);

        let mut changed = first.clone();
        changed.apply("planner.max_blocks", "10").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().planner.max_blocks, 10);
    }

    #[test]
    fn load_from_reports_parse_failures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "planner = 3").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }
}
