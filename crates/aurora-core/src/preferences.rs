//! Planning preferences.
//!
//! Front ends disagree on how intensity is expressed: some send a level
//! (`light`/`balanced`/`intense`), others a 0-100 "rigor" slider. Both are
//! normalized here, at the deserialization boundary, so the planner only ever
//! sees [`Intensity`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Part of the day the plan is anchored to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    #[default]
    #[serde(alias = "Morning")]
    Morning,
    #[serde(alias = "Afternoon")]
    Afternoon,
    #[serde(alias = "Evening", alias = "night", alias = "Night")]
    Evening,
}

impl FromStr for TimeOfDay {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(TimeOfDay::Morning),
            "afternoon" => Ok(TimeOfDay::Afternoon),
            "evening" | "night" => Ok(TimeOfDay::Evening),
            other => Err(InputError::UnknownValue {
                field: "time of day",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
        })
    }
}

/// How hard the day should push.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase", try_from = "IntensityInput")]
pub enum Intensity {
    Light,
    #[default]
    Balanced,
    Intense,
}

/// Scalar values below this are `Light`.
pub const BALANCED_SCALAR_THRESHOLD: f64 = 45.0;
/// Scalar values at or above this are `Intense`.
pub const INTENSE_SCALAR_THRESHOLD: f64 = 75.0;

impl Intensity {
    /// Map a 0-100 rigor scalar onto the three levels.
    ///
    /// # Errors
    /// Returns `IntensityOutOfRange` for NaN or values outside 0..=100.
    pub fn from_scalar(value: f64) -> Result<Self, InputError> {
        if !(0.0..=100.0).contains(&value) {
            return Err(InputError::IntensityOutOfRange(value));
        }
        Ok(if value >= INTENSE_SCALAR_THRESHOLD {
            Intensity::Intense
        } else if value >= BALANCED_SCALAR_THRESHOLD {
            Intensity::Balanced
        } else {
            Intensity::Light
        })
    }
}

impl FromStr for Intensity {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(value) = trimmed.parse::<f64>() {
            return Intensity::from_scalar(value);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "light" => Ok(Intensity::Light),
            "balanced" => Ok(Intensity::Balanced),
            "intense" => Ok(Intensity::Intense),
            other => Err(InputError::UnknownValue {
                field: "intensity",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Intensity::Light => "light",
            Intensity::Balanced => "balanced",
            Intensity::Intense => "intense",
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntensityInput {
    Scalar(f64),
    Level(String),
}

impl TryFrom<IntensityInput> for Intensity {
    type Error = InputError;

    fn try_from(input: IntensityInput) -> Result<Self, Self::Error> {
        match input {
            IntensityInput::Scalar(v) => Intensity::from_scalar(v),
            IntensityInput::Level(s) => s.parse(),
        }
    }
}

/// Clamp range for the daily focus capacity, in hours.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapacityBounds {
    pub min_hours: f64,
    pub max_hours: f64,
}

impl Default for CapacityBounds {
    fn default() -> Self {
        Self {
            min_hours: 2.0,
            max_hours: 8.0,
        }
    }
}

impl CapacityBounds {
    /// Effective focus budget in whole minutes for the requested hours.
    pub fn budget_minutes(&self, hours: f64) -> u32 {
        let clamped = hours.clamp(self.min_hours, self.max_hours.max(self.min_hours));
        (clamped * 60.0).round() as u32
    }
}

/// Coarse planning preferences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preferences {
    #[serde(default, alias = "timeOfDayAnchor", alias = "studyTime", alias = "preference")]
    pub time_of_day: TimeOfDay,
    #[serde(default, alias = "academicRigor")]
    pub intensity: Intensity,
    #[serde(
        default = "default_capacity_hours",
        alias = "dailyFocusCapacityHours",
        alias = "focusHours",
        alias = "focusBlocks"
    )]
    pub daily_focus_capacity_hours: f64,
    /// Advisory only; read by the generative strategy alone.
    #[serde(default, alias = "freeTextInstructions", alias = "userPrompt")]
    pub free_text_instructions: Option<String>,
}

fn default_capacity_hours() -> f64 {
    4.0
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            time_of_day: TimeOfDay::default(),
            intensity: Intensity::default(),
            daily_focus_capacity_hours: default_capacity_hours(),
            free_text_instructions: None,
        }
    }
}

impl Preferences {
    pub fn new(time_of_day: TimeOfDay, intensity: Intensity, daily_focus_capacity_hours: f64) -> Self {
        Self {
            time_of_day,
            intensity,
            daily_focus_capacity_hours,
            free_text_instructions: None,
        }
    }

    /// # Errors
    /// Returns `InvalidCapacity` when the capacity is NaN or infinite.
    pub fn validate(&self) -> Result<(), InputError> {
        if !self.daily_focus_capacity_hours.is_finite() {
            return Err(InputError::InvalidCapacity(self.daily_focus_capacity_hours));
        }
        Ok(())
    }

    /// Free text with surrounding whitespace removed; `None` when blank.
    pub fn instructions(&self) -> Option<&str> {
        self.free_text_instructions
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intensity_accepts_levels_and_scalars() {
        let level: Intensity = serde_json::from_str(r#""intense""#).unwrap();
        assert_eq!(level, Intensity::Intense);

        let scalar: Intensity = serde_json::from_str("70").unwrap();
        assert_eq!(scalar, Intensity::Balanced);
        assert_eq!(Intensity::from_scalar(44.9).unwrap(), Intensity::Light);
        assert_eq!(Intensity::from_scalar(75.0).unwrap(), Intensity::Intense);

        assert!(serde_json::from_str::<Intensity>("140").is_err());
        assert!(serde_json::from_str::<Intensity>(r#""heroic""#).is_err());
    }

    #[test]
    fn intensity_serializes_as_level() {
        assert_eq!(serde_json::to_string(&Intensity::Light).unwrap(), r#""light""#);
    }

    #[test]
    fn preferences_accept_legacy_profile_shape() {
        let json = r#"{"studyTime": "night", "academicRigor": 80, "focusBlocks": 3}"#;
        let prefs: Preferences = serde_json::from_str(json).unwrap();
        assert_eq!(prefs.time_of_day, TimeOfDay::Evening);
        assert_eq!(prefs.intensity, Intensity::Intense);
        assert_eq!(prefs.daily_focus_capacity_hours, 3.0);
        assert_eq!(prefs.instructions(), None);
    }

    #[test]
    fn budget_is_clamped() {
        let bounds = CapacityBounds::default();
        assert_eq!(bounds.budget_minutes(5.0), 300);
        assert_eq!(bounds.budget_minutes(0.5), 120);
        assert_eq!(bounds.budget_minutes(12.0), 480);
        assert_eq!(bounds.budget_minutes(4.25), 255);
    }

    #[test]
    fn blank_instructions_are_ignored() {
        let mut prefs = Preferences::default();
        prefs.free_text_instructions = Some("   ".to_string());
        assert_eq!(prefs.instructions(), None);
        prefs.free_text_instructions = Some("  gym at 6pm ".to_string());
        assert_eq!(prefs.instructions(), Some("gym at 6pm"));
    }

    #[test]
    fn validate_rejects_non_finite_capacity() {
        let prefs = Preferences::new(TimeOfDay::Morning, Intensity::Balanced, f64::NAN);
        assert!(prefs.validate().is_err());
    }
}
