//! Minute-of-day time handling.
//!
//! Blocks are stored as integer minutes since midnight. Inputs may arrive as
//! `"HH:MM"` strings (model output, front ends) or as raw minute offsets.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Minutes in one day; the exclusive upper bound for a block start.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// A point in the day as received from a strategy, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeSpec {
    Minutes(u32),
    Clock(String),
}

impl TimeSpec {
    /// Minutes since midnight, or `None` if the value is not a valid time.
    ///
    /// Range checking against the day is left to the validator so it can
    /// report out-of-day blocks separately from garbage input.
    pub fn to_minute(&self) -> Option<u32> {
        match self {
            TimeSpec::Minutes(m) => Some(*m),
            TimeSpec::Clock(s) => parse_hhmm(s),
        }
    }
}

impl From<u32> for TimeSpec {
    fn from(minute: u32) -> Self {
        TimeSpec::Minutes(minute)
    }
}

impl From<&str> for TimeSpec {
    fn from(s: &str) -> Self {
        TimeSpec::Clock(s.to_string())
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeSpec::Minutes(m) => write!(f, "{m}"),
            TimeSpec::Clock(s) => f.write_str(s),
        }
    }
}

/// Parse a 24h `H:MM` / `HH:MM` string. `24:00` is accepted as end of day.
pub fn parse_hhmm(s: &str) -> Option<u32> {
    let (h, m) = s.trim().split_once(':')?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return None;
    }
    if !h.bytes().all(|b| b.is_ascii_digit()) || !m.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hour: u32 = h.parse().ok()?;
    let minute: u32 = m.parse().ok()?;
    if minute > 59 || hour > 24 || (hour == 24 && minute != 0) {
        return None;
    }
    Some(hour * 60 + minute)
}

/// Format minutes since midnight as `HH:MM`.
pub fn format_hhmm(minute: u32) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}
