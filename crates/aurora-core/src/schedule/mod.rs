//! Schedule types shared by every planning strategy.
//!
//! A strategy produces [`RawBlock`]s; only the [`validator`] turns them into a
//! [`BlockSequence`], so a sequence in hand has already passed the day
//! invariants (sorted, non-overlapping, inside the day, within caps).

pub mod time;
pub mod validator;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{InputError, ValidationErrors};
use crate::task::Priority;

pub use time::{format_hhmm, parse_hhmm, TimeSpec, MINUTES_PER_DAY};
pub use validator::{validate, ValidationLimits, Validator};

use validator::revalidate;

/// Type of schedule block.
///
/// One vocabulary for every producer. Input goes through [`from_tag`](Self::from_tag),
/// so the front-end and model spellings are accepted in any case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum BlockCategory {
    /// Deep work on a task
    Focus,
    Class,
    Break,
    Admin,
    /// Health and personal time
    Health,
}

impl BlockCategory {
    pub const ALL: [BlockCategory; 5] = [
        BlockCategory::Focus,
        BlockCategory::Class,
        BlockCategory::Break,
        BlockCategory::Admin,
        BlockCategory::Health,
    ];

    /// Display tag, also the enum offered to the generative model.
    pub fn tag(self) -> &'static str {
        match self {
            BlockCategory::Focus => "Deep Work",
            BlockCategory::Class => "Class",
            BlockCategory::Break => "Break",
            BlockCategory::Admin => "Admin",
            BlockCategory::Health => "Health",
        }
    }

    /// Case-insensitive lookup by tag or alias.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "deep work" | "deep_work" | "focus" | "study" => Some(BlockCategory::Focus),
            "class" => Some(BlockCategory::Class),
            "break" => Some(BlockCategory::Break),
            "admin" => Some(BlockCategory::Admin),
            "health" | "personal" => Some(BlockCategory::Health),
            _ => None,
        }
    }
}

impl TryFrom<String> for BlockCategory {
    type Error = InputError;

    fn try_from(tag: String) -> Result<Self, Self::Error> {
        Self::from_tag(&tag).ok_or(InputError::UnknownValue {
            field: "category",
            value: tag,
        })
    }
}

impl fmt::Display for BlockCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A candidate block as produced by a strategy, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBlock {
    pub title: String,
    pub start: TimeSpec,
    pub end: TimeSpec,
    #[serde(alias = "tag", alias = "type")]
    pub category: BlockCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_priority: Option<Priority>,
    #[serde(default, alias = "reasoning", skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl RawBlock {
    pub fn new(
        title: impl Into<String>,
        start: impl Into<TimeSpec>,
        end: impl Into<TimeSpec>,
        category: BlockCategory,
    ) -> Self {
        Self {
            title: title.into(),
            start: start.into(),
            end: end.into(),
            category,
            task_id: None,
            source_priority: None,
            rationale: None,
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }
}

impl From<&Block> for RawBlock {
    fn from(block: &Block) -> Self {
        Self {
            title: block.title.clone(),
            start: block.start_minute.into(),
            end: block.end_minute.into(),
            category: block.category,
            task_id: block.task_id.clone(),
            source_priority: block.source_priority,
            rationale: block.rationale.clone(),
        }
    }
}

/// A validated, normalized block on the day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub title: String,
    pub start_minute: u32,
    pub end_minute: u32,
    pub category: BlockCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl Block {
    /// Get total duration in minutes
    pub fn duration_minutes(&self) -> u32 {
        self.end_minute.saturating_sub(self.start_minute)
    }

    pub fn is_focus(&self) -> bool {
        self.category == BlockCategory::Focus
    }

    /// Check if this block overlaps with another (touching ends do not overlap)
    pub fn overlaps(&self, other: &Block) -> bool {
        self.start_minute < other.end_minute && other.start_minute < self.end_minute
    }

    /// `"09:00 - 10:30"`
    pub fn time_range(&self) -> String {
        format!(
            "{} - {}",
            format_hhmm(self.start_minute),
            format_hhmm(self.end_minute)
        )
    }
}

/// Minutes per category, for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySummary {
    pub block_count: usize,
    pub focus_minutes: u32,
    pub break_minutes: u32,
    pub other_minutes: u32,
    pub first_start: Option<u32>,
    pub last_end: Option<u32>,
}

/// Ordered, validated blocks for one day.
///
/// Deserialized sequences are re-checked for order, day bounds and overlap.
/// Session and budget caps belong to the preferences a plan was made under
/// and are not re-applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Block>", into = "Vec<Block>")]
pub struct BlockSequence {
    blocks: Vec<Block>,
}

impl BlockSequence {
    /// Only the validator builds non-empty sequences.
    pub(crate) fn from_validated(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    /// Total minutes across focus blocks.
    pub fn focus_minutes(&self) -> u32 {
        self.blocks
            .iter()
            .filter(|b| b.is_focus())
            .map(Block::duration_minutes)
            .sum()
    }

    pub fn summary(&self) -> DaySummary {
        let mut summary = DaySummary {
            block_count: self.blocks.len(),
            first_start: self.blocks.first().map(|b| b.start_minute),
            last_end: self.blocks.iter().map(|b| b.end_minute).max(),
            ..DaySummary::default()
        };
        for block in &self.blocks {
            let minutes = block.duration_minutes();
            match block.category {
                BlockCategory::Focus => summary.focus_minutes += minutes,
                BlockCategory::Break => summary.break_minutes += minutes,
                _ => summary.other_minutes += minutes,
            }
        }
        summary
    }
}

impl TryFrom<Vec<Block>> for BlockSequence {
    type Error = ValidationErrors;

    fn try_from(blocks: Vec<Block>) -> Result<Self, Self::Error> {
        revalidate(&blocks)
    }
}

impl From<BlockSequence> for Vec<Block> {
    fn from(sequence: BlockSequence) -> Self {
        sequence.blocks
    }
}

impl<'a> IntoIterator for &'a BlockSequence {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}
