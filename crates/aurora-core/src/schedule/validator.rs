//! Block sequence validation.
//!
//! The validator is a gate, not a repair step: a candidate either satisfies
//! every day invariant and comes back as a [`BlockSequence`] with its blocks
//! unchanged (apart from time normalization and ordering), or it is rejected
//! with every violation found.

use serde::{Deserialize, Serialize};

use super::time::{format_hhmm, MINUTES_PER_DAY};
use super::{Block, BlockSequence, RawBlock};
use crate::error::{ValidationError, ValidationErrors};

/// Caps a sequence must respect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationLimits {
    /// Longest allowed single focus block
    pub max_session_minutes: u32,
    /// Total focus minutes allowed for the day
    pub focus_budget_minutes: u32,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_session_minutes: 180,
            focus_budget_minutes: 8 * 60,
        }
    }
}

/// Checks candidate blocks against the day invariants.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    limits: ValidationLimits,
}

impl Validator {
    pub fn new(limits: ValidationLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> ValidationLimits {
        self.limits
    }

    /// Validate a candidate, returning the canonical sequence.
    ///
    /// # Errors
    /// Returns every violation: malformed times or titles, inverted ranges,
    /// blocks outside the day, overlapping pairs, over-long focus sessions,
    /// and an exceeded focus budget.
    pub fn validate(&self, candidate: &[RawBlock]) -> Result<BlockSequence, ValidationErrors> {
        let mut errors = Vec::new();
        let mut blocks = Vec::with_capacity(candidate.len());

        for (index, raw) in candidate.iter().enumerate() {
            if let Some(block) = normalize(index, raw, &mut errors) {
                blocks.push(block);
            }
        }

        for block in &blocks {
            if block.is_focus() && block.duration_minutes() > self.limits.max_session_minutes {
                errors.push(ValidationError::SessionTooLong {
                    title: block.title.clone(),
                    minutes: block.duration_minutes(),
                    cap: self.limits.max_session_minutes,
                });
            }
        }

        // Stable: equal starts keep input order.
        blocks.sort_by_key(|b| b.start_minute);
        detect_conflicts(&blocks, &mut errors);

        let total: u32 = blocks
            .iter()
            .filter(|b| b.is_focus())
            .map(Block::duration_minutes)
            .sum();
        if total > self.limits.focus_budget_minutes {
            errors.push(ValidationError::CapacityExceeded {
                total,
                budget: self.limits.focus_budget_minutes,
            });
        }

        if errors.is_empty() {
            Ok(BlockSequence::from_validated(blocks))
        } else {
            Err(ValidationErrors(errors))
        }
    }
}

/// Validate `candidate` against `limits`.
///
/// # Errors
/// See [`Validator::validate`].
pub fn validate(
    candidate: &[RawBlock],
    limits: ValidationLimits,
) -> Result<BlockSequence, ValidationErrors> {
    Validator::new(limits).validate(candidate)
}

/// Re-check blocks that already went through [`Validator::validate`], e.g. on
/// their way back from storage. Caps are not part of this check.
pub(super) fn revalidate(blocks: &[Block]) -> Result<BlockSequence, ValidationErrors> {
    let mut errors = Vec::new();
    let mut checked: Vec<Block> = blocks
        .iter()
        .enumerate()
        .filter_map(|(index, block)| normalize(index, &RawBlock::from(block), &mut errors))
        .collect();
    checked.sort_by_key(|b| b.start_minute);
    detect_conflicts(&checked, &mut errors);

    if errors.is_empty() {
        Ok(BlockSequence::from_validated(checked))
    } else {
        Err(ValidationErrors(errors))
    }
}

/// Resolve one raw block to minutes; records errors and returns `None` if unusable.
fn normalize(index: usize, raw: &RawBlock, errors: &mut Vec<ValidationError>) -> Option<Block> {
    if raw.title.trim().is_empty() {
        errors.push(ValidationError::EmptyTitle { index });
        return None;
    }

    let start = raw.start.to_minute();
    let end = raw.end.to_minute();
    for (spec, parsed) in [(&raw.start, start), (&raw.end, end)] {
        if parsed.is_none() {
            errors.push(ValidationError::InvalidTime {
                index,
                title: raw.title.clone(),
                value: spec.to_string(),
            });
        }
    }
    let (start, end) = (start?, end?);

    if start >= end {
        errors.push(ValidationError::InvertedRange {
            title: raw.title.clone(),
            start: format_hhmm(start),
            end: format_hhmm(end),
        });
        return None;
    }
    if start >= MINUTES_PER_DAY || end > MINUTES_PER_DAY {
        errors.push(ValidationError::OutOfDay {
            title: raw.title.clone(),
            start: format_hhmm(start),
            end: format_hhmm(end),
        });
        return None;
    }

    Some(Block {
        title: raw.title.clone(),
        start_minute: start,
        end_minute: end,
        category: raw.category,
        task_id: raw.task_id.clone(),
        source_priority: raw.source_priority,
        rationale: raw.rationale.clone(),
    })
}

/// `blocks` must be sorted by start.
fn detect_conflicts(blocks: &[Block], errors: &mut Vec<ValidationError>) {
    // The block reaching furthest so far; a long block can overlap several later ones.
    let mut furthest: Option<&Block> = None;
    for block in blocks {
        if let Some(prev) = furthest {
            if prev.overlaps(block) {
                errors.push(ValidationError::Conflict {
                    first: prev.title.clone(),
                    first_range: prev.time_range(),
                    second: block.title.clone(),
                    second_range: block.time_range(),
                });
            }
        }
        if furthest.map_or(true, |prev| block.end_minute > prev.end_minute) {
            furthest = Some(block);
        }
    }
}
