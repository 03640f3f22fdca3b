//! Deterministic day planner.
//!
//! Greedy packer that lays tasks out back to back from the preferred anchor:
//! - Orders tasks by priority, then due date, then input order
//! - Scales each task by the intensity multiplier and clamps it to the session bounds
//! - Spends the daily focus budget in that order, separating focus blocks with breaks
//! - Frames the day with a lead-in block and a wrap-up block
//!
//! Tasks that no longer fit (budget, end of day, or block ceiling) are left
//! out of the day. Nothing here fails or performs I/O.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::preferences::{CapacityBounds, Intensity, Preferences, TimeOfDay};
use crate::schedule::{BlockCategory, RawBlock, ValidationLimits, MINUTES_PER_DAY};
use crate::task::Task;

/// A fixed synthetic block such as the lead-in or wrap-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedBlock {
    pub title: String,
    pub minutes: u32,
    pub category: BlockCategory,
}

impl FixedBlock {
    pub fn new(title: impl Into<String>, minutes: u32, category: BlockCategory) -> Self {
        Self {
            title: title.into(),
            minutes,
            category,
        }
    }
}

/// Anchor minute-of-day per time-of-day bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorTable {
    pub morning: u32,
    pub afternoon: u32,
    pub evening: u32,
}

impl Default for AnchorTable {
    fn default() -> Self {
        Self {
            morning: 8 * 60,
            afternoon: 13 * 60,
            evening: 18 * 60,
        }
    }
}

impl AnchorTable {
    pub fn minute_for(&self, time_of_day: TimeOfDay) -> u32 {
        match time_of_day {
            TimeOfDay::Morning => self.morning,
            TimeOfDay::Afternoon => self.afternoon,
            TimeOfDay::Evening => self.evening,
        }
    }
}

/// Duration multiplier per intensity level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityTable {
    pub light: f64,
    pub balanced: f64,
    pub intense: f64,
}

impl Default for IntensityTable {
    fn default() -> Self {
        Self {
            light: 0.9,
            balanced: 1.0,
            intense: 1.15,
        }
    }
}

impl IntensityTable {
    pub fn multiplier_for(&self, intensity: Intensity) -> f64 {
        match intensity {
            Intensity::Light => self.light,
            Intensity::Balanced => self.balanced,
            Intensity::Intense => self.intense,
        }
    }
}

/// Planner configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    pub anchors: AnchorTable,
    pub multipliers: IntensityTable,
    /// Clamp range for the daily focus capacity
    pub capacity: CapacityBounds,
    /// Shortest focus block worth scheduling (minutes)
    pub min_session_minutes: u32,
    /// Longest single focus block (minutes)
    pub max_session_minutes: u32,
    /// Break between focus blocks (minutes)
    pub break_minutes: u32,
    pub break_title: String,
    pub lead_in: FixedBlock,
    pub wrap_up: FixedBlock,
    /// Ceiling on emitted blocks, lead-in and wrap-up included
    pub max_blocks: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            anchors: AnchorTable::default(),
            multipliers: IntensityTable::default(),
            capacity: CapacityBounds::default(),
            min_session_minutes: 20,
            max_session_minutes: 180,
            break_minutes: 10,
            break_title: "Break".to_string(),
            lead_in: FixedBlock::new("Plan & Setup", 10, BlockCategory::Admin),
            wrap_up: FixedBlock::new("Wrap up & Review", 15, BlockCategory::Admin),
            max_blocks: 12,
        }
    }
}

impl PlannerConfig {
    /// Limits a plan made for `prefs` must satisfy.
    pub fn limits(&self, prefs: &Preferences) -> ValidationLimits {
        ValidationLimits {
            max_session_minutes: self.max_session_minutes,
            focus_budget_minutes: self.capacity.budget_minutes(prefs.daily_focus_capacity_hours),
        }
    }
}

/// Running state of the packing walk.
struct Packing {
    blocks: Vec<RawBlock>,
    cursor: u32,
    used_focus: u32,
    focus_count: usize,
}

impl Packing {
    fn push(&mut self, title: &str, minutes: u32, category: BlockCategory) -> &mut RawBlock {
        let start = self.cursor;
        self.cursor = self.cursor.saturating_add(minutes);
        self.blocks
            .push(RawBlock::new(title, start, self.cursor, category));
        let last = self.blocks.len() - 1;
        &mut self.blocks[last]
    }
}

/// Greedy, rule-based day planner
#[derive(Debug, Clone, Default)]
pub struct HeuristicPlanner {
    config: PlannerConfig,
}

impl HeuristicPlanner {
    /// Create a new planner with default config
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom config
    pub fn with_config(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Limits the planner's output is built to satisfy.
    pub fn limits(&self, prefs: &Preferences) -> ValidationLimits {
        self.config.limits(prefs)
    }

    /// Plan one day.
    ///
    /// The lead-in ends at the anchor so the first task starts exactly on it.
    /// An empty task list yields just the lead-in and wrap-up.
    pub fn plan(&self, tasks: &[Task], prefs: &Preferences) -> Vec<RawBlock> {
        let cfg = &self.config;
        let anchor = cfg.anchors.minute_for(prefs.time_of_day);
        let multiplier = cfg.multipliers.multiplier_for(prefs.intensity);
        let budget = cfg.capacity.budget_minutes(prefs.daily_focus_capacity_hours);
        let wrap_up_slot = usize::from(cfg.wrap_up.minutes > 0);

        let mut packing = Packing {
            blocks: Vec::new(),
            cursor: anchor.saturating_sub(cfg.lead_in.minutes),
            used_focus: 0,
            focus_count: 0,
        };

        if cfg.lead_in.minutes > 0 && cfg.max_blocks > wrap_up_slot {
            packing.push(&cfg.lead_in.title, cfg.lead_in.minutes, cfg.lead_in.category);
        }

        for task in order_tasks(tasks) {
            let needs_break = packing.focus_count > 0 && cfg.break_minutes > 0;
            let break_len = if needs_break { cfg.break_minutes } else { 0 };
            let slots = 1 + usize::from(needs_break) + wrap_up_slot;
            if packing.blocks.len() + slots > cfg.max_blocks {
                break;
            }

            let start = packing.cursor.saturating_add(break_len);
            let time_left =
                MINUTES_PER_DAY.saturating_sub(start.saturating_add(cfg.wrap_up.minutes));
            let fit = self
                .adjusted_duration(task, multiplier)
                .min(budget.saturating_sub(packing.used_focus))
                .min(time_left);
            if fit < cfg.min_session_minutes {
                break;
            }

            if needs_break {
                packing.push(&cfg.break_title, break_len, BlockCategory::Break);
            }
            let block = packing.push(&task.title, fit, BlockCategory::Focus);
            block.source_priority = Some(task.priority);
            if !task.id.is_empty() {
                block.task_id = Some(task.id.clone());
            }
            packing.used_focus += fit;
            packing.focus_count += 1;
        }

        if wrap_up_slot == 1
            && packing.blocks.len() < cfg.max_blocks
            && packing.cursor.saturating_add(cfg.wrap_up.minutes) <= MINUTES_PER_DAY
        {
            packing.push(&cfg.wrap_up.title, cfg.wrap_up.minutes, cfg.wrap_up.category);
        }

        packing.blocks
    }

    /// `clamp(round(minutes * multiplier), min_session, max_session)`
    pub fn adjusted_duration(&self, task: &Task, multiplier: f64) -> u32 {
        let min = self.config.min_session_minutes;
        let max = self.config.max_session_minutes.max(min);
        let scaled = (f64::from(task.duration_minutes) * multiplier).round();
        if scaled.is_nan() || scaled < f64::from(min) {
            min
        } else if scaled > f64::from(max) {
            max
        } else {
            scaled as u32
        }
    }
}

/// Order tasks for placement: priority high to low, then earlier due date
/// (dated before undated), then input order.
pub fn order_tasks(tasks: &[Task]) -> Vec<&Task> {
    let mut ordered: Vec<&Task> = tasks.iter().collect();
    ordered.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
    });
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::validate;
    use crate::task::Priority;
    use chrono::NaiveDate;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
    }

    fn make_test_task(id: &str, minutes: u32, priority: Priority) -> Task {
        Task::new(id, format!("Task {id}"), minutes).with_priority(priority)
    }

    fn minutes(block: &RawBlock) -> (u32, u32) {
        (
            block.start.to_minute().unwrap(),
            block.end.to_minute().unwrap(),
        )
    }

    #[test]
    fn report_and_notes_morning_day() {
        let tasks = vec![
            Task::new("1", "Report", 90)
                .with_priority(Priority::High)
                .with_due_date(date(18)),
            Task::new("2", "Notes", 45)
                .with_priority(Priority::Medium)
                .with_due_date(date(19)),
        ];
        let prefs = Preferences::new(TimeOfDay::Morning, Intensity::Balanced, 5.0);
        let planner = HeuristicPlanner::new();
        let plan = planner.plan(&tasks, &prefs);

        let shape: Vec<(&str, BlockCategory)> =
            plan.iter().map(|b| (b.title.as_str(), b.category)).collect();
        assert_eq!(
            shape,
            vec![
                ("Plan & Setup", BlockCategory::Admin),
                ("Report", BlockCategory::Focus),
                ("Break", BlockCategory::Break),
                ("Notes", BlockCategory::Focus),
                ("Wrap up & Review", BlockCategory::Admin),
            ]
        );
        assert_eq!(minutes(&plan[0]), (470, 480));
        assert_eq!(minutes(&plan[1]), (480, 570));
        assert_eq!(minutes(&plan[2]), (570, 580));
        assert_eq!(minutes(&plan[3]), (580, 625));
        assert_eq!(minutes(&plan[4]), (625, 640));
        assert_eq!(plan[1].source_priority, Some(Priority::High));
        assert_eq!(plan[1].task_id.as_deref(), Some("1"));
        assert!(plan.iter().all(|b| b.rationale.is_none()));

        let seq = validate(&plan, planner.limits(&prefs)).unwrap();
        assert_eq!(seq.focus_minutes(), 135);
    }

    #[test]
    fn empty_task_list_yields_stub() {
        let plan = HeuristicPlanner::new().plan(&[], &Preferences::default());
        let titles: Vec<&str> = plan.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Plan & Setup", "Wrap up & Review"]);
    }

    #[test]
    fn test_task_priority_ordering() {
        let tasks = vec![
            make_test_task("low", 30, Priority::Low).with_due_date(date(1)),
            make_test_task("high", 30, Priority::High).with_due_date(date(20)),
            make_test_task("medium", 30, Priority::Medium),
        ];
        let ids: Vec<&str> = order_tasks(&tasks).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "medium", "low"]);
    }

    #[test]
    fn due_date_breaks_priority_ties_and_input_order_breaks_the_rest() {
        let tasks = vec![
            make_test_task("undated-1", 30, Priority::High),
            make_test_task("later", 30, Priority::High).with_due_date(date(25)),
            make_test_task("undated-2", 30, Priority::High),
            make_test_task("sooner", 30, Priority::High).with_due_date(date(19)),
        ];
        let ids: Vec<&str> = order_tasks(&tasks).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["sooner", "later", "undated-1", "undated-2"]);
    }

    #[test]
    fn intensity_scales_and_clamps_durations() {
        let planner = HeuristicPlanner::new();
        let light = planner.adjusted_duration(&make_test_task("a", 100, Priority::High), 0.9);
        let intense = planner.adjusted_duration(&make_test_task("a", 100, Priority::High), 1.15);
        assert_eq!(light, 90);
        assert_eq!(intense, 115);
        assert_eq!(planner.adjusted_duration(&make_test_task("a", 5, Priority::High), 1.0), 20);
        assert_eq!(planner.adjusted_duration(&make_test_task("a", 400, Priority::High), 1.0), 180);
    }

    #[test]
    fn over_capacity_tasks_are_dropped_not_stretched() {
        let tasks = vec![
            make_test_task("a", 120, Priority::High),
            make_test_task("b", 100, Priority::Medium),
            make_test_task("c", 90, Priority::Low),
        ];
        // 2h budget: "a" takes all of it, the rest are omitted.
        let prefs = Preferences::new(TimeOfDay::Afternoon, Intensity::Balanced, 2.0);
        let plan = HeuristicPlanner::new().plan(&tasks, &prefs);
        let focus: Vec<&RawBlock> = plan
            .iter()
            .filter(|b| b.category == BlockCategory::Focus)
            .collect();
        assert_eq!(focus.len(), 1);
        assert_eq!(focus[0].task_id.as_deref(), Some("a"));
        assert_eq!(minutes(focus[0]), (780, 900));
    }

    #[test]
    fn last_task_is_trimmed_to_remaining_budget() {
        let tasks = vec![
            make_test_task("a", 100, Priority::High),
            make_test_task("b", 60, Priority::High),
        ];
        let prefs = Preferences::new(TimeOfDay::Morning, Intensity::Balanced, 2.0);
        let plan = HeuristicPlanner::new().plan(&tasks, &prefs);
        let focus: Vec<u32> = plan
            .iter()
            .filter(|b| b.category == BlockCategory::Focus)
            .map(|b| {
                let (s, e) = minutes(b);
                e - s
            })
            .collect();
        assert_eq!(focus, vec![100, 20]);
    }

    #[test]
    fn leftover_budget_below_minimum_stops_the_walk() {
        let tasks = vec![
            make_test_task("a", 110, Priority::High),
            make_test_task("b", 60, Priority::Medium),
        ];
        let prefs = Preferences::new(TimeOfDay::Morning, Intensity::Balanced, 2.0);
        let plan = HeuristicPlanner::new().plan(&tasks, &prefs);
        assert!(!plan.iter().any(|b| b.task_id.as_deref() == Some("b")));
        assert!(!plan.iter().any(|b| b.category == BlockCategory::Break));
    }

    #[test]
    fn block_ceiling_drops_the_tail() {
        let tasks: Vec<Task> = (0..10)
            .map(|i| make_test_task(&i.to_string(), 20, Priority::Medium))
            .collect();
        let prefs = Preferences::new(TimeOfDay::Morning, Intensity::Balanced, 8.0);
        let plan = HeuristicPlanner::new().plan(&tasks, &prefs);
        assert!(plan.len() <= 12);
        assert_eq!(plan.last().unwrap().title, "Wrap up & Review");
        // lead-in + 5 focus + 4 breaks + wrap-up
        let focus_ids: Vec<&str> = plan.iter().filter_map(|b| b.task_id.as_deref()).collect();
        assert_eq!(focus_ids, vec!["0", "1", "2", "3", "4"]);
    }

    #[test]
    fn evening_plan_stops_before_midnight() {
        let tasks: Vec<Task> = (0..4)
            .map(|i| make_test_task(&i.to_string(), 180, Priority::High))
            .collect();
        let mut config = PlannerConfig::default();
        config.anchors.evening = 21 * 60;
        let planner = HeuristicPlanner::with_config(config);
        let prefs = Preferences::new(TimeOfDay::Evening, Intensity::Balanced, 8.0);
        let plan = planner.plan(&tasks, &prefs);

        let last_end = plan.iter().map(|b| b.end.to_minute().unwrap()).max().unwrap();
        assert!(last_end <= MINUTES_PER_DAY);
        assert!(validate(&plan, planner.limits(&prefs)).is_ok());
    }

    #[test]
    fn oversized_break_never_overflows_the_cursor() {
        let tasks = vec![
            make_test_task("a", 60, Priority::High),
            make_test_task("b", 60, Priority::High),
        ];
        let planner = HeuristicPlanner::with_config(PlannerConfig {
            break_minutes: u32::MAX,
            ..PlannerConfig::default()
        });
        let prefs = Preferences::new(TimeOfDay::Morning, Intensity::Balanced, 4.0);
        let plan = planner.plan(&tasks, &prefs);

        let ids: Vec<&str> = plan.iter().filter_map(|b| b.task_id.as_deref()).collect();
        assert_eq!(ids, vec!["a"]);
        assert!(!plan.iter().any(|b| b.category == BlockCategory::Break));
        assert!(validate(&plan, planner.limits(&prefs)).is_ok());
    }

    #[test]
    fn plan_is_deterministic() {
        let tasks = vec![
            make_test_task("x", 75, Priority::Low),
            make_test_task("y", 50, Priority::High),
            make_test_task("z", 40, Priority::High),
        ];
        let prefs = Preferences::new(TimeOfDay::Afternoon, Intensity::Intense, 4.0);
        let planner = HeuristicPlanner::new();
        let first = serde_json::to_string(&planner.plan(&tasks, &prefs)).unwrap();
        let second = serde_json::to_string(&planner.plan(&tasks, &prefs)).unwrap();
        assert_eq!(first, second);
    }
}
