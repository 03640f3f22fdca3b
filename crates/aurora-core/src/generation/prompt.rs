//! Planning prompt and response schema for the generative strategy.

use indoc::formatdoc;
use serde::Serialize;
use serde_json::{json, Value};

use crate::schedule::{format_hhmm, BlockCategory};
use crate::task::Task;

/// Fixed guidance given to the model on every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRules {
    /// Default workday bounds, minutes since midnight
    pub workday_start: u32,
    pub workday_end: u32,
    /// Focus sessions longer than this should be split
    pub split_over_minutes: u32,
    pub break_min_minutes: u32,
    pub break_max_minutes: u32,
}

impl Default for GenerationRules {
    fn default() -> Self {
        Self {
            workday_start: 9 * 60,
            workday_end: 18 * 60,
            split_over_minutes: 90,
            break_min_minutes: 10,
            break_max_minutes: 15,
        }
    }
}

/// A JSON schema the model output must conform to.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSchema {
    pub name: String,
    pub schema: Value,
}

/// The wire view of a task inside the prompt.
#[derive(Serialize)]
struct PromptTask<'a> {
    id: &'a str,
    title: &'a str,
    minutes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    due: Option<String>,
    priority: &'static str,
}

/// Build the planning prompt. Same inputs, same prompt.
pub fn build_prompt(tasks: &[Task], free_text: Option<&str>, rules: &GenerationRules) -> String {
    let prompt_tasks: Vec<PromptTask<'_>> = tasks
        .iter()
        .map(|t| PromptTask {
            id: &t.id,
            title: &t.title,
            minutes: t.duration_minutes,
            due: t.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
            priority: t.priority.as_str(),
        })
        .collect();
    // Serializing plain strings and integers cannot fail.
    let tasks_json = serde_json::to_string(&prompt_tasks).unwrap_or_else(|_| "[]".to_string());
    let tags = BlockCategory::ALL
        .iter()
        .map(|c| c.tag())
        .collect::<Vec<_>>()
        .join(", ");

    formatdoc! {r#"
        You are an elite productivity scheduler.

        Tasks to schedule:
        {tasks_json}

        User preferences/constraints:
        "{free_text}"

        Rules:
        - Work day is typically {start} - {end} unless specified.
        - Group deep work tasks together.
        - Insert {break_min}-{break_max}m breaks between heavy cognitive blocks.
        - Respect task duration but split if >{split} mins.
        - Use 24h HH:MM times within a single day and never overlap blocks.
        - Tag every block with one of: {tags}.
        - Explain in `reasoning` why each time was chosen.
        "#,
        free_text = free_text.unwrap_or(""),
        start = format_hhmm(rules.workday_start),
        end = format_hhmm(rules.workday_end),
        break_min = rules.break_min_minutes,
        break_max = rules.break_max_minutes,
        split = rules.split_over_minutes,
    }
}

/// Schema for `{ "schedule": [ { title, start, end, tag, reasoning } ] }`.
pub fn schedule_schema() -> ResponseSchema {
    let tags: Vec<&str> = BlockCategory::ALL.iter().map(|c| c.tag()).collect();
    ResponseSchema {
        name: "day_schedule".to_string(),
        schema: json!({
            "type": "object",
            "additionalProperties": false,
            "required": ["schedule"],
            "properties": {
                "schedule": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "additionalProperties": false,
                        "required": ["title", "start", "end", "tag", "reasoning"],
                        "properties": {
                            "title": { "type": "string" },
                            "start": { "type": "string", "description": "24h format HH:MM" },
                            "end": { "type": "string", "description": "24h format HH:MM" },
                            "tag": { "type": "string", "enum": tags },
                            "reasoning": { "type": "string", "description": "Why this time was chosen" }
                        }
                    }
                }
            }
        }),
    }
}
