//! AI-assisted planning strategy.
//!
//! The [`StructuredGenerator`] turns tasks and free-text instructions into a
//! prompt, asks a [`GenerativeModel`] for a schema-constrained schedule, and
//! converts the answer into [`RawBlock`]s. It never repairs output: anything
//! that does not match the schema is a `GenerationError::Format`, and
//! well-formed but conflicting schedules are left for the validator to reject.

pub mod openai;
pub mod prompt;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::GenerationError;
use crate::schedule::{parse_hhmm, BlockCategory, RawBlock, TimeSpec};
use crate::task::Task;

pub use openai::OpenAiModel;
pub use prompt::{build_prompt, schedule_schema, GenerationRules, ResponseSchema};

/// An external model that answers a prompt with a JSON object.
///
/// Implementations make a single round trip; retries and deadlines belong to
/// the caller.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Short identifier for logs (e.g. "gpt-4o").
    fn name(&self) -> &str;

    async fn generate_object(
        &self,
        prompt: &str,
        schema: &ResponseSchema,
    ) -> Result<Value, GenerationError>;
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GeneratedSchedule {
    schedule: Vec<GeneratedBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GeneratedBlock {
    title: String,
    start: String,
    end: String,
    tag: String,
    reasoning: String,
}

/// Schema-constrained schedule generator
#[derive(Clone)]
pub struct StructuredGenerator {
    model: Arc<dyn GenerativeModel>,
    rules: GenerationRules,
}

impl std::fmt::Debug for StructuredGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuredGenerator")
            .field("model", &self.model.name())
            .field("rules", &self.rules)
            .finish()
    }
}

impl StructuredGenerator {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self {
            model,
            rules: GenerationRules::default(),
        }
    }

    pub fn with_rules(model: Arc<dyn GenerativeModel>, rules: GenerationRules) -> Self {
        Self { model, rules }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// The exact prompt [`generate`](Self::generate) would send.
    pub fn prompt(&self, tasks: &[Task], free_text: Option<&str>) -> String {
        build_prompt(tasks, free_text, &self.rules)
    }

    /// Build the prompt, call the model once, and convert its answer.
    ///
    /// # Errors
    /// `Format` for schema mismatches; model errors pass through.
    pub async fn generate(
        &self,
        tasks: &[Task],
        free_text: Option<&str>,
    ) -> Result<Vec<RawBlock>, GenerationError> {
        let prompt = self.prompt(tasks, free_text);
        self.generate_from_prompt(&prompt, tasks).await
    }

    /// Call the model with an already built prompt.
    ///
    /// # Errors
    /// See [`generate`](Self::generate).
    pub async fn generate_from_prompt(
        &self,
        prompt: &str,
        tasks: &[Task],
    ) -> Result<Vec<RawBlock>, GenerationError> {
        let value = self
            .model
            .generate_object(prompt, &schedule_schema())
            .await?;
        parse_schedule(value, tasks)
    }
}

/// Convert a model answer into raw blocks, linking focus blocks back to tasks.
///
/// # Errors
/// Returns `GenerationError::Format` on any deviation from the schema: missing
/// or extra fields, times that are not 24h `HH:MM`, unknown tags, blank
/// titles or reasoning, or an empty schedule for a non-empty task list.
pub fn parse_schedule(value: Value, tasks: &[Task]) -> Result<Vec<RawBlock>, GenerationError> {
    let parsed: GeneratedSchedule = serde_json::from_value(value)
        .map_err(|e| GenerationError::Format(format!("schema mismatch: {e}")))?;

    if parsed.schedule.is_empty() && !tasks.is_empty() {
        return Err(GenerationError::Format(
            "model returned an empty schedule".to_string(),
        ));
    }

    parsed
        .schedule
        .into_iter()
        .enumerate()
        .map(|(index, block)| convert_block(index, block, tasks))
        .collect()
}

fn convert_block(
    index: usize,
    block: GeneratedBlock,
    tasks: &[Task],
) -> Result<RawBlock, GenerationError> {
    if block.title.trim().is_empty() {
        return Err(GenerationError::Format(format!("block #{index} has no title")));
    }
    for value in [&block.start, &block.end] {
        if parse_hhmm(value).is_none() {
            return Err(GenerationError::Format(format!(
                "block #{index} ('{}'): '{value}' is not a 24h HH:MM time",
                block.title
            )));
        }
    }
    let category = BlockCategory::from_tag(&block.tag).ok_or_else(|| {
        GenerationError::Format(format!(
            "block #{index} ('{}'): unknown tag '{}'",
            block.title, block.tag
        ))
    })?;
    if block.reasoning.trim().is_empty() {
        return Err(GenerationError::Format(format!(
            "block #{index} ('{}') has no reasoning",
            block.title
        )));
    }

    let source = if category == BlockCategory::Focus {
        match_task(&block.title, tasks)
    } else {
        None
    };

    Ok(RawBlock {
        title: block.title,
        start: TimeSpec::Clock(block.start),
        end: TimeSpec::Clock(block.end),
        category,
        task_id: source.filter(|t| !t.id.is_empty()).map(|t| t.id.clone()),
        source_priority: source.map(|t| t.priority),
        rationale: Some(block.reasoning),
    })
}

/// Exact (case-insensitive) title match first, then the longest task title
/// contained in the block title (models often write "Report (part 2)").
fn match_task<'a>(title: &str, tasks: &'a [Task]) -> Option<&'a Task> {
    let wanted = title.trim().to_lowercase();
    tasks
        .iter()
        .find(|t| t.title.trim().to_lowercase() == wanted)
        .or_else(|| {
            tasks
                .iter()
                .filter(|t| {
                    let name = t.title.trim().to_lowercase();
                    !name.is_empty() && wanted.contains(&name)
                })
                .max_by_key(|t| t.title.trim().len())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Priority;
    use serde_json::json;
    use std::sync::Mutex;

    /// Returns a canned answer and records the prompt it saw.
    struct CannedModel {
        answer: Value,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl GenerativeModel for CannedModel {
        fn name(&self) -> &str {
            "canned"
        }

        async fn generate_object(
            &self,
            prompt: &str,
            _schema: &ResponseSchema,
        ) -> Result<Value, GenerationError> {
            self.seen.lock().unwrap().push(prompt.to_string());
            Ok(self.answer.clone())
        }
    }

    fn tasks() -> Vec<Task> {
        vec![
            Task::new("r", "Report", 120).with_priority(Priority::High),
            Task::new("n", "Notes", 45).with_priority(Priority::Low),
        ]
    }

    #[tokio::test]
    async fn converts_well_formed_answer() {
        let model = Arc::new(CannedModel {
            answer: json!({"schedule": [
                {"title": "Report (part 1)", "start": "09:00", "end": "10:30", "tag": "Deep Work", "reasoning": "Fresh mind."},
                {"title": "Break", "start": "10:30", "end": "10:45", "tag": "Break", "reasoning": "Recover."},
                {"title": "notes", "start": "10:45", "end": "11:30", "tag": "Deep Work", "reasoning": "Lighter task."}
            ]}),
            seen: Mutex::new(Vec::new()),
        });
        let generator = StructuredGenerator::new(model.clone());
        let blocks = generator.generate(&tasks(), Some("short breaks")).await.unwrap();

        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].task_id.as_deref(), Some("r"));
        assert_eq!(blocks[0].source_priority, Some(Priority::High));
        assert_eq!(blocks[0].start, TimeSpec::Clock("09:00".to_string()));
        assert_eq!(blocks[1].task_id, None);
        assert_eq!(blocks[2].task_id.as_deref(), Some("n"));
        assert!(blocks.iter().all(|b| b.rationale.is_some()));

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], generator.prompt(&tasks(), Some("short breaks")));
    }

    #[test]
    fn rejects_schema_mismatches() {
        let cases = vec![
            json!({"blocks": []}),
            json!({"schedule": [{"title": "x", "start": "9am", "end": "10:00", "tag": "Admin", "reasoning": "r"}]}),
            json!({"schedule": [{"title": "x", "start": "09:00", "end": "10:00", "tag": "Lunch", "reasoning": "r"}]}),
            json!({"schedule": [{"title": "x", "start": "09:00", "end": "10:00", "tag": "Admin", "reasoning": " "}]}),
            json!({"schedule": [{"title": "x", "start": "09:00", "end": "10:00", "tag": "Admin"}]}),
            json!({"schedule": [{"title": "x", "start": "09:00", "end": "10:00", "tag": "Admin", "reasoning": "r", "mood": "great"}]}),
            json!({"schedule": []}),
            json!("not an object"),
        ];
        for case in cases {
            let err = parse_schedule(case.clone(), &tasks()).unwrap_err();
            assert!(err.is_format(), "expected format error for {case}");
        }
    }

    #[test]
    fn keeps_conflicting_but_well_formed_output_for_the_validator() {
        let blocks = parse_schedule(
            json!({"schedule": [
                {"title": "Report", "start": "09:00", "end": "11:00", "tag": "Deep Work", "reasoning": "a"},
                {"title": "Notes", "start": "10:00", "end": "11:00", "tag": "Deep Work", "reasoning": "b"}
            ]}),
            &tasks(),
        )
        .unwrap();
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn empty_schedule_is_fine_without_tasks() {
        assert!(parse_schedule(json!({"schedule": []}), &[]).unwrap().is_empty());
    }
}
