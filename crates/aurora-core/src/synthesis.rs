//! Synthesis facade.
//!
//! Picks a strategy, runs it, and pipes its output through the validator.
//! The generative path gets exactly one chance: a malformed answer, a model
//! failure, a timeout, or a rejected schedule all fall back to the heuristic
//! planner, whose plans pass validation by construction.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GenerationError, InputError, SynthesisError};
use crate::generation::StructuredGenerator;
use crate::preferences::Preferences;
use crate::schedule::{BlockSequence, ValidationLimits, Validator};
use crate::scheduler::HeuristicPlanner;
use crate::task::{validate_tasks, Task};

/// Block-producing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Heuristic,
    #[serde(alias = "ai")]
    Generative,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Heuristic => "heuristic",
            Strategy::Generative => "generative",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "heuristic" => Ok(Strategy::Heuristic),
            "generative" | "ai" => Ok(Strategy::Generative),
            _ => Err(InputError::UnknownValue {
                field: "strategy",
                value: s.to_string(),
            }),
        }
    }
}

/// Why the generative path was abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FallbackReason {
    /// No generator is configured
    GeneratorUnavailable,
    /// The model answered outside the schema
    Format { message: String },
    /// The model call itself failed
    Model { message: String },
    Timeout { timeout_secs: u64 },
    /// Well-formed output that broke a day invariant
    Rejected { violations: Vec<String> },
}

impl From<GenerationError> for FallbackReason {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Format(message) => FallbackReason::Format { message },
            GenerationError::Model(message) => FallbackReason::Model { message },
            GenerationError::Timeout { timeout_secs } => FallbackReason::Timeout { timeout_secs },
            GenerationError::NotConfigured(_) => FallbackReason::GeneratorUnavailable,
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::GeneratorUnavailable => write!(f, "no generator configured"),
            FallbackReason::Format { message } => write!(f, "malformed output: {message}"),
            FallbackReason::Model { message } => write!(f, "model failed: {message}"),
            FallbackReason::Timeout { timeout_secs } => {
                write!(f, "model timed out after {timeout_secs}s")
            }
            FallbackReason::Rejected { violations } => {
                write!(f, "rejected by validator: {}", violations.join("; "))
            }
        }
    }
}

/// One synthesis call's input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub preferences: Preferences,
    /// Overrides `preferences.free_text_instructions` when set
    #[serde(default, alias = "freeText")]
    pub free_text: Option<String>,
    /// Forced strategy; chosen from the free text when absent
    #[serde(default)]
    pub strategy: Option<Strategy>,
    /// Return the lead-in/wrap-up stub instead of an empty day when there is nothing to plan
    #[serde(default, alias = "wrapUpOnly")]
    pub wrap_up_only: bool,
}

impl SynthesisRequest {
    pub fn new(tasks: Vec<Task>, preferences: Preferences) -> Self {
        Self {
            tasks,
            preferences,
            ..Self::default()
        }
    }

    pub fn with_free_text(mut self, free_text: impl Into<String>) -> Self {
        self.free_text = Some(free_text.into());
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_wrap_up_only(mut self, wrap_up_only: bool) -> Self {
        self.wrap_up_only = wrap_up_only;
        self
    }

    /// Effective free text, trimmed; `None` when blank.
    pub fn free_text(&self) -> Option<&str> {
        self.free_text
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| self.preferences.instructions())
    }

    /// The explicit strategy, else generative when free text is present.
    pub fn requested_strategy(&self) -> Strategy {
        self.strategy.unwrap_or(if self.free_text().is_some() {
            Strategy::Generative
        } else {
            Strategy::Heuristic
        })
    }
}

/// The accepted sequence plus how it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisOutcome {
    pub sequence: BlockSequence,
    /// Strategy that produced `sequence`
    pub strategy: Strategy,
    pub requested: Strategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackReason>,
    /// Prompt sent to the model, whenever the generative path ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    pub focus_budget_minutes: u32,
}

impl SynthesisOutcome {
    pub fn fell_back(&self) -> bool {
        self.fallback.is_some()
    }
}

/// Strategy selector and validation gate.
#[derive(Debug, Clone, Default)]
pub struct Synthesizer {
    planner: HeuristicPlanner,
    generator: Option<StructuredGenerator>,
    timeout: Option<Duration>,
}

impl Synthesizer {
    /// Heuristic-only synthesizer
    pub fn new(planner: HeuristicPlanner) -> Self {
        Self {
            planner,
            generator: None,
            timeout: None,
        }
    }

    pub fn with_generator(mut self, generator: StructuredGenerator) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Deadline for one model call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn planner(&self) -> &HeuristicPlanner {
        &self.planner
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    /// Produce a validated day plan.
    ///
    /// # Errors
    /// `SynthesisError::Input` for malformed tasks or preferences, and
    /// `SynthesisError::Defect` if a heuristic plan ever fails validation.
    /// Generative failures never surface; they fall back to the heuristic.
    pub async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> Result<SynthesisOutcome, SynthesisError> {
        check_input(request)?;
        let requested = request.requested_strategy();
        let limits = self.planner.limits(&request.preferences);
        tracing::debug!(
            tasks = request.tasks.len(),
            strategy = %requested,
            budget = limits.focus_budget_minutes,
            "synthesizing day plan"
        );

        if is_nothing_to_plan(request) {
            return Ok(empty_outcome(requested, limits));
        }

        if requested == Strategy::Heuristic {
            return self.heuristic_outcome(request, requested, limits, None, None);
        }

        let Some(generator) = &self.generator else {
            tracing::warn!("generative strategy requested without a generator; using heuristic");
            return self.heuristic_outcome(
                request,
                requested,
                limits,
                Some(FallbackReason::GeneratorUnavailable),
                None,
            );
        };

        let prompt = generator.prompt(&request.tasks, request.free_text());
        let reason = match self.run_generator(generator, &prompt, &request.tasks).await {
            Ok(candidate) => match Validator::new(limits).validate(&candidate) {
                Ok(sequence) => {
                    tracing::info!(
                        blocks = sequence.len(),
                        model = generator.model_name(),
                        "accepted generative plan"
                    );
                    return Ok(SynthesisOutcome {
                        sequence,
                        strategy: Strategy::Generative,
                        requested,
                        fallback: None,
                        transcript: Some(prompt),
                        focus_budget_minutes: limits.focus_budget_minutes,
                    });
                }
                Err(violations) => FallbackReason::Rejected {
                    violations: violations.iter().map(ToString::to_string).collect(),
                },
            },
            Err(err) => FallbackReason::from(err),
        };

        tracing::warn!(reason = %reason, "generative plan discarded; falling back to heuristic");
        self.heuristic_outcome(request, requested, limits, Some(reason), Some(prompt))
    }

    /// Heuristic-only synthesis; never touches the model.
    ///
    /// # Errors
    /// See [`synthesize`](Self::synthesize).
    pub fn synthesize_heuristic(
        &self,
        request: &SynthesisRequest,
    ) -> Result<SynthesisOutcome, SynthesisError> {
        check_input(request)?;
        let limits = self.planner.limits(&request.preferences);
        if is_nothing_to_plan(request) {
            return Ok(empty_outcome(Strategy::Heuristic, limits));
        }
        self.heuristic_outcome(request, Strategy::Heuristic, limits, None, None)
    }

    async fn run_generator(
        &self,
        generator: &StructuredGenerator,
        prompt: &str,
        tasks: &[Task],
    ) -> Result<Vec<crate::schedule::RawBlock>, GenerationError> {
        let call = generator.generate_from_prompt(prompt, tasks);
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| GenerationError::Timeout {
                    timeout_secs: limit.as_secs(),
                })?,
            None => call.await,
        }
    }

    fn heuristic_outcome(
        &self,
        request: &SynthesisRequest,
        requested: Strategy,
        limits: ValidationLimits,
        fallback: Option<FallbackReason>,
        transcript: Option<String>,
    ) -> Result<SynthesisOutcome, SynthesisError> {
        let candidate = self.planner.plan(&request.tasks, &request.preferences);
        let sequence = Validator::new(limits).validate(&candidate).map_err(|errors| {
            tracing::error!(%errors, "engine defect: heuristic plan failed validation");
            SynthesisError::Defect(errors)
        })?;
        tracing::debug!(
            blocks = sequence.len(),
            focus = sequence.focus_minutes(),
            "heuristic plan ready"
        );
        Ok(SynthesisOutcome {
            sequence,
            strategy: Strategy::Heuristic,
            requested,
            fallback,
            transcript,
            focus_budget_minutes: limits.focus_budget_minutes,
        })
    }
}

fn check_input(request: &SynthesisRequest) -> Result<(), InputError> {
    validate_tasks(&request.tasks)?;
    request.preferences.validate()
}

/// No tasks, no free text, and no explicit request for the stub.
fn is_nothing_to_plan(request: &SynthesisRequest) -> bool {
    request.tasks.is_empty() && request.free_text().is_none() && !request.wrap_up_only
}

fn empty_outcome(requested: Strategy, limits: ValidationLimits) -> SynthesisOutcome {
    SynthesisOutcome {
        sequence: BlockSequence::empty(),
        strategy: Strategy::Heuristic,
        requested,
        fallback: None,
        transcript: None,
        focus_budget_minutes: limits.focus_budget_minutes,
    }
}
