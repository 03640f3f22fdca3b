use aurora_core::schedule::{format_hhmm, DaySummary};
use aurora_core::{
    Block, BlockCategory, Config, FallbackReason, Identity, Intensity, PlanStore, Preferences,
    Priority, Strategy, SynthesisOutcome, SynthesisRequest, TimeOfDay,
};
use clap::Args;
use serde::Serialize;

use super::{open_db, read_tasks, IdentityArgs};

#[derive(Args)]
pub struct PlanArgs {
    /// JSON task file, or `-` for stdin (default: the identity's open tasks)
    #[arg(long)]
    tasks: Option<String>,
    /// Preferred time of day: morning, afternoon, evening
    #[arg(long)]
    time: Option<TimeOfDay>,
    /// light, balanced, intense, or a 0-100 scalar
    #[arg(long)]
    intensity: Option<Intensity>,
    /// Daily focus capacity in hours
    #[arg(long)]
    capacity: Option<f64>,
    /// Free-text instructions for the generative strategy
    #[arg(long)]
    prompt: Option<String>,
    /// Force a strategy: heuristic or generative
    #[arg(long)]
    strategy: Option<Strategy>,
    #[command(flatten)]
    identity: IdentityArgs,
    /// Return the lead-in/wrap-up stub when there are no tasks
    #[arg(long)]
    wrap_up_only: bool,
    /// Store the plan (and these preferences) for the identity
    #[arg(long)]
    save: bool,
}

/// A block as printed: clock times instead of minute offsets.
#[derive(Serialize)]
struct BlockView<'a> {
    title: &'a str,
    start: String,
    end: String,
    category: BlockCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rationale: Option<&'a str>,
}

impl<'a> From<&'a Block> for BlockView<'a> {
    fn from(b: &'a Block) -> Self {
        Self {
            title: &b.title,
            start: format_hhmm(b.start_minute),
            end: format_hhmm(b.end_minute),
            category: b.category,
            task_id: b.task_id.as_deref(),
            priority: b.source_priority,
            rationale: b.rationale.as_deref(),
        }
    }
}

#[derive(Serialize)]
struct SavedView {
    id: i64,
    identity: Identity,
}

#[derive(Serialize)]
struct PlanView<'a> {
    strategy: Strategy,
    requested: Strategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    fallback: Option<&'a FallbackReason>,
    focus_budget_minutes: u32,
    summary: DaySummary,
    blocks: Vec<BlockView<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transcript: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved: Option<SavedView>,
}

pub fn run(args: PlanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let identity = args.identity.identity();
    let tasks = match (&args.tasks, &identity) {
        (Some(source), _) => read_tasks(source)?,
        (None, Some(who)) => open_db(&config)?
            .list_tasks(who, false)?
            .into_iter()
            .map(|stored| stored.task)
            .collect(),
        (None, None) => return Err("either --tasks or --session/--user is required".into()),
    };

    // Stored profile first, then flags on top.
    let mut preferences = match &identity {
        Some(who) => open_db(&config)?.load_preferences(who)?.unwrap_or_default(),
        None => Preferences::default(),
    };
    if let Some(time) = args.time {
        preferences.time_of_day = time;
    }
    if let Some(intensity) = args.intensity {
        preferences.intensity = intensity;
    }
    if let Some(hours) = args.capacity {
        preferences.daily_focus_capacity_hours = hours;
    }

    let mut request = SynthesisRequest::new(tasks, preferences).with_wrap_up_only(args.wrap_up_only);
    if let Some(text) = &args.prompt {
        request = request.with_free_text(text.clone());
    }
    if let Some(strategy) = args.strategy {
        request = request.with_strategy(strategy);
    }

    let synthesizer = config.synthesizer()?;
    let runtime = tokio::runtime::Runtime::new()?;
    let outcome = runtime.block_on(synthesizer.synthesize(&request))?;

    let saved = if args.save {
        let who = identity.unwrap_or_else(Identity::new_session);
        let db = open_db(&config)?;
        db.save_preferences(&who, &request.preferences)?;
        let stored = db.save_schedule(&who, &outcome, request.free_text())?;
        Some(SavedView {
            id: stored.id,
            identity: who,
        })
    } else {
        None
    };

    print_outcome(&outcome, saved)
}

fn print_outcome(
    outcome: &SynthesisOutcome,
    saved: Option<SavedView>,
) -> Result<(), Box<dyn std::error::Error>> {
    let view = PlanView {
        strategy: outcome.strategy,
        requested: outcome.requested,
        fallback: outcome.fallback.as_ref(),
        focus_budget_minutes: outcome.focus_budget_minutes,
        summary: outcome.sequence.summary(),
        blocks: outcome.sequence.iter().map(BlockView::from).collect(),
        transcript: outcome.transcript.as_deref(),
        saved,
    };
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}
