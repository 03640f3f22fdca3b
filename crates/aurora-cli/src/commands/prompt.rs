use aurora_core::generation::build_prompt;
use aurora_core::Config;
use clap::Args;

use super::read_tasks;

#[derive(Args)]
pub struct PromptArgs {
    /// JSON task file, or `-` for stdin
    #[arg(long)]
    tasks: String,
    /// Free-text instructions
    #[arg(long)]
    prompt: Option<String>,
}

pub fn run(args: PromptArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let tasks = read_tasks(&args.tasks)?;
    aurora_core::task::validate_tasks(&tasks)?;
    let rules = config.generation.rules()?;
    let free_text = args.prompt.as_deref().map(str::trim).filter(|s| !s.is_empty());
    print!("{}", build_prompt(&tasks, free_text, &rules));
    Ok(())
}
