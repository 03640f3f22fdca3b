use aurora_core::{Config, PlanStore};
use clap::Subcommand;

use super::{open_db, IdentityArgs};

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Show the most recently stored plan
    Latest {
        #[command(flatten)]
        identity: IdentityArgs,
    },
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        HistoryAction::Latest { identity } => {
            let who = identity
                .identity()
                .ok_or("either --session or --user is required")?;
            let config = Config::load()?;
            let db = open_db(&config)?;
            match db.latest_schedule(&who)? {
                Some(stored) => println!("{}", serde_json::to_string_pretty(&stored)?),
                None => return Err(format!("no stored plan for {who}").into()),
            }
        }
    }
    Ok(())
}
