use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;

use crate::{
    daemon::storage::{ledger::UsageLedger, store::JsonStateStore},
    utils::time::format_millis,
};

#[derive(Subcommand, Debug)]
pub enum LimitCommand {
    #[command(about = "Set a daily limit for a domain")]
    Set {
        #[arg(help = "Domain name, for example youtube.com")]
        domain: String,
        #[arg(help = "Daily limit in minutes")]
        minutes: u64,
    },
    #[command(about = "Remove the limit for a domain")]
    Remove {
        #[arg(help = "Domain name, for example youtube.com")]
        domain: String,
    },
    #[command(about = "List configured limits")]
    List,
}

/// Command to process `limit` subcommands. This is the only write surface
/// the cli has into the store, and it only ever touches the limit table.
pub async fn process_limit_command(command: LimitCommand, dir: PathBuf) -> Result<()> {
    let ledger = UsageLedger::new(JsonStateStore::new(dir)?);

    match command {
        LimitCommand::Set { domain, minutes } => {
            ledger
                .set_limit(&domain, minutes.saturating_mul(60_000))
                .await?;
            println!("Limit for {domain} set to {minutes} minutes");
        }
        LimitCommand::Remove { domain } => {
            if ledger.remove_limit(&domain).await? {
                println!("Limit for {domain} removed");
            } else {
                println!("No limit configured for {domain}");
            }
        }
        LimitCommand::List => {
            let state = ledger.snapshot().await?;
            if state.limits.is_empty() {
                println!("No limits configured");
            } else {
                let mut limits = state.limits.iter().collect::<Vec<_>>();
                limits.sort();
                for (domain, &millis) in limits {
                    println!("{domain}\t{}", format_millis(millis));
                }
            }
        }
    }
    Ok(())
}
