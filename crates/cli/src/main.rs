//! Terminal front end for the Study Planner.
//!
//! Drives a [`SyncManager`] against an in-process ledger and renders its
//! snapshots, the way a wallet-connected page would.
mod commands;
mod render;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use commands::{Command, USAGE};
use dotenv::dotenv;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use study_planner_domain::Address;
use study_planner_execution::prelude::*;
use study_planner_protocols::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Deletion {
    /// Keep deleted tasks with `exists = false`.
    Tombstone,
    /// Drop deleted tasks from the list.
    Remove,
}

impl From<Deletion> for DeletionMode {
    fn from(value: Deletion) -> Self {
        match value {
            Deletion::Tombstone => Self::Tombstone,
            Deletion::Remove => Self::Remove,
        }
    }
}

#[derive(Parser)]
#[command(name = "study-planner")]
#[command(about = "Study Planner on-chain task list", long_about = None)]
struct Cli {
    /// Wallet address (falls back to STUDY_PLANNER_ADDRESS)
    #[arg(short, long)]
    address: Option<String>,

    /// Milliseconds before a submitted transaction is mined
    #[arg(long, default_value_t = 1500)]
    confirm_delay_ms: u64,

    /// How the contract treats deleted tasks
    #[arg(long, value_enum, default_value_t = Deletion::Tombstone)]
    deletion: Deletion,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let Some(raw_address) = cli
        .address
        .clone()
        .or_else(|| env::var("STUDY_PLANNER_ADDRESS").ok())
    else {
        println!("Study Planner");
        println!("Please connect a wallet: pass --address or set STUDY_PLANNER_ADDRESS.");
        return Ok(());
    };
    let address: Address = raw_address
        .parse()
        .with_context(|| format!("invalid wallet address {raw_address:?}"))?;

    let ledger = InMemoryLedger::new(InMemoryLedgerConfig {
        confirmation: ConfirmationMode::Automatic {
            delay: Duration::from_millis(cli.confirm_delay_ms),
        },
        deletion: cli.deletion.into(),
        ..Default::default()
    });
    let manager = SyncManager::new(Arc::new(ledger), SyncManagerConfig::default());
    manager.activate(address.clone()).await;

    println!("Study Planner");
    println!("Connected wallet: {address}");
    println!("{USAGE}");

    let notifier = tokio::spawn(announce_confirmations(manager.clone()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match commands::parse(&line) {
            None => continue,
            Some(Ok(command)) => command,
            Some(Err(e)) => {
                println!("{e}");
                continue;
            }
        };

        match command {
            Command::Add { title, due_date } => {
                if title.is_empty() {
                    continue;
                }
                report(manager.add_task(&title, due_date).await, "Add task");
            }
            Command::Done(id) => report(manager.mark_completed(id).await, "Mark completed"),
            Command::Remove(id) => report(manager.delete_task(id).await, "Delete task"),
            Command::List => println!("{}", render::tasks(&manager.snapshot().await)),
            Command::Status => println!("{}", render::status(&manager.snapshot().await)),
            Command::Refresh => {
                manager.fetch_all().await;
                println!("{}", render::tasks(&manager.snapshot().await));
            }
            Command::Help => println!("{USAGE}"),
            Command::Quit => break,
        }
    }

    notifier.abort();
    manager.deactivate().await;
    Ok(())
}

fn report(result: Result<(), SyncError>, action: &str) {
    match result {
        Ok(()) => println!("{action}: submitted, waiting for confirmation..."),
        Err(e) => println!("{action} error: {e}"),
    }
}

/// Prints a line whenever the current transaction settles.
async fn announce_confirmations(manager: SyncManager) {
    let mut changes = manager.changes();
    let mut announced = None;
    while changes.changed().await.is_ok() {
        let snapshot = manager.snapshot().await;
        let state = &snapshot.state;
        let settled = state.is_confirmed || (state.error.is_some() && !state.is_loading);
        if settled && state.hash.is_some() && state.hash != announced {
            if state.is_confirmed {
                println!("Transaction confirmed!");
            } else if let Some(error) = &state.error {
                println!("Error: {error}");
            }
            announced.clone_from(&state.hash);
        }
    }
}
