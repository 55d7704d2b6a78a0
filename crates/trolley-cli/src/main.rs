//! Trolley CLI - a shared weekly shopping list client.
//!
//! Drives the sync engine against the in-memory backend. The shell is the
//! collaborator UI from the engine's point of view: it only calls the
//! mutation API and renders projections.

mod cli;
mod output;
mod seed;
mod shell;

use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use trolley_core::{CategoryCatalog, ChangeFeeds, MemoryRemote, SyncEngine};

use crate::cli::{Cli, Commands};
use crate::shell::Shell;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let today = match &args.today {
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .with_context(|| format!("invalid date '{}'", value))?,
        None => chrono::Utc::now().date_naive(),
    };

    let remote = Arc::new(MemoryRemote::new());
    if args.seed {
        seed::sample_weeks(&remote, today)
            .await
            .context("failed to seed sample data")?;
    }

    let engine = SyncEngine::new(remote.clone(), CategoryCatalog::default());
    let feeds = ChangeFeeds::start(engine.remote());

    match args.command.unwrap_or(Commands::Shell) {
        Commands::Shell => Shell::new(engine, feeds, args.quiet).run(today).await,
        Commands::Demo => run_demo(engine, feeds, today, args.quiet).await,
    }
}

/// Scripted walkthrough used as a smoke test of the whole engine surface.
async fn run_demo(
    mut engine: SyncEngine<Arc<MemoryRemote>>,
    mut feeds: ChangeFeeds,
    today: NaiveDate,
    quiet: bool,
) -> anyhow::Result<()> {
    engine.resolve_current_list(today).await?;
    let list_id = engine.current_list_id().context("no current list")?;

    let milk = engine.add_item("Milk", "monday_dinner").await?;
    engine.add_item("Spaghetti", "tuesday_dinner").await?;
    engine.add_item("Sandwich bread", "luke_lunch").await?;
    engine.toggle_item(milk, true).await?;
    engine.update_notes(milk, "semi-skimmed").await?;
    engine.update_cost(list_id, 23.40).await?;
    engine
        .update_meal_title(list_id, "tuesday_dinner", "Spag bol")
        .await?;
    feeds.drain(&mut engine);

    engine.load_lists().await?;
    let items = engine.fetch_all_items().await?;

    if !quiet {
        let list = engine.current_list().context("current list vanished")?;
        output::print_week(engine.catalog(), list, engine.items());
        output::print_stats(trolley_core::projection::spend_stats(engine.lists()));
        output::print_top_items(&trolley_core::projection::top_items(&items, 5));
    }

    feeds.stop(engine.remote());
    Ok(())
}
