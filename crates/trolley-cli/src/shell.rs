//! Interactive session loop.
//!
//! Reads one command per line and dispatches it to the sync engine. Every
//! remote failure is recoverable: the engine has already rolled back, so the
//! shell just reports the error and keeps going. Queued change
//! notifications are drained after each command so peer edits show up
//! before the next render.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use uuid::Uuid;

use trolley_core::week::{period_offset, period_start};
use trolley_core::{projection, ChangeFeeds, MemoryRemote, SyncEngine};

use crate::output;

pub struct Shell {
    engine: SyncEngine<Arc<MemoryRemote>>,
    feeds: ChangeFeeds,
    quiet: bool,
}

impl Shell {
    pub fn new(engine: SyncEngine<Arc<MemoryRemote>>, feeds: ChangeFeeds, quiet: bool) -> Self {
        Self {
            engine,
            feeds,
            quiet,
        }
    }

    /// Check if quiet mode is enabled.
    pub fn quiet(&self) -> bool {
        self.quiet
    }

    /// Run the interactive loop until `quit` or end of input.
    pub async fn run(mut self, today: NaiveDate) -> anyhow::Result<()> {
        self.engine
            .resolve_current_list(today)
            .await
            .context("could not resolve the current week")?;
        if let Err(err) = self.engine.load_lists().await {
            println!("warning: could not load past weeks: {err}");
        }
        self.feeds.drain(&mut self.engine);
        if !self.quiet {
            self.render_week();
            println!("Type 'help' for commands.");
        }

        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();
        loop {
            print!("trolley> ");
            io::stdout().flush().ok();
            let Some(line) = lines.next() else { break };
            let line = line.context("failed to read input")?;
            let words: Vec<&str> = line.split_whitespace().collect();
            if words.is_empty() {
                continue;
            }
            if matches!(words[0], "quit" | "exit") {
                break;
            }
            if let Err(err) = self.dispatch(&words).await {
                println!("error: {err}");
            }
            self.feeds.drain(&mut self.engine);
        }

        self.feeds.stop(self.engine.remote());
        Ok(())
    }

    async fn dispatch(&mut self, words: &[&str]) -> anyhow::Result<()> {
        match words[0] {
            "help" => print_help(),
            "list" | "show" => self.render_week(),
            "add" => {
                let (category, name) = split_category_and_text(&words[1..])
                    .context("usage: add <category> <name>")?;
                self.engine.add_item(&name, category).await?;
                self.echo_week();
            }
            "done" | "undone" | "toggle" => {
                let id = self.item_at(words.get(1))?;
                let completed = match words[0] {
                    "done" => true,
                    "undone" => false,
                    _ => !self
                        .engine
                        .items()
                        .iter()
                        .find(|i| i.id == id)
                        .map(|i| i.completed)
                        .unwrap_or(false),
                };
                self.engine.toggle_item(id, completed).await?;
                self.echo_week();
            }
            "notes" => {
                let id = self.item_at(words.get(1))?;
                let text = words[2..].join(" ");
                self.engine.update_notes(id, &text).await?;
                self.echo_week();
            }
            "rm" | "delete" => {
                let id = self.item_at(words.get(1))?;
                self.engine.delete_item(id).await?;
                self.echo_week();
            }
            "cost" => {
                let list_id = self.current_list_id()?;
                // Unparseable input clamps to zero, like an empty cost field.
                let amount = words
                    .get(1)
                    .and_then(|w| w.parse::<f64>().ok())
                    .unwrap_or(f64::NAN);
                self.engine.update_cost(list_id, amount).await?;
                self.echo_week();
            }
            "meal" => {
                let list_id = self.current_list_id()?;
                let (category, title) = split_category_and_text(&words[1..])
                    .context("usage: meal <category> <title>")?;
                self.engine.update_meal_title(list_id, category, &title).await?;
                self.echo_week();
            }
            "prev" | "next" => {
                let offset = if words[0] == "next" { 1 } else { -1 };
                self.navigate(offset).await?;
            }
            "goto" => {
                let offset: i64 = words
                    .get(1)
                    .and_then(|w| w.parse().ok())
                    .context("usage: goto <weeks-from-selected>, e.g. goto -2")?;
                self.navigate(offset).await?;
            }
            "history" => {
                self.engine.load_lists().await?;
                output::print_history(self.engine.lists(), self.engine.current_list_id());
            }
            "past" => {
                let index: usize = words
                    .get(1)
                    .and_then(|w| w.parse().ok())
                    .context("usage: past <week-number-from-history>")?;
                let list = self
                    .engine
                    .lists()
                    .get(index.saturating_sub(1))
                    .cloned()
                    .context("no such week in history")?;
                let items = self.engine.fetch_items(list.id).await?;
                output::print_history_items(&list, &items);
            }
            "stats" => {
                self.engine.load_lists().await?;
                output::print_stats(projection::spend_stats(self.engine.lists()));
            }
            "top" => {
                let n: usize = words.get(1).and_then(|w| w.parse().ok()).unwrap_or(10);
                let items = self.engine.fetch_all_items().await?;
                output::print_top_items(&projection::top_items(&items, n));
            }
            "categories" => {
                for category in self.engine.catalog().iter() {
                    println!("  {:<20} {}", category.key, category.label);
                }
            }
            other => {
                println!("unknown command '{other}', try 'help'");
            }
        }
        Ok(())
    }

    async fn navigate(&mut self, offset: i64) -> anyhow::Result<()> {
        let base = self
            .engine
            .current_list()
            .map(|l| l.period_start)
            .unwrap_or_else(|| period_start(chrono::Utc::now().date_naive()));
        let target = period_offset(base, offset);
        self.engine.resolve_or_create(target).await?;
        self.feeds.drain(&mut self.engine);
        self.echo_week();
        Ok(())
    }

    fn render_week(&self) {
        if let Some(list) = self.engine.current_list() {
            output::print_week(self.engine.catalog(), list, self.engine.items());
        }
    }

    // Mutation commands echo the week view afterwards; explicit view
    // commands print regardless of quiet.
    fn echo_week(&self) {
        if !self.quiet() {
            self.render_week();
        }
    }

    fn current_list_id(&self) -> anyhow::Result<Uuid> {
        self.engine
            .current_list_id()
            .context("no week is selected")
    }

    fn item_at(&self, word: Option<&&str>) -> anyhow::Result<Uuid> {
        let index: usize = word
            .and_then(|w| w.parse().ok())
            .context("expected an item number from the week view")?;
        self.engine
            .items()
            .get(index.saturating_sub(1))
            .map(|i| i.id)
            .context("no item with that number")
    }
}

/// Split `[category, text...]` argument lists; the engine owns validation.
fn split_category_and_text<'a>(words: &[&'a str]) -> Option<(&'a str, String)> {
    let (category, rest) = words.split_first()?;
    if rest.is_empty() {
        return None;
    }
    Some((category, rest.join(" ")))
}

fn print_help() {
    println!(
        "\
Commands:
  list                      show the current week
  add <category> <name>     add an item (see 'categories')
  done/undone/toggle <n>    set or flip an item's completed state
  notes <n> <text>          attach notes to an item
  rm <n>                    delete an item
  cost <amount>             set the week's total cost
  meal <category> <title>   name the meal for a category
  prev / next / goto <n>    switch weeks, creating them as needed
  history / past <n>        browse past weeks
  stats                     spending statistics
  top [n]                   most frequently bought items
  categories                list category keys
  quit                      leave"
    );
}
