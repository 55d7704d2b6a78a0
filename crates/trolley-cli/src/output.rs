//! Output formatting helpers for the CLI.

use chrono::NaiveDate;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Table};
use owo_colors::OwoColorize;

use trolley_core::projection::{self, Completion, SpendStats, TopItem};
use trolley_core::week::period_end;
use trolley_core::{CategoryCatalog, Item, ShoppingList};

/// "24 Aug - 30 Aug 2026" style label for a week.
pub fn week_range(period_start: NaiveDate) -> String {
    let end = period_end(period_start);
    format!(
        "{} - {}",
        period_start.format("%-d %b"),
        end.format("%-d %b %Y")
    )
}

/// Header line for the selected week: range, progress, cost.
pub fn print_week_header(list: &ShoppingList, items: &[Item]) {
    let tally = Completion::of(items);
    println!(
        "\n{} {}",
        "Week of".bold(),
        week_range(list.period_start).bold()
    );
    println!(
        "  {} / {} items done \u{00B7} total £{:.2}",
        tally.completed,
        tally.total,
        list.total_cost
    );
}

/// The grouped week view: every category with its items and meal title.
pub fn print_week(catalog: &CategoryCatalog, list: &ShoppingList, items: &[Item]) {
    print_week_header(list, items);

    for (category, members) in projection::group_by_category(catalog, items) {
        let title = list
            .meal_titles
            .get(category.key)
            .map(|t| format!(" \u{2014} {}", t))
            .unwrap_or_default();
        println!("\n  {}{}", category.label.bold(), title);
        if members.is_empty() {
            println!("    {}", "no items yet".dimmed());
            continue;
        }
        for item in members {
            let n = items.iter().position(|i| i.id == item.id).map(|p| p + 1).unwrap_or(0);
            let mark = if item.completed { "[x]" } else { "[ ]" };
            let line = format!("{:>3}. {} {}", n, mark, item.name);
            if item.completed {
                println!("    {}", line.dimmed());
            } else {
                println!("    {}", line);
            }
            if !item.notes.is_empty() {
                println!("         {}", item.notes.dimmed());
            }
        }
    }
    println!();
}

/// Past weeks as a table.
pub fn print_history(lists: &[ShoppingList], current: Option<uuid::Uuid>) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["#", "Week", "Cost"]);
    let mut shown = 0;
    for (i, list) in lists.iter().enumerate() {
        if Some(list.id) == current {
            continue;
        }
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(week_range(list.period_start)),
            Cell::new(format!("£{:.2}", list.total_cost)),
        ]);
        shown += 1;
    }
    if shown == 0 {
        println!("No past shopping lists yet");
    } else {
        println!("{table}");
    }
}

/// Items of a past week, read-only.
pub fn print_history_items(list: &ShoppingList, items: &[Item]) {
    println!(
        "\n{} {} \u{00B7} £{:.2}",
        "Week of".bold(),
        week_range(list.period_start),
        list.total_cost
    );
    if items.is_empty() {
        println!("  no items in this list");
        return;
    }
    for item in items {
        let mark = if item.completed { "\u{2713}" } else { " " };
        println!("  {} {}", mark, item.name);
        if !item.notes.is_empty() {
            println!("      {}", item.notes.dimmed());
        }
    }
}

/// Spend statistics table.
pub fn print_stats(stats: Option<SpendStats>) {
    let Some(stats) = stats else {
        println!("Not enough data yet. Start shopping to see statistics!");
        return;
    };
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.add_row(vec![Cell::new("Total weeks"), Cell::new(stats.weeks)]);
    table.add_row(vec![
        Cell::new("Total spent"),
        Cell::new(format!("£{:.2}", stats.total)),
    ]);
    table.add_row(vec![
        Cell::new("Average per week"),
        Cell::new(format!("£{:.2}", stats.average)),
    ]);
    table.add_row(vec![
        Cell::new("Highest week"),
        Cell::new(format!("£{:.2}", stats.highest)),
    ]);
    table.add_row(vec![
        Cell::new("Lowest week"),
        Cell::new(format!("£{:.2}", stats.lowest)),
    ]);
    println!("{table}");
}

/// Most frequent item names.
pub fn print_top_items(top: &[TopItem]) {
    if top.is_empty() {
        println!("No items recorded yet");
        return;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Item", "Times bought"]);
    for entry in top {
        table.add_row(vec![Cell::new(&entry.name), Cell::new(entry.count)]);
    }
    println!("{table}");
}
