//! Sample data for demos: a few past weeks with items and costs.

use chrono::NaiveDate;

use trolley_core::model::{ItemPatch, NewItem, NewList};
use trolley_core::remote::RemoteStore;
use trolley_core::week::{period_offset, period_start};
use trolley_core::MemoryRemote;

const PAST_WEEKS: &[(f64, &[(&str, &str, bool)])] = &[
    (
        62.10,
        &[
            ("monday_dinner", "Chicken thighs", true),
            ("monday_dinner", "Rice", true),
            ("wednesday_dinner", "Salmon", true),
            ("luke_lunch", "Sandwich bread", true),
            ("luke_lunch", "Ham", true),
        ],
    ),
    (
        48.75,
        &[
            ("tuesday_dinner", "Spaghetti", true),
            ("tuesday_dinner", "Passata", true),
            ("friday_dinner", "Pizza dough", true),
            ("charlie_lunch", "Yoghurts", true),
            ("luke_lunch", "Sandwich bread", true),
        ],
    ),
    (
        55.30,
        &[
            ("sunday_dinner", "Beef joint", true),
            ("sunday_dinner", "Potatoes", true),
            ("thursday_dinner", "Stir fry veg", false),
            ("luke_lunch", "Sandwich bread", true),
        ],
    ),
];

/// Insert a few completed past weeks so history, stats, and top-items have
/// something to show.
pub async fn sample_weeks(
    remote: &MemoryRemote,
    today: NaiveDate,
) -> trolley_core::Result<()> {
    let this_week = period_start(today);
    for (weeks_ago, (cost, items)) in PAST_WEEKS.iter().enumerate() {
        let period = period_offset(this_week, -(weeks_ago as i64 + 1));
        let mut new = NewList::for_week(period);
        new.total_cost = *cost;
        let list = remote.insert_list(new).await?;

        for (category, name, completed) in items.iter() {
            let row = remote
                .insert_item(NewItem {
                    list_id: list.id,
                    name: (*name).to_string(),
                    category: (*category).to_string(),
                    completed: false,
                    notes: String::new(),
                })
                .await?;
            if *completed {
                remote
                    .update_item(row.id, ItemPatch::completed(true))
                    .await?;
            }
        }
    }
    Ok(())
}
