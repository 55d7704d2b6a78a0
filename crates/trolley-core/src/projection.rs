//! Read-only view projections.
//!
//! Pure functions over store snapshots, recomputed on every read. Nothing
//! here holds state or performs I/O.

use std::collections::HashMap;

use crate::category::{Category, CategoryCatalog};
use crate::model::{Item, ShoppingList};

/// Completion tally for a set of items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Completion {
    pub completed: usize,
    pub total: usize,
}

impl Completion {
    pub fn of<'a>(items: impl IntoIterator<Item = &'a Item>) -> Self {
        let mut tally = Self::default();
        for item in items {
            tally.total += 1;
            if item.completed {
                tally.completed += 1;
            }
        }
        tally
    }
}

/// Items grouped by catalog category, in catalog order. Items whose key is
/// not in the catalog are dropped from the grouping.
pub fn group_by_category<'a>(
    catalog: &'a CategoryCatalog,
    items: &'a [Item],
) -> Vec<(&'a Category, Vec<&'a Item>)> {
    catalog
        .iter()
        .map(|category| {
            let members = items
                .iter()
                .filter(|item| item.category == category.key)
                .collect();
            (category, members)
        })
        .collect()
}

/// Spend statistics across weeks that recorded a cost.
#[derive(Debug, Clone, PartialEq)]
pub struct SpendStats {
    /// Weeks with `total_cost > 0`
    pub weeks: usize,
    pub total: f64,
    pub average: f64,
    pub highest: f64,
    pub lowest: f64,
}

/// Statistics over all lists with a positive total cost, or `None` when no
/// week has recorded spending yet.
pub fn spend_stats(lists: &[ShoppingList]) -> Option<SpendStats> {
    let costs: Vec<f64> = lists
        .iter()
        .map(|l| l.total_cost)
        .filter(|&c| c > 0.0)
        .collect();
    if costs.is_empty() {
        return None;
    }

    let total: f64 = costs.iter().sum();
    let highest = costs.iter().cloned().fold(f64::MIN, f64::max);
    let lowest = costs.iter().cloned().fold(f64::MAX, f64::min);
    Some(SpendStats {
        weeks: costs.len(),
        total,
        average: total / costs.len() as f64,
        highest,
        lowest,
    })
}

/// One entry of the most-frequent-items projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopItem {
    /// Normalized (trimmed, lowercased) name
    pub name: String,
    pub count: usize,
}

/// The `n` most frequent item names across `items`, case-insensitive and
/// trimmed. Ties break toward the name seen first.
pub fn top_items(items: &[Item], n: usize) -> Vec<TopItem> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for item in items {
        let name = item.name.trim().to_lowercase();
        if name.is_empty() {
            continue;
        }
        let first_seen = counts.len();
        let entry = counts.entry(name).or_insert((0, first_seen));
        entry.0 += 1;
    }

    let mut ranked: Vec<(String, usize, usize)> = counts
        .into_iter()
        .map(|(name, (count, first_seen))| (name, count, first_seen))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked
        .into_iter()
        .take(n)
        .map(|(name, count, _)| TopItem { name, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SyncState;
    use chrono::Utc;
    use uuid::Uuid;

    fn item(name: &str, category: &str, completed: bool) -> Item {
        Item {
            id: Uuid::new_v4(),
            list_id: Uuid::new_v4(),
            name: name.to_string(),
            category: category.to_string(),
            completed,
            notes: String::new(),
            created_at: Utc::now(),
            sync: SyncState::Confirmed,
        }
    }

    fn list_with_cost(cost: f64) -> ShoppingList {
        ShoppingList {
            id: Uuid::new_v4(),
            period_start: chrono::NaiveDate::from_ymd_opt(2026, 8, 24).unwrap(),
            total_cost: cost,
            meal_titles: Default::default(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_completion_counts() {
        let items = vec![
            item("milk", "monday_dinner", true),
            item("eggs", "monday_dinner", false),
            item("bread", "luke_lunch", true),
        ];
        let tally = Completion::of(&items);
        assert_eq!(tally, Completion { completed: 2, total: 3 });
    }

    #[test]
    fn test_grouping_follows_catalog_order() {
        let catalog = CategoryCatalog::default();
        let items = vec![
            item("pasta", "friday_dinner", false),
            item("milk", "monday_dinner", false),
            item("rice", "monday_dinner", false),
        ];
        let groups = group_by_category(&catalog, &items);
        assert_eq!(groups.len(), catalog.len());
        assert_eq!(groups[0].0.key, "monday_dinner");
        assert_eq!(groups[0].1.len(), 2);
        let friday = groups.iter().find(|(c, _)| c.key == "friday_dinner").unwrap();
        assert_eq!(friday.1.len(), 1);
    }

    #[test]
    fn test_spend_stats_excludes_zero_weeks() {
        let lists = vec![
            list_with_cost(12.50),
            list_with_cost(0.0),
            list_with_cost(8.00),
            list_with_cost(20.00),
        ];
        let stats = spend_stats(&lists).unwrap();
        assert_eq!(stats.weeks, 3);
        assert_eq!(stats.total, 40.50);
        assert_eq!(stats.average, 13.50);
        assert_eq!(stats.highest, 20.00);
        assert_eq!(stats.lowest, 8.00);
    }

    #[test]
    fn test_spend_stats_empty_when_no_costs() {
        assert!(spend_stats(&[]).is_none());
        assert!(spend_stats(&[list_with_cost(0.0)]).is_none());
    }

    #[test]
    fn test_top_items_normalizes_names() {
        let items = vec![
            item("Milk", "monday_dinner", false),
            item("milk ", "tuesday_dinner", false),
            item("MILK", "luke_lunch", true),
            item("eggs", "monday_dinner", false),
        ];
        let top = top_items(&items, 10);
        assert_eq!(top[0], TopItem { name: "milk".to_string(), count: 3 });
        assert_eq!(top[1], TopItem { name: "eggs".to_string(), count: 1 });
    }

    #[test]
    fn test_top_items_ties_break_by_first_seen() {
        let items = vec![
            item("apples", "monday_dinner", false),
            item("bananas", "monday_dinner", false),
            item("bananas", "monday_dinner", false),
            item("apples", "monday_dinner", false),
        ];
        let top = top_items(&items, 2);
        assert_eq!(top[0].name, "apples");
        assert_eq!(top[1].name, "bananas");
    }

    #[test]
    fn test_top_items_truncates_to_n() {
        let items = vec![
            item("a", "monday_dinner", false),
            item("b", "monday_dinner", false),
            item("c", "monday_dinner", false),
        ];
        assert_eq!(top_items(&items, 2).len(), 2);
    }
}
