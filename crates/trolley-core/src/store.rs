//! In-memory entity store.
//!
//! The store is the local authoritative mirror of the two remote
//! collections. Operations are synchronous, never perform I/O, and keep each
//! collection in its canonical display order at all times: items by
//! `created_at` ascending, lists by `period_start` descending. Ordering keys
//! never change after creation, so an upsert that replaces an existing row
//! keeps its position.

use std::cmp::Reverse;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::model::{Item, ShoppingList};

/// Local mirror of the Lists and Items collections.
#[derive(Debug, Default)]
pub struct EntityStore {
    lists: Vec<ShoppingList>,
    items: Vec<Item>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Lists ---

    /// Insert or replace a list by id.
    pub fn upsert_list(&mut self, list: ShoppingList) {
        if let Some(existing) = self.lists.iter_mut().find(|l| l.id == list.id) {
            *existing = list;
            return;
        }
        let key = list_sort_key(&list);
        let pos = self
            .lists
            .partition_point(|l| list_sort_key(l) <= key);
        self.lists.insert(pos, list);
    }

    /// Remove a list by id; no-op when absent.
    pub fn remove_list(&mut self, id: Uuid) -> Option<ShoppingList> {
        let pos = self.lists.iter().position(|l| l.id == id)?;
        Some(self.lists.remove(pos))
    }

    pub fn get_list(&self, id: Uuid) -> Option<&ShoppingList> {
        self.lists.iter().find(|l| l.id == id)
    }

    /// All lists, newest period first.
    pub fn lists(&self) -> &[ShoppingList] {
        &self.lists
    }

    pub fn contains_list(&self, id: Uuid) -> bool {
        self.get_list(id).is_some()
    }

    // --- Items ---

    /// Insert or replace an item by id.
    ///
    /// A replacement keeps the row's position: ordering is by creation time,
    /// not mutation time.
    pub fn upsert_item(&mut self, item: Item) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.id == item.id) {
            *existing = item;
            return;
        }
        let key = item_sort_key(&item);
        let pos = self
            .items
            .partition_point(|i| item_sort_key(i) <= key);
        self.items.insert(pos, item);
    }

    /// Remove an item by id, returning it; no-op when absent.
    pub fn remove_item(&mut self, id: Uuid) -> Option<Item> {
        let pos = self.items.iter().position(|i| i.id == id)?;
        Some(self.items.remove(pos))
    }

    pub fn get_item(&self, id: Uuid) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Items of the selected list, oldest first.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn contains_item(&self, id: Uuid) -> bool {
        self.get_item(id).is_some()
    }

    /// Drop the whole item set; used when the selected list changes.
    pub fn clear_items(&mut self) {
        self.items.clear();
    }

    /// Replace the item set wholesale from a fresh query result.
    pub fn load_items(&mut self, items: Vec<Item>) {
        self.items = items;
        self.items.sort_by_key(item_sort_key);
    }

    /// Replace the list set wholesale from a fresh query result.
    pub fn load_lists(&mut self, lists: Vec<ShoppingList>) {
        self.lists = lists;
        self.lists.sort_by_key(list_sort_key);
    }
}

fn item_sort_key(item: &Item) -> (DateTime<Utc>, Uuid) {
    (item.created_at, item.id)
}

// Reverse-ordered on period_start so the vector reads newest week first.
fn list_sort_key(list: &ShoppingList) -> (Reverse<NaiveDate>, Reverse<DateTime<Utc>>) {
    (Reverse(list.period_start), Reverse(list.created_at))
}
