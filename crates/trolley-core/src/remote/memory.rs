//! In-memory remote store backend.
//!
//! Implements [`RemoteStore`] over plain vectors guarded by a mutex. Ids and
//! creation timestamps are assigned on insert, the `period_start`
//! uniqueness constraint is enforced, and every committed write is broadcast
//! to all live subscriptions. Intended for tests and the demo client; it
//! additionally supports write/read failure injection so callers can
//! exercise rollback paths.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{Result, TrolleyError};
use crate::model::{ChangeEvent, Item, ItemPatch, ListPatch, NewItem, NewList, ShoppingList, SyncState};
use crate::remote::{ItemFilter, ListFilter, RemoteStore, Subscription, SubscriptionId};

use async_trait::async_trait;

#[derive(Default)]
struct Tables {
    lists: Vec<ShoppingList>,
    items: Vec<Item>,
    list_subs: Vec<(SubscriptionId, mpsc::UnboundedSender<ChangeEvent<ShoppingList>>)>,
    item_subs: Vec<(SubscriptionId, mpsc::UnboundedSender<ChangeEvent<Item>>)>,
    next_subscription: SubscriptionId,
    last_timestamp: Option<DateTime<Utc>>,
    fail_writes: bool,
    fail_reads: bool,
}

impl Tables {
    /// Strictly increasing creation timestamp, so insertion order is always
    /// recoverable from `created_at` even within one millisecond.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts
    }

    fn broadcast_list(&mut self, event: ChangeEvent<ShoppingList>) {
        self.list_subs
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    fn broadcast_item(&mut self, event: ChangeEvent<Item>) {
        self.item_subs
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }
}

/// In-memory [`RemoteStore`] implementation.
#[derive(Default)]
pub struct MemoryRemote {
    tables: Mutex<Tables>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // A poisoned lock only means a panicking test; the data is still fine.
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every subsequent write fail with `RemoteWrite` until disabled.
    pub fn set_fail_writes(&self, fail: bool) {
        self.tables().fail_writes = fail;
    }

    /// Make every subsequent query fail with `RemoteRead` until disabled.
    pub fn set_fail_reads(&self, fail: bool) {
        self.tables().fail_reads = fail;
    }

    /// Number of live subscriptions per collection (lists, items).
    pub fn subscription_counts(&self) -> (usize, usize) {
        let tables = self.tables();
        (tables.list_subs.len(), tables.item_subs.len())
    }

    fn check_write(tables: &Tables) -> Result<()> {
        if tables.fail_writes {
            Err(TrolleyError::RemoteWrite("injected write failure".into()))
        } else {
            Ok(())
        }
    }

    fn check_read(tables: &Tables) -> Result<()> {
        if tables.fail_reads {
            Err(TrolleyError::RemoteRead("injected read failure".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn query_lists(&self, filter: &ListFilter) -> Result<Vec<ShoppingList>> {
        tokio::task::yield_now().await;
        let tables = self.tables();
        Self::check_read(&tables)?;

        let mut rows: Vec<ShoppingList> = tables
            .lists
            .iter()
            .filter(|l| match filter.period_start {
                Some(p) => l.period_start == p,
                None => true,
            })
            .filter(|l| match filter.period_within {
                Some((start, end)) => l.period_start >= start && l.period_start <= end,
                None => true,
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.period_start
                .cmp(&a.period_start)
                .then(b.created_at.cmp(&a.created_at))
        });
        if let Some(limit) = filter.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert_list(&self, new: NewList) -> Result<ShoppingList> {
        tokio::task::yield_now().await;
        let mut tables = self.tables();
        Self::check_write(&tables)?;

        if tables.lists.iter().any(|l| l.period_start == new.period_start) {
            return Err(TrolleyError::Conflict(format!(
                "list for week {} already exists",
                new.period_start
            )));
        }

        let row = ShoppingList {
            id: Uuid::new_v4(),
            period_start: new.period_start,
            total_cost: new.total_cost,
            meal_titles: Default::default(),
            created_at: tables.next_timestamp(),
        };
        tables.lists.push(row.clone());
        tables.broadcast_list(ChangeEvent::Inserted(row.clone()));
        Ok(row)
    }

    async fn update_list(&self, id: Uuid, patch: ListPatch) -> Result<()> {
        tokio::task::yield_now().await;
        let mut tables = self.tables();
        Self::check_write(&tables)?;

        let Some(pos) = tables.lists.iter().position(|l| l.id == id) else {
            return Err(TrolleyError::RemoteWrite(format!("no list with id {}", id)));
        };
        {
            let row = &mut tables.lists[pos];
            if let Some(total_cost) = patch.total_cost {
                row.total_cost = total_cost;
            }
            if let Some(meal_titles) = patch.meal_titles {
                row.meal_titles = meal_titles;
            }
        }
        let row = tables.lists[pos].clone();
        tables.broadcast_list(ChangeEvent::Updated(row));
        Ok(())
    }

    async fn query_items(&self, filter: &ItemFilter) -> Result<Vec<Item>> {
        tokio::task::yield_now().await;
        let tables = self.tables();
        Self::check_read(&tables)?;

        let mut rows: Vec<Item> = tables
            .items
            .iter()
            .filter(|i| match filter.list_id {
                Some(list_id) => i.list_id == list_id,
                None => true,
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        if let Some(limit) = filter.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert_item(&self, new: NewItem) -> Result<Item> {
        tokio::task::yield_now().await;
        let mut tables = self.tables();
        Self::check_write(&tables)?;

        if !tables.lists.iter().any(|l| l.id == new.list_id) {
            return Err(TrolleyError::RemoteWrite(format!(
                "no list with id {}",
                new.list_id
            )));
        }

        let row = Item {
            id: Uuid::new_v4(),
            list_id: new.list_id,
            name: new.name,
            category: new.category,
            completed: new.completed,
            notes: new.notes,
            created_at: tables.next_timestamp(),
            sync: SyncState::Confirmed,
        };
        tables.items.push(row.clone());
        tables.broadcast_item(ChangeEvent::Inserted(row.clone()));
        Ok(row)
    }

    async fn update_item(&self, id: Uuid, patch: ItemPatch) -> Result<()> {
        tokio::task::yield_now().await;
        let mut tables = self.tables();
        Self::check_write(&tables)?;

        let Some(pos) = tables.items.iter().position(|i| i.id == id) else {
            return Err(TrolleyError::RemoteWrite(format!("no item with id {}", id)));
        };
        {
            let row = &mut tables.items[pos];
            if let Some(completed) = patch.completed {
                row.completed = completed;
            }
            if let Some(notes) = patch.notes {
                row.notes = notes;
            }
        }
        let row = tables.items[pos].clone();
        tables.broadcast_item(ChangeEvent::Updated(row));
        Ok(())
    }

    async fn delete_item(&self, id: Uuid) -> Result<()> {
        tokio::task::yield_now().await;
        let mut tables = self.tables();
        Self::check_write(&tables)?;

        let Some(pos) = tables.items.iter().position(|i| i.id == id) else {
            // Idempotent: the row may already be gone.
            return Ok(());
        };
        tables.items.remove(pos);
        tables.broadcast_item(ChangeEvent::Deleted(id));
        Ok(())
    }

    fn subscribe_lists(&self) -> Subscription<ShoppingList> {
        let mut tables = self.tables();
        let id = tables.next_subscription;
        tables.next_subscription += 1;
        let (tx, rx) = mpsc::unbounded_channel();
        tables.list_subs.push((id, tx));
        Subscription::new(id, rx)
    }

    fn subscribe_items(&self) -> Subscription<Item> {
        let mut tables = self.tables();
        let id = tables.next_subscription;
        tables.next_subscription += 1;
        let (tx, rx) = mpsc::unbounded_channel();
        tables.item_subs.push((id, tx));
        Subscription::new(id, rx)
    }

    fn unsubscribe_lists(&self, id: SubscriptionId) {
        self.tables().list_subs.retain(|(sub_id, _)| *sub_id != id);
    }

    fn unsubscribe_items(&self, id: SubscriptionId) {
        self.tables().item_subs.retain(|(sub_id, _)| *sub_id != id);
    }
}
