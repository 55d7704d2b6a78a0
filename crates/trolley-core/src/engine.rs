//! The optimistic sync engine.
//!
//! `SyncEngine` owns the local [`EntityStore`] and a [`RemoteStore`] backend
//! and implements the three protocols with real invariants:
//!
//! - **Week resolution**: find-or-create the list for a period, tolerating
//!   the race where another client creates the same week first.
//! - **Mutation pipeline**: every user action applies to the store first,
//!   then issues the remote write; a failed write rolls the store back to
//!   its exact pre-mutation state, and a successful insert reconciles the
//!   pending local row to the canonical one the remote returned.
//! - **Change ingestion**: notifications from the change feeds merge into
//!   the store idempotently, so replay and self-echo are harmless.
//!
//! The engine is single-threaded by design: callers interleave mutations
//! and feed draining on one task, and the optimistic apply always lands
//! before the corresponding remote call suspends.

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::category::CategoryCatalog;
use crate::error::{Result, TrolleyError};
use crate::model::{
    ChangeEvent, Item, ItemPatch, ListPatch, NewItem, NewList, ShoppingList, SyncState,
};
use crate::remote::{ItemFilter, ListFilter, RemoteStore};
use crate::store::EntityStore;
use crate::week::{period_end, period_start};

/// Optimistic local state synchronization engine.
pub struct SyncEngine<R: RemoteStore> {
    remote: R,
    store: EntityStore,
    catalog: CategoryCatalog,
    current_list: Option<Uuid>,
}

impl<R: RemoteStore> SyncEngine<R> {
    pub fn new(remote: R, catalog: CategoryCatalog) -> Self {
        Self {
            remote,
            store: EntityStore::new(),
            catalog,
            current_list: None,
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    /// All known lists, newest week first.
    pub fn lists(&self) -> &[ShoppingList] {
        self.store.lists()
    }

    /// Items of the selected list, oldest first.
    pub fn items(&self) -> &[Item] {
        self.store.items()
    }

    /// The selected list's row, if one is selected and still present.
    pub fn current_list(&self) -> Option<&ShoppingList> {
        self.current_list.and_then(|id| self.store.get_list(id))
    }

    pub fn current_list_id(&self) -> Option<Uuid> {
        self.current_list
    }

    // --- Loading & selection ---

    /// Load the full list collection from the remote.
    ///
    /// On a read failure the previously loaded lists stay in place.
    pub async fn load_lists(&mut self) -> Result<()> {
        let rows = self.remote.query_lists(&ListFilter::new()).await?;
        debug!(count = rows.len(), "loaded lists");
        self.store.load_lists(rows);
        Ok(())
    }

    /// Select `list_id`, clearing and reloading the item set.
    ///
    /// On a read failure the previous selection and its items stay in place.
    pub async fn select_list(&mut self, list_id: Uuid) -> Result<()> {
        let rows = self
            .remote
            .query_items(&ItemFilter::new().list(list_id))
            .await?;
        debug!(%list_id, count = rows.len(), "selected list");
        self.store.load_items(rows);
        self.current_list = Some(list_id);
        Ok(())
    }

    // --- Week resolution ---

    /// Resolve (or create) the list for the week containing `today` and
    /// select it.
    ///
    /// When several rows exist for the period (a historical duplicate race),
    /// the most recently created row wins. When creation loses a race to
    /// another client, the winner's row is adopted instead of erroring.
    pub async fn resolve_current_list(&mut self, today: NaiveDate) -> Result<Uuid> {
        let start = period_start(today);
        let filter = ListFilter::new().period_within(start, period_end(start));
        let rows = self.remote.query_lists(&filter).await?;
        match rows.into_iter().next() {
            Some(row) => self.adopt(row).await,
            None => self.create_or_adopt(start).await,
        }
    }

    /// Resolve (or create) the list for an exact period key and select it.
    /// Used for explicit week navigation.
    pub async fn resolve_or_create(&mut self, start: NaiveDate) -> Result<Uuid> {
        let filter = ListFilter::new().period(start);
        let rows = self.remote.query_lists(&filter).await?;
        match rows.into_iter().next() {
            Some(row) => self.adopt(row).await,
            None => self.create_or_adopt(start).await,
        }
    }

    async fn create_or_adopt(&mut self, start: NaiveDate) -> Result<Uuid> {
        match self.remote.insert_list(NewList::for_week(start)).await {
            Ok(row) => {
                info!(period = %start, id = %row.id, "created list for week");
                self.adopt(row).await
            }
            Err(err) if err.is_conflict() => {
                // Another client created this week between our query and
                // insert; theirs is authoritative.
                info!(period = %start, "lost creation race, adopting existing list");
                let filter = ListFilter::new().period(start);
                let rows = self.remote.query_lists(&filter).await?;
                match rows.into_iter().next() {
                    Some(row) => self.adopt(row).await,
                    None => Err(TrolleyError::NotFound(format!(
                        "list for week {} vanished after conflict",
                        start
                    ))),
                }
            }
            Err(err) => Err(err),
        }
    }

    async fn adopt(&mut self, row: ShoppingList) -> Result<Uuid> {
        let id = row.id;
        self.store.upsert_list(row);
        self.select_list(id).await?;
        Ok(id)
    }

    // --- Mutation pipeline ---

    /// Add an item to the selected list.
    ///
    /// The item appears in the store immediately under a provisional id and
    /// is reconciled to the server-assigned row on success. On failure the
    /// provisional row is removed again. Returns the canonical item id.
    pub async fn add_item(&mut self, name: &str, category: &str) -> Result<Uuid> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TrolleyError::Validation("item name is empty".into()));
        }
        if !self.catalog.contains(category) {
            return Err(TrolleyError::Validation(format!(
                "unknown category '{}'",
                category
            )));
        }
        let Some(list_id) = self.current_list else {
            return Err(TrolleyError::Validation("no active list".into()));
        };

        let provisional = Item {
            id: Uuid::new_v4(),
            list_id,
            name: name.to_string(),
            category: category.to_string(),
            completed: false,
            notes: String::new(),
            created_at: Utc::now(),
            sync: SyncState::Pending,
        };
        let provisional_id = provisional.id;
        debug!(id = %provisional_id, name, "optimistic add");
        self.store.upsert_item(provisional);

        let new = NewItem {
            list_id,
            name: name.to_string(),
            category: category.to_string(),
            completed: false,
            notes: String::new(),
        };
        match self.remote.insert_item(new).await {
            Ok(row) => {
                // Reconcile: retire the provisional id so later notifications
                // referencing the server id match the stored row.
                self.store.remove_item(provisional_id);
                debug!(provisional = %provisional_id, id = %row.id, "reconciled add");
                let id = row.id;
                self.store.upsert_item(row);
                Ok(id)
            }
            Err(err) => {
                warn!(id = %provisional_id, %err, "add failed, rolling back");
                self.store.remove_item(provisional_id);
                Err(err)
            }
        }
    }

    /// Set an item's completed flag.
    pub async fn toggle_item(&mut self, id: Uuid, completed: bool) -> Result<()> {
        let prior = self
            .store
            .get_item(id)
            .cloned()
            .ok_or_else(|| TrolleyError::NotFound(format!("item {}", id)))?;

        let mut updated = prior.clone();
        updated.completed = completed;
        self.store.upsert_item(updated);

        if let Err(err) = self.remote.update_item(id, ItemPatch::completed(completed)).await {
            warn!(%id, %err, "toggle failed, rolling back");
            self.store.upsert_item(prior);
            return Err(err);
        }
        Ok(())
    }

    /// Replace an item's notes text.
    pub async fn update_notes(&mut self, id: Uuid, notes: &str) -> Result<()> {
        let prior = self
            .store
            .get_item(id)
            .cloned()
            .ok_or_else(|| TrolleyError::NotFound(format!("item {}", id)))?;

        let mut updated = prior.clone();
        updated.notes = notes.to_string();
        self.store.upsert_item(updated);

        if let Err(err) = self.remote.update_item(id, ItemPatch::notes(notes)).await {
            warn!(%id, %err, "notes update failed, rolling back");
            self.store.upsert_item(prior);
            return Err(err);
        }
        Ok(())
    }

    /// Delete an item.
    ///
    /// On failure the row is re-inserted; ordering by creation time puts it
    /// back at its original position.
    pub async fn delete_item(&mut self, id: Uuid) -> Result<()> {
        let removed = self
            .store
            .remove_item(id)
            .ok_or_else(|| TrolleyError::NotFound(format!("item {}", id)))?;

        if let Err(err) = self.remote.delete_item(id).await {
            warn!(%id, %err, "delete failed, restoring item");
            self.store.upsert_item(removed);
            return Err(err);
        }
        Ok(())
    }

    /// Set a list's weekly total cost. Negative and non-finite amounts
    /// normalize to zero before the optimistic apply.
    pub async fn update_cost(&mut self, list_id: Uuid, amount: f64) -> Result<()> {
        let amount = crate::model::normalize_cost(amount);
        let prior = self
            .store
            .get_list(list_id)
            .cloned()
            .ok_or_else(|| TrolleyError::NotFound(format!("list {}", list_id)))?;

        let mut updated = prior.clone();
        updated.total_cost = amount;
        self.store.upsert_list(updated);

        if let Err(err) = self
            .remote
            .update_list(list_id, ListPatch::total_cost(amount))
            .await
        {
            warn!(%list_id, %err, "cost update failed, rolling back");
            self.store.upsert_list(prior);
            return Err(err);
        }
        Ok(())
    }

    /// Set or clear the meal title for one category on a list. A blank
    /// title clears the entry.
    pub async fn update_meal_title(
        &mut self,
        list_id: Uuid,
        category: &str,
        title: &str,
    ) -> Result<()> {
        if !self.catalog.contains(category) {
            return Err(TrolleyError::Validation(format!(
                "unknown category '{}'",
                category
            )));
        }
        let prior = self
            .store
            .get_list(list_id)
            .cloned()
            .ok_or_else(|| TrolleyError::NotFound(format!("list {}", list_id)))?;

        let mut updated = prior.clone();
        let title = title.trim();
        if title.is_empty() {
            updated.meal_titles.remove(category);
        } else {
            updated
                .meal_titles
                .insert(category.to_string(), title.to_string());
        }
        let titles = updated.meal_titles.clone();
        self.store.upsert_list(updated);

        if let Err(err) = self
            .remote
            .update_list(list_id, ListPatch::meal_titles(titles))
            .await
        {
            warn!(%list_id, %err, "meal title update failed, rolling back");
            self.store.upsert_list(prior);
            return Err(err);
        }
        Ok(())
    }

    // --- History reads ---

    /// Fetch the items of any list without touching the store; used for
    /// browsing past weeks.
    pub async fn fetch_items(&self, list_id: Uuid) -> Result<Vec<Item>> {
        self.remote
            .query_items(&ItemFilter::new().list(list_id))
            .await
    }

    /// Fetch every item across all lists; input for the top-items
    /// projection.
    pub async fn fetch_all_items(&self) -> Result<Vec<Item>> {
        self.remote.query_items(&ItemFilter::new()).await
    }

    // --- Change ingestion ---

    /// Merge one Lists-feed notification into the store.
    ///
    /// Inserts are deduplicated by id, updates always win, deletes are
    /// idempotent. The feed reflects remote commit order, so this is safe to
    /// replay.
    pub fn apply_list_change(&mut self, event: ChangeEvent<ShoppingList>) {
        match event {
            ChangeEvent::Inserted(row) => {
                if self.store.contains_list(row.id) {
                    debug!(id = %row.id, "list insert already known, skipping");
                } else {
                    self.store.upsert_list(row);
                }
            }
            ChangeEvent::Updated(row) => {
                self.store.upsert_list(row);
            }
            ChangeEvent::Deleted(id) => {
                // Clients never delete lists, but another writer might.
                if self.store.remove_list(id).is_some() && self.current_list == Some(id) {
                    warn!(%id, "selected list deleted remotely");
                    self.current_list = None;
                    self.store.clear_items();
                }
            }
        }
    }

    /// Merge one Items-feed notification into the store.
    ///
    /// Events for lists other than the selected one are ignored; the
    /// subscription itself is never re-scoped.
    pub fn apply_item_change(&mut self, event: ChangeEvent<Item>) {
        match event {
            ChangeEvent::Inserted(row) => {
                if Some(row.list_id) != self.current_list {
                    debug!(id = %row.id, "item insert for unselected list, ignoring");
                } else if self.store.contains_item(row.id) {
                    // Echo of our own reconciled optimistic insert.
                    debug!(id = %row.id, "item insert already known, skipping");
                } else {
                    self.store.upsert_item(row);
                }
            }
            ChangeEvent::Updated(row) => {
                if Some(row.list_id) == self.current_list {
                    self.store.upsert_item(row);
                }
            }
            ChangeEvent::Deleted(id) => {
                // No-op when our own optimistic delete got there first.
                self.store.remove_item(id);
            }
        }
    }
}
