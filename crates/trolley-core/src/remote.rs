//! Remote store contract.
//!
//! The `RemoteStore` trait defines the interface the sync engine requires
//! from a backend. This abstraction keeps the engine independent of any
//! particular transport; the crate ships an in-memory implementation
//! ([`memory::MemoryRemote`]) used by tests and the demo client.
//!
//! Every async method is a suspension point: the engine applies optimistic
//! state *before* awaiting any of them, so a projection taken between the
//! apply and the remote acknowledgement already sees the new state.

pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::Result;
use crate::model::{ChangeEvent, Item, ItemPatch, ListPatch, NewItem, NewList, ShoppingList};

/// Identifier for an active change-feed subscription.
pub type SubscriptionId = u64;

/// A live change feed for one collection.
///
/// Notifications arrive in remote commit order, at least once. Dropping the
/// subscription stops delivery, but callers should still release the remote
/// side via the matching `unsubscribe_*` call.
#[derive(Debug)]
pub struct Subscription<T> {
    id: SubscriptionId,
    rx: mpsc::UnboundedReceiver<ChangeEvent<T>>,
}

impl<T> Subscription<T> {
    pub fn new(id: SubscriptionId, rx: mpsc::UnboundedReceiver<ChangeEvent<T>>) -> Self {
        Self { id, rx }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Next queued notification, or `None` when the queue is currently empty
    /// or the feed has closed.
    pub fn try_next(&mut self) -> Option<ChangeEvent<T>> {
        self.rx.try_recv().ok()
    }

    /// Await the next notification; `None` when the feed has closed.
    pub async fn next(&mut self) -> Option<ChangeEvent<T>> {
        self.rx.recv().await
    }
}

/// Filter for querying lists.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Exact period key match
    pub period_start: Option<NaiveDate>,

    /// Period key within [start, end] inclusive
    pub period_within: Option<(NaiveDate, NaiveDate)>,

    /// Maximum number of results
    pub limit: Option<usize>,
}

impl ListFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn period(mut self, period_start: NaiveDate) -> Self {
        self.period_start = Some(period_start);
        self
    }

    pub fn period_within(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.period_within = Some((start, end));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Filter for querying items.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    /// Restrict to one owning list
    pub list_id: Option<Uuid>,

    /// Maximum number of results
    pub limit: Option<usize>,
}

impl ItemFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(mut self, list_id: Uuid) -> Self {
        self.list_id = Some(list_id);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Backend interface for the two synced collections.
///
/// All implementations must ensure:
/// - `period_start` is a uniqueness constraint on lists; a violating insert
///   fails with `TrolleyError::Conflict` and the engine resolves it by
///   re-querying.
/// - Inserts assign `id` and `created_at` server-side and return the full
///   canonical row.
/// - Every committed write is broadcast to all live subscriptions of the
///   affected collection, including the writer's own.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    // --- Lists ---

    /// Query lists, ordered by `period_start` descending then `created_at`
    /// descending.
    async fn query_lists(&self, filter: &ListFilter) -> Result<Vec<ShoppingList>>;

    /// Insert a list, returning the canonical row.
    ///
    /// Fails with `Conflict` when a list for the same `period_start` already
    /// exists.
    async fn insert_list(&self, new: NewList) -> Result<ShoppingList>;

    /// Apply a partial update to a list.
    async fn update_list(&self, id: Uuid, patch: ListPatch) -> Result<()>;

    // --- Items ---

    /// Query items, ordered by `created_at` ascending.
    async fn query_items(&self, filter: &ItemFilter) -> Result<Vec<Item>>;

    /// Insert an item, returning the canonical row.
    async fn insert_item(&self, new: NewItem) -> Result<Item>;

    /// Apply a partial update to an item.
    async fn update_item(&self, id: Uuid, patch: ItemPatch) -> Result<()>;

    /// Delete an item; deleting an absent row is not an error.
    async fn delete_item(&self, id: Uuid) -> Result<()>;

    // --- Change feeds ---

    /// Open a change feed over the Lists collection.
    fn subscribe_lists(&self) -> Subscription<ShoppingList>;

    /// Open a change feed over the Items collection.
    fn subscribe_items(&self) -> Subscription<Item>;

    /// Release a lists feed on the remote side.
    fn unsubscribe_lists(&self, id: SubscriptionId);

    /// Release an items feed on the remote side.
    fn unsubscribe_items(&self, id: SubscriptionId);
}

// Several sessions (or an engine plus a seeding task) can share one backend
// through an Arc.
#[async_trait]
impl<R: RemoteStore> RemoteStore for std::sync::Arc<R> {
    async fn query_lists(&self, filter: &ListFilter) -> Result<Vec<ShoppingList>> {
        (**self).query_lists(filter).await
    }

    async fn insert_list(&self, new: NewList) -> Result<ShoppingList> {
        (**self).insert_list(new).await
    }

    async fn update_list(&self, id: Uuid, patch: ListPatch) -> Result<()> {
        (**self).update_list(id, patch).await
    }

    async fn query_items(&self, filter: &ItemFilter) -> Result<Vec<Item>> {
        (**self).query_items(filter).await
    }

    async fn insert_item(&self, new: NewItem) -> Result<Item> {
        (**self).insert_item(new).await
    }

    async fn update_item(&self, id: Uuid, patch: ItemPatch) -> Result<()> {
        (**self).update_item(id, patch).await
    }

    async fn delete_item(&self, id: Uuid) -> Result<()> {
        (**self).delete_item(id).await
    }

    fn subscribe_lists(&self) -> Subscription<ShoppingList> {
        (**self).subscribe_lists()
    }

    fn subscribe_items(&self) -> Subscription<Item> {
        (**self).subscribe_items()
    }

    fn unsubscribe_lists(&self, id: SubscriptionId) {
        (**self).unsubscribe_lists(id)
    }

    fn unsubscribe_items(&self, id: SubscriptionId) {
        (**self).unsubscribe_items(id)
    }
}
