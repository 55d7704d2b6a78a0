//! Change-feed session.
//!
//! A session owns the two collection subscriptions for its whole lifetime.
//! Selection changes never re-subscribe; filtering happens during merge in
//! the engine. Notifications are pulled from per-collection queues by an
//! explicit consumer, which keeps ordering and idempotence testable without
//! a UI loop.

use tracing::debug;

use crate::engine::SyncEngine;
use crate::model::{Item, ShoppingList};
use crate::remote::{RemoteStore, Subscription};

/// Process-scoped pair of change-feed subscriptions.
#[derive(Debug)]
pub struct ChangeFeeds {
    lists: Subscription<ShoppingList>,
    items: Subscription<Item>,
}

impl ChangeFeeds {
    /// Subscribe to both collections. Call once at session start.
    pub fn start<R: RemoteStore>(remote: &R) -> Self {
        Self {
            lists: remote.subscribe_lists(),
            items: remote.subscribe_items(),
        }
    }

    /// Apply every currently queued notification to the engine, lists
    /// before items so list rows exist before their items arrive. Returns
    /// the number of notifications applied.
    pub fn drain<R: RemoteStore>(&mut self, engine: &mut SyncEngine<R>) -> usize {
        let mut applied = 0;
        while let Some(event) = self.lists.try_next() {
            debug!(kind = event.kind(), "ingesting list change");
            engine.apply_list_change(event);
            applied += 1;
        }
        while let Some(event) = self.items.try_next() {
            debug!(kind = event.kind(), "ingesting item change");
            engine.apply_item_change(event);
            applied += 1;
        }
        applied
    }

    /// Await one notification from either feed and apply it. Returns false
    /// when both feeds have closed.
    pub async fn pump_one<R: RemoteStore>(&mut self, engine: &mut SyncEngine<R>) -> bool {
        tokio::select! {
            Some(event) = self.lists.next() => {
                engine.apply_list_change(event);
                true
            }
            Some(event) = self.items.next() => {
                engine.apply_item_change(event);
                true
            }
            else => false,
        }
    }

    /// Tear the session down, releasing both remote handles. Both are
    /// released even though either unsubscribe could be the one that
    /// triggered teardown.
    pub fn stop<R: RemoteStore>(self, remote: &R) {
        remote.unsubscribe_lists(self.lists.id());
        remote.unsubscribe_items(self.items.id());
    }
}
