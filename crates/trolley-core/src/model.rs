//! Core data types mirrored from the remote collections.
//!
//! `ShoppingList` and `Item` are the two synced collections. Rows carry the
//! fields the remote store persists, plus a local-only [`SyncState`] marking
//! whether a row is an optimistic insert awaiting its server-assigned
//! identity or a confirmed remote row.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Local provenance of a stored row.
///
/// An optimistic insert starts `Pending` under a locally-generated id and is
/// reconciled to `Confirmed` under the server id once the remote write
/// succeeds. Rows arriving from queries or change notifications are always
/// `Confirmed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    /// Local optimistic row; id is provisional.
    Pending,
    /// Row whose id and fields the remote store has acknowledged.
    #[default]
    Confirmed,
}

/// A weekly shopping list. At most one exists per `period_start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShoppingList {
    /// Unique identifier, assigned by the remote store
    pub id: Uuid,

    /// Canonical Monday of the ISO week this list covers
    pub period_start: NaiveDate,

    /// Total spend for the week; never negative
    pub total_cost: f64,

    /// Free-text meal title per category key, absent when unset
    #[serde(default)]
    pub meal_titles: BTreeMap<String, String>,

    /// When the remote store created this row (race tie-breaker)
    pub created_at: DateTime<Utc>,
}

/// A shopping entry belonging to exactly one list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier; provisional while `sync` is `Pending`
    pub id: Uuid,

    /// Owning list
    pub list_id: Uuid,

    /// Non-empty display name
    pub name: String,

    /// Category key from the configured catalog
    pub category: String,

    /// Whether the item has been picked up
    pub completed: bool,

    /// Free-text notes, empty by default
    #[serde(default)]
    pub notes: String,

    /// Creation timestamp; stable sort key for display order
    pub created_at: DateTime<Utc>,

    /// Local-only provenance marker, never sent to the remote
    #[serde(skip, default)]
    pub sync: SyncState,
}

/// Fields for creating a new list; the remote assigns id and created_at.
#[derive(Debug, Clone, Serialize)]
pub struct NewList {
    pub period_start: NaiveDate,
    pub total_cost: f64,
}

impl NewList {
    pub fn for_week(period_start: NaiveDate) -> Self {
        Self {
            period_start,
            total_cost: 0.0,
        }
    }
}

/// Fields for creating a new item; the remote assigns id and created_at.
#[derive(Debug, Clone, Serialize)]
pub struct NewItem {
    pub list_id: Uuid,
    pub name: String,
    pub category: String,
    pub completed: bool,
    pub notes: String,
}

/// Partial update for an item row. Unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ItemPatch {
    pub completed: Option<bool>,
    pub notes: Option<String>,
}

impl ItemPatch {
    pub fn completed(value: bool) -> Self {
        Self {
            completed: Some(value),
            ..Self::default()
        }
    }

    pub fn notes(value: impl Into<String>) -> Self {
        Self {
            notes: Some(value.into()),
            ..Self::default()
        }
    }
}

/// Partial update for a list row. Unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListPatch {
    pub total_cost: Option<f64>,
    pub meal_titles: Option<BTreeMap<String, String>>,
}

impl ListPatch {
    pub fn total_cost(value: f64) -> Self {
        Self {
            total_cost: Some(value),
            ..Self::default()
        }
    }

    pub fn meal_titles(value: BTreeMap<String, String>) -> Self {
        Self {
            meal_titles: Some(value),
            ..Self::default()
        }
    }
}

/// A change notification from a remote collection feed.
///
/// Insert and Update carry the full new row; Delete carries only the id.
/// Notifications are transient and never stored.
#[derive(Debug, Clone)]
pub enum ChangeEvent<T> {
    Inserted(T),
    Updated(T),
    Deleted(Uuid),
}

impl<T> ChangeEvent<T> {
    /// Short label for log output.
    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::Inserted(_) => "insert",
            ChangeEvent::Updated(_) => "update",
            ChangeEvent::Deleted(_) => "delete",
        }
    }
}

/// Clamp a user-supplied cost to a non-negative finite value.
///
/// Non-finite input (the parse-failure sentinel) and negative amounts both
/// normalize to zero.
pub fn normalize_cost(amount: f64) -> f64 {
    if !amount.is_finite() || amount < 0.0 {
        0.0
    } else {
        amount
    }
}
