//! Error types for Trolley core operations.
//!
//! This module defines the error hierarchy for the sync engine.
//! Errors are descriptive at the core level; the embedding client maps
//! these to user-facing messages. No error here is fatal to a session:
//! every failure is scoped to the action that triggered it.

use thiserror::Error;

/// Result type alias for Trolley operations.
pub type Result<T> = std::result::Result<T, TrolleyError>;

/// Core error type for Trolley sync operations.
#[derive(Debug, Error)]
pub enum TrolleyError {
    /// Rejected before any optimistic apply (empty name, no active list).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Remote insert/update/delete failed; the optimistic apply has been
    /// rolled back by the time this is returned.
    #[error("Remote write error: {0}")]
    RemoteWrite(String),

    /// Remote query failed; prior local state is left in place.
    #[error("Remote read error: {0}")]
    RemoteRead(String),

    /// Uniqueness constraint violated on insert, typically two clients
    /// creating a list for the same week. Callers re-query and adopt.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Entity not present in the local store.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl TrolleyError {
    /// True when a failed insert should be resolved by re-querying for the
    /// row another client created concurrently.
    pub fn is_conflict(&self) -> bool {
        matches!(self, TrolleyError::Conflict(_))
    }
}
