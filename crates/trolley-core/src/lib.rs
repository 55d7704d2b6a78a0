//! # Trolley Core
//!
//! Core library for Trolley - an optimistic local-state sync engine for a
//! shared weekly shopping list.
//!
//! The engine keeps an in-memory mirror of two remote collections (weekly
//! lists and their items), applies user mutations locally before remote
//! confirmation, merges live change notifications idempotently, and rolls
//! back optimistic state when a remote write fails. Presentation concerns
//! live entirely in embedding clients.
//!
//! ## Architecture
//!
//! - **store**: in-memory entity store with deterministic ordering
//! - **week**: Monday-anchored period math
//! - **engine**: week resolution, mutation pipeline, ingestion merge rules
//! - **ingest**: change-feed session lifecycle and queue draining
//! - **projection**: pure read-only groupings and statistics
//! - **remote**: abstract backend contract plus the in-memory backend
//! - **category**: fixed category catalog configuration

pub mod category;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod model;
pub mod projection;
pub mod remote;
pub mod store;
pub mod week;

pub use category::{Category, CategoryCatalog};
pub use engine::SyncEngine;
pub use error::{Result, TrolleyError};
pub use ingest::ChangeFeeds;
pub use model::{ChangeEvent, Item, ShoppingList, SyncState};
pub use remote::{memory::MemoryRemote, RemoteStore};
pub use store::EntityStore;

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
