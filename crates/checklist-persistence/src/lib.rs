//! Persistence layer for the checklist bot.
//!
//! This crate provides crash-safe persistence of the checklist document using
//! atomic file operations (write to temp file, then rename) and upgrades
//! older document shapes on load.
//!
//! # Example
//!
//! ```no_run
//! use checklist_persistence::DocumentStore;
//! use checklist_models::ScopeId;
//!
//! let store = DocumentStore::new("/var/lib/checklist/checklist.json");
//!
//! // Never fails: a missing or corrupt file yields an empty document
//! let mut doc = store.load();
//! doc.scope_mut(&ScopeId::from(-100123_i64));
//! store.save(&doc).unwrap();
//! ```

pub mod atomic;
pub mod error;
pub mod migration;
pub mod store;

pub use error::{PersistenceError, Result};
pub use migration::{upgrade, Upgrade};
pub use store::{DocumentStore, LoadOutcome, LoadReport};
