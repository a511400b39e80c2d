//! Core data models for the checklist bot.
//!
//! This crate provides the types that make up the persisted checklist
//! document: scopes, items, view modes and duty assignments.

pub mod document;
pub mod ids;
pub mod item;
pub mod scope;

// Re-export main types
pub use document::{Document, SCHEMA_VERSION};
pub use ids::{PrincipalId, ScopeId};
pub use item::ChecklistItem;
pub use scope::{DutyAssignment, ScopeState, ViewMode};
