//! The persisted checklist document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::ScopeId;
use crate::scope::ScopeState;

/// Current on-disk schema version.
pub const SCHEMA_VERSION: u32 = 2;

/// All checklist state, keyed by scope.
///
/// Scopes are kept in a `BTreeMap` so serialization order is stable and
/// repeated saves of an unchanged document are byte-identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Schema version of this document.
    pub version: u32,
    /// Per-scope state.
    #[serde(default)]
    pub scopes: BTreeMap<ScopeId, ScopeState>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            scopes: BTreeMap::new(),
        }
    }
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the state of a scope, creating the default state if absent.
    pub fn scope_mut(&mut self, id: &ScopeId) -> &mut ScopeState {
        self.scopes.entry(id.clone()).or_default()
    }

    /// Returns the state of a scope if it exists.
    pub fn scope(&self, id: &ScopeId) -> Option<&ScopeState> {
        self.scopes.get(id)
    }

    /// Iterates over scopes that have a duty assignment.
    pub fn scopes_with_duty(&self) -> impl Iterator<Item = (&ScopeId, &ScopeState)> {
        self.scopes.iter().filter(|(_, s)| s.duty.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ChecklistItem;

    #[test]
    fn test_default_document() {
        let doc = Document::default();
        assert_eq!(doc.version, SCHEMA_VERSION);
        assert!(doc.scopes.is_empty());
    }

    #[test]
    fn test_scope_mut_creates_default() {
        let mut doc = Document::new();
        let id = ScopeId::from(1_i64);
        assert!(doc.scope(&id).is_none());
        doc.scope_mut(&id).items.push(ChecklistItem::new("A"));
        assert_eq!(doc.scope(&id).unwrap().len(), 1);
    }

    #[test]
    fn test_serialization_is_stable() {
        let mut doc = Document::new();
        doc.scope_mut(&ScopeId::from(2_i64));
        doc.scope_mut(&ScopeId::from(1_i64));
        let a = serde_json::to_string(&doc).unwrap();
        let reparsed: Document = serde_json::from_str(&a).unwrap();
        let b = serde_json::to_string(&reparsed).unwrap();
        assert_eq!(a, b);
    }
}
