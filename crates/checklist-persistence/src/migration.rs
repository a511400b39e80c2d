//! One-time upgrade of older document shapes.
//!
//! Accepted inputs:
//!
//! ```text
//! v2  { "version": 2, "scopes": { "<scope>": <scope value> } }
//! v1  { "<scope>": <scope value>, ... }
//!
//! scope value  = { "items": [...], "allow": [...], ... }   record
//!              | [ <item>, ... ]                          bare item list
//! item         = { "text": "...", "done": bool } | "..."
//! ```
//!
//! Everything is normalized into a typed [`Document`] at schema
//! [`SCHEMA_VERSION`].

use checklist_models::{ChecklistItem, Document, ScopeId, ScopeState, SCHEMA_VERSION};
use serde_json::Value;
use tracing::debug;

use crate::error::{PersistenceError, Result};

/// Result of upgrading a raw document.
#[derive(Debug, Clone, PartialEq)]
pub struct Upgrade {
    /// The canonical document.
    pub document: Document,
    /// Scopes whose stored shape differed from the canonical one.
    pub migrated: Vec<ScopeId>,
    /// Whether the canonical document differs from the raw input at all.
    pub changed: bool,
}

/// Upgrades a raw JSON value into the current document schema.
///
/// # Errors
/// Returns [`PersistenceError::InvalidData`] if the value is not an object
/// or a scope value has an unrecognized shape.
pub fn upgrade(raw: Value) -> Result<Upgrade> {
    let Value::Object(mut root) = raw else {
        return Err(PersistenceError::InvalidData(
            "document root is not an object".to_string(),
        ));
    };

    // A numeric version is metadata, never a scope value
    let version = if root.get("version").is_some_and(Value::is_number) {
        root.remove("version").and_then(|v| v.as_u64())
    } else {
        None
    };

    let (scopes, mut changed) = match root.remove("scopes") {
        Some(Value::Object(scopes)) => (scopes, version != Some(u64::from(SCHEMA_VERSION))),
        Some(other) => {
            // A scope literally named "scopes" in a v1 document
            root.insert("scopes".to_string(), other);
            (root, true)
        }
        None => (root, true),
    };

    let mut document = Document::new();
    let mut migrated = Vec::new();

    for (key, value) in scopes {
        let id = ScopeId::from(key);
        let (state, scope_changed) = upgrade_scope(&id, value)?;
        if scope_changed {
            migrated.push(id.clone());
            changed = true;
        }
        document.scopes.insert(id, state);
    }

    if changed {
        debug!(migrated = migrated.len(), "Document upgraded to current schema");
    }

    Ok(Upgrade {
        document,
        migrated,
        changed,
    })
}

/// Normalizes one scope value, reporting whether it changed.
fn upgrade_scope(id: &ScopeId, value: Value) -> Result<(ScopeState, bool)> {
    let invalid = |e: serde_json::Error| {
        PersistenceError::InvalidData(format!("scope {}: {}", id, e))
    };

    let (mut state, mut changed) = match value {
        Value::Array(_) => {
            let items: Vec<ChecklistItem> = serde_json::from_value(value).map_err(invalid)?;
            (ScopeState::with_items(items), true)
        }
        Value::Object(_) => {
            let state: ScopeState = serde_json::from_value(value.clone()).map_err(invalid)?;
            let changed = serde_json::to_value(&state)? != value;
            (state, changed)
        }
        Value::Null => (ScopeState::default(), true),
        other => {
            return Err(PersistenceError::InvalidData(format!(
                "scope {}: unexpected value {}",
                id, other
            )))
        }
    };

    let before = state.items.len();
    state.items.retain(|item| !item.text.trim().is_empty());
    if state.items.len() != before {
        changed = true;
    }

    Ok((state, changed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use checklist_models::{PrincipalId, ViewMode};
    use serde_json::json;

    #[test]
    fn test_current_document_is_unchanged() {
        let raw = json!({
            "version": 2,
            "scopes": {
                "-100": {
                    "items": [{"text": "Buy milk", "done": true}],
                    "allow": [5],
                    "remove_mode": false,
                    "view_mode": "full"
                }
            }
        });

        let upgrade = upgrade(raw).unwrap();
        assert!(!upgrade.changed);
        assert!(upgrade.migrated.is_empty());
        let scope = upgrade.document.scope(&ScopeId::from("-100")).unwrap();
        assert_eq!(scope.items, vec![ChecklistItem::with_done("Buy milk", true)]);
        assert!(scope.is_allowed(PrincipalId(5)));
    }

    #[test]
    fn test_v1_bare_array_scope() {
        let raw = json!({
            "42": [{"text": "Buy milk", "done": true}, "Walk dog"]
        });

        let upgrade = upgrade(raw).unwrap();
        assert!(upgrade.changed);
        assert_eq!(upgrade.migrated, vec![ScopeId::from("42")]);

        let scope = upgrade.document.scope(&ScopeId::from("42")).unwrap();
        assert_eq!(
            scope.items,
            vec![
                ChecklistItem::with_done("Buy milk", true),
                ChecklistItem::new("Walk dog"),
            ]
        );
        assert!(scope.allow.is_empty());
        assert!(!scope.remove_mode);
    }

    #[test]
    fn test_v1_camel_case_record() {
        let raw = json!({
            "7": {"items": [], "allow": ["9"], "removeMode": true, "viewMode": "compact"}
        });

        let upgrade = upgrade(raw).unwrap();
        let scope = upgrade.document.scope(&ScopeId::from("7")).unwrap();
        assert!(scope.remove_mode);
        assert_eq!(scope.view_mode, ViewMode::Compact);
        assert!(scope.is_allowed(PrincipalId(9)));
    }

    #[test]
    fn test_upgrade_is_stable() {
        let raw = json!({"1": ["A", "B"], "2": {"items": [{"text": "C"}]}});
        let first = upgrade(raw).unwrap();
        let reserialized = serde_json::to_value(&first.document).unwrap();
        let second = upgrade(reserialized).unwrap();

        assert!(!second.changed);
        assert_eq!(first.document, second.document);
    }

    #[test]
    fn test_drops_blank_items() {
        let raw = json!({"1": ["A", "   "]});
        let upgrade = upgrade(raw).unwrap();
        let scope = upgrade.document.scope(&ScopeId::from("1")).unwrap();
        assert_eq!(scope.items, vec![ChecklistItem::new("A")]);
    }

    #[test]
    fn test_v1_with_version_key_keeps_scopes() {
        let raw = json!({
            "version": 1,
            "-100": ["Buy milk"],
            "-200": {"items": [{"text": "Walk dog", "done": true}]}
        });

        let upgrade = upgrade(raw).unwrap();
        assert!(upgrade.changed);
        assert_eq!(upgrade.document.scopes.len(), 2);
        assert!(upgrade.document.scope(&ScopeId::from("version")).is_none());
        let walk = upgrade.document.scope(&ScopeId::from("-200")).unwrap();
        assert!(walk.items[0].done);
    }

    #[test]
    fn test_rejects_non_object_root() {
        assert!(matches!(
            upgrade(json!([1, 2, 3])),
            Err(PersistenceError::InvalidData(_))
        ));
    }

    #[test]
    fn test_rejects_unexpected_scope_value() {
        assert!(matches!(
            upgrade(json!({"1": 17})),
            Err(PersistenceError::InvalidData(_))
        ));
    }
}
