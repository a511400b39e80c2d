//! Integration tests for load/save durability and legacy upgrades.

use std::fs;

use checklist_models::{ChecklistItem, Document, ScopeId, ScopeState};
use checklist_persistence::atomic::{commit, write_temp};
use checklist_persistence::{DocumentStore, LoadOutcome};
use tempfile::tempdir;

fn sample_document() -> Document {
    let mut doc = Document::new();
    doc.scopes.insert(
        ScopeId::from(-100_i64),
        ScopeState::with_items(vec![
            ChecklistItem::with_done("Buy milk", true),
            ChecklistItem::new("Walk dog"),
        ]),
    );
    doc
}

#[test]
fn test_load_twice_returns_equal_documents() {
    let dir = tempdir().unwrap();
    let store = DocumentStore::new(dir.path().join("checklist.json"));
    store.save(&sample_document()).unwrap();

    let first = store.load();
    let bytes_after_first = fs::read(store.path()).unwrap();
    let second = store.load();
    let bytes_after_second = fs::read(store.path()).unwrap();

    assert_eq!(first, second);
    assert_eq!(bytes_after_first, bytes_after_second);
}

#[test]
fn test_crash_before_rename_keeps_previous_document() {
    let dir = tempdir().unwrap();
    let store = DocumentStore::new(dir.path().join("checklist.json"));
    let before = sample_document();
    store.save(&before).unwrap();

    // Temp file fully written, process dies before the rename
    let mut next = before.clone();
    next.scopes.clear();
    let json = serde_json::to_string_pretty(&next).unwrap();
    let pending = write_temp(store.path(), &json.as_bytes()[..json.len() / 2]).unwrap();
    drop(pending);

    assert_eq!(store.load_with_report().outcome, LoadOutcome::Loaded);
    assert_eq!(store.load(), before);
}

#[test]
fn test_commit_replaces_document() {
    let dir = tempdir().unwrap();
    let store = DocumentStore::new(dir.path().join("checklist.json"));
    store.save(&sample_document()).unwrap();

    let json = serde_json::to_string_pretty(&Document::new()).unwrap();
    let pending = write_temp(store.path(), json.as_bytes()).unwrap();
    commit(pending, store.path()).unwrap();

    assert!(store.load().scopes.is_empty());
}

#[test]
fn test_legacy_bare_array_scope_is_upgraded_once() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("checklist.json");
    fs::write(
        &path,
        r#"{"-100": [{"text": "Buy milk", "done": true}, {"text": "Walk dog", "done": false}]}"#,
    )
    .unwrap();
    let store = DocumentStore::new(&path);

    let upgraded = store.load();
    let scope = upgraded.scope(&ScopeId::from("-100")).unwrap();
    assert_eq!(scope.items, sample_document().scopes[&ScopeId::from(-100_i64)].items);
    assert!(scope.allow.is_empty());
    assert!(!scope.remove_mode);

    // The upgrade was persisted, so a second load changes nothing
    let again = store.load_with_report();
    assert_eq!(again.outcome, LoadOutcome::Loaded);
    assert_eq!(again.document, upgraded);
}
