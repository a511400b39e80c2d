//! The state accessor: sole owner of the in-memory checklist document.
//!
//! Every mutation goes through [`ChecklistBook`] and is written to disk
//! before the call returns. A failed write rolls the in-memory scope back,
//! so memory and disk never disagree about an acknowledged change.

use std::collections::HashSet;

use checklist_models::{
    ChecklistItem, Document, DutyAssignment, PrincipalId, ScopeId, ScopeState, ViewMode,
};
use checklist_persistence::{DocumentStore, LoadOutcome};
use tracing::{debug, info, warn};

use crate::error::{BookError, Result};

/// Owns the checklist document and funnels all mutation through one path.
pub struct ChecklistBook {
    document: Document,
    store: Option<DocumentStore>,
    /// (scope, principal) pairs whose next free-text message becomes an item.
    add_prompts: HashSet<(ScopeId, PrincipalId)>,
}

impl ChecklistBook {
    /// Opens the book from a store, loading (and upgrading) its document.
    pub fn open(store: DocumentStore) -> Self {
        let report = store.load_with_report();
        match &report.outcome {
            LoadOutcome::Fresh => info!(path = %store.path().display(), "Starting with an empty checklist"),
            LoadOutcome::Loaded => {
                info!(scopes = report.document.scopes.len(), "Checklist document loaded")
            }
            LoadOutcome::Migrated { scopes } => {
                info!(migrated = scopes.len(), "Checklist document upgraded")
            }
            LoadOutcome::Reset { reason } => {
                warn!(reason = %reason, "Checklist document was unusable and has been reset")
            }
        }

        Self {
            document: report.document,
            store: Some(store),
            add_prompts: HashSet::new(),
        }
    }

    /// Creates a book that never touches disk.
    pub fn in_memory() -> Self {
        Self::from_document(Document::new())
    }

    /// Creates a disk-less book over an existing document.
    pub fn from_document(document: Document) -> Self {
        Self {
            document,
            store: None,
            add_prompts: HashSet::new(),
        }
    }

    /// The whole document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Returns the canonical state of a scope, creating it on first access.
    pub fn scope(&mut self, id: &ScopeId) -> &ScopeState {
        self.document.scope_mut(id)
    }

    /// Returns the state of a scope without creating it.
    pub fn peek(&self, id: &ScopeId) -> Option<&ScopeState> {
        self.document.scope(id)
    }

    /// Appends one item. Returns its 1-based position.
    ///
    /// The text is trimmed; blank text fails with [`BookError::EmptyText`].
    pub fn add_item(&mut self, id: &ScopeId, text: &str) -> Result<usize> {
        let text = text.trim();
        if text.is_empty() {
            return Err(BookError::EmptyText);
        }

        self.mutate(id, |scope| {
            scope.items.push(ChecklistItem::new(text));
            Ok(scope.items.len())
        })
    }

    /// Flips the completion state of the item at a 0-based index.
    pub fn toggle_item(&mut self, id: &ScopeId, index: usize) -> Result<bool> {
        self.mutate(id, |scope| {
            let item = scope
                .items
                .get_mut(index)
                .ok_or(BookError::NotFound { index })?;
            Ok(item.toggle())
        })
    }

    /// Sets the completion state of the item at a 0-based index.
    /// Returns whether it changed; an unchanged item is not rewritten.
    pub fn set_done(&mut self, id: &ScopeId, index: usize, done: bool) -> Result<bool> {
        let current = self
            .peek(id)
            .and_then(|s| s.items.get(index))
            .map(|i| i.done)
            .ok_or(BookError::NotFound { index })?;
        if current == done {
            return Ok(false);
        }
        self.toggle_item(id, index).map(|_| true)
    }

    /// Removes the item at a 0-based index; later items shift up by one.
    pub fn remove_item(&mut self, id: &ScopeId, index: usize) -> Result<ChecklistItem> {
        self.mutate(id, |scope| {
            if index >= scope.items.len() {
                return Err(BookError::NotFound { index });
            }
            Ok(scope.items.remove(index))
        })
    }

    /// Unchecks every item, keeping text and order. Returns how many were checked.
    pub fn clear_checks(&mut self, id: &ScopeId) -> Result<usize> {
        self.mutate(id, |scope| {
            let mut cleared = 0;
            for item in scope.items.iter_mut().filter(|i| i.done) {
                item.done = false;
                cleared += 1;
            }
            Ok(cleared)
        })
    }

    /// Adds or removes a principal from the allowlist. Returns whether the set changed.
    pub fn set_allow(&mut self, id: &ScopeId, principal: PrincipalId, allowed: bool) -> Result<bool> {
        let present = self
            .peek(id)
            .map(|s| s.is_allowed(principal))
            .unwrap_or(false);
        if present == allowed {
            return Ok(false);
        }

        self.mutate(id, |scope| {
            Ok(if allowed {
                scope.allow.insert(principal)
            } else {
                scope.allow.remove(&principal)
            })
        })
    }

    /// Sets the view mode.
    pub fn set_view_mode(&mut self, id: &ScopeId, mode: ViewMode) -> Result<ViewMode> {
        self.mutate(id, |scope| {
            scope.view_mode = mode;
            Ok(mode)
        })
    }

    /// Switches between full and compact view. Returns the new mode.
    pub fn toggle_view_mode(&mut self, id: &ScopeId) -> Result<ViewMode> {
        let next = self.scope(id).view_mode.toggled();
        self.set_view_mode(id, next)
    }

    /// Sets remove mode.
    pub fn set_remove_mode(&mut self, id: &ScopeId, on: bool) -> Result<bool> {
        self.mutate(id, |scope| {
            scope.remove_mode = on;
            Ok(on)
        })
    }

    /// Flips remove mode. Returns the new value.
    pub fn toggle_remove_mode(&mut self, id: &ScopeId) -> Result<bool> {
        let next = !self.scope(id).remove_mode;
        self.set_remove_mode(id, next)
    }

    /// Replaces the duty assignment. Returns the previous one.
    pub fn set_duty(
        &mut self,
        id: &ScopeId,
        duty: Option<DutyAssignment>,
    ) -> Result<Option<DutyAssignment>> {
        self.mutate(id, |scope| Ok(std::mem::replace(&mut scope.duty, duty)))
    }

    /// Writes the current document to disk.
    pub fn flush(&self) -> Result<()> {
        if let Some(store) = &self.store {
            store.save(&self.document)?;
        }
        Ok(())
    }

    /// Arms the add prompt: the principal's next free text in this scope is a new item.
    ///
    /// A principal has at most one armed prompt; arming replaces the previous one.
    pub fn arm_add_prompt(&mut self, id: &ScopeId, principal: PrincipalId) {
        self.add_prompts.retain(|(_, p)| *p != principal);
        self.add_prompts.insert((id.clone(), principal));
    }

    /// The scope the principal's armed prompt belongs to, if any.
    pub fn add_prompt_scope(&self, principal: PrincipalId) -> Option<&ScopeId> {
        self.add_prompts
            .iter()
            .find(|(_, p)| *p == principal)
            .map(|(scope, _)| scope)
    }

    /// Consumes an armed add prompt, returning whether one was armed.
    pub fn take_add_prompt(&mut self, id: &ScopeId, principal: PrincipalId) -> bool {
        self.add_prompts.remove(&(id.clone(), principal))
    }

    /// Whether an add prompt is armed for the principal.
    pub fn has_add_prompt(&self, id: &ScopeId, principal: PrincipalId) -> bool {
        self.add_prompts.contains(&(id.clone(), principal))
    }

    /// Applies `f` to a scope and persists the result, rolling back on a failed write.
    fn mutate<T>(
        &mut self,
        id: &ScopeId,
        f: impl FnOnce(&mut ScopeState) -> Result<T>,
    ) -> Result<T> {
        let snapshot = self.document.scope(id).cloned();
        let value = f(self.document.scope_mut(id))?;

        if let Err(e) = self.flush() {
            warn!(scope = %id, error = %e, "Persisting checklist failed, rolling back");
            match snapshot {
                Some(previous) => {
                    self.document.scopes.insert(id.clone(), previous);
                }
                None => {
                    self.document.scopes.remove(id);
                }
            }
            return Err(e);
        }

        debug!(scope = %id, "Checklist mutation persisted");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn scope() -> ScopeId {
        ScopeId::from(-100_i64)
    }

    fn book_with(items: &[(&str, bool)]) -> ChecklistBook {
        let mut book = ChecklistBook::in_memory();
        for (text, _) in items {
            book.add_item(&scope(), text).unwrap();
        }
        for (i, (_, done)) in items.iter().enumerate() {
            if *done {
                book.toggle_item(&scope(), i).unwrap();
            }
        }
        book
    }

    fn texts(book: &ChecklistBook) -> Vec<(String, bool)> {
        book.peek(&scope())
            .unwrap()
            .items
            .iter()
            .map(|i| (i.text.clone(), i.done))
            .collect()
    }

    #[test]
    fn test_scope_is_created_lazily_and_idempotent() {
        let mut book = ChecklistBook::in_memory();
        assert!(book.peek(&scope()).is_none());

        let first = book.scope(&scope()).clone();
        let second = book.scope(&scope()).clone();

        assert_eq!(first, second);
        assert_eq!(first, ScopeState::default());
    }

    #[test]
    fn test_add_item_returns_position() {
        let mut book = ChecklistBook::in_memory();
        assert_eq!(book.add_item(&scope(), "Buy milk").unwrap(), 1);
        assert_eq!(book.add_item(&scope(), "  Walk dog  ").unwrap(), 2);
        assert_eq!(
            texts(&book),
            vec![("Buy milk".to_string(), false), ("Walk dog".to_string(), false)]
        );
    }

    #[test]
    fn test_add_empty_text_rejected() {
        let mut book = ChecklistBook::in_memory();
        assert!(matches!(
            book.add_item(&scope(), "   "),
            Err(BookError::EmptyText)
        ));
        assert!(book.peek(&scope()).is_none());
    }

    #[test]
    fn test_multiline_text_is_one_item() {
        let mut book = ChecklistBook::in_memory();
        assert_eq!(book.add_item(&scope(), "Eggs\nBread\n").unwrap(), 1);
        let items = &book.peek(&scope()).unwrap().items;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text, "Eggs\nBread");
    }

    #[test]
    fn test_toggle_twice_restores() {
        let mut book = book_with(&[("Buy milk", false), ("Walk dog", true)]);

        for index in 0..2 {
            let before = book.peek(&scope()).unwrap().items[index].done;
            book.toggle_item(&scope(), index).unwrap();
            book.toggle_item(&scope(), index).unwrap();
            assert_eq!(book.peek(&scope()).unwrap().items[index].done, before);
        }
    }

    #[test]
    fn test_remove_renumbers() {
        let mut book = book_with(&[("A", false), ("B", false), ("C", false)]);

        let removed = book.remove_item(&scope(), 1).unwrap();
        assert_eq!(removed.text, "B");
        assert_eq!(
            texts(&book),
            vec![("A".to_string(), false), ("C".to_string(), false)]
        );

        // Former index 2 is now addressable at index 1
        assert!(book.toggle_item(&scope(), 1).unwrap());
        assert_eq!(texts(&book)[1], ("C".to_string(), true));
    }

    #[test]
    fn test_out_of_range_is_noop() {
        let mut book = book_with(&[("A", false), ("B", true), ("C", false)]);
        let before = texts(&book);

        assert!(matches!(
            book.toggle_item(&scope(), 99),
            Err(BookError::NotFound { index: 99 })
        ));
        assert!(matches!(
            book.remove_item(&scope(), 99),
            Err(BookError::NotFound { index: 99 })
        ));
        assert_eq!(texts(&book), before);
    }

    #[test]
    fn test_not_found_displays_one_based() {
        let err = BookError::NotFound { index: 2 };
        assert_eq!(err.to_string(), "item 3 not found");
    }

    #[test]
    fn test_clear_checks_preserves_text_and_order() {
        let mut book = book_with(&[("Buy milk", true), ("Walk dog", false)]);

        let cleared = book.clear_checks(&scope()).unwrap();

        assert_eq!(cleared, 1);
        assert_eq!(
            texts(&book),
            vec![("Buy milk".to_string(), false), ("Walk dog".to_string(), false)]
        );
    }

    #[test]
    fn test_end_to_end_scenario() {
        let mut book = ChecklistBook::in_memory();
        book.add_item(&scope(), "Buy milk").unwrap();
        assert_eq!(texts(&book), vec![("Buy milk".to_string(), false)]);

        book.add_item(&scope(), "Walk dog").unwrap();
        assert_eq!(
            texts(&book),
            vec![("Buy milk".to_string(), false), ("Walk dog".to_string(), false)]
        );

        book.toggle_item(&scope(), 0).unwrap();
        assert!(book.peek(&scope()).unwrap().items[0].done);

        book.remove_item(&scope(), 1).unwrap();
        assert_eq!(texts(&book), vec![("Buy milk".to_string(), true)]);
    }

    #[test]
    fn test_set_allow_reports_change() {
        let mut book = ChecklistBook::in_memory();
        assert!(book.set_allow(&scope(), PrincipalId(7), true).unwrap());
        assert!(!book.set_allow(&scope(), PrincipalId(7), true).unwrap());
        assert!(book.set_allow(&scope(), PrincipalId(7), false).unwrap());
        assert!(!book.peek(&scope()).unwrap().is_allowed(PrincipalId(7)));
    }

    #[test]
    fn test_modes_are_scope_local() {
        let other = ScopeId::from(-200_i64);
        let mut book = ChecklistBook::in_memory();

        assert!(book.toggle_remove_mode(&scope()).unwrap());
        assert_eq!(book.toggle_view_mode(&scope()).unwrap(), ViewMode::Compact);

        assert!(!book.scope(&other).remove_mode);
        assert_eq!(book.scope(&other).view_mode, ViewMode::Full);
    }

    #[test]
    fn test_set_duty_returns_previous() {
        let mut book = ChecklistBook::in_memory();
        let ann = DutyAssignment::new(PrincipalId(1), "Ann");
        assert!(book.set_duty(&scope(), Some(ann.clone())).unwrap().is_none());
        assert_eq!(book.set_duty(&scope(), None).unwrap(), Some(ann));
    }

    #[test]
    fn test_add_prompt_is_per_principal() {
        let mut book = ChecklistBook::in_memory();
        book.arm_add_prompt(&scope(), PrincipalId(1));

        assert!(!book.take_add_prompt(&scope(), PrincipalId(2)));
        assert!(book.take_add_prompt(&scope(), PrincipalId(1)));
        assert!(!book.take_add_prompt(&scope(), PrincipalId(1)));
    }

    #[test]
    fn test_arming_replaces_previous_prompt() {
        let other = ScopeId::from(-200_i64);
        let mut book = ChecklistBook::in_memory();
        book.arm_add_prompt(&scope(), PrincipalId(1));
        book.arm_add_prompt(&other, PrincipalId(1));

        assert_eq!(book.add_prompt_scope(PrincipalId(1)), Some(&other));
        assert!(!book.has_add_prompt(&scope(), PrincipalId(1)));
        assert_eq!(book.add_prompt_scope(PrincipalId(2)), None);
    }

    #[test]
    fn test_mutations_are_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checklist.json");

        let mut book = ChecklistBook::open(DocumentStore::new(&path));
        book.add_item(&scope(), "Buy milk").unwrap();
        book.toggle_item(&scope(), 0).unwrap();
        book.arm_add_prompt(&scope(), PrincipalId(1));

        let reopened = ChecklistBook::open(DocumentStore::new(&path));
        assert_eq!(reopened.document(), book.document());
        assert!(!reopened.has_add_prompt(&scope(), PrincipalId(1)));
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let dir = tempdir().unwrap();
        // Parent is a file, so every write fails
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let store = DocumentStore::new(blocker.join("checklist.json"));

        let mut book = ChecklistBook::open(store);
        let result = book.add_item(&scope(), "Buy milk");

        assert!(matches!(result, Err(BookError::Persistence(_))));
        assert!(book.peek(&scope()).is_none());
    }
}
