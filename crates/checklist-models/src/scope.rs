//! Per-scope checklist state.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::ids::PrincipalId;
use crate::item::ChecklistItem;

/// How a scope's list is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// Numbered list with one line per item.
    #[default]
    Full,
    /// Single summary line.
    Compact,
}

impl ViewMode {
    /// Returns the other mode.
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Full => ViewMode::Compact,
            ViewMode::Compact => ViewMode::Full,
        }
    }
}

/// Binds a principal to a group scope so reminders and status updates are
/// mirrored to their private chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DutyAssignment {
    /// The principal on duty.
    #[serde(alias = "principalId")]
    pub principal: PrincipalId,
    /// Name shown in group notices.
    #[serde(alias = "displayName")]
    pub display_name: String,
    /// When the duty was taken.
    #[serde(alias = "assignedAt", deserialize_with = "deserialize_timestamp")]
    pub assigned_at: DateTime<Utc>,
}

impl DutyAssignment {
    /// Creates an assignment stamped with the current time.
    pub fn new(principal: PrincipalId, display_name: impl Into<String>) -> Self {
        Self {
            principal,
            display_name: display_name.into(),
            assigned_at: Utc::now(),
        }
    }
}

/// Accepts RFC 3339 strings and legacy millisecond epochs.
fn deserialize_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<DateTime<Utc>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Millis(ms) => DateTime::from_timestamp_millis(ms)
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {}", ms))),
        Raw::Text(s) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom),
    }
}

/// The canonical state of one scope.
///
/// Every field has a default so partially written records are backfilled
/// on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScopeState {
    /// Items in display order.
    pub items: Vec<ChecklistItem>,

    /// Principals allowed to add and remove items.
    pub allow: BTreeSet<PrincipalId>,

    /// When set, the next item selection deletes instead of toggling.
    #[serde(alias = "removeMode")]
    pub remove_mode: bool,

    /// Rendering mode.
    #[serde(alias = "viewMode")]
    pub view_mode: ViewMode,

    /// Current duty assignment, if any.
    #[serde(alias = "dutyAssignment", skip_serializing_if = "Option::is_none")]
    pub duty: Option<DutyAssignment>,
}

impl ScopeState {
    /// Creates a scope state holding the given items.
    pub fn with_items(items: Vec<ChecklistItem>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of checked items.
    pub fn done_count(&self) -> usize {
        self.items.iter().filter(|i| i.done).count()
    }

    /// Number of unchecked items.
    pub fn remaining(&self) -> usize {
        self.len() - self.done_count()
    }

    /// Unchecked items with their 1-based positions.
    pub fn open_items(&self) -> impl Iterator<Item = (usize, &ChecklistItem)> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| !item.done)
            .map(|(i, item)| (i + 1, item))
    }

    /// Whether the principal is on the allowlist.
    pub fn is_allowed(&self, principal: PrincipalId) -> bool {
        self.allow.contains(&principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scope_state() {
        let state = ScopeState::default();
        assert!(state.is_empty());
        assert!(state.allow.is_empty());
        assert!(!state.remove_mode);
        assert_eq!(state.view_mode, ViewMode::Full);
        assert!(state.duty.is_none());
    }

    #[test]
    fn test_counts() {
        let state = ScopeState::with_items(vec![
            ChecklistItem::with_done("Buy milk", true),
            ChecklistItem::new("Walk dog"),
            ChecklistItem::new("Call mum"),
        ]);
        assert_eq!(state.done_count(), 1);
        assert_eq!(state.remaining(), 2);
        let open: Vec<usize> = state.open_items().map(|(n, _)| n).collect();
        assert_eq!(open, vec![2, 3]);
    }

    #[test]
    fn test_backfills_missing_fields() {
        let state: ScopeState = serde_json::from_str(r#"{"items":[{"text":"A"}]}"#).unwrap();
        assert_eq!(state.items, vec![ChecklistItem::new("A")]);
        assert!(!state.remove_mode);
        assert_eq!(state.view_mode, ViewMode::Full);
    }

    #[test]
    fn test_camel_case_aliases() {
        let json = r#"{
            "items": [],
            "allow": ["7", 8],
            "removeMode": true,
            "viewMode": "compact",
            "dutyAssignment": {"principalId": 7, "displayName": "Ann", "assignedAt": 1700000000000}
        }"#;
        let state: ScopeState = serde_json::from_str(json).unwrap();
        assert!(state.remove_mode);
        assert_eq!(state.view_mode, ViewMode::Compact);
        assert!(state.is_allowed(PrincipalId(7)));
        assert!(state.is_allowed(PrincipalId(8)));
        let duty = state.duty.unwrap();
        assert_eq!(duty.display_name, "Ann");
        assert_eq!(duty.assigned_at.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_view_mode_toggle() {
        assert_eq!(ViewMode::Full.toggled(), ViewMode::Compact);
        assert_eq!(ViewMode::Compact.toggled(), ViewMode::Full);
    }
}
