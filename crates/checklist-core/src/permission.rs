//! Who may add and remove items.

use std::collections::BTreeSet;

use checklist_models::PrincipalId;

/// The kind of chat a scope corresponds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// One-on-one chat with a single principal.
    Private,
    /// Multi-party chat.
    Group,
}

impl ScopeKind {
    pub fn is_private(self) -> bool {
        matches!(self, ScopeKind::Private)
    }
}

/// Whether a principal may add or remove items.
///
/// Allowed when any of these hold: the scope is private, the principal
/// administers the scope, allowlist enforcement is off, or the principal
/// is on the scope's allowlist. Toggling completion is never gated.
pub fn may_edit_items(
    kind: ScopeKind,
    is_admin: bool,
    enforce_allowlist: bool,
    allow: &BTreeSet<PrincipalId>,
    principal: PrincipalId,
) -> bool {
    kind.is_private() || is_admin || !enforce_allowlist || allow.contains(&principal)
}

/// Whether the admin status of the principal changes the answer of
/// [`may_edit_items`].
pub fn admin_matters(
    kind: ScopeKind,
    enforce_allowlist: bool,
    allow: &BTreeSet<PrincipalId>,
    principal: PrincipalId,
) -> bool {
    !may_edit_items(kind, false, enforce_allowlist, allow, principal)
}
