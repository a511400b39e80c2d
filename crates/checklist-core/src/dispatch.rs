//! Routes normalized inbound events to state operations.
//!
//! Every input surface (slash commands, free text, reply-keyboard labels,
//! inline button taps) is reduced to an [`InboundEvent`] before it reaches
//! the [`Dispatcher`]. The dispatcher checks permissions, performs at most
//! one operation on the [`ChecklistBook`] and reports an [`Outcome`].

use checklist_models::{DutyAssignment, PrincipalId, ScopeId, ViewMode};
use tracing::{debug, info, warn};

use crate::book::ChecklistBook;
use crate::config::{DispatchConfig, FreeTextPolicy};
use crate::error::BookError;
use crate::permission::{admin_matters, may_edit_items, ScopeKind};
use crate::render::ControlAction;

/// An event from any input surface, addressed to one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub scope: ScopeId,
    pub principal: PrincipalId,
    /// Name of the principal, used for duty notices.
    pub display_name: String,
    pub scope_kind: ScopeKind,
    pub payload: Payload,
}

impl InboundEvent {
    /// Creates an event with an empty display name.
    pub fn new(
        scope: impl Into<ScopeId>,
        principal: PrincipalId,
        scope_kind: ScopeKind,
        payload: Payload,
    ) -> Self {
        Self {
            scope: scope.into(),
            principal,
            display_name: String::new(),
            scope_kind,
            payload,
        }
    }

    /// Sets the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }
}

/// What an inbound event carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// An explicit command with its raw argument.
    Command(Command),
    /// A free-text message.
    Text { text: String, reply_to_bot: bool },
    /// A tap on one of the global controls.
    Control(ControlAction),
    /// A tap on an item selector (1-based).
    SelectItem { index1: usize },
}

/// Explicit commands. Arguments are kept raw and validated on apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(String),
    Done(String),
    Remove(String),
    Clear,
    List,
    Allow(String),
    Deny(String),
    Duty,
    OffDuty,
    View,
    Help,
}

/// Result of the permission lookup performed by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Authority {
    pub is_admin: bool,
}

impl Authority {
    pub fn admin() -> Self {
        Self { is_admin: true }
    }

    pub fn member() -> Self {
        Self { is_admin: false }
    }
}

/// Which command was misused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageHint {
    Add,
    Done,
    Remove,
    Allow,
    Deny,
    /// Duty commands only make sense in a group.
    GroupOnly,
    /// `/offduty` with nobody on duty.
    NoDuty,
}

impl UsageHint {
    /// Usage text shown to the principal.
    pub fn message(self) -> &'static str {
        match self {
            UsageHint::Add => "Usage: /add <text>",
            UsageHint::Done => "Usage: /done <item number>",
            UsageHint::Remove => "Usage: /remove <item number>",
            UsageHint::Allow => "Usage: /allow <user id>",
            UsageHint::Deny => "Usage: /deny <user id>",
            UsageHint::GroupOnly => "Duty can only be taken in a group chat.",
            UsageHint::NoDuty => "Nobody is on duty.",
        }
    }
}

/// Why an event did not change anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Usage(UsageHint),
    NotFound { index1: usize },
    Denied,
    /// The change could not be saved and was rolled back.
    Failed(String),
}

/// Result of applying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Added { index1: usize },
    Toggled { index1: usize, done: bool },
    Removed { index1: usize, text: String },
    ChecksCleared { count: usize },
    Refreshed,
    ViewChanged(ViewMode),
    RemoveModeChanged(bool),
    AddPrompt,
    AllowChanged {
        principal: PrincipalId,
        allowed: bool,
        changed: bool,
    },
    DutyAssigned(DutyAssignment),
    DutyCleared,
    Help,
    Ignored,
    Rejected(Rejection),
}

impl Outcome {
    /// Whether the items of the scope changed.
    pub fn mutated_items(&self) -> bool {
        matches!(
            self,
            Outcome::Added { .. }
                | Outcome::Toggled { .. }
                | Outcome::Removed { .. }
                | Outcome::ChecksCleared { .. }
        )
    }

    /// Whether the list should be re-rendered on the originating surface.
    pub fn needs_refresh(&self) -> bool {
        self.mutated_items()
            || matches!(
                self,
                Outcome::Refreshed | Outcome::ViewChanged(_) | Outcome::RemoveModeChanged(_)
            )
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Outcome::Rejected(_))
    }
}

impl From<BookError> for Outcome {
    fn from(e: BookError) -> Self {
        let rejection = match e {
            BookError::EmptyText => Rejection::Usage(UsageHint::Add),
            BookError::NotFound { index } => Rejection::NotFound { index1: index + 1 },
            BookError::Persistence(e) => Rejection::Failed(e.to_string()),
        };
        Outcome::Rejected(rejection)
    }
}

/// Parses a strictly positive 1-based item number.
fn parse_index(arg: &str) -> Option<usize> {
    arg.trim().parse::<usize>().ok().filter(|n| *n > 0)
}

fn parse_principal(arg: &str) -> Option<PrincipalId> {
    arg.trim().parse::<u64>().ok().map(PrincipalId)
}

/// Whether the payload could add or remove items.
///
/// An item tap counts whatever the current remove mode is: another chat may
/// switch the mode between the admin lookup and the apply.
fn may_edit(payload: &Payload) -> bool {
    matches!(
        payload,
        Payload::Command(Command::Add(_) | Command::Remove(_))
            | Payload::Control(ControlAction::Add)
            | Payload::Text { .. }
            | Payload::SelectItem { .. }
    )
}

/// Applies inbound events to a book.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Whether applying the event depends on the principal being an admin.
    ///
    /// Callers resolve admin status (a platform round trip) only when this
    /// returns true, and must not hold the book across that lookup.
    pub fn needs_authority(&self, book: &ChecklistBook, event: &InboundEvent) -> bool {
        if event.scope_kind.is_private() {
            return false;
        }

        let state = book.peek(&event.scope);
        match &event.payload {
            Payload::Command(Command::Allow(_) | Command::Deny(_)) => true,
            Payload::Command(Command::OffDuty) => state
                .and_then(|s| s.duty.as_ref())
                .is_some_and(|d| d.principal != event.principal),
            payload if may_edit(payload) => {
                let empty = Default::default();
                let allow = state.map(|s| &s.allow).unwrap_or(&empty);
                admin_matters(
                    event.scope_kind,
                    self.config.enforce_allowlist,
                    allow,
                    event.principal,
                )
            }
            _ => false,
        }
    }

    fn check_edit(&self, book: &mut ChecklistBook, event: &InboundEvent, authority: Authority) -> bool {
        let state = book.scope(&event.scope);
        let allowed = may_edit_items(
            event.scope_kind,
            authority.is_admin,
            self.config.enforce_allowlist,
            &state.allow,
            event.principal,
        );
        if !allowed {
            info!(
                scope = %event.scope,
                principal = %event.principal,
                "Item edit denied"
            );
        }
        allowed
    }

    /// Applies one event. Never panics and never leaves a partial mutation.
    pub fn apply(&self, book: &mut ChecklistBook, event: InboundEvent, authority: Authority) -> Outcome {
        debug!(scope = %event.scope, principal = %event.principal, payload = ?event.payload, "Applying event");

        let outcome = match &event.payload {
            Payload::Command(command) => self.apply_command(book, &event, command, authority),
            Payload::Text { text, reply_to_bot } => {
                self.apply_text(book, &event, text, *reply_to_bot, authority)
            }
            Payload::Control(action) => self.apply_control(book, &event, *action, authority),
            Payload::SelectItem { index1 } => self.apply_select(book, &event, *index1, authority),
        };

        if let Outcome::Rejected(Rejection::Failed(reason)) = &outcome {
            warn!(scope = %event.scope, reason = %reason, "Event rolled back");
        }
        outcome
    }

    fn apply_command(
        &self,
        book: &mut ChecklistBook,
        event: &InboundEvent,
        command: &Command,
        authority: Authority,
    ) -> Outcome {
        let scope = &event.scope;
        match command {
            Command::Add(text) => {
                if text.trim().is_empty() {
                    return Outcome::Rejected(Rejection::Usage(UsageHint::Add));
                }
                if !self.check_edit(book, event, authority) {
                    return Outcome::Rejected(Rejection::Denied);
                }
                match book.add_item(scope, text) {
                    Ok(index1) => Outcome::Added { index1 },
                    Err(e) => e.into(),
                }
            }
            Command::Done(arg) => {
                let Some(index1) = parse_index(arg) else {
                    return Outcome::Rejected(Rejection::Usage(UsageHint::Done));
                };
                match book.set_done(scope, index1 - 1, true) {
                    Ok(_) => Outcome::Toggled { index1, done: true },
                    Err(e) => e.into(),
                }
            }
            Command::Remove(arg) => {
                let Some(index1) = parse_index(arg) else {
                    return Outcome::Rejected(Rejection::Usage(UsageHint::Remove));
                };
                if !self.check_edit(book, event, authority) {
                    return Outcome::Rejected(Rejection::Denied);
                }
                match book.remove_item(scope, index1 - 1) {
                    Ok(item) => Outcome::Removed {
                        index1,
                        text: item.text,
                    },
                    Err(e) => e.into(),
                }
            }
            Command::Clear => match book.clear_checks(scope) {
                Ok(count) => Outcome::ChecksCleared { count },
                Err(e) => e.into(),
            },
            Command::List => {
                book.scope(scope);
                Outcome::Refreshed
            }
            Command::Allow(arg) | Command::Deny(arg) => {
                let allowed = matches!(command, Command::Allow(_));
                let Some(principal) = parse_principal(arg) else {
                    let hint = if allowed { UsageHint::Allow } else { UsageHint::Deny };
                    return Outcome::Rejected(Rejection::Usage(hint));
                };
                if !(event.scope_kind.is_private() || authority.is_admin) {
                    return Outcome::Rejected(Rejection::Denied);
                }
                match book.set_allow(scope, principal, allowed) {
                    Ok(changed) => Outcome::AllowChanged {
                        principal,
                        allowed,
                        changed,
                    },
                    Err(e) => e.into(),
                }
            }
            Command::Duty => {
                if event.scope_kind.is_private() {
                    return Outcome::Rejected(Rejection::Usage(UsageHint::GroupOnly));
                }
                let duty = DutyAssignment::new(event.principal, event.display_name.clone());
                match book.set_duty(scope, Some(duty.clone())) {
                    Ok(_) => Outcome::DutyAssigned(duty),
                    Err(e) => e.into(),
                }
            }
            Command::OffDuty => {
                if event.scope_kind.is_private() {
                    return Outcome::Rejected(Rejection::Usage(UsageHint::GroupOnly));
                }
                let Some(current) = book.scope(scope).duty.as_ref() else {
                    return Outcome::Rejected(Rejection::Usage(UsageHint::NoDuty));
                };
                if current.principal != event.principal && !authority.is_admin {
                    return Outcome::Rejected(Rejection::Denied);
                }
                match book.set_duty(scope, None) {
                    Ok(_) => Outcome::DutyCleared,
                    Err(e) => e.into(),
                }
            }
            Command::View => match book.toggle_view_mode(scope) {
                Ok(mode) => Outcome::ViewChanged(mode),
                Err(e) => e.into(),
            },
            Command::Help => Outcome::Help,
        }
    }

    fn apply_text(
        &self,
        book: &mut ChecklistBook,
        event: &InboundEvent,
        text: &str,
        reply_to_bot: bool,
        authority: Authority,
    ) -> Outcome {
        let prompted = book.take_add_prompt(&event.scope, event.principal);
        let accepted = prompted
            || event.scope_kind.is_private()
            || match self.config.free_text {
                FreeTextPolicy::Always => true,
                FreeTextPolicy::ReplyOnly => reply_to_bot,
            };
        if !accepted || text.trim_start().starts_with('/') {
            return Outcome::Ignored;
        }

        if text.trim().is_empty() {
            return Outcome::Ignored;
        }
        if !self.check_edit(book, event, authority) {
            return Outcome::Rejected(Rejection::Denied);
        }
        match book.add_item(&event.scope, text) {
            Ok(index1) => Outcome::Added { index1 },
            Err(e) => e.into(),
        }
    }

    fn apply_control(
        &self,
        book: &mut ChecklistBook,
        event: &InboundEvent,
        action: ControlAction,
        authority: Authority,
    ) -> Outcome {
        let scope = &event.scope;
        let result = match action {
            ControlAction::Add => {
                if !self.check_edit(book, event, authority) {
                    return Outcome::Rejected(Rejection::Denied);
                }
                book.arm_add_prompt(scope, event.principal);
                return Outcome::AddPrompt;
            }
            ControlAction::Refresh => {
                book.scope(scope);
                return Outcome::Refreshed;
            }
            ControlAction::ClearChecks => book
                .clear_checks(scope)
                .map(|count| Outcome::ChecksCleared { count }),
            ControlAction::ToggleRemoveMode => {
                book.toggle_remove_mode(scope).map(Outcome::RemoveModeChanged)
            }
            ControlAction::ToggleView => book.toggle_view_mode(scope).map(Outcome::ViewChanged),
        };
        result.unwrap_or_else(Outcome::from)
    }

    fn apply_select(
        &self,
        book: &mut ChecklistBook,
        event: &InboundEvent,
        index1: usize,
        authority: Authority,
    ) -> Outcome {
        if index1 == 0 {
            return Outcome::Rejected(Rejection::NotFound { index1 });
        }
        let index = index1 - 1;

        if book.scope(&event.scope).remove_mode {
            if !self.check_edit(book, event, authority) {
                return Outcome::Rejected(Rejection::Denied);
            }
            return match book.remove_item(&event.scope, index) {
                Ok(item) => Outcome::Removed {
                    index1,
                    text: item.text,
                },
                Err(e) => e.into(),
            };
        }

        match book.toggle_item(&event.scope, index) {
            Ok(done) => Outcome::Toggled { index1, done },
            Err(e) => e.into(),
        }
    }
}
