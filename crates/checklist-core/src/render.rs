//! Projects scope state into text and tappable controls.
//!
//! Text is HTML for Telegram's `ParseMode::Html`; all item text passes
//! through [`escape_html`].

use std::fmt::Write as _;

use checklist_models::{ScopeId, ScopeState, ViewMode};

use crate::dispatch::{Outcome, Rejection};

const CHECKED: &str = "☑";
const UNCHECKED: &str = "☐";
const REMOVE: &str = "🗑";

/// Longest item text shown on a button.
const BUTTON_TEXT_MAX: usize = 40;

/// Escape text for HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Global controls shown under every list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlAction {
    Add,
    Refresh,
    ClearChecks,
    ToggleRemoveMode,
    ToggleView,
}

impl ControlAction {
    /// All controls in display order.
    pub const ALL: [ControlAction; 5] = [
        ControlAction::Add,
        ControlAction::Refresh,
        ControlAction::ClearChecks,
        ControlAction::ToggleRemoveMode,
        ControlAction::ToggleView,
    ];

    /// Button and reply-keyboard label.
    pub fn label(self) -> &'static str {
        match self {
            ControlAction::Add => "➕ Add",
            ControlAction::Refresh => "🔄 Refresh",
            ControlAction::ClearChecks => "🧹 Clear checks",
            ControlAction::ToggleRemoveMode => "🗑 Remove mode",
            ControlAction::ToggleView => "👁 Toggle view",
        }
    }

    /// Maps a reply-keyboard tap back to its control.
    ///
    /// Only the exact label matches, so ordinary chat such as "add" stays text.
    pub fn from_label(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| text == action.label())
    }

    fn code(self) -> &'static str {
        match self {
            ControlAction::Add => "add",
            ControlAction::Refresh => "refresh",
            ControlAction::ClearChecks => "clear",
            ControlAction::ToggleRemoveMode => "rm",
            ControlAction::ToggleView => "view",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.code() == code)
    }
}

/// Payload of an inline button.
///
/// Encoded as `i:<n>@<scope>` for item selectors and `c:<code>@<scope>` for
/// controls. The scope is explicit so a list mirrored into a private chat
/// still acts on the group it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackData {
    Item { scope: ScopeId, index1: usize },
    Control { scope: ScopeId, action: ControlAction },
}

impl CallbackData {
    pub fn encode(&self) -> String {
        match self {
            CallbackData::Item { scope, index1 } => format!("i:{}@{}", index1, scope),
            CallbackData::Control { scope, action } => format!("c:{}@{}", action.code(), scope),
        }
    }

    /// Parses callback data; returns `None` for anything malformed.
    pub fn parse(data: &str) -> Option<Self> {
        let (body, scope) = data.split_once('@')?;
        if scope.is_empty() {
            return None;
        }
        let scope = ScopeId::from(scope);
        let (kind, value) = body.split_once(':')?;
        match kind {
            "i" => {
                let index1 = value.parse::<usize>().ok().filter(|n| *n > 0)?;
                Some(CallbackData::Item { scope, index1 })
            }
            "c" => ControlAction::from_code(value).map(|action| CallbackData::Control { scope, action }),
            _ => None,
        }
    }

    pub fn scope(&self) -> &ScopeId {
        match self {
            CallbackData::Item { scope, .. } | CallbackData::Control { scope, .. } => scope,
        }
    }
}

/// Selector button for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemControl {
    pub index1: usize,
    pub label: String,
    pub data: CallbackData,
}

/// One of the fixed global buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalControl {
    pub action: ControlAction,
    pub label: String,
    pub data: CallbackData,
}

/// Structured controls for one rendered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlSurface {
    pub items: Vec<ItemControl>,
    pub globals: Vec<GlobalControl>,
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub text: String,
    pub controls: Option<ControlSurface>,
}

impl View {
    /// A text-only view.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            controls: None,
        }
    }

    /// The scope's list in its current view mode, with controls.
    pub fn list(scope: &ScopeId, title: &str, state: &ScopeState) -> Self {
        Self {
            text: render(title, state),
            controls: Some(controls(scope, state)),
        }
    }
}

/// Numbered list with one line per item.
pub fn render_full(title: &str, state: &ScopeState) -> String {
    let mut out = format!("<b>{}</b>\n", escape_html(title));

    if state.is_empty() {
        out.push_str("\n<i>The list is empty. Use /add &lt;text&gt; to add an item.</i>");
    } else {
        for (i, item) in state.items.iter().enumerate() {
            let glyph = if item.done { CHECKED } else { UNCHECKED };
            let _ = write!(out, "\n{}. {} {}", i + 1, glyph, escape_html(&item.text));
        }
        let _ = write!(out, "\n\n{}/{} done", state.done_count(), state.len());
    }

    if state.remove_mode {
        out.push_str("\n\n🗑 <b>Remove mode</b>: tap an item to delete it.");
    }
    out
}

/// One summary line with the remaining count.
pub fn render_compact(title: &str, state: &ScopeState) -> String {
    let mut out = format!(
        "<b>{}</b>: {}/{} remaining",
        escape_html(title),
        state.remaining(),
        state.len()
    );
    if state.remove_mode {
        out.push_str(" · 🗑 remove mode");
    }
    out
}

/// Render in the scope's view mode.
pub fn render(title: &str, state: &ScopeState) -> String {
    match state.view_mode {
        ViewMode::Full => render_full(title, state),
        ViewMode::Compact => render_compact(title, state),
    }
}

/// Completion summary sent with the shutdown warning and at the end of a run.
pub fn render_summary(state: &ScopeState) -> String {
    let mut out = format!(
        "<b>Status</b>: {}/{} done",
        state.done_count(),
        state.len()
    );

    if state.remaining() == 0 {
        if !state.is_empty() {
            out.push_str("\nAll items are done ✅");
        }
    } else {
        out.push_str("\n\nStill open:");
        for (index1, item) in state.open_items() {
            let _ = write!(out, "\n{}. {}", index1, escape_html(&item.text));
        }
    }

    if let Some(duty) = &state.duty {
        let _ = write!(out, "\n\nOn duty: {}", escape_html(&duty.display_name));
    }
    out
}

/// Selector per item plus the fixed global controls.
pub fn controls(scope: &ScopeId, state: &ScopeState) -> ControlSurface {
    let items = state
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let index1 = i + 1;
            let glyph = if state.remove_mode {
                REMOVE
            } else if item.done {
                CHECKED
            } else {
                UNCHECKED
            };
            ItemControl {
                index1,
                label: format!("{} {}. {}", glyph, index1, truncate(&item.text, BUTTON_TEXT_MAX)),
                data: CallbackData::Item {
                    scope: scope.clone(),
                    index1,
                },
            }
        })
        .collect();

    let globals = ControlAction::ALL
        .into_iter()
        .map(|action| GlobalControl {
            action,
            label: action.label().to_string(),
            data: CallbackData::Control {
                scope: scope.clone(),
                action,
            },
        })
        .collect();

    ControlSurface { items, globals }
}

/// Notice for the group when a duty principal's private chat is unreachable.
pub fn companion_unreachable_notice(name: &str) -> String {
    format!(
        "⚠️ Could not reach {} privately. Ask them to start a private chat with the bot first.",
        escape_html(name)
    )
}

/// Confirmation or rejection text for an outcome.
///
/// Returns `None` when the refreshed list says everything, or when the
/// event is ignored.
pub fn outcome_message(outcome: &Outcome) -> Option<String> {
    let text = match outcome {
        Outcome::Added { index1 } => format!("Added item {}.", index1),
        Outcome::Removed { index1, text } => {
            format!("Removed item {}: {}", index1, escape_html(text))
        }
        Outcome::ChecksCleared { count } => format!("Cleared {} checks.", count),
        Outcome::AddPrompt => "Send the text of the new item.".to_string(),
        Outcome::AllowChanged {
            principal,
            allowed,
            changed,
        } => match (allowed, changed) {
            (true, true) => format!("User {} may now edit the list.", principal),
            (true, false) => format!("User {} was already allowed.", principal),
            (false, true) => format!("User {} may no longer edit the list.", principal),
            (false, false) => format!("User {} was not on the allowlist.", principal),
        },
        Outcome::DutyAssigned(duty) => format!(
            "{} is now on duty. Updates will also be sent privately.",
            escape_html(&duty.display_name)
        ),
        Outcome::DutyCleared => "Duty cleared.".to_string(),
        Outcome::Rejected(rejection) => match rejection {
            Rejection::Usage(hint) => escape_html(hint.message()),
            Rejection::NotFound { index1 } => format!("Item {} not found.", index1),
            Rejection::Denied => "You are not allowed to change this list.".to_string(),
            Rejection::Failed(_) => "Could not save the change. Please try again.".to_string(),
        },
        Outcome::Toggled { .. }
        | Outcome::Refreshed
        | Outcome::ViewChanged(_)
        | Outcome::RemoveModeChanged(_)
        | Outcome::Help
        | Outcome::Ignored => return None,
    };
    Some(text)
}
