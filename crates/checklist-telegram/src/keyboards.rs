//! Conversion of control surfaces into Telegram keyboards.

use checklist_core::{ControlAction, ControlSurface};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};

/// Global buttons per row.
const GLOBALS_PER_ROW: usize = 2;

/// Inline keyboard: one row per item, then the global controls.
pub fn inline_keyboard(surface: &ControlSurface) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = surface
        .items
        .iter()
        .map(|item| vec![InlineKeyboardButton::callback(item.label.clone(), item.data.encode())])
        .collect();

    rows.extend(surface.globals.chunks(GLOBALS_PER_ROW).map(|chunk| {
        chunk
            .iter()
            .map(|g| InlineKeyboardButton::callback(g.label.clone(), g.data.encode()))
            .collect()
    }));

    InlineKeyboardMarkup::new(rows)
}

/// Persistent reply keyboard with the global controls.
///
/// Taps arrive as plain text equal to the label and are mapped back with
/// [`ControlAction::from_label`].
pub fn reply_keyboard() -> KeyboardMarkup {
    let rows: Vec<Vec<KeyboardButton>> = ControlAction::ALL
        .chunks(GLOBALS_PER_ROW)
        .map(|chunk| chunk.iter().map(|a| KeyboardButton::new(a.label())).collect())
        .collect();
    KeyboardMarkup::new(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use checklist_core::controls;
    use checklist_models::{ChecklistItem, ScopeId, ScopeState};

    #[test]
    fn test_inline_keyboard_layout() {
        let state = ScopeState::with_items(vec![
            ChecklistItem::new("Buy milk"),
            ChecklistItem::new("Walk dog"),
        ]);
        let kb = inline_keyboard(&controls(&ScopeId::from(-1_i64), &state));

        // 2 item rows + 5 globals in rows of 2
        assert_eq!(kb.inline_keyboard.len(), 2 + 3);
        assert_eq!(kb.inline_keyboard[0][0].text, "☐ 1. Buy milk");
        assert_eq!(kb.inline_keyboard[2].len(), 2);
        assert_eq!(kb.inline_keyboard[4].len(), 1);
    }

    #[test]
    fn test_empty_list_still_has_controls() {
        let kb = inline_keyboard(&controls(&ScopeId::from(-1_i64), &ScopeState::default()));
        let labels: Vec<&str> = kb
            .inline_keyboard
            .iter()
            .flatten()
            .map(|b| b.text.as_str())
            .collect();
        assert_eq!(labels.len(), ControlAction::ALL.len());
        assert!(labels.contains(&ControlAction::Add.label()));
    }

    #[test]
    fn test_reply_keyboard_labels_map_back() {
        let kb = reply_keyboard();
        for button in kb.keyboard.iter().flatten() {
            assert!(ControlAction::from_label(&button.text).is_some());
        }
    }
}
