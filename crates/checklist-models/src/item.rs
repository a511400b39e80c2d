//! Checklist item type.

use serde::{Deserialize, Deserializer, Serialize};

/// A single entry of a checklist.
///
/// Items have no identity of their own; they are addressed by position in
/// the owning scope's item list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistItem {
    /// Display text.
    pub text: String,
    /// Whether the item has been checked off.
    pub done: bool,
}

impl ChecklistItem {
    /// Creates a new unchecked item.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            done: false,
        }
    }

    /// Creates an item with an explicit completion state.
    pub fn with_done(text: impl Into<String>, done: bool) -> Self {
        Self {
            text: text.into(),
            done,
        }
    }

    /// Flips the completion state and returns the new value.
    pub fn toggle(&mut self) -> bool {
        self.done = !self.done;
        self.done
    }
}

impl<'de> Deserialize<'de> for ChecklistItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Record {
            text: String,
            #[serde(default, alias = "checked")]
            done: bool,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Record(Record),
            Bare(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Record(r) => Self::with_done(r.text, r.done),
            Raw::Bare(text) => Self::new(text),
        })
    }
}
