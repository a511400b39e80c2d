//! Document store for the checklist file.

use std::fs;
use std::path::{Path, PathBuf};

use checklist_models::{Document, ScopeId};
use tracing::{debug, info, warn};

use crate::atomic::{atomic_write_json, read_json};
use crate::error::Result;
use crate::migration;

/// How a load was satisfied.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// No file existed; an empty document was written.
    Fresh,
    /// The file was already in the current schema.
    Loaded,
    /// The file was upgraded and the upgrade was written back.
    Migrated { scopes: Vec<ScopeId> },
    /// The file was unreadable or malformed and was reinitialized.
    Reset { reason: String },
}

/// A loaded document together with how it was obtained.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub document: Document,
    pub outcome: LoadOutcome,
}

/// Loads and saves the single checklist document.
///
/// The whole document lives in one JSON file:
/// ```text
/// checklist.json
/// {
///   "version": 2,
///   "scopes": { "<chat id>": { "items": [...], "allow": [...], ... } }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DocumentStore {
    path: PathBuf,
}

impl DocumentStore {
    /// Creates a store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the document, never failing.
    ///
    /// A missing or malformed file yields an empty document, and the file is
    /// reinitialized to match it.
    pub fn load(&self) -> Document {
        self.load_with_report().document
    }

    /// Loads the document and reports what happened.
    pub fn load_with_report(&self) -> LoadReport {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No checklist file, starting empty");
            return self.reinitialize(LoadOutcome::Fresh);
        }

        let raw = match read_json::<serde_json::Value>(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Checklist file unreadable, resetting");
                self.backup_corrupt();
                return self.reinitialize(LoadOutcome::Reset {
                    reason: e.to_string(),
                });
            }
        };

        let upgrade = match migration::upgrade(raw) {
            Ok(upgrade) => upgrade,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Checklist file malformed, resetting");
                self.backup_corrupt();
                return self.reinitialize(LoadOutcome::Reset {
                    reason: e.to_string(),
                });
            }
        };

        if !upgrade.changed {
            debug!(scopes = upgrade.document.scopes.len(), "Checklist loaded");
            return LoadReport {
                document: upgrade.document,
                outcome: LoadOutcome::Loaded,
            };
        }

        // Persist the upgrade before anyone mutates the document
        if let Err(e) = self.save(&upgrade.document) {
            warn!(error = %e, "Failed to write upgraded checklist file");
        } else {
            info!(scopes = upgrade.migrated.len(), "Checklist file upgraded");
        }

        LoadReport {
            document: upgrade.document,
            outcome: LoadOutcome::Migrated {
                scopes: upgrade.migrated,
            },
        }
    }

    /// Saves the full document atomically.
    ///
    /// # Errors
    /// Returns an error if serialization or the rename fails; the previously
    /// saved file is left intact.
    pub fn save(&self, document: &Document) -> Result<()> {
        atomic_write_json(&self.path, document)?;
        debug!(path = %self.path.display(), scopes = document.scopes.len(), "Checklist saved");
        Ok(())
    }

    fn reinitialize(&self, outcome: LoadOutcome) -> LoadReport {
        let document = Document::default();
        if let Err(e) = self.save(&document) {
            warn!(path = %self.path.display(), error = %e, "Failed to initialize checklist file");
        }
        LoadReport { document, outcome }
    }

    /// Keeps a copy of an unusable file next to the original.
    fn backup_corrupt(&self) {
        let mut backup = self.path.clone().into_os_string();
        backup.push(".corrupt");
        let backup = PathBuf::from(backup);
        match fs::copy(&self.path, &backup) {
            Ok(_) => info!(backup = %backup.display(), "Saved copy of unusable checklist file"),
            Err(e) => debug!(error = %e, "Could not copy unusable checklist file"),
        }
    }
}
