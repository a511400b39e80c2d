//! Error types for the checklist core.

use checklist_persistence::PersistenceError;
use thiserror::Error;

use crate::lifecycle::{LifecycleEvent, Phase};

/// Errors from state accessor operations.
#[derive(Debug, Error)]
pub enum BookError {
    /// Item text was empty after trimming.
    #[error("item text is empty")]
    EmptyText,

    /// Index does not address an item. Stored 0-based, shown 1-based.
    #[error("item {} not found", .index + 1)]
    NotFound { index: usize },

    /// The mutation could not be persisted and was rolled back.
    #[error("failed to persist checklist: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Result type for state accessor operations.
pub type Result<T> = std::result::Result<T, BookError>;

/// Errors from the lifecycle state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The event is not valid in the current phase.
    #[error("cannot handle {event:?} while {phase:?}")]
    InvalidTransition { phase: Phase, event: LifecycleEvent },

    /// Shutdown has already run.
    #[error("already stopped")]
    AlreadyStopped,
}

/// A failed delivery to one destination.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The destination refused or cannot receive messages from the bot.
    #[error("destination unreachable: {0}")]
    Unreachable(String),

    /// The destination id cannot be addressed on the platform.
    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    /// Any other platform failure.
    #[error("platform error: {0}")]
    Platform(String),
}
