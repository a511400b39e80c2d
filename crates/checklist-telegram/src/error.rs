//! Error types for the Telegram bot.

use thiserror::Error;

/// Errors that can occur while starting or running the bot.
#[derive(Debug, Error)]
pub enum BotError {
    /// Bot token not provided.
    #[error("Telegram bot token not set. Set TELEGRAM_BOT_TOKEN environment variable.")]
    NoToken,

    /// The bot could not reach Telegram at startup.
    #[error("Failed to start bot: {0}")]
    BotStartFailed(String),

    /// The state directory or data file location is unusable.
    #[error("Failed to prepare state directory: {0}")]
    StateDir(#[from] std::io::Error),
}

/// Result type for bot operations.
pub type Result<T> = std::result::Result<T, BotError>;
