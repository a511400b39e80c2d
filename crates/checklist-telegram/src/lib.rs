//! Telegram front end for the checklist bot.
//!
//! Keeps one checklist per chat. Items are managed through slash commands,
//! free text, a persistent reply keyboard and inline buttons under each
//! rendered list. A principal on duty for a group gets every change mirrored
//! to their private chat and can work the group's list from there.
//!
//! # Environment Variables
//!
//! Required:
//! - `TELEGRAM_BOT_TOKEN`: Bot token from @BotFather
//!
//! Optional (each also a command-line flag):
//! - `CHECKLIST_DATA_FILE`: Path of the checklist document
//! - `CHECKLIST_RUN_MINUTES`: Stop after this many minutes (0 = run until signalled)
//! - `CHECKLIST_WARNING_MINUTES`: Lead time of the pre-shutdown warning
//! - `CHECKLIST_REMIND_AT`: Comma-separated reminder offsets in minutes
//! - `CHECKLIST_ENFORCE_ALLOWLIST`: Restrict add/remove in groups to admins and allowlisted users
//! - `CHECKLIST_FREE_TEXT`: `always` or `reply-only`
//! - `CHECKLIST_ANNOUNCE_CHAT`: Chat receiving startup, reminder and final notices
//! - `CHECKLIST_STATE_DIR`: Base state directory (default `~/.checklist-bot`)
//!
//! # Commands
//!
//! - `/add <text>` - Add an item
//! - `/done <n>` - Mark item n done
//! - `/remove <n>` - Remove item n
//! - `/clear` - Uncheck every item
//! - `/list` - Show the list
//! - `/duty`, `/offduty` - Take or clear duty

pub mod bot;
pub mod error;
pub mod handlers;
pub mod keyboards;
pub mod outbound;
pub mod scheduler;
pub mod state;

pub use bot::{bot_from_env, ChecklistBot};
pub use error::{BotError, Result};
pub use handlers::Command;
pub use outbound::{publish, TelegramOutbound};
pub use scheduler::{shutdown_signal, Scheduler, StopReason};
pub use state::{create_shared_state, BotState};
