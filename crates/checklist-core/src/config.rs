//! Shared configuration for the checklist bot.
//!
//! Locates the state directory and data file, and holds the immutable
//! process configuration handed to the dispatcher and the lifecycle
//! scheduler.
//!
//! # Storage Structure
//!
//! ```text
//! ~/.checklist-bot/
//! ├── config/       # .env.local with the bot token
//! └── state/        # checklist.json
//! ```
//!
//! # Environment Variables
//!
//! - `CHECKLIST_STATE_DIR`: Override the base state directory

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use checklist_models::ScopeId;

/// Environment variable for custom state directory.
pub const STATE_DIR_ENV: &str = "CHECKLIST_STATE_DIR";

/// Default state directory name under home.
const DEFAULT_STATE_DIR: &str = ".checklist-bot";

const CONFIG_SUBDIR: &str = "config";
const STATE_SUBDIR: &str = "state";

/// Name of the checklist document.
pub const DATA_FILE_NAME: &str = "checklist.json";

static STATE_DIR_CACHE: OnceLock<PathBuf> = OnceLock::new();

/// Get the base state directory.
///
/// Determined by:
/// 1. `CHECKLIST_STATE_DIR` environment variable if set
/// 2. `~/.checklist-bot` if home directory is available
/// 3. `.checklist-bot` in current directory as fallback
pub fn state_dir() -> PathBuf {
    STATE_DIR_CACHE
        .get_or_init(|| {
            std::env::var(STATE_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    dirs::home_dir()
                        .map(|h| h.join(DEFAULT_STATE_DIR))
                        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
                })
        })
        .clone()
}

/// Directory holding runtime state files.
pub fn runtime_state_dir() -> PathBuf {
    state_dir().join(STATE_SUBDIR)
}

/// Default path of the checklist document.
pub fn data_file() -> PathBuf {
    runtime_state_dir().join(DATA_FILE_NAME)
}

/// Path of the `.env.local` file holding secrets.
pub fn env_file() -> PathBuf {
    state_dir().join(CONFIG_SUBDIR).join(".env.local")
}

/// Ensure the runtime state directory exists.
pub fn ensure_state_dir() -> std::io::Result<()> {
    std::fs::create_dir_all(runtime_state_dir())
}

/// Whether free text in a group scope creates items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FreeTextPolicy {
    /// Any free-text message adds an item.
    Always,
    /// Only replies to the bot's own messages add items.
    #[default]
    ReplyOnly,
}

impl FromStr for FreeTextPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "reply-only" | "reply_only" | "reply" => Ok(Self::ReplyOnly),
            other => Err(format!(
                "unknown free-text policy '{}', expected 'always' or 'reply-only'",
                other
            )),
        }
    }
}

/// Dispatcher settings.
#[derive(Debug, Clone, Default)]
pub struct DispatchConfig {
    /// Require allowlist membership for add/remove in group scopes.
    pub enforce_allowlist: bool,
    /// Free-text handling in group scopes.
    pub free_text: FreeTextPolicy,
}

impl DispatchConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets allowlist enforcement.
    pub fn with_enforce_allowlist(mut self, enforce: bool) -> Self {
        self.enforce_allowlist = enforce;
        self
    }

    /// Sets the free-text policy.
    pub fn with_free_text(mut self, policy: FreeTextPolicy) -> Self {
        self.free_text = policy;
        self
    }
}

/// Timing of the process lifetime.
#[derive(Debug, Clone, Default)]
pub struct LifecycleConfig {
    /// Total run time; `None` or zero means unbounded.
    pub run_duration: Option<Duration>,
    /// How long before the deadline the warning fires.
    pub warning_lead: Duration,
    /// Offsets from start at which reminders are re-rendered.
    pub reminders: Vec<Duration>,
}

impl LifecycleConfig {
    /// Creates a config with default values (unbounded run).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the run duration. Zero means unbounded.
    pub fn with_run_duration(mut self, duration: Duration) -> Self {
        self.run_duration = (!duration.is_zero()).then_some(duration);
        self
    }

    /// Sets the warning lead time.
    pub fn with_warning_lead(mut self, lead: Duration) -> Self {
        self.warning_lead = lead;
        self
    }

    /// Sets the reminder offsets.
    pub fn with_reminders(mut self, reminders: Vec<Duration>) -> Self {
        self.reminders = reminders;
        self
    }

    /// Whether the process runs without a deadline.
    pub fn is_unbounded(&self) -> bool {
        self.run_duration.is_none()
    }
}

/// Full process configuration, immutable after startup.
#[derive(Debug, Clone, Default)]
pub struct BotConfig {
    pub dispatch: DispatchConfig,
    pub lifecycle: LifecycleConfig,
    /// Optional chat that receives startup, reminder and final notices.
    pub announce: Option<ScopeId>,
}

impl BotConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the dispatcher settings.
    pub fn with_dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Sets the lifecycle timing.
    pub fn with_lifecycle(mut self, lifecycle: LifecycleConfig) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    /// Sets the announcement chat.
    pub fn with_announce(mut self, announce: Option<ScopeId>) -> Self {
        self.announce = announce;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_text_policy_parse() {
        assert_eq!("always".parse::<FreeTextPolicy>(), Ok(FreeTextPolicy::Always));
        assert_eq!(
            "Reply-Only".parse::<FreeTextPolicy>(),
            Ok(FreeTextPolicy::ReplyOnly)
        );
        assert!("sometimes".parse::<FreeTextPolicy>().is_err());
    }

    #[test]
    fn test_zero_duration_is_unbounded() {
        let config = LifecycleConfig::new().with_run_duration(Duration::ZERO);
        assert!(config.is_unbounded());

        let config = LifecycleConfig::new().with_run_duration(Duration::from_secs(60));
        assert_eq!(config.run_duration, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_config_builder() {
        let config = BotConfig::new()
            .with_dispatch(
                DispatchConfig::new()
                    .with_enforce_allowlist(true)
                    .with_free_text(FreeTextPolicy::Always),
            )
            .with_announce(Some(ScopeId::from(-5_i64)));

        assert!(config.dispatch.enforce_allowlist);
        assert_eq!(config.dispatch.free_text, FreeTextPolicy::Always);
        assert_eq!(config.announce, Some(ScopeId::from("-5")));
        assert!(config.lifecycle.is_unbounded());
    }

    #[test]
    fn test_data_file_under_state_dir() {
        assert!(data_file().starts_with(state_dir()));
        assert!(data_file().ends_with(DATA_FILE_NAME));
    }
}
