//! Checklist Telegram Bot binary.
//!
//! Start the bot with:
//! ```bash
//! TELEGRAM_BOT_TOKEN=xxx cargo run -p checklist-telegram -- --duration-mins 60
//! ```

use std::path::PathBuf;
use std::time::Duration;

use checklist_core::{
    config, BotConfig, ChecklistBook, DispatchConfig, FreeTextPolicy, LifecycleConfig,
};
use checklist_models::ScopeId;
use checklist_persistence::DocumentStore;
use checklist_telegram::{bot_from_env, create_shared_state, BotError, ChecklistBot};
use clap::Parser;
use teloxide::prelude::*;
use tracing_subscriber::EnvFilter;

/// Checklist Telegram Bot - a shared checklist per chat
#[derive(Parser, Debug)]
#[command(name = "checklist-bot")]
#[command(about = "Telegram bot that keeps a shared checklist per chat")]
struct Args {
    /// Checklist document (default: ~/.checklist-bot/state/checklist.json)
    #[arg(long, env = "CHECKLIST_DATA_FILE")]
    data_file: Option<String>,

    /// Stop after this many minutes; 0 runs until signalled
    #[arg(long, env = "CHECKLIST_RUN_MINUTES", default_value_t = 0)]
    duration_mins: u64,

    /// Minutes before the stop to send the status warning
    #[arg(long, env = "CHECKLIST_WARNING_MINUTES", default_value_t = 5)]
    warning_mins: u64,

    /// Reminder offsets in minutes from start, comma separated
    #[arg(long, env = "CHECKLIST_REMIND_AT", value_delimiter = ',')]
    remind_at: Vec<u64>,

    /// Only admins and allowlisted users may add or remove items in groups
    #[arg(long, env = "CHECKLIST_ENFORCE_ALLOWLIST")]
    enforce_allowlist: bool,

    /// Free text in groups: "always" or "reply-only"
    #[arg(long, env = "CHECKLIST_FREE_TEXT", default_value = "reply-only")]
    free_text: FreeTextPolicy,

    /// Chat id receiving startup, reminder and final notices
    #[arg(long, env = "CHECKLIST_ANNOUNCE_CHAT", allow_negative_numbers = true)]
    announce_chat: Option<i64>,

    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn bot_config(&self) -> BotConfig {
        let minutes = |m: u64| Duration::from_secs(m * 60);
        BotConfig::new()
            .with_dispatch(
                DispatchConfig::new()
                    .with_enforce_allowlist(self.enforce_allowlist)
                    .with_free_text(self.free_text),
            )
            .with_lifecycle(
                LifecycleConfig::new()
                    .with_run_duration(minutes(self.duration_mins))
                    .with_warning_lead(minutes(self.warning_mins))
                    .with_reminders(self.remind_at.iter().copied().map(minutes).collect()),
            )
            .with_announce(self.announce_chat.map(ScopeId::from))
    }

    /// Resolve the data file and make sure its directory exists.
    fn data_file(&self) -> Result<PathBuf, BotError> {
        let Some(raw) = &self.data_file else {
            config::ensure_state_dir()?;
            return Ok(config::data_file());
        };
        let path = PathBuf::from(shellexpand::tilde(raw).into_owned());
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(path)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from config directory first
    let env_path = config::env_file();
    if env_path.exists() {
        let _ = dotenvy::from_path(&env_path);
    }
    // Also try local .env.local or .env
    let _ = dotenvy::from_filename(".env.local").or_else(|_| dotenvy::dotenv());

    let args = Args::parse();

    // Initialize logging based on verbosity
    let filter = match args.verbose {
        0 => "checklist_telegram=info,checklist_core=info,teloxide=warn",
        1 => "checklist_telegram=debug,checklist_core=debug,checklist_persistence=debug,teloxide=info",
        2 => "checklist_telegram=trace,checklist_core=trace,checklist_persistence=trace,teloxide=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(filter))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let bot = bot_from_env()?;
    let data_file = args.data_file()?;
    let config = args.bot_config();

    // The update channel is unusable without a valid token
    let me = match bot.get_me().await {
        Ok(me) => me,
        Err(e) => {
            tracing::error!(error = %e, "Failed to get bot info");
            return Err(BotError::BotStartFailed(e.to_string()).into());
        }
    };
    tracing::info!(username = %me.username(), data_file = %data_file.display(), "Bot initialized successfully");

    println!("\n[list] Checklist Telegram Bot");
    println!("   Bot: @{}", me.username());
    println!("   Data: {}", data_file.display());
    match config.lifecycle.run_duration {
        Some(d) => println!("   Stops after {} minutes", d.as_secs() / 60),
        None => println!("   Runs until stopped"),
    }
    println!("   Press Ctrl+C to stop\n");

    let book = ChecklistBook::open(DocumentStore::new(data_file));
    let state = create_shared_state(book, config, me.id);

    ChecklistBot::new(bot, state).run().await?;
    Ok(())
}
