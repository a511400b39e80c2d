//! Main Telegram bot implementation.

use std::sync::Arc;
use std::time::Duration;

use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use tracing::{info, warn};

use crate::error::{BotError, Result};
use crate::handlers::{
    handle_callback, handle_command, handle_message, handle_unknown_command, Command,
};
use crate::outbound::TelegramOutbound;
use crate::scheduler::{shutdown_signal, Scheduler};
use crate::state::BotState;

/// Delay between attempts to stop a dispatcher that has not started yet.
const SHUTDOWN_RETRY_MS: u64 = 100;

/// The checklist bot: update dispatcher plus lifecycle scheduler.
pub struct ChecklistBot {
    bot: Bot,
    state: Arc<BotState>,
}

/// Create a Bot API client from the token in `TELEGRAM_BOT_TOKEN`.
pub fn bot_from_env() -> Result<Bot> {
    let token = std::env::var("TELEGRAM_BOT_TOKEN").map_err(|_| BotError::NoToken)?;
    if token.trim().is_empty() {
        return Err(BotError::NoToken);
    }
    Ok(Bot::new(token))
}

impl ChecklistBot {
    pub fn new(bot: Bot, state: Arc<BotState>) -> Self {
        Self { bot, state }
    }

    /// Run in polling mode until the deadline or a termination signal.
    pub async fn run(self) -> Result<()> {
        info!("Starting checklist bot in polling mode...");

        let state_for_commands = Arc::clone(&self.state);
        let state_for_messages = Arc::clone(&self.state);
        let state_for_callbacks = Arc::clone(&self.state);

        let handler = dptree::entry()
            .branch(
                Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
                    let state = Arc::clone(&state_for_callbacks);
                    async move { handle_callback(bot, q, state).await }
                }),
            )
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                        let state = Arc::clone(&state_for_commands);
                        info!(chat_id = %msg.chat.id, "Command matched: {:?}", cmd);
                        async move { handle_command(bot, msg, cmd, state).await }
                    }),
            )
            .branch(
                Update::filter_message()
                    .filter(|msg: Message| msg.text().is_some_and(|t| t.starts_with('/')))
                    .endpoint(|bot: Bot, msg: Message| async move {
                        handle_unknown_command(bot, msg).await
                    }),
            )
            .branch(
                Update::filter_message()
                    .filter(|msg: Message| msg.text().is_some_and(|t| !t.starts_with('/')))
                    .endpoint(move |bot: Bot, msg: Message| {
                        let state = Arc::clone(&state_for_messages);
                        async move { handle_message(bot, msg, state).await }
                    }),
            );

        let mut dispatcher = Dispatcher::builder(self.bot.clone(), handler)
            .default_handler(|upd| async move {
                tracing::debug!("Unhandled update: {:?}", upd.id);
            })
            .build();

        let token = dispatcher.shutdown_token();
        let outbound = Arc::new(TelegramOutbound::new(self.bot.clone()));
        let scheduler = Scheduler::new(Arc::clone(&self.state), outbound);

        let stopper = tokio::spawn(async move {
            let reason = scheduler.run(shutdown_signal()).await;
            info!(reason = ?reason, "Stopping dispatcher");
            loop {
                match token.shutdown() {
                    Ok(stopped) => {
                        stopped.await;
                        break;
                    }
                    // The dispatcher may not be running yet
                    Err(_) => tokio::time::sleep(Duration::from_millis(SHUTDOWN_RETRY_MS)).await,
                }
            }
        });

        info!("Bot is running! Send /start to begin.");
        dispatcher.dispatch().await;

        if let Err(e) = stopper.await {
            warn!(error = %e, "Scheduler task failed");
        }
        info!("Bot stopped");
        Ok(())
    }
}
