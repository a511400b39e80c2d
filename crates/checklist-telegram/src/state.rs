//! Shared state for the Telegram bot.

use std::sync::Arc;

use checklist_core::{BotConfig, ChecklistBook, Dispatcher};
use checklist_models::{ScopeId, ScopeState};
use teloxide::types::UserId;
use tokio::sync::Mutex;

/// State shared by all handlers and the scheduler.
///
/// The book sits behind a single mutex: every mutation and its disk write
/// happen while the lock is held, and the lock is never held across a
/// Telegram request.
pub struct BotState {
    book: Mutex<ChecklistBook>,
    /// Routes normalized events into the book.
    pub dispatcher: Dispatcher,
    /// Process configuration, fixed at startup.
    pub config: BotConfig,
    bot_id: UserId,
}

impl BotState {
    pub fn new(book: ChecklistBook, config: BotConfig, bot_id: UserId) -> Self {
        let dispatcher = Dispatcher::new(config.dispatch.clone());
        Self {
            book: Mutex::new(book),
            dispatcher,
            config,
            bot_id,
        }
    }

    pub fn book(&self) -> &Mutex<ChecklistBook> {
        &self.book
    }

    /// Whether the user is this bot.
    pub fn is_bot(&self, user: UserId) -> bool {
        user == self.bot_id
    }

    pub fn announce_chat(&self) -> Option<&ScopeId> {
        self.config.announce.as_ref()
    }

    /// Snapshot of one scope.
    pub async fn scope_snapshot(&self, scope: &ScopeId) -> ScopeState {
        self.book.lock().await.scope(scope).clone()
    }

    /// Scopes that receive reminders and status summaries, with snapshots.
    ///
    /// The announcement chat (if any) followed by every scope with someone
    /// on duty.
    pub async fn reminder_targets(&self) -> Vec<(ScopeId, ScopeState)> {
        let mut book = self.book.lock().await;
        let mut targets: Vec<ScopeId> = Vec::new();
        if let Some(announce) = self.announce_chat() {
            targets.push(announce.clone());
        }
        for (scope, _) in book.document().scopes_with_duty() {
            if !targets.contains(scope) {
                targets.push(scope.clone());
            }
        }

        targets
            .into_iter()
            .map(|scope| {
                let state = book.scope(&scope).clone();
                (scope, state)
            })
            .collect()
    }
}

/// Create shared state wrapped in Arc.
pub fn create_shared_state(book: ChecklistBook, config: BotConfig, bot_id: UserId) -> Arc<BotState> {
    Arc::new(BotState::new(book, config, bot_id))
}
