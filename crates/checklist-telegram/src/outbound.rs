//! Delivery of rendered views through the Bot API.

use async_trait::async_trait;
use checklist_core::{
    broadcast, companion_unreachable_notice, destinations_for, BroadcastReport, DeliveryError,
    Destination, Outbound, ScopeKind, View,
};
use checklist_models::{ScopeId, ScopeState};
use teloxide::prelude::*;
use teloxide::types::{MessageId, ParseMode};
use teloxide::{ApiError, RequestError};
use tracing::{debug, info};

use crate::keyboards::inline_keyboard;

/// Resolve a scope id to a Telegram chat.
pub fn chat_id(scope: &ScopeId) -> Result<ChatId, DeliveryError> {
    scope
        .as_chat_id()
        .map(ChatId)
        .ok_or_else(|| DeliveryError::InvalidDestination(scope.to_string()))
}

/// Kind of chat behind a scope. Telegram gives users positive ids and
/// groups negative ones.
pub fn scope_kind(scope: &ScopeId) -> ScopeKind {
    match scope.as_chat_id() {
        Some(id) if id > 0 => ScopeKind::Private,
        _ => ScopeKind::Group,
    }
}

/// Push a view of a scope to all its destinations except `skip`.
///
/// When the duty principal's private chat cannot be reached, the group is
/// told so they can start a conversation with the bot.
pub async fn publish(
    outbound: &dyn Outbound,
    scope: &ScopeId,
    state: &ScopeState,
    view: &View,
    skip: Option<&ScopeId>,
) -> BroadcastReport {
    let destinations: Vec<Destination> = destinations_for(scope, state, scope_kind(scope), None)
        .into_iter()
        .filter(|d| Some(&d.chat) != skip)
        .collect();
    let report = broadcast(outbound, &destinations, view).await;

    if report.companion_failures().next().is_some() {
        if let Some(duty) = &state.duty {
            info!(chat_id = %scope, principal = %duty.principal, "Companion chat unreachable");
            let notice = View::text(companion_unreachable_notice(&duty.display_name));
            broadcast(outbound, &[Destination::origin(scope.clone())], &notice).await;
        }
    }
    report
}

/// Map a Bot API failure onto a delivery error.
pub fn classify(e: RequestError) -> DeliveryError {
    match &e {
        RequestError::Api(
            ApiError::BotBlocked
            | ApiError::CantInitiateConversation
            | ApiError::ChatNotFound
            | ApiError::UserDeactivated
            | ApiError::BotKicked,
        ) => DeliveryError::Unreachable(e.to_string()),
        _ => DeliveryError::Platform(e.to_string()),
    }
}

/// [`Outbound`] implementation sending HTML messages with inline controls.
#[derive(Clone)]
pub struct TelegramOutbound {
    bot: Bot,
}

impl TelegramOutbound {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Replace the text and controls of an existing message.
    ///
    /// An unchanged message is not an error.
    pub async fn edit(&self, chat: ChatId, message: MessageId, view: &View) -> Result<(), DeliveryError> {
        let mut req = self
            .bot
            .edit_message_text(chat, message, view.text.clone())
            .parse_mode(ParseMode::Html);
        if let Some(controls) = &view.controls {
            req = req.reply_markup(inline_keyboard(controls));
        }

        match req.await {
            Ok(_) => Ok(()),
            Err(RequestError::Api(ApiError::MessageNotModified)) => {
                debug!(chat_id = chat.0, "Message unchanged");
                Ok(())
            }
            Err(e) => Err(classify(e)),
        }
    }
}

#[async_trait]
impl Outbound for TelegramOutbound {
    async fn deliver(&self, destination: &Destination, view: &View) -> Result<(), DeliveryError> {
        let chat = chat_id(&destination.chat)?;
        let mut req = self
            .bot
            .send_message(chat, view.text.clone())
            .parse_mode(ParseMode::Html);
        if let Some(controls) = &view.controls {
            req = req.reply_markup(inline_keyboard(controls));
        }
        req.await.map(|_| ()).map_err(classify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_id_resolution() {
        assert_eq!(chat_id(&ScopeId::from(-1001_i64)), Ok(ChatId(-1001)));
        assert!(matches!(
            chat_id(&ScopeId::from("general")),
            Err(DeliveryError::InvalidDestination(_))
        ));
    }

    #[test]
    fn test_scope_kind_from_id_sign() {
        assert_eq!(scope_kind(&ScopeId::from(42_i64)), ScopeKind::Private);
        assert_eq!(scope_kind(&ScopeId::from(-1001_i64)), ScopeKind::Group);
    }

    #[test]
    fn test_blocked_is_unreachable() {
        let err = classify(RequestError::Api(ApiError::BotBlocked));
        assert!(matches!(err, DeliveryError::Unreachable(_)));

        let err = classify(RequestError::Api(ApiError::MessageIsTooLong));
        assert!(matches!(err, DeliveryError::Platform(_)));
    }
}
