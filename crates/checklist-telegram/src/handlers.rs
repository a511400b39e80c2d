//! Telegram update handlers.
//!
//! Each handler turns an update into an [`InboundEvent`], resolves admin
//! status when the dispatcher needs it, applies the event under the book
//! lock, then answers in the originating chat and fans the new view out.

use std::sync::Arc;

use checklist_core::{
    outcome_message, Authority, CallbackData, ChecklistBook, Command as ListCommand, ControlAction,
    Destination, InboundEvent, Outbound, Outcome, Payload, ScopeKind, UsageHint, View,
};
use checklist_models::{PrincipalId, ScopeId};
use teloxide::prelude::*;
use teloxide::types::{MessageId, ParseMode, User};
use teloxide::utils::command::BotCommands;
use tracing::{debug, info, warn};

use crate::keyboards::reply_keyboard;
use crate::outbound::{chat_id, publish, scope_kind, TelegramOutbound};
use crate::state::BotState;

/// Title shown above every list.
pub const LIST_TITLE: &str = "Checklist";

/// Bot commands.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Checklist commands:")]
pub enum Command {
    #[command(description = "Show the list and the control keyboard")]
    Start,

    #[command(description = "Show help message")]
    Help,

    #[command(description = "Add an item: /add <text>")]
    Add(String),

    #[command(description = "Mark an item done: /done <number>")]
    Done(String),

    #[command(description = "Remove an item: /remove <number>")]
    Remove(String),

    #[command(description = "Uncheck every item")]
    Clear,

    #[command(description = "Show the list")]
    List,

    #[command(description = "Switch between full and compact view")]
    View,

    #[command(description = "Let a user add and remove items: /allow <user id>")]
    Allow(String),

    #[command(description = "Revoke edit rights: /deny <user id>")]
    Deny(String),

    #[command(description = "Take duty: updates are mirrored to your private chat")]
    Duty,

    #[command(description = "Clear the duty assignment")]
    OffDuty,
}

impl Command {
    /// The list command behind a bot command; `None` for `/start` and `/help`.
    fn into_list_command(self) -> Option<ListCommand> {
        Some(match self {
            Command::Start | Command::Help => return None,
            Command::Add(text) => ListCommand::Add(text),
            Command::Done(arg) => ListCommand::Done(arg),
            Command::Remove(arg) => ListCommand::Remove(arg),
            Command::Clear => ListCommand::Clear,
            Command::List => ListCommand::List,
            Command::View => ListCommand::View,
            Command::Allow(arg) => ListCommand::Allow(arg),
            Command::Deny(arg) => ListCommand::Deny(arg),
            Command::Duty => ListCommand::Duty,
            Command::OffDuty => ListCommand::OffDuty,
        })
    }
}

/// Usage hint for a known command whose arguments failed to parse.
pub fn usage_for(text: &str) -> Option<UsageHint> {
    let word = text.split_whitespace().next()?.strip_prefix('/')?;
    let name = word.split('@').next().unwrap_or(word).to_ascii_lowercase();
    match name.as_str() {
        "add" => Some(UsageHint::Add),
        "done" => Some(UsageHint::Done),
        "remove" => Some(UsageHint::Remove),
        "allow" => Some(UsageHint::Allow),
        "deny" => Some(UsageHint::Deny),
        _ => None,
    }
}

fn principal_of(user: &User) -> PrincipalId {
    PrincipalId(user.id.0)
}

/// Payload of a plain text message: a reply-keyboard tap or free text.
fn text_payload(text: &str, reply_to_bot: bool) -> Payload {
    match ControlAction::from_label(text) {
        Some(action) => Payload::Control(action),
        None => Payload::Text {
            text: text.to_string(),
            reply_to_bot,
        },
    }
}

/// Point private-chat text at the group whose add prompt the sender armed.
///
/// The prompt is armed from a list mirrored into the private chat, so the
/// answer belongs to that group. Anything else is returned unchanged.
fn retarget(book: &ChecklistBook, mut event: InboundEvent) -> InboundEvent {
    if event.scope_kind != ScopeKind::Private || !matches!(event.payload, Payload::Text { .. }) {
        return event;
    }
    if let Some(target) = book.add_prompt_scope(event.principal) {
        if target != &event.scope {
            event.scope = target.clone();
            event.scope_kind = scope_kind(target);
        }
    }
    event
}

/// Where the result of an event is shown.
struct Surface {
    chat: ChatId,
    /// Message to edit in place instead of sending a new list.
    edit: Option<MessageId>,
}

/// Build an event from a message; `None` when the message has no sender.
fn event_from_message(msg: &Message, payload: Payload) -> Option<InboundEvent> {
    let user = msg.from.as_ref()?;
    let kind = if msg.chat.is_private() {
        ScopeKind::Private
    } else {
        ScopeKind::Group
    };
    Some(
        InboundEvent::new(ScopeId::from(msg.chat.id.0), principal_of(user), kind, payload)
            .with_display_name(user.full_name()),
    )
}

/// Resolve admin status, but only when the answer changes the outcome.
///
/// The book lock is released before the Telegram round trip.
async fn resolve_authority(bot: &Bot, state: &BotState, event: &InboundEvent) -> Authority {
    let needed = {
        let book = state.book().lock().await;
        state.dispatcher.needs_authority(&book, event)
    };
    if !needed {
        return Authority::member();
    }

    let Some(chat) = event.scope.as_chat_id() else {
        return Authority::member();
    };
    match bot
        .get_chat_member(ChatId(chat), UserId(event.principal.get()))
        .await
    {
        Ok(member) => Authority {
            is_admin: member.kind.is_privileged(),
        },
        Err(e) => {
            warn!(chat_id = chat, principal = %event.principal, error = %e, "Admin lookup failed");
            Authority::member()
        }
    }
}

/// Apply an event and answer on the surface it came from.
async fn process(bot: &Bot, state: &BotState, event: InboundEvent, surface: Surface) -> ResponseResult<()> {
    let authority = resolve_authority(bot, state, &event).await;
    let scope = event.scope.clone();

    let (outcome, snapshot) = {
        let mut book = state.book().lock().await;
        let outcome = state.dispatcher.apply(&mut book, event, authority);
        let snapshot = book.scope(&scope).clone();
        (outcome, snapshot)
    };
    debug!(chat_id = %scope, outcome = ?outcome, "Event applied");

    if outcome == Outcome::Help {
        return send_help(bot, surface.chat).await;
    }
    if let Some(text) = outcome_message(&outcome) {
        bot.send_message(surface.chat, text)
            .parse_mode(ParseMode::Html)
            .await?;
    }

    let outbound = TelegramOutbound::new(bot.clone());
    let view = View::list(&scope, LIST_TITLE, &snapshot);
    let shown_in = ScopeId::from(surface.chat.0);

    if outcome.needs_refresh() {
        let shown = match surface.edit {
            Some(message) => outbound.edit(surface.chat, message, &view).await,
            None => outbound.deliver(&Destination::origin(shown_in.clone()), &view).await,
        };
        if let Err(e) = shown {
            warn!(chat_id = surface.chat.0, error = %e, "Failed to show list");
        }
    }

    // Mirror changes to the other surfaces of the scope
    if outcome.mutated_items() || matches!(outcome, Outcome::DutyAssigned(_)) {
        publish(&outbound, &scope, &snapshot, &view, Some(&shown_in)).await;
    }
    Ok(())
}

async fn send_help(bot: &Bot, chat: ChatId) -> ResponseResult<()> {
    bot.send_message(chat, Command::descriptions().to_string())
        .await?;
    Ok(())
}

/// Handle the /start command.
pub async fn handle_start(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    if msg.chat.is_private() {
        if let Some(user) = msg.from.as_ref() {
            info!(principal = user.id.0, "Principal opened a private chat");
        }
    }

    bot.send_message(
        msg.chat.id,
        "👋 I keep a shared checklist for this chat.\n\nUse the buttons below or /help for commands.",
    )
    .reply_markup(reply_keyboard())
    .await?;

    let scope = ScopeId::from(msg.chat.id.0);
    let snapshot = state.scope_snapshot(&scope).await;
    let view = View::list(&scope, LIST_TITLE, &snapshot);
    if let Err(e) = TelegramOutbound::new(bot)
        .deliver(&Destination::origin(scope.clone()), &view)
        .await
    {
        warn!(chat_id = %scope, error = %e, "Failed to show list");
    }
    Ok(())
}

/// Handle a parsed command.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<BotState>,
) -> ResponseResult<()> {
    match cmd {
        Command::Start => handle_start(bot, msg, state).await,
        Command::Help => send_help(&bot, msg.chat.id).await,
        other => {
            let Some(command) = other.into_list_command() else {
                return Ok(());
            };
            let Some(event) = event_from_message(&msg, Payload::Command(command)) else {
                return Ok(());
            };
            let surface = Surface {
                chat: msg.chat.id,
                edit: None,
            };
            process(&bot, &state, event, surface).await
        }
    }
}

/// Handle a text message that is not a command.
///
/// Reply-keyboard labels become control taps; anything else is free text.
pub async fn handle_message(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let reply_to_bot = msg
        .reply_to_message()
        .and_then(|r| r.from.as_ref())
        .is_some_and(|u| state.is_bot(u.id));
    let Some(event) = event_from_message(&msg, text_payload(text, reply_to_bot)) else {
        return Ok(());
    };
    let event = {
        let book = state.book().lock().await;
        retarget(&book, event)
    };

    let surface = Surface {
        chat: msg.chat.id,
        edit: None,
    };
    process(&bot, &state, event, surface).await
}

/// Handle a message starting with `/` that did not parse as a command.
///
/// Known commands with bad arguments get their usage line.
pub async fn handle_unknown_command(bot: Bot, msg: Message) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let reply = match usage_for(text) {
        Some(hint) => hint.message().to_string(),
        None => format!(
            "Unknown command: {}\n\nUse /help to see available commands.",
            text.split_whitespace().next().unwrap_or(text)
        ),
    };
    info!(chat_id = %msg.chat.id, "Unrecognized command");
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

/// Handle an inline button tap.
pub async fn handle_callback(bot: Bot, q: CallbackQuery, state: Arc<BotState>) -> ResponseResult<()> {
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(data) = q.data.as_deref().and_then(CallbackData::parse) else {
        debug!(data = ?q.data, "Ignoring unknown callback data");
        return Ok(());
    };

    let scope = data.scope().clone();
    let payload = match data {
        CallbackData::Item { index1, .. } => Payload::SelectItem { index1 },
        CallbackData::Control { action, .. } => Payload::Control(action),
    };
    let event = InboundEvent::new(scope.clone(), principal_of(&q.from), scope_kind(&scope), payload)
        .with_display_name(q.from.full_name());

    let surface = match q.message.as_ref().and_then(|m| m.regular_message()) {
        Some(message) => Surface {
            chat: message.chat.id,
            edit: Some(message.id),
        },
        None => match chat_id(&scope) {
            Ok(chat) => Surface { chat, edit: None },
            Err(e) => {
                warn!(error = %e, "Callback for unaddressable scope");
                return Ok(());
            }
        },
    };

    process(&bot, &state, event, surface).await
}
