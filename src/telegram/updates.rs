//! Inbound update handling on the Bot API.

use std::sync::Arc;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::User;
use tracing::{debug, error, info, warn};

use super::TelegramBot;
use crate::app::{App, Outcome};
use crate::tally::{IncomingMessage, Sender};

/// The app as wired to the real Bot API.
pub type BotApp = App<TelegramBot>;

/// Reduces a Bot API message to the fields the app routes on.
#[must_use]
pub fn incoming_from(msg: &Message) -> IncomingMessage {
    IncomingMessage {
        chat_id: msg.chat.id.0,
        message_id: msg.id.0,
        sender: msg.from.as_ref().map(sender_of),
        text: msg.text().map(str::to_owned),
        has_sticker: msg.sticker().is_some(),
        has_animation: msg.animation().is_some(),
        is_admin: false,
        is_group: msg.chat.is_group() || msg.chat.is_supergroup(),
    }
}

fn sender_of(user: &User) -> Sender {
    Sender {
        id: user.id.0,
        display_name: user.full_name(),
        username: user.username.clone(),
        is_bot: user.is_bot,
    }
}

/// Builds the update routing tree.
#[must_use]
pub fn schema() -> UpdateHandler<anyhow::Error> {
    dptree::entry()
        .branch(
            Update::filter_message().endpoint(|app: Arc<BotApp>, msg: Message| async move {
                let outcome = app.handle_message(incoming_from(&msg)).await;
                if let Outcome::Command(command) = outcome {
                    debug!("Chat {} ran /{}", msg.chat.id, command.name());
                }
                Ok::<(), anyhow::Error>(())
            }),
        )
        .branch(
            Update::filter_callback_query().endpoint(|bot: Bot, app: Arc<BotApp>, q: CallbackQuery| async move {
                if let Err(e) = handle_callback(&bot, &app, &q).await {
                    error!("Callback handler error: {:?}", e);
                }
                Ok::<(), anyhow::Error>(())
            }),
        )
}

async fn handle_callback(bot: &Bot, app: &BotApp, q: &CallbackQuery) -> anyhow::Result<()> {
    let chat_id = q
        .message
        .as_ref()
        .and_then(|m| m.regular_message())
        .map(|m| m.chat.id.0);

    let answer = match q.data.as_deref() {
        Some(data) => app.handle_callback(chat_id, data).await,
        None => None,
    };

    let mut request = bot.answer_callback_query(q.id.clone());
    match answer {
        Some(text) => request = request.text(text),
        None => warn!("Unknown callback data {:?} from user {}", q.data, q.from.id),
    }
    request.await?;
    Ok(())
}

/// Long-polls Telegram until Ctrl+C.
pub async fn dispatch(bot: &TelegramBot, app: Arc<BotApp>) {
    info!("Listening for updates as @{}", bot.username());

    Dispatcher::builder(bot.inner().clone(), schema())
        .dependencies(dptree::deps![app])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Update dispatcher stopped");
}
