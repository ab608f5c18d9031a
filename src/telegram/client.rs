//! Bot API client wrapper.

use teloxide::RequestError;
use teloxide::prelude::*;
use teloxide::types::{
    ChatId as TgChatId, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
    MessageId as TgMessageId, ReplyParameters,
};
use tracing::{debug, info, warn};

use super::{ChatGateway, TelegramError};
use crate::config::{MenuEntry, TelegramConfig};
use crate::tally::{ChatId, MessageId, UserId};

impl From<RequestError> for TelegramError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::RetryAfter(wait) => Self::FloodWait(wait.seconds()),
            RequestError::Api(e) => Self::Api(e.to_string()),
            RequestError::Network(e) => Self::Network(e.to_string()),
            other => Self::Other(other.to_string()),
        }
    }
}

/// High-level Telegram Bot API client.
#[derive(Clone)]
pub struct TelegramBot {
    /// The underlying teloxide bot.
    bot: Bot,

    /// The bot's own username, without `@`.
    username: String,
}

impl TelegramBot {
    /// Connects to Telegram and identifies the bot.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is rejected or Telegram is unreachable.
    pub async fn connect(config: &TelegramConfig) -> Result<Self, TelegramError> {
        info!("Connecting to Telegram...");

        let bot = Bot::new(&config.bot_token);
        let me = bot.get_me().await?;
        let username = me.user.username.clone().unwrap_or_default();

        info!("Connected to Telegram as @{}", username);

        Ok(Self { bot, username })
    }

    /// Returns the bot's username, used to recognize `/cmd@botname`.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns a reference to the underlying client for advanced operations.
    #[must_use]
    pub fn inner(&self) -> &Bot {
        &self.bot
    }
}

impl ChatGateway for TelegramBot {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageId, TelegramError> {
        debug!("Sending {} chars to chat {}", text.chars().count(), chat_id);
        let sent = self.bot.send_message(TgChatId(chat_id), text.to_owned()).await?;
        Ok(sent.id.0)
    }

    async fn send_menu_entry(
        &self,
        chat_id: ChatId,
        reply_to: Option<MessageId>,
        entry: &MenuEntry,
    ) -> Result<MessageId, TelegramError> {
        let mut request = self.bot.send_message(TgChatId(chat_id), entry.text.clone());
        if !entry.buttons.is_empty() {
            request = request.reply_markup(link_keyboard(entry)?);
        }
        if let Some(id) = reply_to {
            request = request.reply_parameters(ReplyParameters::new(TgMessageId(id)));
        }

        let sent = request.await?;
        Ok(sent.id.0)
    }

    async fn send_keyboard(
        &self,
        chat_id: ChatId,
        prompt: &str,
        layout: &[Vec<String>],
    ) -> Result<MessageId, TelegramError> {
        let sent = self
            .bot
            .send_message(TgChatId(chat_id), prompt.to_owned())
            .reply_markup(reply_keyboard(layout))
            .await?;
        Ok(sent.id.0)
    }

    async fn pin(&self, chat_id: ChatId, message_id: MessageId) -> Result<(), TelegramError> {
        self.bot
            .pin_chat_message(TgChatId(chat_id), TgMessageId(message_id))
            .disable_notification(true)
            .await?;
        Ok(())
    }

    async fn unpin(&self, chat_id: ChatId, message_id: MessageId) -> Result<(), TelegramError> {
        self.bot
            .unpin_chat_message(TgChatId(chat_id))
            .message_id(TgMessageId(message_id))
            .await?;
        Ok(())
    }

    async fn delete(&self, chat_id: ChatId, message_id: MessageId) -> Result<(), TelegramError> {
        self.bot
            .delete_message(TgChatId(chat_id), TgMessageId(message_id))
            .await?;
        Ok(())
    }

    async fn administrators(&self, chat_id: ChatId) -> Result<Vec<UserId>, TelegramError> {
        let members = self.bot.get_chat_administrators(TgChatId(chat_id)).await?;
        let ids: Vec<UserId> = members.into_iter().map(|m| m.user.id.0).collect();
        if ids.is_empty() {
            warn!("Chat {} reported no administrators", chat_id);
        }
        Ok(ids)
    }
}

impl std::fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBot")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Builds the inline link buttons of a menu entry.
fn link_keyboard(entry: &MenuEntry) -> Result<InlineKeyboardMarkup, TelegramError> {
    let rows = entry
        .buttons
        .iter()
        .map(|row| {
            row.iter()
                .map(|button| {
                    button
                        .parsed_url()
                        .map(|url| InlineKeyboardButton::url(button.text.clone(), url))
                        .map_err(|e| TelegramError::InvalidUrl(format!("{}: {e}", button.url)))
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(InlineKeyboardMarkup::new(rows))
}

/// Builds the persistent reply keyboard.
fn reply_keyboard(layout: &[Vec<String>]) -> KeyboardMarkup {
    let rows = layout
        .iter()
        .map(|row| row.iter().map(|label| KeyboardButton::new(label.clone())).collect::<Vec<_>>());
    KeyboardMarkup::new(rows).resize_keyboard()
}
