//! Outbound boundary between the bot logic and Telegram.

use std::future::Future;

use thiserror::Error;

use crate::config::MenuEntry;
use crate::tally::{ChatId, MessageId, UserId};

/// Errors that can occur during Telegram operations.
///
/// Every one of them is recoverable: callers log and move on.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Flood wait required: {0} seconds")]
    FloodWait(u32),

    #[error("Telegram rejected the request: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid button link: {0}")]
    InvalidUrl(String),

    #[error("Telegram request failed: {0}")]
    Other(String),
}

/// Operations the bot performs against a chat.
pub trait ChatGateway: Send + Sync + 'static {
    /// Sends plain text and returns the new message id.
    fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
    ) -> impl Future<Output = Result<MessageId, TelegramError>> + Send;

    /// Sends a menu entry's text with its link buttons, optionally as a
    /// reply, and returns the new message id.
    fn send_menu_entry(
        &self,
        chat_id: ChatId,
        reply_to: Option<MessageId>,
        entry: &MenuEntry,
    ) -> impl Future<Output = Result<MessageId, TelegramError>> + Send;

    /// Sends `prompt` together with a reply keyboard built from `layout`.
    fn send_keyboard(
        &self,
        chat_id: ChatId,
        prompt: &str,
        layout: &[Vec<String>],
    ) -> impl Future<Output = Result<MessageId, TelegramError>> + Send;

    /// Pins a message without notifying members.
    fn pin(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> impl Future<Output = Result<(), TelegramError>> + Send;

    /// Unpins one specific message.
    fn unpin(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> impl Future<Output = Result<(), TelegramError>> + Send;

    /// Deletes a message.
    fn delete(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> impl Future<Output = Result<(), TelegramError>> + Send;

    /// Lists the user ids of the chat's administrators.
    fn administrators(
        &self,
        chat_id: ChatId,
    ) -> impl Future<Output = Result<Vec<UserId>, TelegramError>> + Send;
}
