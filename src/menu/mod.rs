//! Reply-keyboard menu with canned responses.
//!
//! Pressing a keyboard button sends its label as plain text. The bot answers
//! with the configured entry, and both messages are deleted shortly after
//! so the group stays clean.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{MenuConfig, MenuEntry};
use crate::tally::{ChatId, IncomingMessage, MessageId};
use crate::telegram::{ChatGateway, TelegramError};

/// Telegram's limit on callback answer text.
const MAX_CALLBACK_ANSWER_CHARS: usize = 200;

/// Routes button presses and callback ids to canned replies.
pub struct MenuDispatcher<G: ChatGateway> {
    /// Static menu data.
    config: MenuConfig,

    /// Every keyboard label, for exact matching.
    labels: HashSet<String>,

    /// Outbound Telegram operations.
    gateway: Arc<G>,
}

impl<G: ChatGateway> MenuDispatcher<G> {
    /// Creates a dispatcher over a validated menu.
    #[must_use]
    pub fn new(config: MenuConfig, gateway: Arc<G>) -> Self {
        let labels = config.entries.iter().map(|e| e.label.clone()).collect();
        Self {
            config,
            labels,
            gateway,
        }
    }

    /// Labels that are menu buttons and therefore never tallied.
    #[must_use]
    pub fn labels(&self) -> &HashSet<String> {
        &self.labels
    }

    /// Gets a reference to the menu configuration.
    #[must_use]
    pub fn config(&self) -> &MenuConfig {
        &self.config
    }

    /// Sends the prompt with the reply keyboard.
    pub async fn send_keyboard(&self, chat_id: ChatId) -> Result<MessageId, TelegramError> {
        self.gateway
            .send_keyboard(chat_id, &self.config.prompt, &self.config.keyboard)
            .await
    }

    /// Answers a keyboard button press.
    ///
    /// Returns `false` if the message text is not a menu label.
    pub async fn handle_button(&self, message: &IncomingMessage) -> bool {
        let Some(entry) = message
            .text
            .as_deref()
            .and_then(|t| self.config.lookup_label(t))
        else {
            return false;
        };

        debug!("Menu button '{}' pressed in chat {}", entry.label, message.chat_id);
        self.delete_later(
            message.chat_id,
            message.message_id,
            Duration::from_secs(self.config.user_message_ttl_secs),
        );
        self.reply_with(message.chat_id, Some(message.message_id), entry).await;
        true
    }

    /// Answers an inline callback id by posting its entry to `chat_id`.
    ///
    /// Returns the text for the callback answer toast, or `None` if the id
    /// is unknown. Without a chat (the original message is gone) nothing is
    /// posted.
    pub async fn handle_callback(&self, chat_id: Option<ChatId>, callback: &str) -> Option<String> {
        let Some(entry) = self.config.lookup_callback(callback) else {
            debug!("Unknown menu callback '{}'", callback);
            return None;
        };

        if let Some(chat_id) = chat_id {
            self.reply_with(chat_id, None, entry).await;
        }
        Some(entry.text.chars().take(MAX_CALLBACK_ANSWER_CHARS).collect())
    }

    async fn reply_with(&self, chat_id: ChatId, reply_to: Option<MessageId>, entry: &MenuEntry) {
        match self.gateway.send_menu_entry(chat_id, reply_to, entry).await {
            Ok(message_id) => {
                self.delete_later(
                    chat_id,
                    message_id,
                    Duration::from_secs(self.config.reply_ttl_secs),
                );
            }
            Err(e) => warn!("Failed to answer menu button '{}' in chat {}: {}", entry.label, chat_id, e),
        }
    }

    /// Deletes a message after `delay` on a background task.
    fn delete_later(&self, chat_id: ChatId, message_id: MessageId, delay: Duration) {
        let gateway = Arc::clone(&self.gateway);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match gateway.delete(chat_id, message_id).await {
                Ok(()) => info!("Deleted menu message {} in chat {}", message_id, chat_id),
                Err(e) => warn!("Failed to delete message {} in chat {}: {}", message_id, chat_id, e),
            }
        });
    }
}

impl<G: ChatGateway> std::fmt::Debug for MenuDispatcher<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MenuDispatcher")
            .field("entries", &self.config.len())
            .finish_non_exhaustive()
    }
}
