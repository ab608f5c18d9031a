//! Inbound event routing.
//!
//! Every message is tried as a command first, then as a menu button, and
//! only then offered to the counter store.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::commands::{BotCommand, CommandContext, CommandHandler, CommandResult};
use crate::menu::MenuDispatcher;
use crate::tally::{ChatId, CounterStore, IncomingMessage, Verdict, precheck};
use crate::telegram::{AdminCache, ChatGateway};

/// What happened to an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Handled as a slash command.
    Command(BotCommand),
    /// Answered as a menu button.
    MenuButton,
    /// Offered to the counter store.
    Tallied(Verdict),
    /// A private-chat message that is neither command nor button.
    Ignored,
}

/// The bot's inbound side, independent of the transport.
pub struct App<G: ChatGateway> {
    gateway: Arc<G>,
    store: Arc<CounterStore>,
    menu: MenuDispatcher<G>,
    commands: CommandHandler,
    admins: AdminCache,
}

impl<G: ChatGateway> App<G> {
    #[must_use]
    pub fn new(
        gateway: Arc<G>,
        store: Arc<CounterStore>,
        menu: MenuDispatcher<G>,
        commands: CommandHandler,
        admins: AdminCache,
    ) -> Self {
        Self {
            gateway,
            store,
            menu,
            commands,
            admins,
        }
    }

    /// Routes one inbound message.
    pub async fn handle_message(&self, mut message: IncomingMessage) -> Outcome {
        if let Some(text) = message.text.as_deref()
            && let Some(command) = self.commands.parse(text)
        {
            self.run_command(command, &message).await;
            return Outcome::Command(command);
        }

        // Other bots may post menu labels of their own.
        let from_bot = message.sender.as_ref().is_some_and(|s| s.is_bot);
        if !from_bot && self.menu.handle_button(&message).await {
            return Outcome::MenuButton;
        }

        if !message.is_group {
            return Outcome::Ignored;
        }

        // Only messages that would otherwise count cost an admin lookup.
        let eligible = precheck(&message, self.menu.labels()).is_ok();
        if eligible && let Some(user_id) = message.sender_id() {
            message.is_admin = self.admins.is_admin(&*self.gateway, message.chat_id, user_id).await;
        }

        let verdict = self.store.observe(&message, self.menu.labels()).await;
        if let Verdict::Skipped(reason) = verdict {
            debug!("Message {} in chat {} not counted: {}", message.message_id, message.chat_id, reason);
        }
        Outcome::Tallied(verdict)
    }

    /// Answers an inline button. Returns the toast text, if the id is known.
    pub async fn handle_callback(&self, chat_id: Option<ChatId>, data: &str) -> Option<String> {
        self.menu.handle_callback(chat_id, data).await
    }

    async fn run_command(&self, command: BotCommand, message: &IncomingMessage) {
        let is_admin = match message.sender_id() {
            Some(user_id) if command.admin_only() && message.is_group => {
                self.admins.is_admin(&*self.gateway, message.chat_id, user_id).await
            }
            _ => false,
        };

        let ctx = CommandContext {
            chat_id: message.chat_id,
            is_group: message.is_group,
            is_admin,
        };
        let result = self.commands.execute(command, &ctx).await;
        self.deliver(message.chat_id, &result).await;
    }

    async fn deliver(&self, chat_id: ChatId, result: &CommandResult) {
        let sent = if result.show_keyboard {
            self.menu.send_keyboard(chat_id).await
        } else {
            self.gateway.send_text(chat_id, &result.message).await
        };

        if let Err(e) = sent {
            warn!("Failed to answer command in chat {}: {}", chat_id, e);
        }
    }
}

impl<G: ChatGateway> std::fmt::Debug for App<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("menu", &self.menu)
            .field("commands", &self.commands)
            .finish_non_exhaustive()
    }
}
