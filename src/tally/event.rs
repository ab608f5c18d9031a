//! Transport-independent view of an inbound chat message.

/// Telegram chat identifier.
pub type ChatId = i64;

/// Telegram user identifier.
pub type UserId = u64;

/// Telegram message identifier, unique within a chat.
pub type MessageId = i32;

/// Author of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: UserId,
    pub display_name: String,
    pub username: Option<String>,
    pub is_bot: bool,
}

impl Sender {
    /// Creates a human sender.
    #[must_use]
    pub fn new(id: UserId, display_name: impl Into<String>, username: Option<&str>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            username: username.map(str::to_owned),
            is_bot: false,
        }
    }

    /// Marks the sender as a bot account.
    #[must_use]
    pub const fn bot(mut self) -> Self {
        self.is_bot = true;
        self
    }
}

/// A single inbound message, reduced to the fields the bot cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    /// `None` for channel posts and other messages without a user.
    pub sender: Option<Sender>,
    pub text: Option<String>,
    pub has_sticker: bool,
    pub has_animation: bool,
    /// Whether the sender administers this chat.
    pub is_admin: bool,
    /// Whether the chat is a group or supergroup.
    pub is_group: bool,
}

impl IncomingMessage {
    /// Creates a plain text message in a group chat.
    #[must_use]
    pub fn text(chat_id: ChatId, message_id: MessageId, sender: Sender, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            message_id,
            sender: Some(sender),
            text: Some(text.into()),
            has_sticker: false,
            has_animation: false,
            is_admin: false,
            is_group: true,
        }
    }

    /// Marks the sender as a chat administrator.
    #[must_use]
    pub const fn from_admin(mut self) -> Self {
        self.is_admin = true;
        self
    }

    /// Returns the sender's user id, if any.
    #[must_use]
    pub fn sender_id(&self) -> Option<UserId> {
        self.sender.as_ref().map(|s| s.id)
    }
}
