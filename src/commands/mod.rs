//! Command handling module.
//!
//! Processes slash commands sent to the bot in groups and private chats.

mod handler;
mod types;

pub use handler::{CommandContext, CommandHandler};
pub use types::{BotCommand, CommandResult, MAX_TOP};
