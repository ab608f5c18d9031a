//! Configuration module for the tally bot.
//!
//! Handles loading, validation, and management of bot configuration
//! including the menu, leaderboard timing, and Telegram credentials.

mod menu;
mod settings;

pub use menu::{LinkButton, MenuConfig, MenuEntry, MenuError};
pub use settings::{BotSettings, ConfigError, ScheduleSettings, TelegramConfig};

/// Maximum length of a Telegram text message, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 4096;

/// Maximum size of inline button callback data, in bytes.
pub const MAX_CALLBACK_DATA_BYTES: usize = 64;
