//! Telegram transport module.
//!
//! The rest of the bot talks to Telegram only through the [`ChatGateway`]
//! trait. [`TelegramBot`] implements it on the Bot API, and [`updates`]
//! turns inbound updates into domain events.

mod admins;
mod client;
mod gateway;
#[cfg(test)]
pub(crate) mod testing;
pub mod updates;

pub use admins::AdminCache;
pub use client::TelegramBot;
pub use gateway::{ChatGateway, TelegramError};
