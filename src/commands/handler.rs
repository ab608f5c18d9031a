//! Command handler implementation.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use tracing::{debug, info};

use super::types::{BotCommand, CommandResult};
use crate::tally::leaderboard::{self, Framing};
use crate::tally::{ChatId, CounterStore};

/// Where a command was sent and by whom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandContext {
    pub chat_id: ChatId,
    /// Whether the chat is a group or supergroup.
    pub is_group: bool,
    /// Whether the sender administers the chat. Only resolved for
    /// admin-only commands.
    pub is_admin: bool,
}

/// Executes bot commands against the tally store.
pub struct CommandHandler {
    /// Bot username, for `/cmd@botname` addressing.
    bot_username: String,

    /// Shared per-chat tallies.
    store: Arc<CounterStore>,

    /// Size of `/top` without an argument.
    default_top: usize,

    /// Local timezone for leaderboard timestamps.
    offset: FixedOffset,
}

impl CommandHandler {
    /// Creates a new command handler.
    #[must_use]
    pub fn new(
        bot_username: impl Into<String>,
        store: Arc<CounterStore>,
        default_top: usize,
        offset: FixedOffset,
    ) -> Self {
        Self {
            bot_username: bot_username.into(),
            store,
            default_top,
            offset,
        }
    }

    /// Parses a message text as a command addressed to this bot.
    #[must_use]
    pub fn parse(&self, message_text: &str) -> Option<BotCommand> {
        BotCommand::parse(message_text, &self.bot_username)
    }

    /// Executes a parsed command.
    pub async fn execute(&self, command: BotCommand, ctx: &CommandContext) -> CommandResult {
        debug!("Handling command {} in chat {}", command, ctx.chat_id);

        let result = match command {
            BotCommand::Start | BotCommand::Menu => CommandResult::keyboard(),
            BotCommand::Top(n) => self.handle_top(n, ctx, self.now()).await,
            BotCommand::Reset => self.handle_reset(ctx).await,
            BotCommand::Help => Self::handle_help(),
        };

        info!(
            "Command {} in chat {}: success={}",
            command, ctx.chat_id, result.success
        );
        result
    }

    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }

    async fn handle_top(
        &self,
        n: Option<usize>,
        ctx: &CommandContext,
        now: DateTime<FixedOffset>,
    ) -> CommandResult {
        if !ctx.is_group {
            return CommandResult::error("排行榜只在群组中可用。");
        }

        let top = self.store.top_n(ctx.chat_id, n.unwrap_or(self.default_top)).await;
        match leaderboard::render(&top, Framing::Current, now) {
            Some(text) => CommandResult::success(text),
            None => CommandResult::success("暂无统计"),
        }
    }

    async fn handle_reset(&self, ctx: &CommandContext) -> CommandResult {
        if !ctx.is_group {
            return CommandResult::error("该命令只在群组中可用。");
        }
        if !ctx.is_admin {
            return CommandResult::error("只有群管理员可以清零计数。");
        }

        self.store.reset_chat(ctx.chat_id).await;
        info!("Chat {} reset by an administrator", ctx.chat_id);
        CommandResult::success("✓ 本群计数已清零。")
    }

    fn handle_help() -> CommandResult {
        let mut lines = vec!["可用命令:".to_owned()];
        for (usage, description) in BotCommand::all_commands() {
            lines.push(format!("{usage} - {description}"));
        }
        CommandResult::success(lines.join("\n"))
    }
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler")
            .field("bot_username", &self.bot_username)
            .field("default_top", &self.default_top)
            .finish_non_exhaustive()
    }
}
