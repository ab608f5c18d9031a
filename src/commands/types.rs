//! Command types and definitions.

use std::fmt;

/// Largest leaderboard `/top` will render.
pub const MAX_TOP: usize = 50;

/// Available bot commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    /// Send the menu keyboard.
    Start,

    /// Send the menu keyboard again.
    Menu,

    /// Show the current leaderboard, optionally with a custom size.
    Top(Option<usize>),

    /// Clear this chat's counters (admins only).
    Reset,

    /// Show help information.
    Help,
}

impl BotCommand {
    /// Parses a command from a message text.
    ///
    /// Accepts `/cmd`, `/cmd@botname` and trailing arguments. A command
    /// addressed to a different bot is ignored. Returns `None` if the
    /// message is not a known command.
    #[must_use]
    pub fn parse(text: &str, bot_username: &str) -> Option<Self> {
        let rest = text.trim().strip_prefix('/')?;

        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (rest, ""),
        };

        let cmd = match head.split_once('@') {
            Some((cmd, target)) => {
                if !target.eq_ignore_ascii_case(bot_username) {
                    return None;
                }
                cmd
            }
            None => head,
        };

        match cmd.to_lowercase().as_str() {
            "start" => Some(Self::Start),
            "menu" | "keyboard" => Some(Self::Menu),
            "top" | "rank" | "leaderboard" => Some(Self::Top(Self::parse_size(args))),
            "reset" | "clear" => Some(Self::Reset),
            "help" | "h" => Some(Self::Help),
            _ => None,
        }
    }

    /// Parses the optional `/top` size, clamped to `1..=MAX_TOP`.
    fn parse_size(args: &str) -> Option<usize> {
        let n: usize = args.split_whitespace().next()?.parse().ok()?;
        Some(n.clamp(1, MAX_TOP))
    }

    /// Returns the command name as it appears in help.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Menu => "menu",
            Self::Top(_) => "top",
            Self::Reset => "reset",
            Self::Help => "help",
        }
    }

    /// Whether only chat administrators may run the command.
    #[must_use]
    pub const fn admin_only(&self) -> bool {
        matches!(self, Self::Reset)
    }

    /// Returns all available commands with their descriptions.
    #[must_use]
    pub fn all_commands() -> Vec<(&'static str, &'static str)> {
        vec![
            ("/start", "显示菜单"),
            ("/menu", "重新显示菜单键盘"),
            ("/top [n]", "查看今日活跃排行榜 (n 为 1-50)"),
            ("/reset", "清零本群计数 (仅管理员)"),
            ("/help", "显示本帮助"),
        ]
    }
}

impl fmt::Display for BotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Top(Some(n)) => write!(f, "top {n}"),
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// Result of command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Whether the command was successful.
    pub success: bool,

    /// Response message to show the user.
    pub message: String,

    /// Whether to answer with the menu keyboard instead of `message`.
    pub show_keyboard: bool,
}

impl CommandResult {
    /// Creates a successful result.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            show_keyboard: false,
        }
    }

    /// Creates a result answered by the menu keyboard.
    #[must_use]
    pub fn keyboard() -> Self {
        Self {
            success: true,
            message: String::new(),
            show_keyboard: true,
        }
    }

    /// Creates an error result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            show_keyboard: false,
        }
    }
}
