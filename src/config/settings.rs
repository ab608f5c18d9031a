//! Application settings, schedule settings and Telegram configuration.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{FixedOffset, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Telegram Bot API configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token issued by `@BotFather`.
    pub bot_token: String,
}

impl TelegramConfig {
    /// Creates a new Telegram configuration.
    #[must_use]
    pub const fn new(bot_token: String) -> Self {
        Self { bot_token }
    }

    /// Creates configuration from environment variables.
    ///
    /// Reads `TG_BOT_TOKEN`, falling back to `TOKEN`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = std::env::var("TG_BOT_TOKEN")
            .or_else(|_| std::env::var("TOKEN"))
            .map_err(|_| ConfigError::MissingEnvVar("TG_BOT_TOKEN"))?;

        if bot_token.trim().is_empty() {
            return Err(ConfigError::MissingEnvVar("TG_BOT_TOKEN"));
        }

        Ok(Self::new(bot_token))
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .finish()
    }
}

/// Bot-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSettings {
    /// Path to the menu JSON file.
    #[serde(default = "default_menu_path")]
    pub menu_path: PathBuf,

    /// Maximum number of remembered texts per chat for repeat suppression.
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: usize,

    /// How long a chat's administrator list stays cached, in seconds.
    #[serde(default = "default_admin_cache_secs")]
    pub admin_cache_secs: u64,

    /// Log level for the application.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_menu_path() -> PathBuf {
    PathBuf::from("menu.json")
}

const fn default_dedup_capacity() -> usize {
    10_000
}

const fn default_admin_cache_secs() -> u64 {
    600
}

fn default_log_level() -> String {
    "info".to_owned()
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            menu_path: default_menu_path(),
            dedup_capacity: default_dedup_capacity(),
            admin_cache_secs: default_admin_cache_secs(),
            log_level: default_log_level(),
        }
    }
}

impl BotSettings {
    /// Creates bot settings from environment variables with defaults.
    #[must_use]
    pub fn from_env_with_defaults() -> Self {
        Self {
            menu_path: std::env::var("MENU_PATH").map_or_else(|_| default_menu_path(), PathBuf::from),
            dedup_capacity: env_parse("DEDUP_CAPACITY").unwrap_or_else(default_dedup_capacity),
            admin_cache_secs: env_parse("ADMIN_CACHE_SECS")
                .unwrap_or_else(default_admin_cache_secs),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| default_log_level()),
        }
    }

    /// Returns the administrator cache lifetime.
    #[must_use]
    pub const fn admin_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.admin_cache_secs)
    }
}

/// Timing of the leaderboard broadcasts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleSettings {
    /// Offset of the local timezone from UTC, in whole hours.
    pub utc_offset_hours: i32,

    /// First local hour (inclusive) of the hourly broadcast window.
    pub active_start_hour: u32,

    /// Last local hour (inclusive) of the hourly broadcast window.
    pub active_end_hour: u32,

    /// Local time of the end-of-day finalize.
    pub finalize_at: NaiveTime,

    /// Number of entries on a leaderboard.
    pub top_n: usize,

    /// Polling period of the scheduler, in seconds.
    pub tick_secs: u64,

    /// Whether the final leaderboard gets pinned.
    pub pin_final: bool,

    /// Delay before a pinned leaderboard is unpinned, in seconds.
    pub unpin_after_secs: u64,

    /// Whether counters are cleared again at local midnight.
    pub midnight_reset: bool,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            utc_offset_hours: 8,
            active_start_hour: 11,
            active_end_hour: 23,
            finalize_at: NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN),
            top_n: 10,
            tick_secs: 60,
            pin_final: true,
            unpin_after_secs: 24 * 3600,
            midnight_reset: true,
        }
    }
}

impl ScheduleSettings {
    /// Creates schedule settings from environment variables with defaults.
    ///
    /// Unparseable values fall back to the default; range checks are left
    /// to [`ScheduleSettings::validate`].
    #[must_use]
    pub fn from_env_with_defaults() -> Self {
        let defaults = Self::default();
        Self {
            utc_offset_hours: env_parse("TZ_OFFSET_HOURS").unwrap_or(defaults.utc_offset_hours),
            active_start_hour: env_parse("ACTIVE_START_HOUR").unwrap_or(defaults.active_start_hour),
            active_end_hour: env_parse("ACTIVE_END_HOUR").unwrap_or(defaults.active_end_hour),
            finalize_at: std::env::var("FINALIZE_AT")
                .ok()
                .and_then(|s| parse_clock_time(&s))
                .unwrap_or(defaults.finalize_at),
            top_n: env_parse("LEADERBOARD_SIZE").unwrap_or(defaults.top_n),
            tick_secs: env_parse("TICK_SECS").unwrap_or(defaults.tick_secs),
            pin_final: env_flag("PIN_FINAL").unwrap_or(defaults.pin_final),
            unpin_after_secs: env_parse("UNPIN_AFTER_SECS").unwrap_or(defaults.unpin_after_secs),
            midnight_reset: env_flag("MIDNIGHT_RESET").unwrap_or(defaults.midnight_reset),
        }
    }

    /// Checks that every value is within range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.offset().is_none() {
            return Err(ConfigError::InvalidValue {
                name: "TZ_OFFSET_HOURS",
                reason: format!("{} is outside -12..=14", self.utc_offset_hours),
            });
        }
        if self.active_start_hour > 23 || self.active_end_hour > 23 {
            return Err(ConfigError::InvalidValue {
                name: "ACTIVE_START_HOUR/ACTIVE_END_HOUR",
                reason: "hours must be within 0..=23".to_owned(),
            });
        }
        if self.active_start_hour > self.active_end_hour {
            return Err(ConfigError::InvalidValue {
                name: "ACTIVE_START_HOUR/ACTIVE_END_HOUR",
                reason: format!(
                    "window {}..={} is empty",
                    self.active_start_hour, self.active_end_hour
                ),
            });
        }
        if self.top_n == 0 {
            return Err(ConfigError::InvalidValue {
                name: "LEADERBOARD_SIZE",
                reason: "must be greater than 0".to_owned(),
            });
        }
        if self.tick_secs == 0 || self.tick_secs > 3600 {
            return Err(ConfigError::InvalidValue {
                name: "TICK_SECS",
                reason: "must be within 1..=3600".to_owned(),
            });
        }
        Ok(())
    }

    /// Returns the local timezone, or `None` for an out-of-range offset.
    #[must_use]
    pub fn offset(&self) -> Option<FixedOffset> {
        if !(-12..=14).contains(&self.utc_offset_hours) {
            return None;
        }
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
    }

    /// Whether the given local hour lies in the hourly broadcast window.
    #[must_use]
    pub const fn is_active_hour(&self, hour: u32) -> bool {
        hour >= self.active_start_hour && hour <= self.active_end_hour
    }

    /// Returns the scheduler polling period.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }

    /// Returns the delay between pinning and unpinning the final board.
    #[must_use]
    pub const fn unpin_after(&self) -> Duration {
        Duration::from_secs(self.unpin_after_secs)
    }

    /// Formats the finalize time as `HH:MM`.
    #[must_use]
    pub fn finalize_label(&self) -> String {
        format!("{:02}:{:02}", self.finalize_at.hour(), self.finalize_at.minute())
    }
}

/// Parses `HH:MM` or `HH:MM:SS`.
fn parse_clock_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|s| parse_flag(&s))
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}
