//! Menu configuration and validation.
//!
//! The reply-keyboard menu is pure data: a keyboard layout of button labels,
//! and for each label a canned text with rows of inline link buttons.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use super::{MAX_CALLBACK_DATA_BYTES, MAX_MESSAGE_LENGTH};

/// Errors that can occur while loading or validating the menu.
#[derive(Debug, Error)]
pub enum MenuError {
    #[error("No menu entries configured")]
    NoEntries,

    #[error("Menu entry at index {index} has an empty label")]
    EmptyLabel { index: usize },

    #[error("Duplicate menu label found: {label}")]
    DuplicateLabel { label: String },

    #[error("Duplicate callback id found: {callback}")]
    DuplicateCallback { callback: String },

    #[error("Menu entry '{label}' has empty text")]
    EmptyText { label: String },

    #[error("Menu entry '{label}' exceeds maximum length: {length} > {max_length}")]
    TooLong {
        label: String,
        length: usize,
        max_length: usize,
    },

    #[error("Callback id '{callback}' must be between 1 and 64 bytes")]
    CallbackTooLong { callback: String },

    #[error("Menu entry '{label}' has an invalid link '{url}': {reason}")]
    InvalidUrl {
        label: String,
        url: String,
        reason: String,
    },

    #[error("Keyboard layout is empty")]
    EmptyKeyboard,

    #[error("Keyboard button '{label}' has no matching menu entry")]
    UnknownKeyboardLabel { label: String },

    #[error("{name} must be greater than 0 seconds")]
    InvalidTtl { name: &'static str },

    #[error("Failed to read menu file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse menu file: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// An inline button that opens a link.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkButton {
    /// Button caption.
    pub text: String,

    /// Target of the button (`https://` or `tg://`).
    pub url: String,
}

impl LinkButton {
    /// Creates a new link button.
    #[must_use]
    pub fn new(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: url.into(),
        }
    }

    /// Parses the button target.
    pub fn parsed_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.url)
    }
}

/// A single canned response behind a keyboard button.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MenuEntry {
    /// Keyboard label that triggers this entry (exact match).
    pub label: String,

    /// Optional callback id for inline-button access to the same entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<String>,

    /// Reply text.
    pub text: String,

    /// Rows of link buttons attached to the reply.
    #[serde(default)]
    pub buttons: Vec<Vec<LinkButton>>,
}

impl MenuEntry {
    /// Creates a new entry without a callback id.
    #[must_use]
    pub fn new(label: impl Into<String>, text: impl Into<String>, buttons: Vec<Vec<LinkButton>>) -> Self {
        Self {
            label: label.into(),
            callback: None,
            text: text.into(),
            buttons,
        }
    }

    /// Sets the callback id.
    #[must_use]
    pub fn with_callback(mut self, callback: impl Into<String>) -> Self {
        self.callback = Some(callback.into());
        self
    }

    /// Returns the character count of the reply text.
    #[must_use]
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Returns the total number of link buttons.
    #[must_use]
    pub fn button_count(&self) -> usize {
        self.buttons.iter().map(Vec::len).sum()
    }

    /// Validates this entry on its own.
    pub fn validate(&self, index: usize) -> Result<(), MenuError> {
        if self.label.trim().is_empty() {
            return Err(MenuError::EmptyLabel { index });
        }

        if self.text.trim().is_empty() {
            return Err(MenuError::EmptyText {
                label: self.label.clone(),
            });
        }

        let length = self.char_count();
        if length > MAX_MESSAGE_LENGTH {
            return Err(MenuError::TooLong {
                label: self.label.clone(),
                length,
                max_length: MAX_MESSAGE_LENGTH,
            });
        }

        if let Some(callback) = &self.callback
            && (callback.is_empty() || callback.len() > MAX_CALLBACK_DATA_BYTES)
        {
            return Err(MenuError::CallbackTooLong {
                callback: callback.clone(),
            });
        }

        for button in self.buttons.iter().flatten() {
            check_link(&self.label, button)?;
        }

        Ok(())
    }
}

fn check_link(label: &str, button: &LinkButton) -> Result<(), MenuError> {
    let invalid = |reason: String| MenuError::InvalidUrl {
        label: label.to_owned(),
        url: button.url.clone(),
        reason,
    };

    let url = button.parsed_url().map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" | "tg" => Ok(()),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}

/// Full menu configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuConfig {
    /// Text sent together with the reply keyboard.
    #[serde(default = "default_prompt")]
    pub prompt: String,

    /// Keyboard layout, as rows of entry labels.
    pub keyboard: Vec<Vec<String>>,

    /// Canned responses.
    pub entries: Vec<MenuEntry>,

    /// Seconds before the user's button message is deleted.
    #[serde(default = "default_user_message_ttl")]
    pub user_message_ttl_secs: u64,

    /// Seconds before the bot's canned reply is deleted.
    #[serde(default = "default_reply_ttl")]
    pub reply_ttl_secs: u64,
}

fn default_prompt() -> String {
    "请选择一个选项:".to_owned()
}

const fn default_user_message_ttl() -> u64 {
    20
}

const fn default_reply_ttl() -> u64 {
    15
}

impl MenuConfig {
    /// Loads configuration from a JSON file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, MenuError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Saves configuration to a JSON file.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), MenuError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validates the whole menu.
    ///
    /// # Errors
    ///
    /// Returns the first validation error encountered.
    pub fn validate(&self) -> Result<(), MenuError> {
        if self.entries.is_empty() {
            return Err(MenuError::NoEntries);
        }

        for result in self.validate_all() {
            result?;
        }

        self.validate_layout()
    }

    /// Returns one validation result per entry, in order.
    #[must_use]
    pub fn validate_all(&self) -> Vec<Result<(), MenuError>> {
        let mut seen_labels = HashSet::new();
        let mut seen_callbacks = HashSet::new();

        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                entry.validate(index)?;

                if !seen_labels.insert(entry.label.as_str()) {
                    return Err(MenuError::DuplicateLabel {
                        label: entry.label.clone(),
                    });
                }

                if let Some(callback) = entry.callback.as_deref()
                    && !seen_callbacks.insert(callback)
                {
                    return Err(MenuError::DuplicateCallback {
                        callback: callback.to_owned(),
                    });
                }

                Ok(())
            })
            .collect()
    }

    /// Checks the keyboard layout and deletion delays.
    pub fn validate_layout(&self) -> Result<(), MenuError> {
        if self.keyboard.iter().all(Vec::is_empty) {
            return Err(MenuError::EmptyKeyboard);
        }

        for label in self.keyboard.iter().flatten() {
            if self.lookup_label(label).is_none() {
                return Err(MenuError::UnknownKeyboardLabel {
                    label: label.clone(),
                });
            }
        }

        if self.user_message_ttl_secs == 0 {
            return Err(MenuError::InvalidTtl {
                name: "user_message_ttl_secs",
            });
        }
        if self.reply_ttl_secs == 0 {
            return Err(MenuError::InvalidTtl {
                name: "reply_ttl_secs",
            });
        }

        Ok(())
    }

    /// Finds the entry for an exact keyboard label.
    #[must_use]
    pub fn lookup_label(&self, label: &str) -> Option<&MenuEntry> {
        self.entries.iter().find(|e| e.label == label)
    }

    /// Finds the entry for a callback id.
    #[must_use]
    pub fn lookup_callback(&self, callback: &str) -> Option<&MenuEntry> {
        self.entries
            .iter()
            .find(|e| e.callback.as_deref() == Some(callback))
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Creates an example menu for users to reference.
    #[must_use]
    pub fn example() -> Self {
        let link = LinkButton::new;
        Self {
            prompt: default_prompt(),
            keyboard: vec![
                vec!["查看资源".to_owned(), "吐司推荐".to_owned()],
                vec!["查看报告".to_owned(), "提交报告".to_owned()],
                vec!["抽奖活动".to_owned(), "开通会员".to_owned()],
                vec!["囡囡点此免费认证上榜".to_owned()],
            ],
            entries: vec![
                MenuEntry::new(
                    "查看资源",
                    "吐司.正在努力收录全市资源！争取将客栈仓库塞满！",
                    vec![
                        vec![
                            link("罗湖区", "https://t.me/lmkzgather/9"),
                            link("福田区", "https://t.me/lmkzgather/5"),
                            link("南山区", "https://t.me/lmkzgather/7"),
                        ],
                        vec![
                            link("龙岗区", "https://t.me/lmkzgather/13"),
                            link("宝安区", "https://t.me/szpages/2767"),
                            link("龙华区", "https://t.me/lmkzgather/15"),
                        ],
                        vec![link("抽奖活动专区", "https://t.me/lmkzgather/21")],
                        vec![link("电报注册/解禁/科学上网", "https://t.me/lmkzgather/21")],
                    ],
                )
                .with_callback("resources"),
                MenuEntry::new(
                    "吐司推荐",
                    "推荐的都是经过客栈认证的老师！",
                    vec![vec![link("吐司推荐榜单", "https://t.me/tusisz")]],
                )
                .with_callback("recommend"),
                MenuEntry::new(
                    "查看报告",
                    "虽然审核很严格，但还是要自辩真假哦！",
                    vec![vec![link("龙门报告", "https://t.me/szhyChat")]],
                )
                .with_callback("reports"),
                MenuEntry::new(
                    "提交报告",
                    "提交报告需要提供预约记录哦！",
                    vec![vec![link("提交报告", "https://t.me/lmkzgather/1/36")]],
                )
                .with_callback("submit_report"),
                MenuEntry::new(
                    "抽奖活动",
                    "万一中奖了呢！",
                    vec![vec![link("抽奖活动专区", "https://t.me/lmkzgather/21")]],
                )
                .with_callback("lottery"),
                MenuEntry::new(
                    "开通会员",
                    "可使用支付宝、微信和USDT进行支付，并在24小时内自动到账。",
                    vec![vec![link("自助开启电报会员", "https://t.me/TPGift_BOT")]],
                )
                .with_callback("premium"),
                MenuEntry::new(
                    "囡囡点此免费认证上榜",
                    "让我们一起互相成就吧！",
                    vec![vec![link("感谢你的支持", "https://t.me/lmkzgather/1/35")]],
                )
                .with_callback("verify"),
            ],
            user_message_ttl_secs: default_user_message_ttl(),
            reply_ttl_secs: default_reply_ttl(),
        }
    }
}
