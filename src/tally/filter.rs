//! Eligibility rules and repeat suppression.
//!
//! A message counts only if it passes every rule, checked in order:
//! 1. it has a sender (channel posts and service messages are dropped)
//! 2. the sender is neither a bot nor a chat administrator
//! 3. the text is not a menu button label
//! 4. it carries no sticker or animation
//! 5. it has text
//! 6. the text has not been seen in this chat since the last reset
//!
//! Rules 1-5 are stateless and live in [`precheck`]. Rule 6 needs the
//! chat's [`RecentTextLog`] and is applied by the counter store under its
//! lock, together with the increment.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use super::{IncomingMessage, Sender};

/// Why a message was not counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoSender,
    Bot,
    Admin,
    MenuButton,
    Media,
    NoText,
    Duplicate,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoSender => "no sender",
            Self::Bot => "bot account",
            Self::Admin => "chat administrator",
            Self::MenuButton => "menu button",
            Self::Media => "sticker or animation",
            Self::NoText => "no text",
            Self::Duplicate => "repeated text",
        };
        f.write_str(s)
    }
}

/// Outcome of offering a message to the counter store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The message was counted; holds the sender's new tally.
    Counted(u64),
    /// The message was ignored.
    Skipped(SkipReason),
}

impl Verdict {
    /// Whether the message was counted.
    #[must_use]
    pub const fn is_counted(self) -> bool {
        matches!(self, Self::Counted(_))
    }
}

/// Applies the stateless eligibility rules.
///
/// On success returns the sender and the text to check for repeats.
pub fn precheck<'a>(
    message: &'a IncomingMessage,
    menu_labels: &HashSet<String>,
) -> Result<(&'a Sender, &'a str), SkipReason> {
    let sender = message.sender.as_ref().ok_or(SkipReason::NoSender)?;

    if sender.is_bot {
        return Err(SkipReason::Bot);
    }
    if message.is_admin {
        return Err(SkipReason::Admin);
    }

    let text = message.text.as_deref();

    if text.is_some_and(|t| menu_labels.contains(t)) {
        return Err(SkipReason::MenuButton);
    }
    if message.has_sticker || message.has_animation {
        return Err(SkipReason::Media);
    }

    match text {
        Some(t) if !t.is_empty() => Ok((sender, t)),
        _ => Err(SkipReason::NoText),
    }
}

/// Texts already seen in one chat during the current accumulation period.
///
/// Bounded: once `capacity` texts are remembered, the oldest is forgotten
/// to make room.
#[derive(Debug, Clone)]
pub struct RecentTextLog {
    order: VecDeque<String>,
    seen: HashSet<String>,
    capacity: usize,
}

impl RecentTextLog {
    /// Creates an empty log holding at most `capacity` texts.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::new(),
            seen: HashSet::new(),
            capacity: capacity.max(1),
        }
    }

    /// Records `text`. Returns `false` if it was already present.
    pub fn remember(&mut self, text: &str) -> bool {
        if self.seen.contains(text) {
            return false;
        }

        if self.order.len() >= self.capacity
            && let Some(oldest) = self.order.pop_front()
        {
            self.seen.remove(&oldest);
        }

        self.order.push_back(text.to_owned());
        self.seen.insert(text.to_owned());
        true
    }

    /// Whether `text` has been seen.
    #[must_use]
    pub fn contains(&self, text: &str) -> bool {
        self.seen.contains(text)
    }

    /// Forgets every text.
    pub fn clear(&mut self) {
        self.order.clear();
        self.seen.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
