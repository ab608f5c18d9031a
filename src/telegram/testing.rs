//! In-memory gateway for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

use super::{ChatGateway, TelegramError};
use crate::config::MenuEntry;
use crate::tally::{ChatId, MessageId, UserId};

/// A successful gateway operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SendText { chat_id: ChatId, message_id: MessageId, text: String },
    SendMenu { chat_id: ChatId, reply_to: Option<MessageId>, label: String },
    SendKeyboard { chat_id: ChatId, prompt: String },
    Pin { chat_id: ChatId, message_id: MessageId },
    Unpin { chat_id: ChatId, message_id: MessageId },
    Delete { chat_id: ChatId, message_id: MessageId },
}

/// Records every successful call; failures are configured per operation.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<Call>>,
    next_id: AtomicI32,
    admin_lookups: AtomicUsize,
    failed_sends: AtomicUsize,
    admins: HashMap<ChatId, Vec<UserId>>,
    fail_sends_to: HashSet<ChatId>,
    fail_pins: bool,
    fail_admin_lookups: bool,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI32::new(1000),
            ..Self::default()
        }
    }

    pub fn with_admins(mut self, chat_id: ChatId, ids: Vec<UserId>) -> Self {
        self.admins.insert(chat_id, ids);
        self
    }

    pub fn failing_sends_to(mut self, chat_id: ChatId) -> Self {
        self.fail_sends_to.insert(chat_id);
        self
    }

    pub fn failing_pins(mut self) -> Self {
        self.fail_pins = true;
        self
    }

    pub fn failing_admin_lookups(mut self) -> Self {
        self.fail_admin_lookups = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sent_texts(&self) -> Vec<(ChatId, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::SendText { chat_id, text, .. } => Some((chat_id, text)),
                _ => None,
            })
            .collect()
    }

    pub fn pins(&self) -> Vec<(ChatId, MessageId)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Pin { chat_id, message_id } => Some((chat_id, message_id)),
                _ => None,
            })
            .collect()
    }

    pub fn unpins(&self) -> Vec<(ChatId, MessageId)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Unpin { chat_id, message_id } => Some((chat_id, message_id)),
                _ => None,
            })
            .collect()
    }

    pub fn deletes(&self) -> Vec<(ChatId, MessageId)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete { chat_id, message_id } => Some((chat_id, message_id)),
                _ => None,
            })
            .collect()
    }

    pub fn admin_lookups(&self) -> usize {
        self.admin_lookups.load(Ordering::SeqCst)
    }

    pub fn failed_sends(&self) -> usize {
        self.failed_sends.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_message_id(&self) -> MessageId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn check_send(&self, chat_id: ChatId) -> Result<(), TelegramError> {
        if self.fail_sends_to.contains(&chat_id) {
            self.failed_sends.fetch_add(1, Ordering::SeqCst);
            return Err(TelegramError::Network("connection reset".to_owned()));
        }
        Ok(())
    }
}

impl ChatGateway for RecordingGateway {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageId, TelegramError> {
        self.check_send(chat_id)?;
        let message_id = self.next_message_id();
        self.record(Call::SendText {
            chat_id,
            message_id,
            text: text.to_owned(),
        });
        Ok(message_id)
    }

    async fn send_menu_entry(
        &self,
        chat_id: ChatId,
        reply_to: Option<MessageId>,
        entry: &MenuEntry,
    ) -> Result<MessageId, TelegramError> {
        self.check_send(chat_id)?;
        self.record(Call::SendMenu {
            chat_id,
            reply_to,
            label: entry.label.clone(),
        });
        Ok(self.next_message_id())
    }

    async fn send_keyboard(
        &self,
        chat_id: ChatId,
        prompt: &str,
        _layout: &[Vec<String>],
    ) -> Result<MessageId, TelegramError> {
        self.check_send(chat_id)?;
        self.record(Call::SendKeyboard {
            chat_id,
            prompt: prompt.to_owned(),
        });
        Ok(self.next_message_id())
    }

    async fn pin(&self, chat_id: ChatId, message_id: MessageId) -> Result<(), TelegramError> {
        if self.fail_pins {
            return Err(TelegramError::Api("not enough rights to pin a message".to_owned()));
        }
        self.record(Call::Pin { chat_id, message_id });
        Ok(())
    }

    async fn unpin(&self, chat_id: ChatId, message_id: MessageId) -> Result<(), TelegramError> {
        self.record(Call::Unpin { chat_id, message_id });
        Ok(())
    }

    async fn delete(&self, chat_id: ChatId, message_id: MessageId) -> Result<(), TelegramError> {
        self.record(Call::Delete { chat_id, message_id });
        Ok(())
    }

    async fn administrators(&self, chat_id: ChatId) -> Result<Vec<UserId>, TelegramError> {
        self.admin_lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_admin_lookups {
            return Err(TelegramError::FloodWait(5));
        }
        Ok(self.admins.get(&chat_id).cloned().unwrap_or_default())
    }
}
