//! In-memory per-chat tallies.

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;
use tracing::debug;

use super::filter::{RecentTextLog, SkipReason, Verdict, precheck};
use super::{ChatId, IncomingMessage, Sender, UserId};

/// One user's message count in one chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserTally {
    pub user_id: UserId,
    pub display_name: String,
    pub username: Option<String>,
    pub count: u64,
}

/// Tallies and dedup memory of a single chat.
///
/// Both are cleared together; they share one accumulation period.
#[derive(Debug)]
struct ChatTallies {
    /// Entries in first-seen order.
    entries: Vec<UserTally>,
    /// User id to position in `entries`.
    index: HashMap<UserId, usize>,
    recent: RecentTextLog,
}

impl ChatTallies {
    fn new(dedup_capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            recent: RecentTextLog::new(dedup_capacity),
        }
    }

    fn increment(&mut self, sender: &Sender) -> u64 {
        let pos = match self.index.get(&sender.id) {
            Some(&pos) => pos,
            None => {
                self.entries.push(UserTally {
                    user_id: sender.id,
                    display_name: String::new(),
                    username: None,
                    count: 0,
                });
                let pos = self.entries.len() - 1;
                self.index.insert(sender.id, pos);
                pos
            }
        };

        let entry = &mut self.entries[pos];
        // Names change; show the latest one.
        entry.display_name.clone_from(&sender.display_name);
        entry.username.clone_from(&sender.username);
        entry.count += 1;
        entry.count
    }

    fn top_n(&self, n: usize) -> Vec<UserTally> {
        let mut ranked: Vec<&UserTally> = self.entries.iter().collect();
        // Stable sort keeps first-seen order among equal counts.
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked.into_iter().take(n).cloned().collect()
    }

    /// Clears tallies and dedup memory. Returns whether anything was counted.
    fn clear(&mut self) -> bool {
        let had_entries = !self.entries.is_empty();
        self.entries.clear();
        self.index.clear();
        self.recent.clear();
        had_entries
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared store of message tallies for every tracked chat.
///
/// A single lock guards all chats; contention is low and every critical
/// section is short. No method holds the lock across an `.await` on I/O.
#[derive(Debug)]
pub struct CounterStore {
    chats: RwLock<HashMap<ChatId, ChatTallies>>,
    dedup_capacity: usize,
}

impl CounterStore {
    /// Creates an empty store. Each chat remembers up to `dedup_capacity`
    /// texts for repeat suppression.
    #[must_use]
    pub fn new(dedup_capacity: usize) -> Self {
        Self {
            chats: RwLock::new(HashMap::new()),
            dedup_capacity,
        }
    }

    /// Runs the eligibility rules on `message` and counts it if it passes.
    ///
    /// The repeat check, the text log append and the increment happen in
    /// one critical section.
    pub async fn observe(&self, message: &IncomingMessage, menu_labels: &HashSet<String>) -> Verdict {
        let (sender, text) = match precheck(message, menu_labels) {
            Ok(found) => found,
            Err(reason) => return Verdict::Skipped(reason),
        };

        let mut chats = self.chats.write().await;
        let chat = chats
            .entry(message.chat_id)
            .or_insert_with(|| ChatTallies::new(self.dedup_capacity));

        if !chat.recent.remember(text) {
            return Verdict::Skipped(SkipReason::Duplicate);
        }

        let count = chat.increment(sender);
        debug!(
            "Counted message from {} in chat {} (now {})",
            sender.id, message.chat_id, count
        );
        Verdict::Counted(count)
    }

    /// Adds one to the sender's tally in `chat_id`, creating it at zero
    /// first if needed. Returns the new count.
    pub async fn increment(&self, chat_id: ChatId, sender: &Sender) -> u64 {
        let mut chats = self.chats.write().await;
        chats
            .entry(chat_id)
            .or_insert_with(|| ChatTallies::new(self.dedup_capacity))
            .increment(sender)
    }

    /// Returns the `n` highest tallies of a chat, highest first.
    ///
    /// Equal counts keep first-seen order.
    pub async fn top_n(&self, chat_id: ChatId, n: usize) -> Vec<UserTally> {
        let chats = self.chats.read().await;
        chats.get(&chat_id).map(|c| c.top_n(n)).unwrap_or_default()
    }

    /// Returns the top `n` and resets the chat in one critical section.
    pub async fn drain_top_n(&self, chat_id: ChatId, n: usize) -> Vec<UserTally> {
        let mut chats = self.chats.write().await;
        let Some(chat) = chats.get_mut(&chat_id) else {
            return Vec::new();
        };
        let top = chat.top_n(n);
        chat.clear();
        top
    }

    /// Empties a chat's tallies and its dedup memory together.
    ///
    /// The chat stays tracked. Unknown chats are left alone.
    pub async fn reset_chat(&self, chat_id: ChatId) {
        let mut chats = self.chats.write().await;
        if let Some(chat) = chats.get_mut(&chat_id)
            && chat.clear()
        {
            debug!("Reset tallies for chat {}", chat_id);
        }
    }

    /// Resets every tracked chat. Returns how many chats had tallies.
    pub async fn reset_all(&self) -> usize {
        let mut chats = self.chats.write().await;
        chats.values_mut().map(ChatTallies::clear).filter(|&had| had).count()
    }

    /// Chats with at least one counted message.
    pub async fn active_chats(&self) -> Vec<ChatId> {
        let chats = self.chats.read().await;
        let mut ids: Vec<ChatId> = chats
            .iter()
            .filter(|(_, c)| !c.is_empty())
            .map(|(&id, _)| id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Every chat seen so far, including chats reset to empty.
    pub async fn tracked_chats(&self) -> Vec<ChatId> {
        let chats = self.chats.read().await;
        let mut ids: Vec<ChatId> = chats.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns one user's tally in a chat, zero if absent.
    pub async fn count_of(&self, chat_id: ChatId, user_id: UserId) -> u64 {
        let chats = self.chats.read().await;
        chats
            .get(&chat_id)
            .and_then(|c| c.index.get(&user_id).map(|&pos| c.entries[pos].count))
            .unwrap_or(0)
    }
}

impl Default for CounterStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    const CHAT: ChatId = -1001;

    fn user(id: UserId, name: &str) -> Sender {
        Sender::new(id, name, Some(name))
    }

    fn no_labels() -> HashSet<String> {
        HashSet::new()
    }

    #[tokio::test]
    async fn test_tally_equals_increments_since_last_reset() {
        let store = CounterStore::default();
        let a = user(1, "a");

        for _ in 0..4 {
            store.increment(CHAT, &a).await;
        }
        store.reset_chat(CHAT).await;
        for _ in 0..3 {
            store.increment(CHAT, &a).await;
        }

        assert_eq!(store.count_of(CHAT, 1).await, 3);
    }

    #[tokio::test]
    async fn test_top_n_orders_by_count_then_first_seen() {
        let store = CounterStore::default();
        let (a, b, c) = (user(1, "a"), user(2, "b"), user(3, "c"));

        for _ in 0..3 {
            store.increment(CHAT, &b).await;
        }
        for _ in 0..5 {
            store.increment(CHAT, &a).await;
        }
        for _ in 0..3 {
            store.increment(CHAT, &c).await;
        }

        let top = store.top_n(CHAT, 2).await;
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].user_id, 1);
        assert_eq!(top[0].count, 5);
        // b was seen before c, so it wins the tie.
        assert_eq!(top[1].user_id, 2);

        // Deterministic for identical state.
        assert_eq!(store.top_n(CHAT, 2).await, top);
    }

    #[tokio::test]
    async fn test_top_n_of_unknown_chat_is_empty() {
        let store = CounterStore::default();
        assert!(store.top_n(42, 10).await.is_empty());
    }

    #[tokio::test]
    async fn test_reset_of_unknown_chat_is_noop() {
        let store = CounterStore::default();
        store.reset_chat(CHAT).await;
        store.reset_chat(CHAT).await;
        assert!(store.tracked_chats().await.is_empty());
        assert_eq!(store.reset_all().await, 0);
    }

    #[tokio::test]
    async fn test_repeat_text_counts_once_until_reset() {
        let store = CounterStore::default();
        let msg = IncomingMessage::text(CHAT, 1, user(1, "a"), "hello");

        assert_eq!(store.observe(&msg, &no_labels()).await, Verdict::Counted(1));
        assert_eq!(
            store.observe(&msg, &no_labels()).await,
            Verdict::Skipped(SkipReason::Duplicate)
        );
        assert_eq!(store.count_of(CHAT, 1).await, 1);

        store.reset_chat(CHAT).await;
        assert_eq!(store.observe(&msg, &no_labels()).await, Verdict::Counted(1));
    }

    #[tokio::test]
    async fn test_repeat_text_is_per_chat_not_per_user() {
        let store = CounterStore::default();
        let first = IncomingMessage::text(CHAT, 1, user(1, "a"), "same");
        let second = IncomingMessage::text(CHAT, 2, user(2, "b"), "same");
        let elsewhere = IncomingMessage::text(CHAT + 1, 3, user(2, "b"), "same");

        assert!(store.observe(&first, &no_labels()).await.is_counted());
        assert_eq!(
            store.observe(&second, &no_labels()).await,
            Verdict::Skipped(SkipReason::Duplicate)
        );
        assert!(store.observe(&elsewhere, &no_labels()).await.is_counted());
    }

    #[tokio::test]
    async fn test_admin_messages_never_count() {
        let store = CounterStore::default();
        for i in 0..5 {
            let msg = IncomingMessage::text(CHAT, i, user(1, "a"), format!("msg {i}")).from_admin();
            assert_eq!(
                store.observe(&msg, &no_labels()).await,
                Verdict::Skipped(SkipReason::Admin)
            );
        }
        assert_eq!(store.count_of(CHAT, 1).await, 0);
        assert!(store.active_chats().await.is_empty());
    }

    #[tokio::test]
    async fn test_drain_returns_snapshot_and_resets() {
        let store = CounterStore::default();
        let a = user(1, "a");
        store.increment(CHAT, &a).await;
        store.increment(CHAT, &a).await;
        let msg = IncomingMessage::text(CHAT, 9, a.clone(), "once");
        assert!(store.observe(&msg, &no_labels()).await.is_counted());

        let top = store.drain_top_n(CHAT, 10).await;
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].count, 3);

        assert!(store.top_n(CHAT, 10).await.is_empty());
        assert!(store.active_chats().await.is_empty());
        assert_eq!(store.tracked_chats().await, vec![CHAT]);
        // Dedup memory went with the counts.
        assert!(store.observe(&msg, &no_labels()).await.is_counted());
    }

    #[tokio::test]
    async fn test_latest_display_name_wins() {
        let store = CounterStore::default();
        store.increment(CHAT, &Sender::new(1, "Old", None)).await;
        store.increment(CHAT, &Sender::new(1, "New", Some("new"))).await;

        let top = store.top_n(CHAT, 1).await;
        assert_eq!(top[0].display_name, "New");
        assert_eq!(top[0].username.as_deref(), Some("new"));
        assert_eq!(top[0].count, 2);
    }

    #[tokio::test]
    async fn test_reset_all_counts_active_chats() {
        let store = CounterStore::default();
        store.increment(1, &user(1, "a")).await;
        store.increment(2, &user(1, "a")).await;
        store.increment(3, &user(1, "a")).await;
        store.reset_chat(3).await;

        assert_eq!(store.active_chats().await, vec![1, 2]);
        assert_eq!(store.reset_all().await, 2);
        assert_eq!(store.reset_all().await, 0);
        assert_eq!(store.tracked_chats().await.len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_to_one_chat_are_not_lost() {
        const TASKS: u64 = 8;
        const PER_TASK: u64 = 50;

        let store = Arc::new(CounterStore::new(10_000));
        let mut handles = Vec::new();
        for task in 0..TASKS {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let labels = HashSet::new();
                let mut shared_counted = 0;
                for i in 0..PER_TASK {
                    store.increment(CHAT, &user(1, "a")).await;

                    let own = IncomingMessage::text(CHAT, 0, user(2, "b"), format!("task {task} line {i}"));
                    assert!(store.observe(&own, &labels).await.is_counted());

                    let shared = IncomingMessage::text(CHAT, 0, user(3, "c"), "same for everyone");
                    if store.observe(&shared, &labels).await.is_counted() {
                        shared_counted += 1;
                    }
                }
                shared_counted
            }));
        }

        let mut shared_total = 0;
        for handle in handles {
            shared_total += handle.await.unwrap();
        }

        assert_eq!(store.count_of(CHAT, 1).await, TASKS * PER_TASK);
        assert_eq!(store.count_of(CHAT, 2).await, TASKS * PER_TASK);
        assert_eq!(shared_total, 1);
        assert_eq!(store.count_of(CHAT, 3).await, 1);

        let chats = store.chats.read().await;
        let log = &chats[&CHAT].recent;
        assert_eq!(log.len(), usize::try_from(TASKS * PER_TASK + 1).unwrap());
        assert!(log.contains("same for everyone"));
        for task in 0..TASKS {
            for i in 0..PER_TASK {
                assert!(log.contains(&format!("task {task} line {i}")));
            }
        }
    }
}
