//! Cached chat administrator lists.
//!
//! Administrators are never tallied, so every group message needs an admin
//! check. Asking Telegram each time would trip flood limits; lists are kept
//! for a fixed time instead.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::ChatGateway;
use crate::tally::{ChatId, UserId};

#[derive(Debug)]
struct CachedAdmins {
    fetched_at: Instant,
    ids: HashSet<UserId>,
}

/// Per-chat administrator cache with a fixed time-to-live.
#[derive(Debug)]
pub struct AdminCache {
    /// How long a fetched list stays valid.
    ttl: Duration,

    /// Lists by chat.
    entries: Mutex<HashMap<ChatId, CachedAdmins>>,
}

impl AdminCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a cache from seconds.
    #[must_use]
    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    /// Checks whether `user_id` administers `chat_id`.
    ///
    /// Uses the cached list while it is fresh and refetches it otherwise.
    /// If the lookup fails the user is treated as a regular member.
    pub async fn is_admin<G: ChatGateway>(&self, gateway: &G, chat_id: ChatId, user_id: UserId) -> bool {
        if let Some(hit) = self.cached(chat_id, user_id).await {
            return hit;
        }

        // Fetch without holding the lock.
        match gateway.administrators(chat_id).await {
            Ok(ids) => {
                let ids: HashSet<UserId> = ids.into_iter().collect();
                let is_admin = ids.contains(&user_id);
                debug!("Cached {} administrators for chat {}", ids.len(), chat_id);
                self.store(chat_id, ids).await;
                is_admin
            }
            Err(e) => {
                warn!("Failed to fetch administrators of chat {}: {}", chat_id, e);
                false
            }
        }
    }

    /// Returns the cached answer, or `None` if the list is missing or stale.
    async fn cached(&self, chat_id: ChatId, user_id: UserId) -> Option<bool> {
        let entries = self.entries.lock().await;
        entries
            .get(&chat_id)
            .filter(|e| e.fetched_at.elapsed() < self.ttl)
            .map(|e| e.ids.contains(&user_id))
    }

    /// Replaces the cached list of a chat.
    pub async fn store(&self, chat_id: ChatId, ids: HashSet<UserId>) {
        let mut entries = self.entries.lock().await;
        entries.insert(
            chat_id,
            CachedAdmins {
                fetched_at: Instant::now(),
                ids,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::testing::RecordingGateway;

    #[tokio::test]
    async fn test_fetches_once_then_uses_cache() {
        let gateway = RecordingGateway::new().with_admins(-1, vec![7]);
        let cache = AdminCache::from_secs(60);

        assert!(cache.is_admin(&gateway, -1, 7).await);
        assert!(!cache.is_admin(&gateway, -1, 8).await);
        assert_eq!(gateway.admin_lookups(), 1);
    }

    #[tokio::test]
    async fn test_stale_entry_is_refetched() {
        let gateway = RecordingGateway::new().with_admins(-1, vec![7]);
        let cache = AdminCache::new(Duration::ZERO);

        assert!(cache.is_admin(&gateway, -1, 7).await);
        assert!(cache.is_admin(&gateway, -1, 7).await);
        assert_eq!(gateway.admin_lookups(), 2);
    }

    #[tokio::test]
    async fn test_lookup_failure_means_not_admin() {
        let gateway = RecordingGateway::new().failing_admin_lookups();
        let cache = AdminCache::from_secs(60);

        assert!(!cache.is_admin(&gateway, -1, 7).await);
    }
}
