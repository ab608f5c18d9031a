//! Deferred unpinning of final leaderboards.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::tally::{ChatId, MessageId};
use crate::telegram::ChatGateway;

type PendingMap = HashMap<(ChatId, MessageId), AbortHandle>;

/// Background tasks that each unpin one message after a delay.
///
/// Tasks run independently of whatever scheduled them and remove
/// themselves when done.
pub struct UnpinQueue<G: ChatGateway> {
    gateway: Arc<G>,
    pending: Arc<Mutex<PendingMap>>,
}

impl<G: ChatGateway> UnpinQueue<G> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Unpins `message_id` in `chat_id` once `delay` has passed.
    ///
    /// Scheduling the same message again replaces the earlier task.
    pub async fn schedule(&self, chat_id: ChatId, message_id: MessageId, delay: Duration) {
        let key = (chat_id, message_id);
        let gateway = Arc::clone(&self.gateway);
        let pending = Arc::clone(&self.pending);

        // The task removes its own entry; holding the lock until it is
        // inserted keeps a short delay from racing the insert.
        let mut guard = self.pending.lock().await;

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match gateway.unpin(chat_id, message_id).await {
                Ok(()) => info!("Unpinned message {} in chat {}", message_id, chat_id),
                Err(e) => warn!("Failed to unpin message {} in chat {}: {}", message_id, chat_id, e),
            }
            pending.lock().await.remove(&key);
        });

        if let Some(previous) = guard.insert(key, task.abort_handle()) {
            previous.abort();
        }
        debug!(
            "Scheduled unpin of message {} in chat {} in {:?}",
            message_id, chat_id, delay
        );
    }

    /// Cancels everything still pending. Returns how many.
    pub async fn cancel_all(&self) -> usize {
        let mut pending = self.pending.lock().await;
        let count = pending.len();
        for (_, handle) in pending.drain() {
            handle.abort();
        }
        count
    }

    /// Number of unpins still waiting.
    pub async fn pending(&self) -> usize {
        self.pending.lock().await.len()
    }
}

impl<G: ChatGateway> std::fmt::Debug for UnpinQueue<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnpinQueue").finish_non_exhaustive()
    }
}
