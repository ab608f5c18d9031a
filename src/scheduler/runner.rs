//! Leaderboard scheduler runner.
//!
//! One ticker drives three jobs, picked each tick by [`ScheduleState::due`]:
//! 1. Midnight reset: clear every chat (a no-op for chats already empty).
//! 2. Daily finalize: for each active chat, take the top entries and reset
//!    the chat in one step, then post the final board, pin it and queue an
//!    unpin for later.
//! 3. Hourly broadcast: post the current board of each active chat.
//!
//! Chats are handled one after another, and a failed send only affects its
//! own chat. The finalize reset happens before delivery, so it never
//! depends on the send succeeding.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use tokio::sync::{Mutex, mpsc};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use super::{ScheduleState, ScheduledAction, UnpinQueue};
use crate::config::ScheduleSettings;
use crate::tally::leaderboard::{self, Framing};
use crate::tally::{ChatId, CounterStore, MessageId};
use crate::telegram::ChatGateway;

/// Messages that can be sent to the scheduler.
#[derive(Debug, Clone)]
pub enum SchedulerMessage {
    /// Run an action immediately, outside the regular slots.
    Trigger(ScheduledAction),
    /// Stop the scheduler.
    Shutdown,
}

/// What one run of an action did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionReport {
    /// Chats the action looked at.
    pub chats: usize,
    /// Boards delivered.
    pub delivered: usize,
    /// Boards that failed to send.
    pub failed: usize,
    /// Boards pinned.
    pub pinned: usize,
}

/// Periodic leaderboard broadcaster.
pub struct LeaderboardScheduler<G: ChatGateway> {
    /// Outbound Telegram operations.
    gateway: Arc<G>,

    /// Shared message tallies.
    store: Arc<CounterStore>,

    /// Timing configuration.
    settings: ScheduleSettings,

    /// Local timezone of the schedule.
    offset: FixedOffset,

    /// Slots already fired.
    state: Mutex<ScheduleState>,

    /// Pending unpins of final boards.
    unpins: UnpinQueue<G>,
}

impl<G: ChatGateway> LeaderboardScheduler<G> {
    /// Creates a scheduler whose slots start at the current local time.
    #[must_use]
    pub fn new(gateway: Arc<G>, store: Arc<CounterStore>, settings: ScheduleSettings) -> Self {
        let offset = settings.offset().unwrap_or_else(|| Utc.fix());
        let now = Utc::now().with_timezone(&offset);
        let state = ScheduleState::starting_at(now.naive_local(), &settings);

        Self {
            unpins: UnpinQueue::new(Arc::clone(&gateway)),
            gateway,
            store,
            settings,
            offset,
            state: Mutex::new(state),
        }
    }

    /// Replaces the slot bookkeeping.
    #[must_use]
    pub fn with_state(mut self, state: ScheduleState) -> Self {
        self.state = Mutex::new(state);
        self
    }

    /// Runs the scheduler loop until shutdown.
    pub async fn run(&self, mut rx: mpsc::Receiver<SchedulerMessage>) {
        info!(
            "Leaderboard scheduler started (hourly {}:00-{}:59, finalize {}, tick {}s)",
            self.settings.active_start_hour,
            self.settings.active_end_hour,
            self.settings.finalize_label(),
            self.settings.tick_secs
        );

        let mut ticker = interval(self.settings.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                msg = rx.recv() => {
                    match msg {
                        Some(SchedulerMessage::Trigger(action)) => {
                            debug!("Received trigger for {}", action);
                            self.perform(action, self.now()).await;
                        }
                        Some(SchedulerMessage::Shutdown) | None => {
                            info!("Scheduler shutting down");
                            break;
                        }
                    }
                }
            }
        }

        let cancelled = self.unpins.cancel_all().await;
        if cancelled > 0 {
            info!("Cancelled {} pending unpin(s)", cancelled);
        }
    }

    /// Current time in the schedule's timezone.
    #[must_use]
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }

    /// Single tick at the current time.
    pub async fn tick(&self) {
        self.tick_at(self.now()).await;
    }

    /// Single tick at `now`. Returns the actions that fired.
    pub async fn tick_at(&self, now: DateTime<FixedOffset>) -> Vec<ScheduledAction> {
        let due = {
            let mut state = self.state.lock().await;
            state.due(now.naive_local(), &self.settings)
        };

        for &action in &due {
            self.perform(action, now).await;
        }
        due
    }

    /// Runs one action for every relevant chat.
    pub async fn perform(&self, action: ScheduledAction, now: DateTime<FixedOffset>) -> ActionReport {
        let report = match action {
            ScheduledAction::MidnightReset => self.midnight_reset().await,
            ScheduledAction::DailyFinalize => self.finalize_day(now).await,
            ScheduledAction::HourlyBroadcast => self.broadcast_hourly(now).await,
        };

        info!(
            "{} done: {} chat(s), {} delivered, {} failed, {} pinned",
            action, report.chats, report.delivered, report.failed, report.pinned
        );
        report
    }

    async fn midnight_reset(&self) -> ActionReport {
        let cleared = self.store.reset_all().await;
        ActionReport {
            chats: cleared,
            ..ActionReport::default()
        }
    }

    async fn broadcast_hourly(&self, now: DateTime<FixedOffset>) -> ActionReport {
        let mut report = ActionReport::default();

        for chat_id in self.store.active_chats().await {
            report.chats += 1;
            // Snapshot under the lock, send after releasing it.
            let top = self.store.top_n(chat_id, self.settings.top_n).await;
            let Some(text) = leaderboard::render(&top, Framing::Hourly, now) else {
                continue;
            };

            match self.gateway.send_text(chat_id, &text).await {
                Ok(_) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!("Failed to post hourly leaderboard to chat {}: {}", chat_id, e);
                }
            }
        }

        report
    }

    async fn finalize_day(&self, now: DateTime<FixedOffset>) -> ActionReport {
        let mut report = ActionReport::default();

        for chat_id in self.store.active_chats().await {
            report.chats += 1;
            // Reset happens here, whatever the delivery outcome.
            let top = self.store.drain_top_n(chat_id, self.settings.top_n).await;
            let Some(text) = leaderboard::render(&top, Framing::Final, now) else {
                continue;
            };

            match self.gateway.send_text(chat_id, &text).await {
                Ok(message_id) => {
                    report.delivered += 1;
                    if self.settings.pin_final && self.pin_for_a_day(chat_id, message_id).await {
                        report.pinned += 1;
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    error!("Failed to post final leaderboard to chat {}: {}", chat_id, e);
                }
            }
        }

        report
    }

    /// Pins a board and queues its unpin. Returns whether the pin worked.
    async fn pin_for_a_day(&self, chat_id: ChatId, message_id: MessageId) -> bool {
        match self.gateway.pin(chat_id, message_id).await {
            Ok(()) => {
                info!("Pinned final leaderboard {} in chat {}", message_id, chat_id);
                self.unpins
                    .schedule(chat_id, message_id, self.settings.unpin_after())
                    .await;
                true
            }
            Err(e) => {
                warn!("Failed to pin final leaderboard in chat {}: {}", chat_id, e);
                false
            }
        }
    }

    /// Gets a reference to the pending unpins.
    #[must_use]
    pub fn unpins(&self) -> &UnpinQueue<G> {
        &self.unpins
    }

    /// Gets a reference to the schedule settings.
    #[must_use]
    pub fn settings(&self) -> &ScheduleSettings {
        &self.settings
    }
}

impl<G: ChatGateway> std::fmt::Debug for LeaderboardScheduler<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaderboardScheduler")
            .field("settings", &self.settings)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}
