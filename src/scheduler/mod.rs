//! Leaderboard scheduler module.
//!
//! Posts hourly and end-of-day leaderboards for every active chat and
//! resets the tallies at the end of each day.

mod runner;
mod state;
mod unpin;

pub use runner::{ActionReport, LeaderboardScheduler, SchedulerMessage};
pub use state::{ScheduleState, ScheduledAction};
pub use unpin::UnpinQueue;
