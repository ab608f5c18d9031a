//! Message tallies for group chats.
//!
//! Inbound group messages pass the eligibility filter, then bump a per-user
//! counter in the [`CounterStore`]. The scheduler reads the store on its own
//! cadence and renders leaderboards with [`leaderboard::render`].

mod event;
mod filter;
pub mod leaderboard;
mod store;

pub use event::{ChatId, IncomingMessage, MessageId, Sender, UserId};
pub use filter::{RecentTextLog, SkipReason, Verdict, precheck};
pub use leaderboard::Framing;
pub use store::{CounterStore, UserTally};
