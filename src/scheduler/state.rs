//! Scheduler slot bookkeeping.
//!
//! The scheduler polls the clock on a fixed period. Each action owns a slot
//! (an hour of a day, or a day) and fires on the first tick that lands in a
//! slot it has not fired in yet. Missed hourly slots are not made up, but a
//! day that ends before its finalize ran is finalized on the first tick of
//! the next day, ahead of the midnight reset.

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::config::ScheduleSettings;

/// A periodic job of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledAction {
    /// Clear every chat at the start of a new day.
    MidnightReset,
    /// Post, pin and reset the day's final leaderboard.
    DailyFinalize,
    /// Post the current leaderboard without resetting.
    HourlyBroadcast,
}

impl std::fmt::Display for ScheduledAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::MidnightReset => "midnight reset",
            Self::DailyFinalize => "daily finalize",
            Self::HourlyBroadcast => "hourly broadcast",
        };
        f.write_str(s)
    }
}

/// Which slots have already fired.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleState {
    last_hourly: Option<(NaiveDate, u32)>,
    last_finalize: Option<NaiveDate>,
    last_midnight: Option<NaiveDate>,
}

impl ScheduleState {
    /// Creates a state where nothing has fired yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state for a process starting at `now` (local time).
    ///
    /// Slots already in progress count as fired, so a restart does not
    /// broadcast or reset right away.
    #[must_use]
    pub fn starting_at(now: NaiveDateTime, settings: &ScheduleSettings) -> Self {
        let date = now.date();
        Self {
            last_hourly: Some((date, now.hour())),
            last_finalize: (now.time() >= settings.finalize_at).then_some(date),
            last_midnight: Some(date),
        }
    }

    /// Returns the actions due at `now` (local time) and marks them fired.
    ///
    /// Order is late finalize of the previous day, midnight reset, finalize,
    /// hourly. When a finalize fires, the hourly broadcast of the same tick
    /// is dropped so the board is not posted twice.
    pub fn due(&mut self, now: NaiveDateTime, settings: &ScheduleSettings) -> Vec<ScheduledAction> {
        let date = now.date();
        let hour = now.hour();
        let mut actions = Vec::new();

        // The previous day ended without a tick between finalize and midnight.
        let late_finalize = self
            .last_midnight
            .is_some_and(|previous| previous < date && self.last_finalize != Some(previous));
        if late_finalize {
            self.last_finalize = self.last_midnight;
            actions.push(ScheduledAction::DailyFinalize);
        }

        if self.last_midnight != Some(date) {
            self.last_midnight = Some(date);
            if settings.midnight_reset {
                actions.push(ScheduledAction::MidnightReset);
            }
        }

        let finalize_due = now.time() >= settings.finalize_at && self.last_finalize != Some(date);
        if finalize_due {
            self.last_finalize = Some(date);
            actions.push(ScheduledAction::DailyFinalize);
        }

        if self.last_hourly != Some((date, hour)) {
            self.last_hourly = Some((date, hour));
            if settings.is_active_hour(hour) && !finalize_due && !late_finalize {
                actions.push(ScheduledAction::HourlyBroadcast);
            }
        }

        actions
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn settings() -> ScheduleSettings {
        ScheduleSettings::default()
    }

    #[test]
    fn test_startup_fires_nothing() {
        let s = settings();
        let mut state = ScheduleState::starting_at(at(1, 14, 30), &s);
        assert!(state.due(at(1, 14, 31), &s).is_empty());
        assert!(state.due(at(1, 14, 59), &s).is_empty());
    }

    #[test]
    fn test_hourly_fires_once_per_hour_inside_window() {
        let s = settings();
        let mut state = ScheduleState::starting_at(at(1, 9, 0), &s);

        assert!(state.due(at(1, 10, 0), &s).is_empty());
        assert_eq!(state.due(at(1, 11, 0), &s), vec![ScheduledAction::HourlyBroadcast]);
        assert!(state.due(at(1, 11, 1), &s).is_empty());
        assert!(state.due(at(1, 11, 59), &s).is_empty());
        assert_eq!(state.due(at(1, 12, 0), &s), vec![ScheduledAction::HourlyBroadcast]);
        assert_eq!(state.due(at(1, 23, 0), &s), vec![ScheduledAction::HourlyBroadcast]);
    }

    #[test]
    fn test_finalize_once_per_day() {
        let s = settings();
        let mut state = ScheduleState::starting_at(at(1, 23, 30), &s);

        assert!(state.due(at(1, 23, 58), &s).is_empty());
        assert_eq!(state.due(at(1, 23, 59), &s), vec![ScheduledAction::DailyFinalize]);
        assert!(state.due(at(1, 23, 59), &s).is_empty());
    }

    #[test]
    fn test_midnight_reset_on_new_day() {
        let s = settings();
        let mut state = ScheduleState::starting_at(at(1, 23, 59), &s);

        assert_eq!(state.due(at(2, 0, 0), &s), vec![ScheduledAction::MidnightReset]);
        assert!(state.due(at(2, 0, 1), &s).is_empty());
    }

    #[test]
    fn test_midnight_reset_can_be_disabled() {
        let s = ScheduleSettings {
            midnight_reset: false,
            ..settings()
        };
        let mut state = ScheduleState::starting_at(at(1, 23, 59), &s);
        assert!(state.due(at(2, 0, 0), &s).is_empty());
    }

    #[test]
    fn test_finalize_suppresses_hourly_in_same_tick() {
        let s = ScheduleSettings {
            finalize_at: NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            ..settings()
        };
        let mut state = ScheduleState::starting_at(at(1, 22, 30), &s);
        assert_eq!(state.due(at(1, 23, 0), &s), vec![ScheduledAction::DailyFinalize]);
        assert!(state.due(at(1, 23, 30), &s).is_empty());
    }

    #[test]
    fn test_missed_finalize_runs_before_midnight_reset() {
        let s = settings();
        let mut state = ScheduleState::starting_at(at(1, 23, 0), &s);

        // Process asleep across 23:59; the next tick is already tomorrow.
        let due = state.due(at(2, 0, 5), &s);
        assert_eq!(
            due,
            vec![ScheduledAction::DailyFinalize, ScheduledAction::MidnightReset]
        );
        assert!(state.due(at(2, 0, 6), &s).is_empty());
        // Today's own finalize is still ahead.
        assert_eq!(state.due(at(2, 23, 59), &s), vec![ScheduledAction::DailyFinalize]);
    }

    #[test]
    fn test_hourly_ticks_still_finalize_each_day() {
        let s = ScheduleSettings {
            tick_secs: 3600,
            ..settings()
        };
        assert!(s.validate().is_ok());

        let mut state = ScheduleState::starting_at(at(1, 10, 17), &s);
        let mut fired = Vec::new();
        for hour in 11..24 {
            fired.extend(state.due(at(1, hour, 17), &s));
        }
        for hour in 0..24 {
            fired.extend(state.due(at(2, hour, 17), &s));
        }
        fired.extend(state.due(at(3, 0, 17), &s));

        let finalizes: Vec<usize> = fired
            .iter()
            .enumerate()
            .filter(|(_, a)| **a == ScheduledAction::DailyFinalize)
            .map(|(i, _)| i)
            .collect();
        let resets: Vec<usize> = fired
            .iter()
            .enumerate()
            .filter(|(_, a)| **a == ScheduledAction::MidnightReset)
            .map(|(i, _)| i)
            .collect();

        // One finalize per day, each right before that day's reset.
        assert_eq!(finalizes.len(), 2);
        assert_eq!(resets.len(), 2);
        assert_eq!(resets[0], finalizes[0] + 1);
        assert_eq!(resets[1], finalizes[1] + 1);
    }

    #[test]
    fn test_late_finalize_without_midnight_reset() {
        let s = ScheduleSettings {
            midnight_reset: false,
            ..settings()
        };
        let mut state = ScheduleState::starting_at(at(1, 12, 0), &s);
        assert_eq!(state.due(at(2, 0, 30), &s), vec![ScheduledAction::DailyFinalize]);
    }

    #[test]
    fn test_finalized_day_is_not_finalized_again_after_midnight() {
        let s = settings();
        let mut state = ScheduleState::starting_at(at(1, 23, 30), &s);
        assert_eq!(state.due(at(1, 23, 59), &s), vec![ScheduledAction::DailyFinalize]);
        assert_eq!(state.due(at(2, 0, 0), &s), vec![ScheduledAction::MidnightReset]);
    }

    #[test]
    fn test_fresh_state_fires_everything_due() {
        let s = settings();
        let mut state = ScheduleState::new();
        assert_eq!(
            state.due(at(1, 12, 0), &s),
            vec![ScheduledAction::MidnightReset, ScheduledAction::HourlyBroadcast]
        );
    }
}
