//! Public view of a timer's lifecycle state

use std::fmt;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an existing timer
///
/// Absence from the store is the implicit `NoTimer` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    /// Counting down with a live scheduled callback
    Running,
    /// Frozen; no callback is scheduled
    Paused,
    /// Fired; completion actions are running
    Expiring,
}

impl TimerState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused)
    }
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Expiring => "expiring",
        })
    }
}

/// Read-only copy of a timer record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub id: String,
    pub state: TimerState,
    /// When the current run segment began
    pub started_at: DateTime<Utc>,
    /// Remaining duration as of `started_at` (or as frozen by the last pause)
    pub remaining: TimeDelta,
}

impl TimerSnapshot {
    /// Remaining time as seen at `now`, never negative
    pub fn remaining_at(&self, now: DateTime<Utc>) -> TimeDelta {
        let remaining = match self.state {
            TimerState::Running => {
                let elapsed = now - self.started_at;
                // Overflow means an extreme start time: far future leaves all
                // of it, far past leaves none
                self.remaining.checked_sub(&elapsed).unwrap_or(if elapsed < TimeDelta::zero() {
                    TimeDelta::MAX
                } else {
                    TimeDelta::zero()
                })
            }
            TimerState::Paused => self.remaining,
            TimerState::Expiring => TimeDelta::zero(),
        };
        remaining.max(TimeDelta::zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(state: TimerState) -> TimerSnapshot {
        TimerSnapshot {
            id: "user".to_string(),
            state,
            started_at: DateTime::<Utc>::UNIX_EPOCH,
            remaining: TimeDelta::minutes(20),
        }
    }

    #[test]
    fn running_timers_count_down() {
        let now = DateTime::<Utc>::UNIX_EPOCH + TimeDelta::minutes(5);
        assert_eq!(snapshot(TimerState::Running).remaining_at(now), TimeDelta::minutes(15));

        let later = DateTime::<Utc>::UNIX_EPOCH + TimeDelta::hours(1);
        assert_eq!(snapshot(TimerState::Running).remaining_at(later), TimeDelta::zero());
    }

    #[test]
    fn paused_timers_are_frozen() {
        let now = DateTime::<Utc>::UNIX_EPOCH + TimeDelta::minutes(5);
        assert_eq!(snapshot(TimerState::Paused).remaining_at(now), TimeDelta::minutes(20));
        assert_eq!(snapshot(TimerState::Expiring).remaining_at(now), TimeDelta::zero());
    }

    #[test]
    fn extreme_start_times_do_not_overflow() {
        let far_future = TimerSnapshot {
            started_at: DateTime::<Utc>::MAX_UTC,
            remaining: TimeDelta::seconds(153_700_000_000_000 * 60),
            ..snapshot(TimerState::Running)
        };
        assert_eq!(far_future.remaining_at(DateTime::<Utc>::MIN_UTC), TimeDelta::MAX);

        let far_past = TimerSnapshot {
            started_at: DateTime::<Utc>::MIN_UTC,
            remaining: TimeDelta::seconds(-153_700_000_000_000 * 60),
            ..snapshot(TimerState::Running)
        };
        assert_eq!(far_past.remaining_at(DateTime::<Utc>::MAX_UTC), TimeDelta::zero());
    }

    #[test]
    fn state_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&TimerState::Paused).unwrap(), "\"paused\"");
        assert_eq!(TimerState::Expiring.to_string(), "expiring");
    }
}
