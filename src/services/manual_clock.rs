//! Hand-driven clock for deterministic tests and simulations

use std::{sync::Arc, time::Duration};
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;

use super::clock::{Callback, CallbackLatch, ClockSource, ScheduledCallback};

/// Clock whose time only moves when [`ManualClock::advance`] is called.
///
/// Due callbacks run on the thread calling `advance`, in deadline order,
/// with no internal lock held so they may schedule or cancel other timers.
#[derive(Debug, Clone)]
pub struct ManualClock {
    shared: Arc<Mutex<ManualState>>,
}

#[derive(Debug)]
struct ManualState {
    origin: DateTime<Utc>,
    elapsed: Duration,
    next_seq: u64,
    timers: Vec<Arc<ManualTimer>>,
}

struct ManualTimer {
    seq: u64,
    latch: CallbackLatch,
    deadline: Mutex<Duration>,
    callback: Mutex<Option<Callback>>,
}

impl std::fmt::Debug for ManualTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualTimer")
            .field("seq", &self.seq)
            .field("pending", &self.latch.is_pending())
            .field("deadline", &*self.deadline.lock())
            .finish()
    }
}

impl ManualClock {
    /// Create a clock reading `origin` until advanced
    pub fn starting_at(origin: DateTime<Utc>) -> Self {
        Self {
            shared: Arc::new(Mutex::new(ManualState {
                origin,
                elapsed: Duration::ZERO,
                next_seq: 0,
                timers: Vec::new(),
            })),
        }
    }

    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Move time forward by `by`, firing every callback that falls due
    pub fn advance(&self, by: Duration) {
        let target = self.shared.lock().elapsed.saturating_add(by);

        loop {
            let due = {
                let mut state = self.shared.lock();
                state.timers.retain(|timer| timer.latch.is_pending());

                let next = state
                    .timers
                    .iter()
                    .filter(|timer| *timer.deadline.lock() <= target)
                    .min_by_key(|timer| (*timer.deadline.lock(), timer.seq))
                    .cloned();

                match next {
                    Some(timer) => {
                        let deadline = *timer.deadline.lock();
                        state.elapsed = state.elapsed.max(deadline);
                        Some(timer)
                    }
                    None => {
                        state.elapsed = target;
                        None
                    }
                }
            };

            match due {
                Some(timer) => timer.fire(),
                None => break,
            }
        }
    }

    /// Number of callbacks that have neither fired nor been canceled
    pub fn pending(&self) -> usize {
        self.shared
            .lock()
            .timers
            .iter()
            .filter(|timer| timer.latch.is_pending())
            .count()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualTimer {
    fn fire(&self) {
        if self.latch.try_fire() {
            if let Some(callback) = self.callback.lock().take() {
                callback();
            }
        }
    }
}

impl ClockSource for ManualClock {
    type Handle = ManualTimerHandle;

    fn now(&self) -> DateTime<Utc> {
        let state = self.shared.lock();
        let elapsed = TimeDelta::from_std(state.elapsed).unwrap_or(TimeDelta::MAX);
        state
            .origin
            .checked_add_signed(elapsed)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn schedule(&self, delay: Duration, callback: Callback) -> ManualTimerHandle {
        let mut state = self.shared.lock();
        let timer = Arc::new(ManualTimer {
            seq: state.next_seq,
            latch: CallbackLatch::new(),
            deadline: Mutex::new(state.elapsed.saturating_add(delay)),
            callback: Mutex::new(Some(callback)),
        });
        state.next_seq += 1;
        state.timers.push(Arc::clone(&timer));

        ManualTimerHandle {
            timer,
            clock: Arc::clone(&self.shared),
        }
    }
}

/// Handle to a callback scheduled on a [`ManualClock`]
#[derive(Debug)]
pub struct ManualTimerHandle {
    timer: Arc<ManualTimer>,
    clock: Arc<Mutex<ManualState>>,
}

impl ScheduledCallback for ManualTimerHandle {
    fn cancel(&self) -> bool {
        if self.timer.latch.try_cancel() {
            self.timer.callback.lock().take();
            true
        } else {
            false
        }
    }

    fn reset(&self, delay: Duration) -> bool {
        if !self.timer.latch.is_pending() {
            return false;
        }
        let now = self.clock.lock().elapsed;
        *self.timer.deadline.lock() = now.saturating_add(delay);
        true
    }

    fn is_pending(&self) -> bool {
        self.timer.latch.is_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> Callback {
        let log = Arc::clone(log);
        Box::new(move || log.lock().push(name))
    }

    #[test]
    fn fires_due_callbacks_in_deadline_order() {
        let clock = ManualClock::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let _late = clock.schedule(Duration::from_secs(3), recorder(&log, "late"));
        let _early = clock.schedule(Duration::from_secs(1), recorder(&log, "early"));
        let _never = clock.schedule(Duration::from_secs(10), recorder(&log, "never"));

        clock.advance(Duration::from_secs(5));
        assert_eq!(*log.lock(), vec!["early", "late"]);
        assert_eq!(clock.pending(), 1);
    }

    #[test]
    fn now_moves_only_on_advance() {
        let origin = Utc::now();
        let clock = ManualClock::starting_at(origin);
        assert_eq!(clock.now(), origin);

        clock.advance(Duration::from_secs(30));
        assert_eq!(clock.now() - origin, TimeDelta::seconds(30));
    }

    #[test]
    fn cancel_and_reset() {
        let clock = ManualClock::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let canceled = clock.schedule(Duration::from_secs(1), recorder(&log, "canceled"));
        let moved = clock.schedule(Duration::from_secs(1), recorder(&log, "moved"));
        assert!(canceled.cancel());
        assert!(moved.reset(Duration::from_secs(4)));

        clock.advance(Duration::from_secs(2));
        assert!(log.lock().is_empty());

        clock.advance(Duration::from_secs(2));
        assert_eq!(*log.lock(), vec!["moved"]);
        assert!(!moved.cancel());
        assert!(!canceled.reset(Duration::from_secs(1)));
    }

    #[test]
    fn callbacks_may_schedule_more_work() {
        let clock = ManualClock::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let inner_clock = clock.clone();
        let inner_log = Arc::clone(&log);
        let _outer = clock.schedule(
            Duration::from_secs(1),
            Box::new(move || {
                inner_log.lock().push("outer");
                let chained = recorder(&inner_log, "chained");
                let _detached = inner_clock.schedule(Duration::ZERO, chained);
            }),
        );

        clock.advance(Duration::from_secs(1));
        assert_eq!(*log.lock(), vec!["outer", "chained"]);
    }
}
