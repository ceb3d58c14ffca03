//! Timer lifecycle manager: start, pause, resume and stop named pomodoros

use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
    time::Duration,
};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, error, info, warn};

use crate::{
    error::{TimerError, TimerResult},
    services::{Callback, ClockSource, IdGenerator, ScheduledCallback, TokioClock, UuidGenerator},
};
use super::{
    record::{CompletionAction, Phase, TimerRecord},
    MemoryStore, TimerSnapshot, TimerState, TimerStore,
};

/// Duration used when a timer is started without one
pub const DEFAULT_DURATION_MINUTES: i64 = 20;

/// Tracks every active timer and drives its state machine.
///
/// Cloning is cheap and every clone manages the same timers. Scheduled
/// callbacks only hold a weak reference, so once the last clone is dropped
/// pending timers fire into nothing.
pub struct TimerManager<C = TokioClock, S = MemoryStore, G = UuidGenerator>
where
    C: ClockSource,
    S: TimerStore,
    G: IdGenerator,
{
    inner: Arc<Inner<C, S, G>>,
}

struct Inner<C, S, G> {
    clock: C,
    store: S,
    ids: G,
    generations: AtomicU64,
}

enum PauseOutcome {
    Paused(TimeDelta),
    Exhausted(u64),
}

impl TimerManager {
    /// Manager on the current tokio runtime with in-memory storage
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn new() -> Self {
        Self::with_parts(TokioClock::current(), MemoryStore::new(), UuidGenerator)
    }
}

impl<C, S, G> TimerManager<C, S, G>
where
    C: ClockSource,
    S: TimerStore,
    G: IdGenerator,
{
    pub fn with_parts(clock: C, store: S, ids: G) -> Self {
        Self {
            inner: Arc::new(Inner {
                clock,
                store,
                ids,
                generations: AtomicU64::new(0),
            }),
        }
    }

    pub fn clock(&self) -> &C {
        &self.inner.clock
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Fresh id from the manager's generator, for callers that need the id
    /// before starting (e.g. to capture it in a completion action)
    pub fn generate_id(&self) -> String {
        self.inner.ids.generate()
    }

    /// Start a pomodoro of `minutes` minutes.
    ///
    /// An empty `id` is replaced by a generated one, `None` as start time
    /// means now, and zero minutes means [`DEFAULT_DURATION_MINUTES`]. The
    /// effective id is returned. Starting an id that already has a timer
    /// cancels the old one (its actions never run) and replaces it.
    pub fn start(
        &self,
        id: &str,
        start_time: Option<DateTime<Utc>>,
        minutes: i64,
        actions: Vec<CompletionAction>,
    ) -> TimerResult<String> {
        let minutes = if minutes == 0 {
            info!("Duration not set, defaulting to {} minutes", DEFAULT_DURATION_MINUTES);
            DEFAULT_DURATION_MINUTES
        } else {
            minutes
        };

        let duration = parse_minutes(minutes).inspect_err(|e| error!("{}", e))?;
        self.start_with_duration(id, start_time, duration, actions)
    }

    /// Start a pomodoro lasting exactly `duration`.
    ///
    /// Same defaults as [`TimerManager::start`]; a zero duration means
    /// [`DEFAULT_DURATION_MINUTES`].
    pub fn start_with_duration(
        &self,
        id: &str,
        start_time: Option<DateTime<Utc>>,
        duration: Duration,
        actions: Vec<CompletionAction>,
    ) -> TimerResult<String> {
        let id = if id.trim().is_empty() {
            let generated = self.inner.ids.generate();
            info!("Timer id not provided, generated {}", generated);
            generated
        } else {
            id.to_string()
        };

        let start_time = start_time.unwrap_or_else(|| {
            debug!("Start time not set, using current time");
            self.inner.clock.now()
        });

        let duration = if duration.is_zero() {
            Duration::from_secs(DEFAULT_DURATION_MINUTES as u64 * 60)
        } else {
            duration
        };

        let remaining = TimeDelta::from_std(duration).map_err(|e| {
            let err = TimerError::Internal(format!("failed to parse duration: {}", e));
            error!("{}", err);
            err
        })?;

        let generation = self.inner.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let record = TimerRecord::new(id.clone(), generation, start_time, remaining, actions);

        if let Some(replaced) = self.inner.store.put(&id, record) {
            replaced.disarm();
            info!("Replaced existing {} timer for {}", replaced.state(), id);
        }

        self.arm(&id, generation, duration);
        info!("Started timer {} for {:?}", id, duration);
        Ok(id)
    }

    /// Freeze a running timer. Its completion actions will not run until it
    /// is resumed and the remaining time elapses.
    pub fn pause(&self, id: &str) -> TimerResult<()> {
        self.observe("pause", self.try_pause(id))
    }

    /// Continue a paused timer with the time it had left
    pub fn resume(&self, id: &str) -> TimerResult<()> {
        self.observe("resume", self.try_resume(id))
    }

    /// Remove a running or paused timer without running its completion actions
    pub fn stop(&self, id: &str) -> TimerResult<()> {
        self.observe("stop", self.try_stop(id))
    }

    /// Current snapshot of the timer for `id`
    pub fn status(&self, id: &str) -> TimerResult<TimerSnapshot> {
        let result = validate_id(id).and_then(|()| {
            self.inner.store.get(id).ok_or_else(|| TimerError::not_found(id))
        });
        self.observe("status", result)
    }

    /// Sorted ids of every timer currently stored
    pub fn active_ids(&self) -> Vec<String> {
        let mut ids = self.inner.store.ids();
        ids.sort();
        ids
    }

    fn try_pause(&self, id: &str) -> TimerResult<()> {
        validate_id(id)?;
        let now = self.inner.clock.now();

        let outcome = self.inner.store.modify(id, |slot| {
            let record = slot.as_mut().ok_or_else(|| TimerError::not_found(id))?;
            match &record.phase {
                Phase::Paused => {
                    return Err(TimerError::InvalidState {
                        id: id.to_string(),
                        state: TimerState::Paused,
                        operation: "pause",
                    });
                }
                Phase::Expiring => return Err(TimerError::elapsed(id)),
                Phase::Running(_) | Phase::Arming => {}
            }

            // Computed before cancelling so an out-of-range result changes nothing
            let remaining = record
                .remaining
                .checked_sub(&(now - record.start_time))
                .ok_or_else(|| {
                    TimerError::Internal(format!("remaining time of timer {} is out of range", id))
                })?;

            if let Phase::Running(handle) = &record.phase {
                if !handle.cancel() {
                    // The callback won the race and is about to expire the record
                    debug!("Pause of {} lost the race with expiry", id);
                    return Err(TimerError::elapsed(id));
                }
            }

            if remaining <= TimeDelta::zero() {
                record.phase = Phase::Arming;
                return Ok(PauseOutcome::Exhausted(record.generation));
            }

            record.remaining = remaining;
            record.phase = Phase::Paused;
            Ok(PauseOutcome::Paused(remaining))
        })?;

        match outcome {
            PauseOutcome::Paused(remaining) => {
                info!("Paused timer {} with {}s remaining", id, remaining.num_seconds());
                Ok(())
            }
            PauseOutcome::Exhausted(generation) => {
                info!("Timer {} ran out before it could be paused, expiring", id);
                self.arm(id, generation, Duration::ZERO);
                Err(TimerError::elapsed(id))
            }
        }
    }

    fn try_resume(&self, id: &str) -> TimerResult<()> {
        validate_id(id)?;
        let now = self.inner.clock.now();

        let (generation, remaining) = self.inner.store.modify(id, |slot| {
            let record = slot.as_mut().ok_or_else(|| TimerError::not_found(id))?;
            match record.phase {
                Phase::Paused => {
                    record.start_time = now;
                    record.phase = Phase::Arming;
                    Ok((record.generation, record.remaining))
                }
                Phase::Arming | Phase::Running(_) => Err(TimerError::InvalidState {
                    id: id.to_string(),
                    state: TimerState::Running,
                    operation: "resume",
                }),
                Phase::Expiring => Err(TimerError::elapsed(id)),
            }
        })?;

        let delay = remaining.to_std().unwrap_or(Duration::ZERO);
        self.arm(id, generation, delay);
        info!("Resumed timer {} with {}s remaining", id, remaining.num_seconds());
        Ok(())
    }

    fn try_stop(&self, id: &str) -> TimerResult<()> {
        validate_id(id)?;

        let record = self
            .inner
            .store
            .delete(id)
            .ok_or_else(|| TimerError::not_found(id))?;

        // Once the record is gone a late firing finds nothing to expire
        if !record.disarm() && record.state() == TimerState::Expiring {
            debug!("Stopped timer {} while its completion actions were running", id);
        }

        info!("Stopped {} timer {}", record.state(), id);
        Ok(())
    }

    /// Register the callback for `generation` and hand it to the record.
    ///
    /// Must be called without the store lock held. If the record changed
    /// while the callback was being registered, the fresh handle is dropped
    /// again.
    fn arm(&self, id: &str, generation: u64, delay: Duration) {
        let handle = self.inner.clock.schedule(delay, self.expiry_callback(id, generation));

        let stale = self.inner.store.modify(id, |slot| match slot {
            Some(record)
                if record.generation == generation && matches!(record.phase, Phase::Arming) =>
            {
                record.phase = Phase::Running(Box::new(handle));
                None
            }
            _ => Some(handle),
        });

        if let Some(handle) = stale {
            handle.cancel();
            debug!("Timer {} changed while arming, discarded its callback", id);
        }
    }

    fn expiry_callback(&self, id: &str, generation: u64) -> Callback {
        let inner: Weak<Inner<C, S, G>> = Arc::downgrade(&self.inner);
        let id = id.to_string();
        Box::new(move || {
            if let Some(inner) = inner.upgrade() {
                TimerManager { inner }.expire(&id, generation);
            }
        })
    }

    /// Runs on the clock's context when a callback fires
    fn expire(&self, id: &str, generation: u64) {
        let actions = self.inner.store.modify(id, |slot| {
            let record = slot.as_mut().filter(|record| record.generation == generation)?;
            match record.phase {
                Phase::Arming | Phase::Running(_) => {
                    record.phase = Phase::Expiring;
                    Some(std::mem::take(&mut record.actions))
                }
                Phase::Paused | Phase::Expiring => None,
            }
        });

        let Some(actions) = actions else {
            debug!("Ignoring stale callback for timer {}", id);
            return;
        };

        info!("Timer {} finished, running {} completion actions", id, actions.len());
        for action in actions {
            if catch_unwind(AssertUnwindSafe(action)).is_err() {
                error!("Completion action for timer {} panicked", id);
            }
        }

        let removed = self.inner.store.modify(id, |slot| {
            if slot.as_ref().is_some_and(|record| record.generation == generation) {
                slot.take()
            } else {
                None
            }
        });
        if removed.is_some() {
            debug!("Removed expired timer {}", id);
        }
    }

    fn observe<T>(&self, operation: &str, result: TimerResult<T>) -> TimerResult<T> {
        if let Err(e) = &result {
            match e {
                TimerError::NotFound { .. } => info!("Cannot {}: {}", operation, e),
                TimerError::InvalidArgument(_) | TimerError::InvalidState { .. } => {
                    warn!("Cannot {}: {}", operation, e)
                }
                TimerError::Internal(_) => error!("Cannot {}: {}", operation, e),
            }
        }
        result
    }
}

impl<C, S, G> Clone for TimerManager<C, S, G>
where
    C: ClockSource,
    S: TimerStore,
    G: IdGenerator,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C, S, G> std::fmt::Debug for TimerManager<C, S, G>
where
    C: ClockSource,
    S: TimerStore,
    G: IdGenerator,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerManager")
            .field("timers", &self.inner.store.len())
            .finish()
    }
}

fn validate_id(id: &str) -> TimerResult<()> {
    if id.trim().is_empty() {
        return Err(TimerError::InvalidArgument("no timer id provided".to_string()));
    }
    Ok(())
}

/// Convert whole minutes into a duration, rejecting negative and
/// out-of-range values
pub fn parse_minutes(minutes: i64) -> TimerResult<Duration> {
    u64::try_from(minutes)
        .ok()
        .and_then(|minutes| minutes.checked_mul(60))
        .map(Duration::from_secs)
        .ok_or_else(|| {
            TimerError::Internal(format!("failed to parse duration: {} minutes", minutes))
        })
}
