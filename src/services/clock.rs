//! Clock source and delayed-callback primitive backed by tokio

use std::{
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    time::Duration,
};
use chrono::{DateTime, TimeDelta, Utc};
use tokio::{
    runtime::{Handle, TryCurrentError},
    sync::watch,
    task::AbortHandle,
    time::{sleep_until, Instant},
};

/// A zero-argument callback handed to [`ClockSource::schedule`]
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Handle to a pending delayed callback
///
/// Dropping a handle detaches it: the callback still fires unless it was
/// canceled first.
pub trait ScheduledCallback: Send + Sync + 'static {
    /// Prevent the callback from running.
    ///
    /// Returns `true` if the callback was still pending and will now never
    /// run, `false` if it already fired (or is firing) or was canceled.
    fn cancel(&self) -> bool;

    /// Re-arm a still-pending callback to fire `delay` from now.
    ///
    /// Returns `false` once the callback has fired or been canceled.
    fn reset(&self, delay: Duration) -> bool;

    /// Whether the callback has neither fired nor been canceled
    fn is_pending(&self) -> bool;
}

/// Source of the current time and of cancelable delayed callbacks
pub trait ClockSource: Send + Sync + 'static {
    type Handle: ScheduledCallback;

    /// Current wall-clock time
    fn now(&self) -> DateTime<Utc>;

    /// Run `callback` on a background context once `delay` has elapsed
    fn schedule(&self, delay: Duration, callback: Callback) -> Self::Handle;
}

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELED: u8 = 2;

/// Arbitrates between a callback firing and being canceled.
///
/// Whichever side moves the latch out of the pending state first wins; the
/// other side observes `false`.
#[derive(Debug)]
pub struct CallbackLatch(AtomicU8);

impl CallbackLatch {
    pub fn new() -> Self {
        Self(AtomicU8::new(PENDING))
    }

    /// Claim the right to run the callback
    pub fn try_fire(&self) -> bool {
        self.transition(FIRED)
    }

    /// Claim the right to suppress the callback
    pub fn try_cancel(&self) -> bool {
        self.transition(CANCELED)
    }

    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::Acquire) == PENDING
    }

    fn transition(&self, to: u8) -> bool {
        self.0
            .compare_exchange(PENDING, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for CallbackLatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Production clock: callbacks run as tasks on a tokio runtime.
///
/// `now()` is anchored to the wall clock at construction and advanced by
/// tokio's monotonic clock, so it never jumps backwards and follows paused
/// time in tests.
#[derive(Debug, Clone)]
pub struct TokioClock {
    runtime: Handle,
    anchor_wall: DateTime<Utc>,
    anchor: Instant,
}

impl TokioClock {
    /// Create a clock that spawns its timers onto `runtime`
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            anchor_wall: Utc::now(),
            anchor: Instant::now(),
        }
    }

    /// Create a clock on the current runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    /// Create a clock on the current runtime, if there is one
    pub fn try_current() -> Result<Self, TryCurrentError> {
        Handle::try_current().map(Self::new)
    }
}

impl ClockSource for TokioClock {
    type Handle = TokioTimerHandle;

    fn now(&self) -> DateTime<Utc> {
        TimeDelta::from_std(self.anchor.elapsed())
            .ok()
            .and_then(|elapsed| self.anchor_wall.checked_add_signed(elapsed))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn schedule(&self, delay: Duration, callback: Callback) -> TokioTimerHandle {
        let latch = Arc::new(CallbackLatch::new());
        let (deadline_tx, mut deadline_rx) = watch::channel(deadline_after(delay));

        let task_latch = Arc::clone(&latch);
        let task = self.runtime.spawn(async move {
            loop {
                let deadline = *deadline_rx.borrow_and_update();
                tokio::select! {
                    _ = sleep_until(deadline) => break,
                    // A dropped handle disables this branch; the sleep still completes
                    Ok(()) = deadline_rx.changed() => {}
                }
            }

            if task_latch.try_fire() {
                callback();
            }
        });

        TokioTimerHandle {
            latch,
            deadline: deadline_tx,
            task: task.abort_handle(),
        }
    }
}

fn deadline_after(delay: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(delay)
        // Roughly 30 years, far enough to never fire
        .unwrap_or_else(|| now + Duration::from_secs(86400 * 365 * 30))
}

/// Handle to a callback scheduled on a [`TokioClock`]
#[derive(Debug)]
pub struct TokioTimerHandle {
    latch: Arc<CallbackLatch>,
    deadline: watch::Sender<Instant>,
    task: AbortHandle,
}

impl ScheduledCallback for TokioTimerHandle {
    fn cancel(&self) -> bool {
        if self.latch.try_cancel() {
            self.task.abort();
            true
        } else {
            false
        }
    }

    fn reset(&self, delay: Duration) -> bool {
        if !self.latch.is_pending() {
            return false;
        }
        self.deadline.send_replace(deadline_after(delay));
        true
    }

    fn is_pending(&self) -> bool {
        self.latch.is_pending()
    }
}
