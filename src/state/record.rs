//! Stored state for one timer

use std::fmt;
use chrono::{DateTime, TimeDelta, Utc};

use crate::services::ScheduledCallback;
use super::{TimerSnapshot, TimerState};

/// Zero-argument callback run when a timer naturally expires
pub type CompletionAction = Box<dyn FnOnce() + Send + 'static>;

/// Where a record is in its lifecycle
pub(crate) enum Phase {
    /// Inserted; its callback is being registered outside the store lock
    Arming,
    /// Owns the one live scheduled callback
    Running(Box<dyn ScheduledCallback>),
    /// Callback canceled, remaining duration frozen
    Paused,
    /// Callback fired, completion actions taken and running
    Expiring,
}

/// One in-flight or paused pomodoro
pub struct TimerRecord {
    pub(crate) id: String,
    pub(crate) generation: u64,
    pub(crate) start_time: DateTime<Utc>,
    pub(crate) remaining: TimeDelta,
    pub(crate) phase: Phase,
    pub(crate) actions: Vec<CompletionAction>,
}

impl TimerRecord {
    pub(crate) fn new(
        id: String,
        generation: u64,
        start_time: DateTime<Utc>,
        remaining: TimeDelta,
        actions: Vec<CompletionAction>,
    ) -> Self {
        Self {
            id,
            generation,
            start_time,
            remaining,
            phase: Phase::Arming,
            actions,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> TimerState {
        match self.phase {
            Phase::Arming | Phase::Running(_) => TimerState::Running,
            Phase::Paused => TimerState::Paused,
            Phase::Expiring => TimerState::Expiring,
        }
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            id: self.id.clone(),
            state: self.state(),
            started_at: self.start_time,
            remaining: self.remaining,
        }
    }

    /// Cancel the live callback, if any. Returns whether it was still pending.
    pub(crate) fn disarm(&self) -> bool {
        match &self.phase {
            Phase::Running(handle) => handle.cancel(),
            _ => false,
        }
    }
}

impl fmt::Debug for TimerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerRecord")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .field("state", &self.state())
            .field("start_time", &self.start_time)
            .field("remaining", &self.remaining)
            .field("actions", &self.actions.len())
            .finish()
    }
}
