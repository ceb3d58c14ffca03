//! Platform facilities the timer core depends on
//!
//! This module contains the clock sources (real and manual) and the
//! identifier generators injected into the timer manager.

pub mod clock;
pub mod ids;
pub mod manual_clock;

// Re-export main types
pub use clock::{Callback, CallbackLatch, ClockSource, ScheduledCallback, TokioClock, TokioTimerHandle};
pub use ids::{IdGenerator, SequentialIds, UuidGenerator};
pub use manual_clock::{ManualClock, ManualTimerHandle};
