//! Tomato Timer - named pomodoro timers with pause and resume
//!
//! The core is [`TimerManager`]: it starts, pauses, resumes and stops
//! countdown timers keyed by string ids, keeps at most one live timer per id
//! and runs the caller's completion actions when a timer runs out. The HTTP
//! and Slack layers on top are thin glue.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use error::{TimerError, TimerResult};
pub use services::{ClockSource, IdGenerator, ManualClock, ScheduledCallback, TokioClock, UuidGenerator};
pub use state::{
    AppState, CompletionAction, MemoryStore, TimerManager, TimerSnapshot, TimerState, TimerStore,
};
pub use utils::signals::shutdown_signal;
