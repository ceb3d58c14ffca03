//! State management module
//!
//! This module contains the timer records, their store, the lifecycle
//! manager and the application state shared with the HTTP handlers.

pub mod app_state;
pub mod manager;
pub mod record;
pub mod store;
pub mod timer_state;

// Re-export main types
pub use app_state::{AppState, CompletionEvent, SlackSettings, TimerOrigin};
pub use manager::{parse_minutes, TimerManager, DEFAULT_DURATION_MINUTES};
pub use record::{CompletionAction, TimerRecord};
pub use store::{MemoryStore, TimerStore};
pub use timer_state::{TimerSnapshot, TimerState};
