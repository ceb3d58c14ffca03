//! Application state shared by the HTTP handlers and background tasks

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Instant,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::{CompletionAction, TimerManager};

/// How a finished timer was started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerOrigin {
    Slack,
    Api,
}

/// Published every time a timer started through this server runs out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub id: String,
    pub origin: TimerOrigin,
    pub finished_at: DateTime<Utc>,
}

/// Slash-command verification settings
#[derive(Debug, Clone)]
pub struct SlackSettings {
    /// Expected verification token; without one every request is rejected
    pub token: Option<String>,
    /// Command name this server answers, e.g. `/gomato`
    pub command: String,
}

/// Main application state
#[derive(Debug)]
pub struct AppState {
    pub timers: TimerManager,
    pub slack: SlackSettings,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Mutex<Option<String>>,
    pub last_action_time: Mutex<Option<DateTime<Utc>>>,
    /// Finished-timer notifications
    pub completion_tx: broadcast::Sender<CompletionEvent>,
    pub completed_total: AtomicU64,
}

impl AppState {
    pub fn new(timers: TimerManager, slack: SlackSettings, port: u16, host: String) -> Self {
        let (completion_tx, _) = broadcast::channel(100);

        Self {
            timers,
            slack,
            start_time: Instant::now(),
            port,
            host,
            last_action: Mutex::new(None),
            last_action_time: Mutex::new(None),
            completion_tx,
            completed_total: AtomicU64::new(0),
        }
    }

    /// Completion action that announces the timer on the completion channel
    pub fn completion_action(&self, id: &str, origin: TimerOrigin) -> CompletionAction {
        let tx = self.completion_tx.clone();
        let id = id.to_string();
        Box::new(move || {
            let event = CompletionEvent {
                id,
                origin,
                finished_at: Utc::now(),
            };
            // No subscribers is fine; the timer still finished
            if tx.send(event).is_err() {
                debug!("No listeners for timer completion");
            }
        })
    }

    /// Remember the last control action for the status endpoint
    pub fn record_action(&self, action: &str) {
        info!("Timer action: {}", action);
        *self.last_action.lock() = Some(action.to_string());
        *self.last_action_time.lock() = Some(Utc::now());
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        (self.last_action.lock().clone(), *self.last_action_time.lock())
    }

    pub fn record_completions(&self, count: u64) {
        self.completed_total.fetch_add(count, Ordering::Relaxed);
    }

    pub fn completed_total(&self) -> u64 {
        self.completed_total.load(Ordering::Relaxed)
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        format_duration(self.start_time.elapsed().as_secs())
    }
}

/// Render seconds as `1h 2m 3s`, dropping leading zero units
pub fn format_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
