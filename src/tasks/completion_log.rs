//! Completion log background task

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::state::AppState;

/// Background task that logs and counts every finished pomodoro
pub async fn completion_log_task(state: Arc<AppState>) {
    info!("Starting completion log task");

    let mut completion_rx = state.completion_tx.subscribe();

    loop {
        match completion_rx.recv().await {
            Ok(event) => {
                state.record_completions(1);
                info!(
                    "Pomodoro {} ({:?}) finished at {}",
                    event.id, event.origin, event.finished_at
                );
            }
            Err(RecvError::Lagged(missed)) => {
                warn!("Completion log fell behind, {} events skipped", missed);
                state.record_completions(missed);
            }
            Err(RecvError::Closed) => {
                info!("Completion channel closed, stopping completion log task");
                break;
            }
        }
    }
}
