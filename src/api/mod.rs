//! HTTP API module
//!
//! This module contains the Slack slash-command endpoint, the JSON timer
//! endpoints and their response structures.

pub mod handlers;
pub mod responses;
pub mod slack;

use std::sync::Arc;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;
use slack::slash_command_handler;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/slack/command", post(slash_command_handler))
        .route("/timers", get(list_timers_handler).post(create_timer_handler))
        .route("/timers/:id", get(get_timer_handler).delete(stop_timer_handler))
        .route("/timers/:id/pause", post(pause_timer_handler))
        .route("/timers/:id/resume", post(resume_timer_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
