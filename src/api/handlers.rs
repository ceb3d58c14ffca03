//! HTTP endpoint handlers for the JSON timer API

use std::{sync::Arc, time::Duration};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::info;

use crate::{
    services::ClockSource,
    state::{AppState, TimerOrigin, TimerStore},
};
use super::responses::{
    ApiError, ApiResponse, HealthResponse, StartTimerRequest, StatusResponse, TimerListResponse,
    TimerResponse,
};

/// Handle POST /timers - Start (or restart) a timer
pub async fn create_timer_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartTimerRequest>,
) -> Result<(StatusCode, Json<TimerResponse>), ApiError> {
    let timers = &state.timers;
    let id = request
        .id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| timers.generate_id());
    let actions = vec![state.completion_action(&id, TimerOrigin::Api)];

    let id = match request.seconds {
        Some(seconds) => timers.start_with_duration(
            &id,
            request.start_time,
            Duration::from_secs(seconds),
            actions,
        )?,
        None => timers.start(&id, request.start_time, request.minutes.unwrap_or(0), actions)?,
    };
    state.record_action("start");

    let snapshot = timers.status(&id)?;
    Ok((
        StatusCode::CREATED,
        Json(TimerResponse::from_snapshot(&snapshot, timers.clock().now())),
    ))
}

/// Handle GET /timers - List active timer ids
pub async fn list_timers_handler(State(state): State<Arc<AppState>>) -> Json<TimerListResponse> {
    let ids = state.timers.active_ids();
    Json(TimerListResponse {
        count: ids.len(),
        ids,
    })
}

/// Handle GET /timers/:id - Inspect one timer
pub async fn get_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TimerResponse>, ApiError> {
    let snapshot = state.timers.status(&id)?;
    Ok(Json(TimerResponse::from_snapshot(
        &snapshot,
        state.timers.clock().now(),
    )))
}

/// Handle POST /timers/:id/pause
pub async fn pause_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TimerResponse>, ApiError> {
    state.timers.pause(&id)?;
    state.record_action("pause");
    get_timer_handler(State(state), Path(id)).await
}

/// Handle POST /timers/:id/resume
pub async fn resume_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TimerResponse>, ApiError> {
    state.timers.resume(&id)?;
    state.record_action("resume");
    get_timer_handler(State(state), Path(id)).await
}

/// Handle DELETE /timers/:id - Stop without running completion actions
pub async fn stop_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse>, ApiError> {
    state.timers.stop(&id)?;
    state.record_action("stop");
    info!("Timer {} stopped via API", id);
    Ok(Json(ApiResponse::new("stopped", format!("Timer {} stopped", id))))
}

/// Handle GET /status - Return server and timer counters
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let (last_action, last_action_time) = state.get_last_action();

    Json(StatusResponse {
        active_timers: state.timers.store().len(),
        completed_timers: state.completed_total(),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    })
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
