//! API request and response structures

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::TimerError,
    state::{TimerSnapshot, TimerState},
};

/// Body of `POST /timers`; every field is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartTimerRequest {
    pub id: Option<String>,
    /// Whole minutes, zero or absent for the default
    pub minutes: Option<i64>,
    /// Exact length in seconds; takes precedence over `minutes`
    pub seconds: Option<u64>,
    pub start_time: Option<DateTime<Utc>>,
}

/// Generic acknowledgement for control endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ApiResponse {
    pub fn new(status: &str, message: String) -> Self {
        Self {
            status: status.to_string(),
            message,
            timestamp: Utc::now(),
        }
    }
}

/// One timer as seen at `timestamp`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerResponse {
    pub id: String,
    pub state: TimerState,
    pub started_at: DateTime<Utc>,
    pub remaining_seconds: i64,
    pub timestamp: DateTime<Utc>,
}

impl TimerResponse {
    pub fn from_snapshot(snapshot: &TimerSnapshot, now: DateTime<Utc>) -> Self {
        Self {
            id: snapshot.id.clone(),
            state: snapshot.state,
            started_at: snapshot.started_at,
            remaining_seconds: snapshot.remaining_at(now).num_seconds(),
            timestamp: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerListResponse {
    pub count: usize,
    pub ids: Vec<String>,
}

/// Server status with timer counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub active_timers: usize,
    pub completed_timers: u64,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub kind: String,
    pub message: String,
}

/// Timer failure rendered as an HTTP error
#[derive(Debug)]
pub struct ApiError(pub TimerError);

impl From<TimerError> for ApiError {
    fn from(err: TimerError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self.0 {
            TimerError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            TimerError::NotFound { .. } => StatusCode::NOT_FOUND,
            TimerError::InvalidState { .. } => StatusCode::CONFLICT,
            TimerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            status: "error".to_string(),
            kind: self.0.kind().to_string(),
            message: self.0.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Reply to a Slack slash command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackReply {
    pub response_type: String,
    pub text: String,
}

impl SlackReply {
    /// Visible only to the user who ran the command
    pub fn ephemeral(text: String) -> Self {
        Self {
            response_type: "ephemeral".to_string(),
            text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_map_to_status_codes() {
        let cases = [
            (TimerError::InvalidArgument("x".into()), StatusCode::BAD_REQUEST),
            (TimerError::not_found("a"), StatusCode::NOT_FOUND),
            (
                TimerError::InvalidState {
                    id: "a".into(),
                    state: TimerState::Paused,
                    operation: "pause",
                },
                StatusCode::CONFLICT,
            ),
            (TimerError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status_code(), status);
        }
    }
}
