//! Slack slash-command endpoint

use std::sync::Arc;
use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    error::TimerError,
    services::ClockSource,
    state::{app_state::format_duration, AppState, TimerOrigin, TimerSnapshot, TimerState, DEFAULT_DURATION_MINUTES},
};
use super::responses::SlackReply;

/// Form fields Slack posts for a slash command (unused fields omitted)
#[derive(Debug, Clone, Deserialize)]
pub struct SlashCommand {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    pub command: String,
    #[serde(default)]
    pub text: String,
}

/// What the user asked for in the command text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlackAction {
    Start(Option<i64>),
    Pause,
    Resume,
    Stop,
    Status,
    Help,
}

impl SlackAction {
    /// Parse `start [minutes]`, `pause`, `resume`, `stop` or `status`.
    /// Empty text starts a default-length timer; anything else asks for help.
    pub fn parse(text: &str) -> Self {
        let mut words = text.split_whitespace();
        let verb = words.next().map(str::to_ascii_lowercase);

        let action = match verb.as_deref() {
            None | Some("start") => match words.next() {
                None => Self::Start(None),
                Some(minutes) => match minutes.parse() {
                    Ok(minutes) => Self::Start(Some(minutes)),
                    Err(_) => Self::Help,
                },
            },
            Some("pause") => Self::Pause,
            Some("resume") => Self::Resume,
            Some("stop") => Self::Stop,
            Some("status") => Self::Status,
            _ => Self::Help,
        };

        if words.next().is_some() {
            return Self::Help;
        }
        action
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Start(_) => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
            Self::Status => "status",
            Self::Help => "help",
        }
    }
}

/// Compare the request token with the configured one in constant time.
/// A missing or empty configured token rejects everything.
pub fn verify_token(expected: Option<&str>, provided: &str) -> bool {
    let Some(expected) = expected.filter(|token| !token.is_empty()) else {
        return false;
    };
    let (expected, provided) = (expected.as_bytes(), provided.as_bytes());
    expected.len() == provided.len()
        && expected
            .iter()
            .zip(provided)
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}

/// Handle POST /slack/command
pub async fn slash_command_handler(
    State(state): State<Arc<AppState>>,
    Form(command): Form<SlashCommand>,
) -> Response {
    if !verify_token(state.slack.token.as_deref(), &command.token) {
        warn!("Rejected slash command from team {:?}: bad verification token", command.team_id);
        return StatusCode::UNAUTHORIZED.into_response();
    }

    if command.command != state.slack.command {
        debug!("Ignoring unknown slash command {}", command.command);
        return StatusCode::NO_CONTENT.into_response();
    }

    let action = SlackAction::parse(&command.text);
    debug!("Slash command from {} ({}): {:?}", command.user_name, command.user_id, action);

    let text = run_action(&state, &command.user_id, action);
    Json(SlackReply::ephemeral(text)).into_response()
}

fn run_action(state: &AppState, user_id: &str, action: SlackAction) -> String {
    let timers = &state.timers;
    let slash = &state.slack.command;

    let result = match action {
        SlackAction::Help => return usage(slash),
        SlackAction::Start(minutes) => {
            let id = if user_id.trim().is_empty() {
                timers.generate_id()
            } else {
                user_id.to_string()
            };
            let minutes = minutes.unwrap_or(0);
            let actions = vec![state.completion_action(&id, TimerOrigin::Slack)];
            timers.start(&id, None, minutes, actions).map(|_| {
                let minutes = if minutes == 0 { DEFAULT_DURATION_MINUTES } else { minutes };
                format!("Starting a {} minute pomodoro. Focus time!", minutes)
            })
        }
        SlackAction::Pause => timers
            .pause(user_id)
            .and_then(|()| timers.status(user_id))
            .map(|snapshot| describe(state, &snapshot)),
        SlackAction::Resume => timers
            .resume(user_id)
            .and_then(|()| timers.status(user_id))
            .map(|snapshot| describe(state, &snapshot)),
        SlackAction::Stop => timers
            .stop(user_id)
            .map(|()| "Pomodoro stopped.".to_string()),
        SlackAction::Status => timers.status(user_id).map(|snapshot| describe(state, &snapshot)),
    };

    match result {
        Ok(text) => {
            state.record_action(action.name());
            text
        }
        Err(err) => error_text(slash, &err),
    }
}

fn describe(state: &AppState, snapshot: &TimerSnapshot) -> String {
    let remaining = snapshot.remaining_at(state.timers.clock().now());
    let left = format_duration(remaining.num_seconds().max(0) as u64);
    match snapshot.state {
        TimerState::Running => format!("Your pomodoro is running, {} left.", left),
        TimerState::Paused => format!("Your pomodoro is paused with {} left.", left),
        TimerState::Expiring => "Your pomodoro just finished.".to_string(),
    }
}

fn error_text(slash: &str, err: &TimerError) -> String {
    match err {
        TimerError::NotFound { .. } => {
            format!("You don't have a pomodoro going. Start one with `{} start`.", slash)
        }
        TimerError::InvalidState { state, .. } => format!("Your pomodoro is already {}.", state),
        TimerError::InvalidArgument(_) => "Could not tell who you are, try again.".to_string(),
        TimerError::Internal(_) => format!("Something went wrong: {}", err),
    }
}

fn usage(slash: &str) -> String {
    format!(
        "Usage: `{0} start [minutes]`, `{0} pause`, `{0} resume`, `{0} stop` or `{0} status`",
        slash
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_text() {
        assert_eq!(SlackAction::parse(""), SlackAction::Start(None));
        assert_eq!(SlackAction::parse("  start "), SlackAction::Start(None));
        assert_eq!(SlackAction::parse("START 25"), SlackAction::Start(Some(25)));
        assert_eq!(SlackAction::parse("pause"), SlackAction::Pause);
        assert_eq!(SlackAction::parse("resume"), SlackAction::Resume);
        assert_eq!(SlackAction::parse("stop"), SlackAction::Stop);
        assert_eq!(SlackAction::parse("status"), SlackAction::Status);
        assert_eq!(SlackAction::parse("start soon"), SlackAction::Help);
        assert_eq!(SlackAction::parse("pause now please"), SlackAction::Help);
        assert_eq!(SlackAction::parse("dance"), SlackAction::Help);
    }

    #[test]
    fn token_verification() {
        assert!(verify_token(Some("secret"), "secret"));
        assert!(!verify_token(Some("secret"), "secreT"));
        assert!(!verify_token(Some("secret"), "secret2"));
        assert!(!verify_token(Some(""), ""));
        assert!(!verify_token(None, "secret"));
    }
}
