//! Error types for timer lifecycle operations

use thiserror::Error;

use crate::state::TimerState;

/// Errors returned by [`TimerManager`](crate::state::TimerManager) operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    /// The caller passed an empty or blank identifier
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No timer exists for the identifier (or it has already elapsed)
    #[error("no timer associated with id {id:?}: {reason}")]
    NotFound { id: String, reason: &'static str },

    /// The timer exists but is not in a state that allows the operation
    #[error("timer {id:?} is {state}, cannot {operation}")]
    InvalidState {
        id: String,
        state: TimerState,
        operation: &'static str,
    },

    /// Defensive failures that should not happen with valid input
    #[error("internal failure: {0}")]
    Internal(String),
}

impl TimerError {
    pub(crate) fn not_found(id: &str) -> Self {
        Self::NotFound {
            id: id.to_string(),
            reason: "no such timer",
        }
    }

    pub(crate) fn elapsed(id: &str) -> Self {
        Self::NotFound {
            id: id.to_string(),
            reason: "timer has already elapsed",
        }
    }

    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotFound { .. } => "not_found",
            Self::InvalidState { .. } => "invalid_state",
            Self::Internal(_) => "internal",
        }
    }
}

pub type TimerResult<T> = Result<T, TimerError>;
