//! Session error types.
//!
//! Validation and re-entry failures are surfaced to the participant as
//! user-facing messages. Scoring outcomes (timeouts, a failed ladder) are
//! never errors.

use thiserror::Error;

use crate::model::TaskKind;
use crate::session::Phase;

/// Errors that can occur while driving a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The participant ID is not a non-empty string of digits.
    #[error("participant ID must contain digits only, got '{0}'")]
    InvalidParticipantId(String),

    /// The week number is not an integer in the accepted range.
    #[error("{}", invalid_week_message(.input, .max_week))]
    InvalidWeek { input: String, max_week: Option<u32> },

    /// This participant already completed the battery for this week.
    #[error("participant {participant_id} has already completed week {week}")]
    AlreadyCompleted { participant_id: String, week: u32 },

    /// The command is not valid in the current phase.
    #[error("cannot {action} during {phase}")]
    InvalidTransition { action: &'static str, phase: Phase },

    /// The chosen task was already completed in this session.
    #[error("the {0} task is already completed")]
    TaskAlreadyCompleted(TaskKind),

    /// Reading or writing the completion lock failed.
    #[error("completion lock store failed: {0:#}")]
    LockStore(#[from] anyhow::Error),
}

fn invalid_week_message(input: &str, max_week: &Option<u32>) -> String {
    match max_week {
        Some(max) => format!("week number must be a whole number from 1 to {max}, got '{input}'"),
        None => format!("week number must be a whole number of 1 or higher, got '{input}'"),
    }
}

impl SessionError {
    /// Returns `true` if the participant can correct the input and retry setup.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::InvalidParticipantId(_) | SessionError::InvalidWeek { .. }
        )
    }
}
