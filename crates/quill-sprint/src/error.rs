//! Error types for sprint operations.
//!
//! Input and permission errors carry the user-facing text in their `Display`
//! impl; callers prefix the mention of the user they reply to.

use quill_scheduler::StoreError;
use thiserror::Error;

/// Errors raised when delivering a message.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// The request never reached the chat service.
    #[error("message delivery failed: {0}")]
    Delivery(String),

    /// The chat service answered with an error status.
    #[error("chat service rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Errors that can occur in sprint operations.
#[derive(Debug, Error)]
pub enum SprintError {
    #[error("there is no sprint running on this server. Maybe you should start one? `/sprint for`")]
    NoActiveSprint,

    #[error(
        "there is already a sprint running here. Please wait until it has finished before creating a new one."
    )]
    AlreadyActive,

    #[error("you are not currently sprinting. Use `sprint join` to join.")]
    NotSprinting,

    #[error("the sprint hasn't started yet.")]
    NotStarted,

    #[error(
        "word count **{amount}** is less than the word count you started with (**{starting}**)!\nIf you joined with a starting word count, make sure to declare your new TOTAL word count, not just the amount you wrote in this sprint.\nIf you really are trying to lower your word count for this sprint, please run: `sprint wrote -{difference}` instead, to decrement your current word count"
    )]
    BelowStartingCount {
        amount: i64,
        starting: i64,
        difference: i64,
    },

    #[error("you joined the sprint as a non-wordcount user. You cannot declare a word count.")]
    NoWordcountParticipant,

    #[error(
        "did you really mean to submit **{written}** words? That would be **{wpm}** wpm. If you did, please increase this warning threshold by running `/mysetting maxwpm <wpm>` and then redeclare your word count."
    )]
    SuspiciousWpm { written: i64, wpm: f64 },

    #[error("you need to set a valid timezone in order to do this. Please see `help mysetting`")]
    InvalidTimezone,

    #[error("value must be a valid minute between 0 and 59")]
    InvalidMinute,

    #[error("that word count is too large.")]
    WordCountOutOfRange,

    #[error("you do not have a project with that shortname ({0})")]
    UnknownProject(String),

    #[error("you do not have permission to {0} this sprint")]
    PermissionDenied(&'static str),

    /// Persistence failure.
    #[error("sprint storage error: {0}")]
    Store(#[from] StoreError),

    /// Messaging failure.
    #[error(transparent)]
    Messaging(#[from] MessagingError),
}

impl SprintError {
    /// Whether this error should be shown to the user rather than logged.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, Self::Store(_) | Self::Messaging(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_below_start_is_distinct_from_not_sprinting() {
        let below = SprintError::BelowStartingCount {
            amount: 900,
            starting: 1000,
            difference: 100,
        };
        assert_ne!(below.to_string(), SprintError::NotSprinting.to_string());
        assert!(below.to_string().contains("`sprint wrote -100`"));
    }

    #[test]
    fn test_infrastructure_errors_are_not_user_facing() {
        assert!(SprintError::NotStarted.is_user_facing());
        assert!(!SprintError::Store(StoreError::Backend("locked".into())).is_user_facing());
        assert!(!SprintError::Messaging(MessagingError::Delivery("timeout".into())).is_user_facing());
    }
}
