//! Error types for goal operations.

use quill_scheduler::StoreError;
use thiserror::Error;

/// Errors that can occur in goal operations.
#[derive(Debug, Error)]
pub enum GoalError {
    /// The owner's timezone setting is not a known IANA name.
    #[error("invalid timezone ({timezone}) for user {user}")]
    InvalidTimezone { user: u64, timezone: String },

    #[error("goal must be a positive number of words")]
    InvalidTarget,

    /// A period boundary fell outside the representable calendar.
    #[error("no {period} boundary after timestamp {at}")]
    OutOfRange { period: &'static str, at: i64 },

    #[error("goal storage error: {0}")]
    Store(#[from] StoreError),
}
