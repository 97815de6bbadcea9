//! Error types for the scheduler.

use thiserror::Error;

/// Errors raised by a persistence backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend rejected or failed the operation.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A stored row could not be decoded.
    #[error("corrupt record in {table}: {reason}")]
    Corrupt { table: &'static str, reason: String },
}

/// Errors that can occur in scheduler operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Job store error.
    #[error("job store error: {0}")]
    Store(#[from] StoreError),

    /// Job kinds that must be handled have no registered handler.
    #[error("no handler registered for: {}", .0.join(", "))]
    MissingHandlers(Vec<String>),
}
