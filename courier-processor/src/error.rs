//! Error types for the outbox processor

use thiserror::Error;

/// Result type alias for outbox store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failure talking to the outbox store
///
/// Always transient from the processor's point of view: the poll loop logs it
/// and tries again on its normal schedule.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Outbox store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Errors surfaced to the code embedding the processor
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// Rejected at `start()`; nothing was spawned
    #[error("Invalid processor configuration: {0}")]
    InvalidConfig(String),
}
