//! Domain errors for the tally counter system.

use thiserror::Error;

use crate::domain::models::{CounterId, Interrupted};

/// Domain-level errors surfaced by counter operations.
///
/// The durable store decides success or failure of every operation, so
/// every variant here originates either in the store, in input validation,
/// or in the caller's deadline. Cache failures have their own type
/// ([`CacheError`](crate::domain::ports::CacheError)) and no conversion
/// into this one.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Counter not found: {0}")]
    CounterNotFound(CounterId),

    #[error("Counter name already taken: {0}")]
    DuplicateName(String),

    #[error("Durable store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Counter {id} would overflow when adding {amount}")]
    ValueOverflow { id: CounterId, amount: i64 },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Operation cancelled")]
    Cancelled,
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Machine-readable code used by the HTTP and CLI surfaces.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::CounterNotFound(_) => "COUNTER_NOT_FOUND",
            Self::DuplicateName(_) => "DUPLICATE_NAME",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::ValidationFailed(_) => "VALIDATION_FAILED",
            Self::ValueOverflow { .. } => "VALUE_OVERFLOW",
            Self::SerializationError(_) => "SERIALIZATION_ERROR",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::StoreUnavailable(err.to_string())
    }
}

impl From<Interrupted> for DomainError {
    fn from(interrupted: Interrupted) -> Self {
        match interrupted {
            Interrupted::DeadlineExceeded => DomainError::DeadlineExceeded,
            Interrupted::Cancelled => DomainError::Cancelled,
        }
    }
}
