//! Fast cache port.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::domain::models::CounterId;

/// Failures of the fast cache.
///
/// Deliberately not convertible into [`DomainError`](crate::domain::DomainError):
/// the cache never decides the outcome of an operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt cache entry {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("cache call timed out")]
    Timeout,

    #[error("cache call cancelled")]
    Cancelled,
}

/// TTL-bounded key/value copy of counter values.
#[async_trait]
pub trait CounterCache: Send + Sync {
    /// Cached value, or `None` on a miss.
    async fn get(&self, id: CounterId) -> Result<Option<i64>, CacheError>;

    /// Store `value` and (re)start its expiry at `ttl`.
    async fn set(&self, id: CounterId, value: i64, ttl: Duration) -> Result<(), CacheError>;

    /// Remove the entry. Removing a missing entry succeeds.
    async fn delete(&self, id: CounterId) -> Result<(), CacheError>;

    /// Short backend name used in logs.
    fn backend(&self) -> &'static str;
}
