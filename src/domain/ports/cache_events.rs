//! Error channel for best-effort cache operations.

use chrono::{DateTime, Utc};
use std::fmt;

use super::CacheError;
use crate::domain::models::CounterId;

/// Which best-effort cache operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOp {
    Lookup,
    Seed,
    Refresh,
    Invalidate,
}

impl CacheOp {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Lookup => "lookup",
            Self::Seed => "seed",
            Self::Refresh => "refresh",
            Self::Invalidate => "invalidate",
        }
    }
}

impl fmt::Display for CacheOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed cache operation.
#[derive(Debug, Clone)]
pub struct CacheFailure {
    pub op: CacheOp,
    pub counter_id: CounterId,
    pub backend: &'static str,
    pub error: CacheError,
    pub occurred_at: DateTime<Utc>,
}

impl CacheFailure {
    pub fn new(op: CacheOp, counter_id: CounterId, backend: &'static str, error: CacheError) -> Self {
        Self {
            op,
            counter_id,
            backend,
            error,
            occurred_at: Utc::now(),
        }
    }
}

/// Receives cache failures. Recording must not block or fail.
pub trait CacheEventSink: Send + Sync {
    fn record(&self, failure: CacheFailure);
}
