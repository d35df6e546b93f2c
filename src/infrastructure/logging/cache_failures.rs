//! Default sink for best-effort cache failures.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::ports::{CacheEventSink, CacheFailure};

/// Logs each cache failure at `warn` and counts them.
#[derive(Debug, Default)]
pub struct TracingCacheSink {
    failures: AtomicU64,
}

impl TracingCacheSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Failures recorded since startup.
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

impl CacheEventSink for TracingCacheSink {
    fn record(&self, failure: CacheFailure) {
        let total = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::warn!(
            op = %failure.op,
            counter_id = %failure.counter_id,
            backend = failure.backend,
            error = %failure.error,
            occurred_at = %failure.occurred_at.to_rfc3339(),
            total_failures = total,
            "cache operation failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::CounterId;
    use crate::domain::ports::{CacheError, CacheOp};

    #[test]
    fn test_counts_failures() {
        let sink = TracingCacheSink::new();
        sink.record(CacheFailure::new(CacheOp::Refresh, CounterId(1), "redis", CacheError::Timeout));
        sink.record(CacheFailure::new(
            CacheOp::Invalidate,
            CounterId(2),
            "redis",
            CacheError::Unavailable("connection refused".to_string()),
        ));
        assert_eq!(sink.failure_count(), 2);
    }
}
