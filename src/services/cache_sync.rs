//! Best-effort propagation of counter values into the fast cache.

use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::models::{CallContext, CounterId, Interrupted, COUNTER_TTL};
use crate::domain::ports::{CacheError, CacheEventSink, CacheFailure, CacheOp, CounterCache};

/// Wraps a [`CounterCache`] so that no cache outcome can fail a counter
/// operation.
///
/// Failures are handed to the [`CacheEventSink`]. Every write or delete
/// quarantines the id before touching the cache and lifts the quarantine
/// only once the cache call succeeds, so a call that fails or is dropped
/// midway leaves the id quarantined: lookups report a miss, since the
/// backend may still hold an outdated value. The quarantine lapses after
/// one cache TTL, by which time any outdated entry has expired too.
pub struct CacheSync {
    cache: Arc<dyn CounterCache>,
    sink: Arc<dyn CacheEventSink>,
    quarantine: Cache<CounterId, ()>,
    op_timeout: Option<Duration>,
    ttl: Duration,
}

impl CacheSync {
    pub fn new(cache: Arc<dyn CounterCache>, sink: Arc<dyn CacheEventSink>) -> Self {
        Self::with_ttl(cache, sink, COUNTER_TTL)
    }

    pub fn with_ttl(cache: Arc<dyn CounterCache>, sink: Arc<dyn CacheEventSink>, ttl: Duration) -> Self {
        Self {
            cache,
            sink,
            quarantine: Cache::builder().time_to_live(ttl).build(),
            op_timeout: None,
            ttl,
        }
    }

    /// Cap every cache call at `timeout`, in addition to the caller's deadline.
    #[must_use]
    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = Some(timeout);
        self
    }

    pub fn backend(&self) -> &'static str {
        self.cache.backend()
    }

    pub fn is_quarantined(&self, id: CounterId) -> bool {
        self.quarantine.contains_key(&id)
    }

    /// Cached value for `id`, or `None` on a miss, a failure, or quarantine.
    pub async fn lookup(&self, ctx: &CallContext, id: CounterId) -> Option<i64> {
        if self.is_quarantined(id) {
            return None;
        }

        match self.call(ctx, self.cache.get(id)).await {
            Ok(value) => value,
            Err(error) => {
                self.report(CacheOp::Lookup, id, error);
                None
            }
        }
    }

    /// Write the starting value of a newly created counter.
    pub async fn seed(&self, ctx: &CallContext, id: CounterId, value: i64) {
        self.write(ctx, CacheOp::Seed, id, value).await;
    }

    /// Write the current durable value, restarting its TTL.
    pub async fn refresh(&self, ctx: &CallContext, id: CounterId, value: i64) {
        self.write(ctx, CacheOp::Refresh, id, value).await;
    }

    /// Drop the cached value of a deleted counter.
    pub async fn invalidate(&self, ctx: &CallContext, id: CounterId) {
        self.quarantine.insert(id, ());
        match self.call(ctx, self.cache.delete(id)).await {
            Ok(()) => self.quarantine.invalidate(&id),
            Err(error) => self.report(CacheOp::Invalidate, id, error),
        }
    }

    async fn write(&self, ctx: &CallContext, op: CacheOp, id: CounterId, value: i64) {
        self.quarantine.insert(id, ());
        match self.call(ctx, self.cache.set(id, value, self.ttl)).await {
            Ok(()) => self.quarantine.invalidate(&id),
            Err(error) => self.report(op, id, error),
        }
    }

    async fn call<F, T>(&self, ctx: &CallContext, fut: F) -> Result<T, CacheError>
    where
        F: std::future::Future<Output = Result<T, CacheError>>,
    {
        match ctx.run_bounded(self.op_timeout, fut).await {
            Ok(result) => result,
            Err(Interrupted::DeadlineExceeded) => Err(CacheError::Timeout),
            Err(Interrupted::Cancelled) => Err(CacheError::Cancelled),
        }
    }

    fn report(&self, op: CacheOp, id: CounterId, error: CacheError) {
        self.sink.record(CacheFailure::new(op, id, self.cache.backend(), error));
    }
}
