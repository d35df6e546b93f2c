//! Controllable cache and sink doubles.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tally::adapters::cache::MokaCounterCache;
use tally::domain::ports::{CacheEventSink, CacheFailure, CacheOp};
use tally::{CacheError, CounterCache, CounterId};

/// In-memory cache whose individual operations can be made to fail.
#[derive(Default)]
pub struct FlakyCache {
    inner: MokaCounterCache,
    fail_get: AtomicBool,
    fail_set: AtomicBool,
    fail_delete: AtomicBool,
    hang_writes: AtomicBool,
}

impl FlakyCache {
    pub fn fail_gets(&self, on: bool) {
        self.fail_get.store(on, Ordering::SeqCst);
    }

    pub fn fail_sets(&self, on: bool) {
        self.fail_set.store(on, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, on: bool) {
        self.fail_delete.store(on, Ordering::SeqCst);
    }

    /// Make `set` and `delete` wait forever, as on a stalled connection.
    pub fn hang_writes(&self, on: bool) {
        self.hang_writes.store(on, Ordering::SeqCst);
    }

    async fn stall_if_hung(&self) {
        if self.hang_writes.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }

    /// Simulate expiry of one entry.
    pub async fn evict(&self, id: CounterId) {
        self.inner.delete(id).await.expect("moka delete cannot fail");
    }

    /// What the backend holds, bypassing failure injection.
    pub async fn peek(&self, id: CounterId) -> Option<i64> {
        self.inner.get(id).await.expect("moka get cannot fail")
    }

    fn check(flag: &AtomicBool) -> Result<(), CacheError> {
        if flag.load(Ordering::SeqCst) {
            Err(CacheError::Unavailable("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CounterCache for FlakyCache {
    async fn get(&self, id: CounterId) -> Result<Option<i64>, CacheError> {
        Self::check(&self.fail_get)?;
        self.inner.get(id).await
    }

    async fn set(&self, id: CounterId, value: i64, ttl: Duration) -> Result<(), CacheError> {
        self.stall_if_hung().await;
        Self::check(&self.fail_set)?;
        self.inner.set(id, value, ttl).await
    }

    async fn delete(&self, id: CounterId) -> Result<(), CacheError> {
        self.stall_if_hung().await;
        Self::check(&self.fail_delete)?;
        self.inner.delete(id).await
    }

    fn backend(&self) -> &'static str {
        "flaky"
    }
}

/// Sink that keeps every failure for inspection.
#[derive(Default)]
pub struct RecordingSink {
    failures: Mutex<Vec<CacheFailure>>,
}

impl RecordingSink {
    pub fn ops(&self) -> Vec<CacheOp> {
        self.failures.lock().unwrap().iter().map(|f| f.op).collect()
    }

    pub fn count(&self) -> usize {
        self.failures.lock().unwrap().len()
    }
}

impl CacheEventSink for RecordingSink {
    fn record(&self, failure: CacheFailure) {
        self.failures.lock().unwrap().push(failure);
    }
}
