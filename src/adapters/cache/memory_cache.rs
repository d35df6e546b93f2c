//! In-process counter cache backed by moka.
//!
//! Every entry carries its own TTL so that each `set` restarts the expiry
//! clock, independent of how long the entry has already lived.

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};

use crate::domain::models::CounterId;
use crate::domain::ports::{CacheError, CounterCache};

/// Default upper bound on cached counters.
pub const DEFAULT_MAX_CAPACITY: u64 = 100_000;

#[derive(Debug, Clone, Copy)]
struct CachedValue {
    value: i64,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<CounterId, CachedValue> for PerEntryTtl {
    fn expire_after_create(&self, _key: &CounterId, entry: &CachedValue, _created_at: Instant) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &CounterId,
        entry: &CachedValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Counter cache living in process memory.
#[derive(Clone)]
pub struct MokaCounterCache {
    entries: Cache<CounterId, CachedValue>,
}

impl MokaCounterCache {
    pub fn new(max_capacity: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        Self { entries }
    }
}

impl Default for MokaCounterCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CAPACITY)
    }
}

#[async_trait]
impl CounterCache for MokaCounterCache {
    async fn get(&self, id: CounterId) -> Result<Option<i64>, CacheError> {
        Ok(self.entries.get(&id).await.map(|entry| entry.value))
    }

    async fn set(&self, id: CounterId, value: i64, ttl: Duration) -> Result<(), CacheError> {
        self.entries.insert(id, CachedValue { value, ttl }).await;
        Ok(())
    }

    async fn delete(&self, id: CounterId) -> Result<(), CacheError> {
        self.entries.invalidate(&id).await;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = MokaCounterCache::default();
        cache.set(CounterId(1), 42, Duration::from_secs(60)).await.unwrap();

        assert_eq!(cache.get(CounterId(1)).await.unwrap(), Some(42));
        assert_eq!(cache.get(CounterId(2)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let cache = MokaCounterCache::default();
        cache.set(CounterId(1), 1, Duration::from_secs(60)).await.unwrap();

        cache.delete(CounterId(1)).await.unwrap();
        cache.delete(CounterId(1)).await.unwrap();
        assert_eq!(cache.get(CounterId(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_entries_expire_after_their_ttl() {
        let cache = MokaCounterCache::default();
        cache.set(CounterId(1), 5, Duration::from_millis(30)).await.unwrap();
        cache.set(CounterId(2), 6, Duration::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(cache.get(CounterId(1)).await.unwrap(), None);
        assert_eq!(cache.get(CounterId(2)).await.unwrap(), Some(6));
    }

    #[tokio::test]
    async fn test_overwrite_resets_ttl() {
        let cache = MokaCounterCache::default();
        cache.set(CounterId(1), 1, Duration::from_millis(30)).await.unwrap();
        cache.set(CounterId(1), 2, Duration::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(cache.get(CounterId(1)).await.unwrap(), Some(2));
    }
}
