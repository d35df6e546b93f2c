//! Redis-backed counter cache shared between instances.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

use crate::domain::models::CounterId;
use crate::domain::ports::{CacheError, CounterCache};

const KEY_PREFIX: &str = "counter:value";

/// Redis key holding the cached value of `id`.
pub fn counter_key(id: CounterId) -> String {
    format!("{KEY_PREFIX}:{id}")
}

fn map_redis_error(err: &redis::RedisError) -> CacheError {
    if err.is_timeout() {
        CacheError::Timeout
    } else {
        CacheError::Unavailable(err.to_string())
    }
}

/// Counter cache stored as plain string values with `EX` expiry.
///
/// `ConnectionManager` reconnects on its own after a dropped connection, so
/// one failing call does not poison later ones.
#[derive(Clone)]
pub struct RedisCounterCache {
    conn: ConnectionManager,
}

impl RedisCounterCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Open a managed connection to `redis_url`.
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url).map_err(|e| map_redis_error(&e))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| map_redis_error(&e))?;
        Ok(Self::new(conn))
    }
}

#[async_trait]
impl CounterCache for RedisCounterCache {
    async fn get(&self, id: CounterId) -> Result<Option<i64>, CacheError> {
        let key = counter_key(id);
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(&key).await.map_err(|e| map_redis_error(&e))?;

        raw.map(|s| {
            s.parse::<i64>().map_err(|e| CacheError::Corrupt {
                key: key.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
    }

    async fn set(&self, id: CounterId, value: i64, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(counter_key(id))
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| map_redis_error(&e))
    }

    async fn delete(&self, id: CounterId) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(counter_key(id))
            .await
            .map_err(|e| map_redis_error(&e))
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_key_format() {
        assert_eq!(counter_key(CounterId(17)), "counter:value:17");
        assert_eq!(counter_key(CounterId(-3)), "counter:value:-3");
    }

    #[tokio::test]
    async fn test_connect_rejects_malformed_url() {
        let result = RedisCounterCache::connect("not a url").await;
        assert!(matches!(result, Err(CacheError::Unavailable(_))));
    }

    #[tokio::test]
    #[ignore = "requires a running Redis at REDIS_URL"]
    async fn test_round_trip_against_live_redis() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let cache = RedisCounterCache::connect(&url).await.unwrap();
        let id = CounterId(9_000_001);

        cache.set(id, 12, Duration::from_secs(30)).await.unwrap();
        assert_eq!(cache.get(id).await.unwrap(), Some(12));

        cache.delete(id).await.unwrap();
        assert_eq!(cache.get(id).await.unwrap(), None);
    }
}
