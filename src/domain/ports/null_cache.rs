//! Null counter cache implementation.
//!
//! Used when caching is disabled but the service still needs a
//! CounterCache. Every read is a miss, so every read hits the store.

use async_trait::async_trait;
use std::time::Duration;

use super::{CacheError, CounterCache};
use crate::domain::models::CounterId;

/// A no-op cache that stores nothing.
#[derive(Debug, Clone, Default)]
pub struct NullCounterCache;

impl NullCounterCache {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CounterCache for NullCounterCache {
    async fn get(&self, _id: CounterId) -> Result<Option<i64>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _id: CounterId, _value: i64, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _id: CounterId) -> Result<(), CacheError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "none"
    }
}
