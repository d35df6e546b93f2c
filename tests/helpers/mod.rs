//! Shared fixtures for integration tests.

#![allow(dead_code)]

pub mod cache;
pub mod database;

use std::sync::Arc;

use tally::adapters::sqlite::SqliteCounterStore;
use tally::{CacheSync, CounterService};

use cache::{FlakyCache, RecordingSink};

/// A service over a fresh in-memory database and a controllable cache.
pub struct Harness {
    pub service: Arc<CounterService<SqliteCounterStore>>,
    pub cache: Arc<FlakyCache>,
    pub sink: Arc<RecordingSink>,
}

pub async fn harness() -> Harness {
    let pool = database::setup_test_db().await;
    harness_over(SqliteCounterStore::new(pool))
}

pub fn harness_over(store: SqliteCounterStore) -> Harness {
    let cache = Arc::new(FlakyCache::default());
    let sink = Arc::new(RecordingSink::default());
    let sync = CacheSync::new(cache.clone(), sink.clone());

    Harness {
        service: Arc::new(CounterService::new(Arc::new(store), sync)),
        cache,
        sink,
    }
}
