//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the async trait interfaces that infrastructure
//! adapters implement:
//! - CounterStore: durable, transactional storage of counters
//! - CounterCache: TTL-bounded fast copy of counter values
//! - CacheEventSink: where best-effort cache failures are reported
//!
//! The counter service depends only on these traits, so either store can be
//! swapped without touching the consistency policy.

pub mod cache_events;
pub mod counter_cache;
pub mod counter_store;
pub mod null_cache;

pub use cache_events::{CacheEventSink, CacheFailure, CacheOp};
pub use counter_cache::{CacheError, CounterCache};
pub use counter_store::{CounterStore, CounterTransaction};
pub use null_cache::NullCounterCache;
