//! Fast cache adapters for counter values.
//!
//! Both adapters implement [`CounterCache`](crate::domain::ports::CounterCache):
//! an in-process `moka` cache for single-instance deployments and a Redis
//! cache shared between instances.

pub mod memory_cache;
pub mod redis_cache;

pub use memory_cache::MokaCounterCache;
pub use redis_cache::{counter_key, RedisCounterCache};
