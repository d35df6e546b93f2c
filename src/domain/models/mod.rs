//! Domain models for the tally counter system.

pub mod config;
pub mod context;
pub mod counter;

pub use config::{
    CacheBackend, CacheConfig, Config, DatabaseConfig, LoggingConfig, RateLimitConfig,
    ServerConfig,
};
pub use context::{CallContext, Interrupted};
pub use counter::{
    validate_name, Counter, CounterId, CounterReading, ReadSource, COUNTER_TTL, MAX_NAME_LEN,
    MIN_NAME_LEN,
};
