//! tally - durable per-entity counters with a read-through, write-through cache
//!
//! Every counter lives in a durable store (SQLite) and is mirrored in a fast
//! cache (in-process or Redis). Reads are served from the cache when
//! possible; writes commit to the store first and then refresh the cache.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, errors and the store/cache ports
//! - **Service Layer** (`services`): The consistency policy over both stores
//! - **Adapters** (`adapters`): SQLite, moka, Redis and HTTP implementations
//! - **Infrastructure Layer** (`infrastructure`): Config, logging, wiring
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use tally::domain::models::CallContext;
//! use tally::infrastructure::setup::build_counter_runtime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = tally::ConfigLoader::load()?;
//!     let runtime = build_counter_runtime(&config).await?;
//!     let ctx = CallContext::background();
//!     let counter = runtime.service.create(&ctx, "visits").await?;
//!     runtime.service.increment(&ctx, counter.id, 1).await?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    CallContext, Config, Counter, CounterId, CounterReading, ReadSource, COUNTER_TTL,
};
pub use domain::ports::{CacheError, CounterCache, CounterStore};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{CacheSync, CounterService};
