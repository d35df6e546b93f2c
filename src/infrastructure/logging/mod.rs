//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON or pretty console output
//! - Rolling JSON log files
//! - Reporting of best-effort cache failures

pub mod cache_failures;
pub mod logger;

pub use cache_failures::TracingCacheSink;
pub use logger::LoggerImpl;
