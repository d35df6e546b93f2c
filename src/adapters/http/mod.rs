//! HTTP transport for counter operations.

pub mod counters_http;
pub mod rate_limit;

pub use counters_http::{CountersHttpConfig, CountersHttpServer, ErrorResponse};
