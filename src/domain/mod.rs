//! Domain layer for the tally counter system
//!
//! Counter models, the per-call context, domain errors, and the port traits
//! that the durable store and fast cache adapters implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
