//! CLI command implementations.

pub mod counter;
pub mod init;
pub mod serve;
