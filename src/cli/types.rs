//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cli::commands::counter::CounterCommands;
use crate::cli::commands::init::InitArgs;
use crate::cli::commands::serve::ServeArgs;

#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(about = "tally - durable counters with a read-through cache", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Config file to use instead of .tally/config.yaml and .tally/local.yaml
    #[arg(short, long, global = true, env = "TALLY_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize tally configuration and database
    Init(InitArgs),

    /// Run the HTTP server
    Serve(ServeArgs),

    #[command(flatten)]
    Counter(CounterCommands),
}
