//! tally CLI entry point.

use anyhow::Result;
use clap::Parser;

use tally::cli::commands::{counter, init, serve};
use tally::cli::{Cli, Commands};
use tally::ConfigLoader;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = run(cli).await {
        tally::cli::handle_error(err, json);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init(args) => init::execute(args, cli.json).await,
        Commands::Serve(args) => {
            let config = ConfigLoader::resolve(cli.config.as_deref())?;
            serve::execute(args, config).await
        }
        Commands::Counter(command) => {
            let config = ConfigLoader::resolve(cli.config.as_deref())?;
            counter::execute(command, config, cli.json).await
        }
    }
}
