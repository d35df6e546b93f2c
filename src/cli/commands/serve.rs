//! Implementation of the `tally serve` command.

use anyhow::{anyhow, Result};
use clap::Args;

use crate::adapters::http::{CountersHttpConfig, CountersHttpServer};
use crate::domain::models::Config;
use crate::infrastructure::logging::LoggerImpl;
use crate::infrastructure::setup::build_counter_runtime;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Override the configured bind host
    #[arg(long)]
    pub host: Option<String>,

    /// Override the configured port
    #[arg(short, long)]
    pub port: Option<u16>,
}

pub async fn execute(args: ServeArgs, mut config: Config) -> Result<()> {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let _logger = LoggerImpl::init(&config.logging)?;
    let runtime = build_counter_runtime(&config).await?;

    let server = CountersHttpServer::new(runtime.service, CountersHttpConfig::from(&config));
    server
        .serve_with_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow!(e))?;

    tracing::info!(
        cache_failures = runtime.cache_failures.failure_count(),
        "shutdown complete"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
