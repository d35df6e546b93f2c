//! Implementation of the `tally init` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::cli::output::{output, CommandOutput};
use crate::infrastructure::setup::{init_project, SetupPaths};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config file with the defaults
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub config_dir: PathBuf,
    pub config_written: bool,
    pub database_file: PathBuf,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if self.config_written {
            lines.push(format!("\nWrote default config to {}", self.config_dir.join("config.yaml").display()));
        } else {
            lines.push("\nKept existing config (use --force to overwrite)".to_string());
        }
        lines.push(format!("Database ready at {}", self.database_file.display()));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let target_path = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir().context("Failed to get current directory")?.join(&args.path)
    };

    let paths = SetupPaths::at(&target_path);
    let was_initialized = paths.is_initialized();
    let report = init_project(&paths, args.force).await?;

    let output_data = InitOutput {
        success: true,
        message: if was_initialized {
            "Project already initialized; migrations are up to date.".to_string()
        } else {
            "Project initialized successfully.".to_string()
        },
        config_dir: report.config_dir,
        config_written: report.config_written,
        database_file: report.database_file,
    };
    output(&output_data, json_mode);
    Ok(())
}
