//! Counter CLI commands.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::cli::output::{counter_table, output, CommandOutput};
use crate::domain::models::{CallContext, Config, Counter, CounterId, CounterReading};
use crate::infrastructure::logging::LoggerImpl;
use crate::infrastructure::setup::build_counter_runtime;

#[derive(Subcommand, Debug)]
pub enum CounterCommands {
    /// Create a counter starting at zero
    Create {
        /// Unique counter name
        name: String,
    },
    /// Show a counter's details
    Get {
        /// Counter ID
        id: CounterId,
    },
    /// Show a counter's current value and where it was read from
    Count {
        /// Counter ID
        id: CounterId,
    },
    /// Add to a counter
    Increment(IncrementArgs),
    /// Delete a counter
    Delete {
        /// Counter ID
        id: CounterId,
    },
    /// List all counters
    List,
}

#[derive(Args, Debug)]
pub struct IncrementArgs {
    /// Counter ID
    pub id: CounterId,

    /// Amount to add (may be negative)
    #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
    pub amount: i64,
}

#[derive(Debug, serde::Serialize)]
pub struct CounterOutput {
    pub id: CounterId,
    pub name: String,
    pub value: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Counter> for CounterOutput {
    fn from(counter: Counter) -> Self {
        Self {
            id: counter.id,
            name: counter.name,
            value: counter.value,
            created_at: counter.created_at.to_rfc3339(),
            updated_at: counter.updated_at.to_rfc3339(),
        }
    }
}

impl CommandOutput for CounterOutput {
    fn to_human(&self) -> String {
        [
            format!("Counter {}", self.id),
            format!("  Name:    {}", self.name),
            format!("  Value:   {}", self.value),
            format!("  Created: {}", self.created_at),
            format!("  Updated: {}", self.updated_at),
        ]
        .join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct CountOutput {
    #[serde(flatten)]
    pub reading: CounterReading,
}

impl CommandOutput for CountOutput {
    fn to_human(&self) -> String {
        format!(
            "Counter {} = {} (from {})",
            self.reading.id, self.reading.value, self.reading.source
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct CounterListOutput {
    pub counters: Vec<Counter>,
    pub total: usize,
}

impl CommandOutput for CounterListOutput {
    fn to_human(&self) -> String {
        if self.counters.is_empty() {
            return "No counters found.".to_string();
        }
        format!("Found {} counter(s):\n{}", self.total, counter_table(&self.counters))
    }

    fn to_json(&self) -> serde_json::Value {
        let counters: Vec<CounterOutput> = self.counters.iter().cloned().map(CounterOutput::from).collect();
        serde_json::json!({ "counters": counters, "total": self.total })
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ActionOutput {
    pub success: bool,
    pub message: String,
}

impl CommandOutput for ActionOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(command: CounterCommands, config: Config, json_mode: bool) -> Result<()> {
    // One-shot commands keep stderr quiet unless RUST_LOG asks otherwise.
    let mut logging = config.logging.clone();
    logging.level = "warn".to_string();
    logging.format = "pretty".to_string();
    let _logger = LoggerImpl::init_for_cli(&logging)?;

    let runtime = build_counter_runtime(&config).await?;
    let service = runtime.service;
    let ctx = CallContext::with_timeout(config.server.request_timeout());

    match command {
        CounterCommands::Create { name } => {
            let counter = service.create(&ctx, &name).await?;
            output(&CounterOutput::from(counter), json_mode);
        }
        CounterCommands::Get { id } => {
            let counter = service.get(&ctx, id).await?;
            output(&CounterOutput::from(counter), json_mode);
        }
        CounterCommands::Count { id } => {
            let reading = service.read(&ctx, id).await?;
            output(&CountOutput { reading }, json_mode);
        }
        CounterCommands::Increment(args) => {
            let counter = service.increment(&ctx, args.id, args.amount).await?;
            output(&CounterOutput::from(counter), json_mode);
        }
        CounterCommands::Delete { id } => {
            service.delete(&ctx, id).await?;
            output(
                &ActionOutput {
                    success: true,
                    message: format!("Counter {id} deleted"),
                },
                json_mode,
            );
        }
        CounterCommands::List => {
            let counters = service.list(&ctx).await?;
            output(
                &CounterListOutput {
                    total: counters.len(),
                    counters,
                },
                json_mode,
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ReadSource;

    #[test]
    fn test_count_output_formats() {
        let out = CountOutput {
            reading: CounterReading {
                id: CounterId(5),
                value: 12,
                source: ReadSource::Cache,
            },
        };
        assert_eq!(out.to_human(), "Counter 5 = 12 (from cache)");
        assert_eq!(out.to_json(), serde_json::json!({ "id": 5, "value": 12, "source": "cache" }));
    }

    #[test]
    fn test_empty_list_output() {
        let out = CounterListOutput {
            counters: vec![],
            total: 0,
        };
        assert_eq!(out.to_human(), "No counters found.");
        assert_eq!(out.to_json()["total"], 0);
    }

    #[test]
    fn test_list_output_renders_each_counter_once() {
        let now = chrono::Utc::now();
        let out = CounterListOutput {
            counters: vec![Counter {
                id: CounterId(9),
                name: "visits".to_string(),
                value: 3,
                created_at: now,
                updated_at: now,
            }],
            total: 1,
        };

        let json = out.to_json();
        assert_eq!(json["counters"][0]["name"], "visits");
        assert_eq!(json["counters"][0]["created_at"], now.to_rfc3339());
        assert!(out.to_human().contains("visits"));
    }
}
