//! tally setup and wiring
//!
//! Handles project initialization:
//! - Configuration directory creation
//! - Default config file creation
//! - Database migrations
//!
//! and builds the counter service from a loaded [`Config`].

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::adapters::cache::{MokaCounterCache, RedisCounterCache};
use crate::adapters::sqlite::{initialize_configured_database, initialize_database, SqliteCounterStore};
use crate::domain::models::{CacheBackend, CacheConfig, Config};
use crate::domain::ports::{CounterCache, NullCounterCache};
use crate::infrastructure::config::PROJECT_DIR;
use crate::infrastructure::logging::TracingCacheSink;
use crate::services::{CacheSync, CounterService};

/// Default configuration template content
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# tally configuration
# Override settings by editing this file, adding .tally/local.yaml, or
# setting environment variables with the TALLY_ prefix
#
# Example environment variables:
#   export TALLY_SERVER__PORT=9090
#   export TALLY_CACHE__BACKEND=redis
#   export TALLY_DATABASE__PATH=/custom/path/tally.db
#   export TALLY_LOGGING__LEVEL=debug

server:
  host: "127.0.0.1"
  port: 8080
  enable_cors: true
  # Deadline applied to every request
  request_timeout_ms: 3000

database:
  # Path to SQLite database file (project-local)
  path: ".tally/tally.db"
  max_connections: 10
  acquire_timeout_secs: 3
  # How long a writer waits for the database write lock
  busy_timeout_secs: 30

cache:
  # memory, redis, none
  backend: "memory"
  redis_url: "redis://127.0.0.1:6379"
  max_capacity: 100000
  op_timeout_ms: 3000

logging:
  # Log level: trace, debug, info, warn, error
  level: "info"
  # Log format: json, pretty
  format: "json"
  # Rolling file rotation when log_dir is set: daily, hourly, never
  rotation: "daily"

# Inbound limit per client address
rate_limit:
  enabled: true
  requests_per_second: 10000
  burst_size: 10000
"#;

/// Setup paths and directories
pub struct SetupPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub database_file: PathBuf,
}

impl SetupPaths {
    /// Get setup paths for the current directory
    pub fn new() -> Result<Self> {
        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        Ok(Self::at(&current_dir))
    }

    /// Setup paths for a project rooted at `root`.
    pub fn at(root: &Path) -> Self {
        let config_dir = root.join(PROJECT_DIR);
        Self {
            config_file: config_dir.join("config.yaml"),
            database_file: config_dir.join("tally.db"),
            config_dir,
        }
    }

    /// Check if the project is already initialized
    pub fn is_initialized(&self) -> bool {
        self.config_file.exists() && self.database_file.exists()
    }
}

/// Create the configuration directory
pub fn create_config_dir(paths: &SetupPaths) -> Result<()> {
    fs::create_dir_all(&paths.config_dir).context("Failed to create config directory")
}

/// Create the default configuration file. Returns whether it was written.
pub fn create_config_file(paths: &SetupPaths, force: bool) -> Result<bool> {
    if paths.config_file.exists() && !force {
        return Ok(false);
    }

    fs::write(&paths.config_file, DEFAULT_CONFIG_TEMPLATE).context("Failed to write config file")?;
    Ok(true)
}

/// Create the database if needed and apply pending migrations.
pub async fn run_migrations(paths: &SetupPaths) -> Result<()> {
    let db_url = format!("sqlite:{}", paths.database_file.display());
    let pool = initialize_database(&db_url, None)
        .await
        .context("Failed to initialize database")?;
    pool.close().await;
    Ok(())
}

/// What `init_project` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitReport {
    pub config_dir: PathBuf,
    pub config_written: bool,
    pub database_file: PathBuf,
}

/// Create config directory, default config and migrated database.
pub async fn init_project(paths: &SetupPaths, force: bool) -> Result<InitReport> {
    create_config_dir(paths)?;
    let config_written = create_config_file(paths, force)?;
    run_migrations(paths).await?;

    Ok(InitReport {
        config_dir: paths.config_dir.clone(),
        config_written,
        database_file: paths.database_file.clone(),
    })
}

/// Everything a surface (HTTP or CLI) needs to run counter operations.
pub struct CounterRuntime {
    pub service: Arc<CounterService<SqliteCounterStore>>,
    pub cache_failures: Arc<TracingCacheSink>,
}

/// Open the configured cache backend.
pub async fn build_cache(config: &CacheConfig) -> Result<Arc<dyn CounterCache>> {
    let cache: Arc<dyn CounterCache> = match config.backend {
        CacheBackend::Memory => Arc::new(MokaCounterCache::new(config.max_capacity)),
        CacheBackend::Redis => Arc::new(
            RedisCounterCache::connect(&config.redis_url)
                .await
                .with_context(|| format!("Failed to connect to Redis at {}", config.redis_url))?,
        ),
        CacheBackend::None => Arc::new(NullCounterCache::new()),
    };
    Ok(cache)
}

/// Open the database and cache described by `config` and wire the service.
pub async fn build_counter_runtime(config: &Config) -> Result<CounterRuntime> {
    let pool = initialize_configured_database(&config.database)
        .await
        .with_context(|| format!("Failed to open database at {}", config.database.path))?;
    let store = Arc::new(SqliteCounterStore::new(pool));

    let cache = build_cache(&config.cache).await?;
    let cache_failures = Arc::new(TracingCacheSink::new());
    let sync = CacheSync::new(cache, cache_failures.clone()).with_op_timeout(config.cache.op_timeout());

    tracing::info!(
        database = %config.database.path,
        cache_backend = sync.backend(),
        "counter service ready"
    );

    Ok(CounterRuntime {
        service: Arc::new(CounterService::new(store, sync)),
        cache_failures,
    })
}
