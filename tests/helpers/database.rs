use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;

use tally::adapters::sqlite::{create_migrated_test_pool, initialize_database, PoolConfig};

/// Create an in-memory SQLite database for testing
///
/// Each call creates a completely isolated database with migrations applied.
pub async fn setup_test_db() -> SqlitePool {
    create_migrated_test_pool()
        .await
        .expect("failed to create test database")
}

/// Open (and migrate) a database file that several pools may share.
pub async fn setup_file_db(path: &Path) -> SqlitePool {
    let url = format!("sqlite:{}", path.display());
    let config = PoolConfig {
        max_connections: 4,
        min_connections: 1,
        acquire_timeout: Duration::from_secs(10),
        busy_timeout: Duration::from_secs(30),
    };
    initialize_database(&url, Some(config))
        .await
        .expect("failed to open file database")
}
