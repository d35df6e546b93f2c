//! SQLite implementation of the CounterStore.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};

use super::parse_datetime;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Counter, CounterId};
use crate::domain::ports::{CounterStore, CounterTransaction};

const COUNTER_COLUMNS: &str = "id, name, value, created_at, updated_at";

#[derive(Clone)]
pub struct SqliteCounterStore {
    pool: SqlitePool,
}

impl SqliteCounterStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl CounterStore for SqliteCounterStore {
    async fn create(&self, name: &str) -> DomainResult<Counter> {
        let now = Utc::now().to_rfc3339();

        let row: CounterRow = sqlx::query_as(&format!(
            "INSERT INTO counters (name, value, created_at, updated_at) VALUES (?, 0, ?, ?) RETURNING {COUNTER_COLUMNS}"
        ))
        .bind(name)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                DomainError::DuplicateName(name.to_string())
            }
            other => other.into(),
        })?;

        row.try_into()
    }

    async fn read_value(&self, id: CounterId) -> DomainResult<i64> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT value FROM counters WHERE id = ?")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|(value,)| value).ok_or(DomainError::CounterNotFound(id))
    }

    async fn get(&self, id: CounterId) -> DomainResult<Counter> {
        let row: Option<CounterRow> =
            sqlx::query_as(&format!("SELECT {COUNTER_COLUMNS} FROM counters WHERE id = ?"))
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await?;

        row.ok_or(DomainError::CounterNotFound(id))?.try_into()
    }

    async fn list(&self) -> DomainResult<Vec<Counter>> {
        let rows: Vec<CounterRow> =
            sqlx::query_as(&format!("SELECT {COUNTER_COLUMNS} FROM counters ORDER BY id"))
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn begin(&self) -> DomainResult<Box<dyn CounterTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteCounterTransaction { tx }))
    }

    async fn delete(&self, id: CounterId) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM counters WHERE id = ?")
            .bind(id.get())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::CounterNotFound(id));
        }

        Ok(())
    }

    async fn health_check(&self) -> DomainResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Read-modify-write transaction over one pooled connection.
///
/// SQLite has no `SELECT ... FOR UPDATE`. `lock_for_update` issues a no-op
/// `UPDATE ... RETURNING` instead, which takes the database write lock as the
/// transaction's first statement. Every other writer, in this process or
/// another one, waits on `busy_timeout` until this transaction ends.
pub struct SqliteCounterTransaction {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl CounterTransaction for SqliteCounterTransaction {
    async fn lock_for_update(&mut self, id: CounterId) -> DomainResult<Counter> {
        let row: Option<CounterRow> = sqlx::query_as(&format!(
            "UPDATE counters SET value = value WHERE id = ? RETURNING {COUNTER_COLUMNS}"
        ))
        .bind(id.get())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.ok_or(DomainError::CounterNotFound(id))?.try_into()
    }

    async fn save(&mut self, counter: &Counter) -> DomainResult<()> {
        let result = sqlx::query("UPDATE counters SET value = ?, updated_at = ? WHERE id = ?")
            .bind(counter.value)
            .bind(counter.updated_at.to_rfc3339())
            .bind(counter.id.get())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::CounterNotFound(counter.id));
        }

        Ok(())
    }

    async fn commit(self: Box<Self>) -> DomainResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DomainResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct CounterRow {
    id: i64,
    name: String,
    value: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<CounterRow> for Counter {
    type Error = DomainError;

    fn try_from(row: CounterRow) -> Result<Self, Self::Error> {
        Ok(Counter {
            id: CounterId(row.id),
            name: row.name,
            value: row.value,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    async fn setup_store() -> SqliteCounterStore {
        let pool = create_migrated_test_pool().await.unwrap();
        SqliteCounterStore::new(pool)
    }

    #[tokio::test]
    async fn test_create_starts_at_zero() {
        let store = setup_store().await;
        let counter = store.create("alice").await.unwrap();

        assert_eq!(counter.name, "alice");
        assert_eq!(counter.value, 0);
        assert_eq!(store.read_value(counter.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_name_is_rejected() {
        let store = setup_store().await;
        store.create("dup").await.unwrap();

        let err = store.create("dup").await.unwrap_err();
        assert!(matches!(err, DomainError::DuplicateName(ref n) if n == "dup"));
    }

    #[tokio::test]
    async fn test_missing_counter_is_not_found() {
        let store = setup_store().await;
        let missing = CounterId(404);

        assert!(matches!(store.read_value(missing).await, Err(DomainError::CounterNotFound(_))));
        assert!(matches!(store.get(missing).await, Err(DomainError::CounterNotFound(_))));
        assert!(matches!(store.delete(missing).await, Err(DomainError::CounterNotFound(_))));
    }

    #[tokio::test]
    async fn test_transaction_commit_persists_value() {
        let store = setup_store().await;
        let created = store.create("alice").await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let mut locked = tx.lock_for_update(created.id).await.unwrap();
        assert_eq!(locked.apply_increment(5), Some(5));
        tx.save(&locked).await.unwrap();
        tx.commit().await.unwrap();

        let stored = store.get(created.id).await.unwrap();
        assert_eq!(stored.value, 5);
        assert!(stored.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_transaction_rollback_discards_value() {
        let store = setup_store().await;
        let created = store.create("alice").await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let mut locked = tx.lock_for_update(created.id).await.unwrap();
        locked.apply_increment(9);
        tx.save(&locked).await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(store.read_value(created.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let store = setup_store().await;
        let created = store.create("alice").await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            let mut locked = tx.lock_for_update(created.id).await.unwrap();
            locked.apply_increment(3);
            tx.save(&locked).await.unwrap();
        }

        assert_eq!(store.read_value(created.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_lock_for_update_missing_row() {
        let store = setup_store().await;
        let mut tx = store.begin().await.unwrap();

        let err = tx.lock_for_update(CounterId(77)).await.unwrap_err();
        assert!(matches!(err, DomainError::CounterNotFound(CounterId(77))));
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete() {
        let store = setup_store().await;
        let first = store.create("first").await.unwrap();
        store.delete(first.id).await.unwrap();

        let second = store.create("second").await.unwrap();
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn test_list_orders_by_id() {
        let store = setup_store().await;
        store.create("bravo").await.unwrap();
        store.create("alpha").await.unwrap();

        let names: Vec<_> = store.list().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["bravo", "alpha"]);
        store.health_check().await.unwrap();
    }
}
