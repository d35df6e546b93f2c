//! Durable store port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Counter, CounterId};

/// System of record for counters.
///
/// Implementations own the uniqueness constraint on `name` and assign ids.
/// Callers apply deadlines around each call; an implementation only has to
/// be cancel-safe, i.e. dropping a pending future must not leave partial
/// writes behind.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Insert a new counter with value 0.
    ///
    /// Fails with `DuplicateName` when the name is taken.
    async fn create(&self, name: &str) -> DomainResult<Counter>;

    /// Read only the value column of one counter.
    async fn read_value(&self, id: CounterId) -> DomainResult<i64>;

    /// Read the whole entity.
    async fn get(&self, id: CounterId) -> DomainResult<Counter>;

    /// All counters ordered by id.
    async fn list(&self) -> DomainResult<Vec<Counter>>;

    /// Open a read-modify-write transaction.
    async fn begin(&self) -> DomainResult<Box<dyn CounterTransaction>>;

    /// Remove a counter. Fails with `CounterNotFound` if nothing was deleted.
    async fn delete(&self, id: CounterId) -> DomainResult<()>;

    /// Cheap liveness probe.
    async fn health_check(&self) -> DomainResult<()>;
}

/// An open store transaction.
///
/// Dropping a transaction without committing rolls it back.
#[async_trait]
pub trait CounterTransaction: Send {
    /// Read a counter and hold it exclusively until commit or rollback.
    async fn lock_for_update(&mut self, id: CounterId) -> DomainResult<Counter>;

    /// Persist the counter's value and `updated_at`.
    async fn save(&mut self, counter: &Counter) -> DomainResult<()>;

    async fn commit(self: Box<Self>) -> DomainResult<()>;

    async fn rollback(self: Box<Self>) -> DomainResult<()>;
}
