//! Counter service: the read-through / write-through policy over the
//! durable store and the fast cache.

use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::cache_sync::CacheSync;
use super::keyed_lock::KeyedLocks;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{validate_name, CallContext, Counter, CounterId, CounterReading, ReadSource};
use crate::domain::ports::{CounterStore, CounterTransaction};

/// Orchestrates counter operations across the store and the cache.
///
/// The store decides every outcome. The cache only ever holds a copy,
/// written after the store commits and under the same per-counter guard
/// as increments, so a cached value never runs ahead of or behind a
/// completed write from this process.
pub struct CounterService<S: CounterStore> {
    store: Arc<S>,
    cache: CacheSync,
    locks: KeyedLocks,
}

impl<S: CounterStore> CounterService<S> {
    pub fn new(store: Arc<S>, cache: CacheSync) -> Self {
        Self {
            store,
            cache,
            locks: KeyedLocks::new(),
        }
    }

    pub fn cache(&self) -> &CacheSync {
        &self.cache
    }

    /// Create a counter starting at zero and seed its cache entry.
    #[instrument(skip(self, ctx), err)]
    pub async fn create(&self, ctx: &CallContext, name: &str) -> DomainResult<Counter> {
        let name = validate_name(name).map_err(DomainError::ValidationFailed)?;
        let counter = ctx.run(self.store.create(&name)).await??;

        self.cache.seed(ctx, counter.id, counter.value).await;
        debug!(counter_id = %counter.id, "counter created");
        Ok(counter)
    }

    /// Current value, from the cache when possible.
    ///
    /// A miss reads the value column from the store and repopulates the
    /// cache while holding the counter's guard, so the repopulated value
    /// cannot overwrite a newer increment or resurrect a deleted counter.
    #[instrument(skip(self, ctx), fields(counter_id = %id), err)]
    pub async fn read(&self, ctx: &CallContext, id: CounterId) -> DomainResult<CounterReading> {
        if let Some(value) = self.cache.lookup(ctx, id).await {
            return Ok(CounterReading {
                id,
                value,
                source: ReadSource::Cache,
            });
        }

        let _guard = ctx.run(self.locks.acquire(id)).await?;
        let value = ctx.run(self.store.read_value(id)).await??;
        self.cache.refresh(ctx, id, value).await;

        Ok(CounterReading {
            id,
            value,
            source: ReadSource::Store,
        })
    }

    /// Add `amount` to the counter and return the updated entity.
    ///
    /// Either the new value is committed and then propagated to the cache,
    /// or nothing changes. Commit itself is never cut short by the
    /// deadline, so a returned error always means the value is unchanged.
    #[instrument(skip(self, ctx), fields(counter_id = %id), err)]
    pub async fn increment(&self, ctx: &CallContext, id: CounterId, amount: i64) -> DomainResult<Counter> {
        let _guard = ctx.run(self.locks.acquire(id)).await?;
        let mut tx = ctx.run(self.store.begin()).await??;

        let counter = match Self::apply_in_transaction(ctx, &mut *tx, id, amount).await {
            Ok(counter) => counter,
            Err(err) => {
                Self::abort(ctx, tx).await;
                return Err(err);
            }
        };

        // Last point at which giving up still leaves the value unchanged.
        if let Some(interrupted) = ctx.interrupted() {
            Self::abort(ctx, tx).await;
            return Err(interrupted.into());
        }

        tx.commit().await?;
        self.cache.refresh(ctx, id, counter.value).await;
        Ok(counter)
    }

    /// Remove the counter from the store, then from the cache.
    #[instrument(skip(self, ctx), fields(counter_id = %id), err)]
    pub async fn delete(&self, ctx: &CallContext, id: CounterId) -> DomainResult<()> {
        let _guard = ctx.run(self.locks.acquire(id)).await?;
        ctx.run(self.store.delete(id)).await??;
        self.cache.invalidate(ctx, id).await;
        Ok(())
    }

    /// The full entity, read from the store.
    #[instrument(skip(self, ctx), fields(counter_id = %id), err)]
    pub async fn get(&self, ctx: &CallContext, id: CounterId) -> DomainResult<Counter> {
        ctx.run(self.store.get(id)).await?
    }

    /// All counters ordered by id.
    pub async fn list(&self, ctx: &CallContext) -> DomainResult<Vec<Counter>> {
        ctx.run(self.store.list()).await?
    }

    /// Whether the store answers.
    pub async fn health(&self, ctx: &CallContext) -> DomainResult<()> {
        ctx.run(self.store.health_check()).await?
    }

    async fn apply_in_transaction(
        ctx: &CallContext,
        tx: &mut dyn CounterTransaction,
        id: CounterId,
        amount: i64,
    ) -> DomainResult<Counter> {
        let mut counter = ctx.run(tx.lock_for_update(id)).await??;
        counter
            .apply_increment(amount)
            .ok_or(DomainError::ValueOverflow { id, amount })?;
        ctx.run(tx.save(&counter)).await??;
        Ok(counter)
    }

    /// Roll back, falling back to the drop-time rollback if the context is
    /// already spent.
    async fn abort(ctx: &CallContext, tx: Box<dyn CounterTransaction>) {
        match ctx.run(tx.rollback()).await {
            Ok(Ok(())) | Err(_) => {}
            Ok(Err(err)) => warn!(error = %err, "transaction rollback failed"),
        }
    }
}
