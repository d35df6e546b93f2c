//! Per-counter async mutual exclusion.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::models::CounterId;

const CLEANUP_THRESHOLD: usize = 1024;
const CLEANUP_INTERVAL: usize = 256;

/// Lazily created async mutex per counter id.
///
/// The map holds only weak references, so a counter's mutex lives exactly
/// as long as someone holds or waits on it. Dead entries are purged every
/// `CLEANUP_INTERVAL` acquisitions once the map grows past
/// `CLEANUP_THRESHOLD`.
#[derive(Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<CounterId, Weak<AsyncMutex<()>>>>,
    acquisitions: AtomicUsize,
}

/// Held while an operation owns a counter. Released on drop.
#[must_use = "the counter is unlocked as soon as the guard is dropped"]
pub struct CounterGuard {
    _guard: OwnedMutexGuard<()>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive ownership of `id`.
    ///
    /// Cancel-safe: dropping the returned future before it resolves leaves
    /// no lock held.
    pub async fn acquire(&self, id: CounterId) -> CounterGuard {
        let mutex = {
            let mut map = self.locks.lock().unwrap_or_else(PoisonError::into_inner);

            let mutex = map.get(&id).and_then(Weak::upgrade).unwrap_or_else(|| {
                let fresh = Arc::new(AsyncMutex::new(()));
                map.insert(id, Arc::downgrade(&fresh));
                fresh
            });

            let tick = self.acquisitions.fetch_add(1, Ordering::Relaxed);
            if map.len() > CLEANUP_THRESHOLD && tick % CLEANUP_INTERVAL == 0 {
                retain_live(&mut map);
            }

            mutex
        };

        CounterGuard {
            _guard: mutex.lock_owned().await,
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Drop entries no one holds or waits on any more.
fn retain_live(map: &mut HashMap<CounterId, Weak<AsyncMutex<()>>>) {
    map.retain(|_, weak| weak.strong_count() > 0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_id_is_exclusive() {
        let locks = KeyedLocks::new();
        let _held = locks.acquire(CounterId(1)).await;

        let second = tokio::time::timeout(Duration::from_millis(50), locks.acquire(CounterId(1))).await;
        assert!(second.is_err(), "second acquire must wait for the first guard");
    }

    #[tokio::test]
    async fn test_different_ids_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.acquire(CounterId(1)).await;

        let b = tokio::time::timeout(Duration::from_millis(50), locks.acquire(CounterId(2))).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_release_unblocks_waiter() {
        let locks = Arc::new(KeyedLocks::new());
        let held = locks.acquire(CounterId(7)).await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(CounterId(7)).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());
        drop(held);
        tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_released_entries_are_purged_once_map_grows() {
        let locks = KeyedLocks::new();
        let mut held = Vec::new();
        for i in 0..=CLEANUP_THRESHOLD as i64 {
            held.push(locks.acquire(CounterId(i)).await);
        }
        assert_eq!(locks.tracked(), CLEANUP_THRESHOLD + 1, "held entries survive cleanup");
        drop(held);

        // Walk the tick counter up to the next cleanup point.
        let mut id = CLEANUP_THRESHOLD as i64 + 1;
        while locks.acquisitions.load(Ordering::Relaxed) % CLEANUP_INTERVAL != 0 {
            let _guard = locks.acquire(CounterId(id)).await;
            id += 1;
        }

        let _last = locks.acquire(CounterId(-1)).await;
        assert_eq!(locks.tracked(), 1);
    }

    #[tokio::test]
    async fn test_abandoned_acquire_leaves_no_lock() {
        let locks = KeyedLocks::new();
        let held = locks.acquire(CounterId(1)).await;
        let timed_out = tokio::time::timeout(Duration::from_millis(10), locks.acquire(CounterId(1))).await;
        assert!(timed_out.is_err());
        drop(held);

        let again = tokio::time::timeout(Duration::from_millis(50), locks.acquire(CounterId(1))).await;
        assert!(again.is_ok());
    }
}
