pub mod cache_sync;
pub mod counter_service;
pub mod keyed_lock;

pub use cache_sync::CacheSync;
pub use counter_service::CounterService;
pub use keyed_lock::{CounterGuard, KeyedLocks};
