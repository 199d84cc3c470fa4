//! Cache-aside layer keeping entity and list snapshots in step with the
//! record store.
//!
//! # Consistency protocol
//!
//! Every mutation writes the [`RecordStore`](crate::RecordStore) first. Only
//! after that succeeds is the single-entity key refreshed (or removed), and
//! then the list key is rebuilt from a fresh, id-ordered scan. The list is
//! never patched incrementally: rebuilding costs a full scan per write but
//! guarantees the cached list is a real snapshot of the store.
//!
//! Concurrent writers on different entities race to rebuild the list. The
//! last writer's scan wins, which can be stale by one write but never a
//! corrupted merge.
//!
//! A cache failure after a successful store write is returned as an error.
//! The store change is not rolled back; the next miss-triggered rebuild
//! repairs the cache.
//!
//! # Example
//!
//! ```ignore
//! let cache = CacheAsideStore::new(records, kv, CacheConfig::default());
//! cache.create(department).await?;
//! let all = cache.read_all().await?;
//! ```

pub mod cache_aside;
pub mod keys;
pub mod traits;

pub use cache_aside::{CacheAsideStore, CacheConfig};
pub use keys::{entity_key, list_key};
pub use traits::{CacheStats, CacheableEntity, EntityCache};
