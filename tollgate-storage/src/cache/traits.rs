//! Cache traits and statistics.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tollgate_core::{Department, Entity, TollgateResult};

/// An entity that can be snapshotted into the key-value cache.
pub trait CacheableEntity: Entity + Serialize + DeserializeOwned {
    /// Key namespace, e.g. `department` for `department:D001`.
    const CACHE_NAMESPACE: &'static str;
}

impl CacheableEntity for Department {
    const CACHE_NAMESPACE: &'static str = "department";
}

/// Cache-aside CRUD over one entity kind.
///
/// Writes go to the record store first; the single-entity key and the
/// list key are refreshed afterwards. After any successful mutation
/// `read_all` returns exactly what a fresh id-ordered scan would.
#[async_trait]
pub trait EntityCache<E: CacheableEntity>: Send + Sync {
    /// Persist a new entity. Fails with `AlreadyExists` if the id is taken.
    async fn create(&self, entity: E) -> TollgateResult<E>;

    /// Look up one entity. A miss is `Ok(None)` and is never cached.
    async fn read(&self, id: &str) -> TollgateResult<Option<E>>;

    /// Every entity ordered by id.
    async fn read_all(&self) -> TollgateResult<Vec<E>>;

    /// Merge a patch into an existing entity. Fails with `NotFound`.
    async fn update(&self, id: &str, patch: E::Patch) -> TollgateResult<E>;

    /// Remove an entity. Fails with `NotFound`.
    async fn delete(&self, id: &str) -> TollgateResult<()>;

    /// Point-in-time counters.
    fn stats(&self) -> CacheStats;
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Single-entity key hits.
    pub hits: u64,
    /// Single-entity key misses.
    pub misses: u64,
    pub list_hits: u64,
    pub list_misses: u64,
    /// Times the list key was rewritten from a fresh scan.
    pub list_rebuilds: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0) over both key families.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits + self.list_hits;
        let total = hits + self.misses + self.list_misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}
