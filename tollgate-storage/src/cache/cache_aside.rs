//! Cache-aside entity store over a record store and a key-value cache.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tollgate_core::{ensure_identifier, TollgateError, TollgateResult};

use super::keys::{entity_key, list_key};
use super::traits::{CacheStats, CacheableEntity, EntityCache};
use crate::kv::{decode_json, encode_json, KeyValueStore};
use crate::record::RecordStore;

/// Expiry applied to cache snapshots.
///
/// Both default to no expiry: single-entity keys are overwritten on update
/// and removed on delete, and the list key is rewritten on every mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheConfig {
    pub entity_ttl: Option<Duration>,
    pub list_ttl: Option<Duration>,
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity_ttl(mut self, ttl: Duration) -> Self {
        self.entity_ttl = Some(ttl);
        self
    }

    pub fn with_list_ttl(mut self, ttl: Duration) -> Self {
        self.list_ttl = Some(ttl);
        self
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    list_hits: AtomicU64,
    list_misses: AtomicU64,
    list_rebuilds: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            list_hits: self.list_hits.load(Ordering::Relaxed),
            list_misses: self.list_misses.load(Ordering::Relaxed),
            list_rebuilds: self.list_rebuilds.load(Ordering::Relaxed),
        }
    }
}

/// [`EntityCache`] implementation.
///
/// # Type Parameters
///
/// - `E`: the cached entity kind
/// - `R`: the authoritative record store
/// - `K`: the key-value store used as cache
pub struct CacheAsideStore<E, R: ?Sized, K: ?Sized> {
    records: Arc<R>,
    kv: Arc<K>,
    config: CacheConfig,
    counters: Counters,
    _entity: PhantomData<fn() -> E>,
}

impl<E, R: ?Sized, K: ?Sized> std::fmt::Debug for CacheAsideStore<E, R, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheAsideStore")
            .field("config", &self.config)
            .field("stats", &self.counters.snapshot())
            .finish_non_exhaustive()
    }
}

impl<E, R, K> CacheAsideStore<E, R, K>
where
    E: CacheableEntity,
    R: RecordStore<E> + ?Sized,
    K: KeyValueStore + ?Sized,
{
    pub fn new(records: Arc<R>, kv: Arc<K>, config: CacheConfig) -> Self {
        Self {
            records,
            kv,
            config,
            counters: Counters::default(),
            _entity: PhantomData,
        }
    }

    pub fn records(&self) -> &Arc<R> {
        &self.records
    }

    pub fn key_value_store(&self) -> &Arc<K> {
        &self.kv
    }

    async fn cache_entity(&self, entity: &E) -> TollgateResult<()> {
        let key = entity_key::<E>(entity.entity_id());
        let raw = encode_json(entity)?;
        self.kv
            .set(&key, &raw, self.config.entity_ttl)
            .await
            .inspect_err(|e| tracing::error!(key = %key, error = %e, "failed to cache entity"))
    }

    async fn write_list(&self, entities: &[E]) -> TollgateResult<()> {
        let key = list_key::<E>();
        let raw = entities
            .iter()
            .map(encode_json)
            .collect::<Result<Vec<_>, _>>()?;
        self.kv
            .set_list(&key, &raw, self.config.list_ttl)
            .await
            .inspect_err(|e| tracing::error!(key = %key, error = %e, "failed to cache list"))?;
        Counters::bump(&self.counters.list_rebuilds);
        Ok(())
    }

    /// Rewrite the list key from a fresh scan of the record store.
    ///
    /// An empty store leaves the list key absent.
    pub async fn rebuild_list(&self) -> TollgateResult<Vec<E>> {
        let all = self.records.get_all().await?;
        self.write_list(&all).await?;
        tracing::debug!(kind = E::KIND, count = all.len(), "list cache rebuilt");
        Ok(all)
    }

    async fn require_existing(&self, id: &str) -> TollgateResult<E> {
        self.records
            .get_by_id(id)
            .await?
            .ok_or_else(|| TollgateError::NotFound {
                entity_type: E::KIND,
                id: id.to_string(),
            })
    }
}

#[async_trait]
impl<E, R, K> EntityCache<E> for CacheAsideStore<E, R, K>
where
    E: CacheableEntity,
    R: RecordStore<E> + ?Sized,
    K: KeyValueStore + ?Sized,
{
    async fn create(&self, entity: E) -> TollgateResult<E> {
        ensure_identifier("id", entity.entity_id())?;

        if self.records.get_by_id(entity.entity_id()).await?.is_some() {
            return Err(TollgateError::AlreadyExists {
                entity_type: E::KIND,
                id: entity.entity_id().to_string(),
            });
        }

        let saved = self.records.insert(entity).await?;
        self.cache_entity(&saved).await?;
        self.rebuild_list().await?;

        tracing::debug!(kind = E::KIND, id = saved.entity_id(), "entity created");
        Ok(saved)
    }

    async fn read(&self, id: &str) -> TollgateResult<Option<E>> {
        ensure_identifier("id", id)?;
        let key = entity_key::<E>(id);

        if let Some(raw) = self.kv.get(&key).await? {
            Counters::bump(&self.counters.hits);
            tracing::debug!(key = %key, "cache hit");
            return Ok(Some(decode_json(&raw)?));
        }

        Counters::bump(&self.counters.misses);
        tracing::debug!(key = %key, "cache miss");

        let Some(entity) = self.records.get_by_id(id).await? else {
            return Ok(None);
        };

        self.cache_entity(&entity).await?;
        self.rebuild_list().await?;
        Ok(Some(entity))
    }

    async fn read_all(&self) -> TollgateResult<Vec<E>> {
        let key = list_key::<E>();
        let cached = self.kv.get_list(&key).await?;

        if !cached.is_empty() {
            Counters::bump(&self.counters.list_hits);
            tracing::debug!(key = %key, count = cached.len(), "list cache hit");
            let entities = cached
                .iter()
                .map(|raw| decode_json(raw))
                .collect::<Result<Vec<E>, _>>()?;
            return Ok(entities);
        }

        Counters::bump(&self.counters.list_misses);
        tracing::debug!(key = %key, "list cache miss");

        let all = self.records.get_all().await?;
        if !all.is_empty() {
            self.write_list(&all).await?;
        }
        Ok(all)
    }

    async fn update(&self, id: &str, patch: E::Patch) -> TollgateResult<E> {
        ensure_identifier("id", id)?;
        let mut entity = self.require_existing(id).await?;
        entity.apply_patch(patch);

        let saved = self.records.save(entity).await?;
        self.cache_entity(&saved).await?;
        self.rebuild_list().await?;

        tracing::debug!(kind = E::KIND, id, "entity updated");
        Ok(saved)
    }

    async fn delete(&self, id: &str) -> TollgateResult<()> {
        ensure_identifier("id", id)?;
        self.require_existing(id).await?;

        self.records.delete_by_id(id).await?;
        let key = entity_key::<E>(id);
        self.kv
            .delete(&key)
            .await
            .inspect_err(|e| tracing::error!(key = %key, error = %e, "failed to evict entity"))?;
        self.rebuild_list().await?;

        tracing::debug!(kind = E::KIND, id, "entity deleted");
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }
}
