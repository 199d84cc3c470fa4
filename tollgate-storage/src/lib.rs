//! Tollgate Storage - Store Contracts, Rate Limiter and Entity Cache
//!
//! Defines the two collaborator contracts the service is built on:
//! [`KeyValueStore`] (shared counters and cache snapshots) and
//! [`RecordStore`] (the durable source of truth). Each has an in-memory
//! implementation and an external one (Redis, PostgreSQL).
//!
//! On top of them sit the two algorithms with real invariants:
//! [`FixedWindowRateLimiter`] and the cache-aside [`CacheAsideStore`].

pub mod cache;
pub mod kv;
pub mod rate_limit;
pub mod record;

pub use cache::{
    entity_key, list_key, CacheAsideStore, CacheConfig, CacheStats, CacheableEntity, EntityCache,
};
pub use kv::{
    decode_json, encode_json, InMemoryKeyValueStore, KeyValueStore, RedisConfig,
    RedisKeyValueStore,
};
pub use rate_limit::{FixedWindowRateLimiter, RateLimiter, RATE_LIMIT_KEY_PREFIX};
pub use record::{InMemoryRecordStore, PgConfig, PgRecordStore, RecordStore};
