//! Key-value stores backing the rate limiter and the entity cache.
//!
//! [`KeyValueStore`] is the contract. [`InMemoryKeyValueStore`] is a
//! process-local implementation used in tests and single-process
//! deployments; [`RedisKeyValueStore`] talks to a shared Redis server.
//!
//! Values are plain strings. Entities are stored as JSON through
//! [`encode_json`] and [`decode_json`].

pub mod memory;
pub mod redis_backend;
pub mod traits;

pub use memory::InMemoryKeyValueStore;
pub use redis_backend::{RedisConfig, RedisKeyValueStore};
pub use traits::KeyValueStore;

use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tollgate_core::{StoreError, TollgateError, TollgateResult};

/// Reject empty keys before any store round trip.
pub(crate) fn ensure_key(key: &str) -> TollgateResult<()> {
    if key.is_empty() {
        return Err(TollgateError::invalid_argument("Key cannot be empty"));
    }
    Ok(())
}

/// Normalise a TTL argument: zero means no expiry.
pub(crate) fn effective_ttl(ttl: Option<Duration>) -> Option<Duration> {
    ttl.filter(|d| !d.is_zero())
}

/// Serialize a value for storage.
pub fn encode_json<T: Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(StoreError::from)
}

/// Deserialize a stored value.
pub fn decode_json<T: DeserializeOwned>(raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(StoreError::from)
}
