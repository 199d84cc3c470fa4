//! Key-value store contract.
//!
//! The rate limiter counts requests in this store and the entity cache
//! keeps its snapshots here. Implementations must be safe for concurrent
//! use from many callers. `increment` and `expire` must each be atomic;
//! nothing in this crate assumes atomicity across a sequence of calls.

use std::time::Duration;

use async_trait::async_trait;
use tollgate_core::TollgateResult;

/// Shared, network-accessible key-value service.
///
/// # TTL semantics
///
/// `ttl` arguments are optional. `None` or a zero duration means the key
/// never expires. An expired key behaves exactly like an absent one.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Store a string value, replacing any previous value and expiry.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> TollgateResult<()>;

    /// Replace the list stored at `key` wholesale.
    ///
    /// An empty `values` slice leaves the key absent.
    async fn set_list(
        &self,
        key: &str,
        values: &[String],
        ttl: Option<Duration>,
    ) -> TollgateResult<()>;

    /// Get a string value, or None if the key is absent.
    async fn get(&self, key: &str) -> TollgateResult<Option<String>>;

    /// Get every element of the list at `key`. Absent keys yield an empty list.
    async fn get_list(&self, key: &str) -> TollgateResult<Vec<String>>;

    /// Check whether a key is present.
    async fn exists(&self, key: &str) -> TollgateResult<bool>;

    /// Remove a key. Returns true if something was removed.
    async fn delete(&self, key: &str) -> TollgateResult<bool>;

    /// Set the time-to-live of an existing key.
    ///
    /// Returns false if the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> TollgateResult<bool>;

    /// Atomically add `delta` to the integer at `key` and return the new value.
    ///
    /// An absent key counts from 0 and is created without expiry.
    async fn increment(&self, key: &str, delta: i64) -> TollgateResult<i64>;

    /// List every key containing `pattern` as a substring.
    async fn keys_containing(&self, pattern: &str) -> TollgateResult<Vec<String>>;
}
