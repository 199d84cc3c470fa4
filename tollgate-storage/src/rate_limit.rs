//! Fixed-window rate limiting over a shared key-value store.
//!
//! Each limiter key maps to a counter that lives for one window. The first
//! request of a window creates the counter and starts its expiry; later
//! requests only increment it. Decisions are shared by every process that
//! talks to the same store.

use crate::kv::KeyValueStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tollgate_core::{RateLimitRule, TollgateError, TollgateResult};

/// Namespace prepended to every limiter key.
pub const RATE_LIMIT_KEY_PREFIX: &str = "rate-limit:";

/// Decides whether a request identified by a key is within its budget.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Record one request against `key` and report whether it is allowed.
    ///
    /// Every call counts, including rejected ones.
    async fn is_allowed(&self, key: &str, max_requests: u32, window: Duration)
        -> TollgateResult<bool>;

    /// Convenience wrapper taking a configured rule.
    async fn check(&self, key: &str, rule: &RateLimitRule) -> TollgateResult<bool> {
        self.is_allowed(key, rule.max_requests, rule.window).await
    }
}

/// Fixed-window counter limiter.
///
/// The window starts at the first request seen for a key and is never
/// extended by later requests. The existence check and the increment are
/// separate store calls, so two concurrent first requests may both write
/// the initial counter; the increment itself is atomic, so no request is
/// lost beyond that race.
#[derive(Debug)]
pub struct FixedWindowRateLimiter<K: ?Sized> {
    store: Arc<K>,
}

impl<K: ?Sized> Clone for FixedWindowRateLimiter<K> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<K: KeyValueStore + ?Sized> FixedWindowRateLimiter<K> {
    pub fn new(store: Arc<K>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<K> {
        &self.store
    }

    /// Store key for a limiter key.
    pub fn counter_key(key: &str) -> String {
        format!("{}{}", RATE_LIMIT_KEY_PREFIX, key)
    }
}

#[async_trait]
impl<K: KeyValueStore + ?Sized> RateLimiter for FixedWindowRateLimiter<K> {
    async fn is_allowed(
        &self,
        key: &str,
        max_requests: u32,
        window: Duration,
    ) -> TollgateResult<bool> {
        if key.is_empty() {
            return Err(TollgateError::invalid_argument("Rate limit key cannot be empty"));
        }
        if max_requests == 0 {
            return Err(TollgateError::invalid_argument(
                "max_requests must be greater than 0",
            ));
        }
        if window.is_zero() {
            return Err(TollgateError::invalid_argument(
                "window must be greater than 0",
            ));
        }

        let counter_key = Self::counter_key(key);

        if !self.store.exists(&counter_key).await? {
            self.store.set(&counter_key, "0", Some(window)).await?;
        }

        let count = self.store.increment(&counter_key, 1).await?;
        if count == 1 {
            // The counter may have expired between the check and the increment,
            // recreating it without expiry.
            self.store.expire(&counter_key, window).await?;
        }

        let allowed = count <= i64::from(max_requests);
        if !allowed {
            tracing::debug!(key = %counter_key, count, max_requests, "rate limit exceeded");
        }
        Ok(allowed)
    }
}
