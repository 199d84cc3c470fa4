//! Shared application state for Axum routers.

use std::sync::Arc;

use tollgate_core::{Department, RateLimitPolicy};
use tollgate_storage::{
    CacheAsideStore, CacheConfig, EntityCache, FixedWindowRateLimiter, InMemoryKeyValueStore,
    InMemoryRecordStore, KeyValueStore, RateLimiter, RecordStore,
};

/// Department cache handle used by the route handlers.
pub type DepartmentCache = Arc<dyn EntityCache<Department>>;

/// Limiter handle used by the rate limit middleware.
pub type SharedRateLimiter = Arc<dyn RateLimiter>;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Cache-aside view over the department record store.
    pub departments: DepartmentCache,
    pub limiter: SharedRateLimiter,
    pub policy: Arc<RateLimitPolicy>,
    /// Key rate limits on proxy headers rather than the socket peer.
    pub trust_proxy_headers: bool,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(
        departments: DepartmentCache,
        limiter: SharedRateLimiter,
        policy: RateLimitPolicy,
    ) -> Self {
        Self {
            departments,
            limiter,
            policy: Arc::new(policy),
            trust_proxy_headers: false,
            start_time: std::time::Instant::now(),
        }
    }

    /// Wire the cache and the limiter over one key-value store.
    ///
    /// Rate-limit counters and cache snapshots share the store; their key
    /// namespaces do not overlap.
    pub fn from_stores(
        records: Arc<dyn RecordStore<Department>>,
        kv: Arc<dyn KeyValueStore>,
        cache: CacheConfig,
        policy: RateLimitPolicy,
    ) -> Self {
        let departments: DepartmentCache =
            Arc::new(CacheAsideStore::new(records, Arc::clone(&kv), cache));
        let limiter: SharedRateLimiter = Arc::new(FixedWindowRateLimiter::new(kv));
        Self::new(departments, limiter, policy)
    }

    pub fn with_trust_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    /// Self-contained state over in-process stores.
    pub fn in_memory(policy: RateLimitPolicy) -> Self {
        Self::from_stores(
            Arc::new(InMemoryRecordStore::<Department>::new()),
            Arc::new(InMemoryKeyValueStore::new()),
            CacheConfig::default(),
            policy,
        )
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("policy", &self.policy)
            .field("trust_proxy_headers", &self.trust_proxy_headers)
            .field("stats", &self.departments.stats())
            .finish_non_exhaustive()
    }
}

// Use macro to reduce boilerplate for FromRef implementations
crate::impl_from_ref!(DepartmentCache, departments);
crate::impl_from_ref!(SharedRateLimiter, limiter);
crate::impl_from_ref!(Arc<RateLimitPolicy>, policy);
crate::impl_from_ref!(std::time::Instant, start_time);
