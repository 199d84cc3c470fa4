//! API Configuration Module
//!
//! Server address, store backend selection, CORS and the per-endpoint rate
//! limit policy. Configuration is loaded from environment variables with
//! defaults suitable for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use tollgate_core::{ConfigError, Endpoint, RateLimitPolicy, RateLimitRule};
use tollgate_storage::CacheConfig;

use crate::constants::{DEFAULT_BIND_HOST, DEFAULT_CORS_MAX_AGE_SECS, DEFAULT_PORT};

// ============================================================================
// BACKEND SELECTION
// ============================================================================

/// Which stores back the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// Redis key-value store and PostgreSQL record store.
    #[default]
    External,
    /// In-process stores; state is lost on restart.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "external" | "redis" => Ok(StoreBackend::External),
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::InvalidValue {
                field: "TOLLGATE_BACKEND".to_string(),
                value: other.to_string(),
                reason: "expected 'external' or 'memory'".to_string(),
            }),
        }
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_host: String,
    pub port: u16,
    pub backend: StoreBackend,

    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    /// Per-endpoint fixed-window limits.
    pub rate_limit: RateLimitPolicy,

    /// Expiry of cached department snapshots (none by default).
    pub cache: CacheConfig,

    /// Identify clients by `X-Forwarded-For` / `X-Real-IP` instead of the
    /// socket peer. Only safe behind a proxy that overwrites those headers.
    pub trust_proxy_headers: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: DEFAULT_BIND_HOST.to_string(),
            port: DEFAULT_PORT,
            backend: StoreBackend::default(),
            cors_origins: Vec::new(),
            cors_max_age_secs: DEFAULT_CORS_MAX_AGE_SECS,
            rate_limit: RateLimitPolicy::default(),
            cache: CacheConfig::default(),
            trust_proxy_headers: false,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `TOLLGATE_API_BIND`: bind host (default: 0.0.0.0)
    /// - `TOLLGATE_API_PORT` or `PORT`: listen port (default: 8080)
    /// - `TOLLGATE_BACKEND`: `external` (default) or `memory`
    /// - `TOLLGATE_CORS_ORIGINS`: comma-separated allowed origins (empty = allow all)
    /// - `TOLLGATE_CORS_MAX_AGE_SECS`: preflight cache duration (default: 86400)
    /// - `TOLLGATE_RATE_LIMIT_ENABLED`: "true" or "false" (default: true)
    /// - `TOLLGATE_RATE_LIMIT_MAX_REQUESTS`: requests per window, every endpoint (default: 5)
    /// - `TOLLGATE_RATE_LIMIT_WINDOW_SECS`: window length, every endpoint (default: 60)
    /// - `TOLLGATE_RATE_LIMIT_<ENDPOINT>_MAX_REQUESTS` / `_WINDOW_SECS`: per-endpoint
    ///   overrides, `<ENDPOINT>` one of SAVE, FIND_ALL, FIND_BY_ID, UPDATE, DELETE
    /// - `TOLLGATE_CACHE_ENTITY_TTL_SECS` / `TOLLGATE_CACHE_LIST_TTL_SECS`: cache
    ///   snapshot expiry (unset = never expire)
    /// - `TOLLGATE_TRUST_PROXY_HEADERS`: "true" to key rate limits on proxy
    ///   headers (default: false, the socket peer is used)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let bind_host = lookup("TOLLGATE_API_BIND").unwrap_or(defaults.bind_host);
        let port = match lookup("TOLLGATE_API_PORT").or_else(|| lookup("PORT")) {
            Some(raw) => parse_value("TOLLGATE_API_PORT", &raw)?,
            None => defaults.port,
        };
        let backend = match lookup("TOLLGATE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => defaults.backend,
        };

        let cors_origins = lookup("TOLLGATE_CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let cors_max_age_secs = lookup("TOLLGATE_CORS_MAX_AGE_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.cors_max_age_secs);

        let rate_limit = rate_limit_policy(&lookup)?;

        let mut cache = CacheConfig::new();
        if let Some(raw) = lookup("TOLLGATE_CACHE_ENTITY_TTL_SECS") {
            let secs = parse_value("TOLLGATE_CACHE_ENTITY_TTL_SECS", &raw)?;
            cache = cache.with_entity_ttl(Duration::from_secs(secs));
        }
        if let Some(raw) = lookup("TOLLGATE_CACHE_LIST_TTL_SECS") {
            let secs = parse_value("TOLLGATE_CACHE_LIST_TTL_SECS", &raw)?;
            cache = cache.with_list_ttl(Duration::from_secs(secs));
        }

        let trust_proxy_headers = match lookup("TOLLGATE_TRUST_PROXY_HEADERS") {
            Some(raw) => parse_value("TOLLGATE_TRUST_PROXY_HEADERS", &raw.to_lowercase())?,
            None => defaults.trust_proxy_headers,
        };

        Ok(Self {
            bind_host,
            port,
            backend,
            cors_origins,
            cors_max_age_secs,
            rate_limit,
            cache,
            trust_proxy_headers,
        })
    }

    /// Resolve the listen address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse().map_err(|e| ConfigError::InvalidValue {
            field: "TOLLGATE_API_BIND".to_string(),
            value: addr.clone(),
            reason: format!("{}", e),
        })
    }
}

/// Environment prefix for an endpoint's overrides.
fn endpoint_env_prefix(endpoint: Endpoint) -> String {
    format!("TOLLGATE_RATE_LIMIT_{}", endpoint.as_str().to_uppercase())
}

fn rate_limit_policy<F>(lookup: &F) -> Result<RateLimitPolicy, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut base = RateLimitRule::default();
    if let Some(raw) = lookup("TOLLGATE_RATE_LIMIT_MAX_REQUESTS") {
        base.max_requests = parse_value("TOLLGATE_RATE_LIMIT_MAX_REQUESTS", &raw)?;
    }
    if let Some(raw) = lookup("TOLLGATE_RATE_LIMIT_WINDOW_SECS") {
        base.window = Duration::from_secs(parse_value("TOLLGATE_RATE_LIMIT_WINDOW_SECS", &raw)?);
    }

    let mut policy = RateLimitPolicy::uniform(base);
    policy.enabled = lookup("TOLLGATE_RATE_LIMIT_ENABLED")
        .map(|s| s.trim().to_lowercase() != "false")
        .unwrap_or(true);

    for endpoint in Endpoint::ALL {
        let prefix = endpoint_env_prefix(endpoint);
        let rule = policy.rule_mut(endpoint);

        let field = format!("{}_MAX_REQUESTS", prefix);
        if let Some(raw) = lookup(&field) {
            rule.max_requests = parse_value(&field, &raw)?;
        }
        let field = format!("{}_WINDOW_SECS", prefix);
        if let Some(raw) = lookup(&field) {
            rule.window = Duration::from_secs(parse_value(&field, &raw)?);
        }
    }

    policy.validate()?;
    Ok(policy)
}

fn parse_value<T>(field: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        field: field.to_string(),
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
