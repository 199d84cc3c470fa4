//! Redis-backed key-value store.
//!
//! Uses a `ConnectionManager`, which multiplexes one connection across
//! clones and reconnects transparently after a dropped socket.

use super::{effective_ttl, ensure_key, KeyValueStore};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::RedisError;
use std::time::Duration;
use tollgate_core::{StoreError, TollgateError, TollgateResult};

/// Default Redis URL when `TOLLGATE_REDIS_URL` is not set.
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Redis connection configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisConfig {
    pub url: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_REDIS_URL.to_string(),
        }
    }
}

impl RedisConfig {
    /// Read `TOLLGATE_REDIS_URL`, falling back to the local default.
    pub fn from_env() -> Self {
        let url = std::env::var("TOLLGATE_REDIS_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());
        Self { url }
    }
}

fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

fn command_failed<'a>(
    op: &'static str,
    key: &'a str,
) -> impl FnOnce(RedisError) -> TollgateError + 'a {
    move |e| {
        tracing::error!(op, key, error = %e, "Redis command failed");
        StoreError::key_value(format!("{} failed: {}", op, e)).into()
    }
}

/// [`KeyValueStore`] backed by a Redis server.
#[derive(Clone)]
pub struct RedisKeyValueStore {
    conn: ConnectionManager,
}

impl std::fmt::Debug for RedisKeyValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisKeyValueStore").finish_non_exhaustive()
    }
}

impl RedisKeyValueStore {
    /// Open a managed connection to the configured server.
    pub async fn connect(config: &RedisConfig) -> TollgateResult<Self> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| StoreError::key_value(format!("invalid Redis URL: {}", e)))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(command_failed("CONNECT", &config.url))?;
        tracing::info!(url = %config.url, "Connected to Redis");
        Ok(Self { conn })
    }

    /// Round-trip a PING, used by readiness checks.
    pub async fn ping(&self) -> TollgateResult<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(command_failed("PING", ""))?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for RedisKeyValueStore {
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> TollgateResult<()> {
        ensure_key(key)?;
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = effective_ttl(ttl) {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }
        let _: () = cmd
            .query_async(&mut conn)
            .await
            .map_err(command_failed("SET", key))?;
        Ok(())
    }

    async fn set_list(
        &self,
        key: &str,
        values: &[String],
        ttl: Option<Duration>,
    ) -> TollgateResult<()> {
        ensure_key(key)?;
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic().cmd("DEL").arg(key).ignore();
        if !values.is_empty() {
            pipe.cmd("RPUSH").arg(key).arg(values).ignore();
            if let Some(ttl) = effective_ttl(ttl) {
                pipe.cmd("PEXPIRE").arg(key).arg(ttl_millis(ttl)).ignore();
            }
        }
        let _: () = pipe
            .query_async(&mut conn)
            .await
            .map_err(command_failed("DEL+RPUSH", key))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> TollgateResult<Option<String>> {
        ensure_key(key)?;
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(command_failed("GET", key))?;
        Ok(value)
    }

    async fn get_list(&self, key: &str) -> TollgateResult<Vec<String>> {
        ensure_key(key)?;
        let mut conn = self.conn.clone();
        let values: Vec<String> = redis::cmd("LRANGE")
            .arg(key)
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await
            .map_err(command_failed("LRANGE", key))?;
        Ok(values)
    }

    async fn exists(&self, key: &str) -> TollgateResult<bool> {
        ensure_key(key)?;
        let mut conn = self.conn.clone();
        let count: i64 = redis::cmd("EXISTS")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(command_failed("EXISTS", key))?;
        Ok(count > 0)
    }

    async fn delete(&self, key: &str) -> TollgateResult<bool> {
        ensure_key(key)?;
        let mut conn = self.conn.clone();
        let removed: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(command_failed("DEL", key))?;
        Ok(removed > 0)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> TollgateResult<bool> {
        ensure_key(key)?;
        let mut conn = self.conn.clone();
        let applied: i64 = if ttl.is_zero() {
            redis::cmd("DEL")
                .arg(key)
                .query_async(&mut conn)
                .await
                .map_err(command_failed("DEL", key))?
        } else {
            redis::cmd("PEXPIRE")
                .arg(key)
                .arg(ttl_millis(ttl))
                .query_async(&mut conn)
                .await
                .map_err(command_failed("PEXPIRE", key))?
        };
        Ok(applied > 0)
    }

    async fn increment(&self, key: &str, delta: i64) -> TollgateResult<i64> {
        ensure_key(key)?;
        let mut conn = self.conn.clone();
        let value: i64 = redis::cmd("INCRBY")
            .arg(key)
            .arg(delta)
            .query_async(&mut conn)
            .await
            .map_err(command_failed("INCRBY", key))?;
        Ok(value)
    }

    async fn keys_containing(&self, pattern: &str) -> TollgateResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let glob = format!("*{}*", escape_glob(pattern));
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(&glob)
            .query_async(&mut conn)
            .await
            .map_err(command_failed("KEYS", pattern))?;
        Ok(keys)
    }
}

/// Escape Redis glob metacharacters so the pattern matches literally.
fn escape_glob(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_glob() {
        assert_eq!(escape_glob("save-department"), "save-department");
        assert_eq!(escape_glob("a*b?[c]"), "a\\*b\\?\\[c\\]");
    }

    #[test]
    fn test_ttl_millis_never_zero() {
        assert_eq!(ttl_millis(Duration::from_micros(10)), 1);
        assert_eq!(ttl_millis(Duration::from_secs(60)), 60_000);
    }

    #[test]
    fn test_command_failure_keeps_op_and_reason() {
        let key = String::from("department:D001");
        let to_error = command_failed("GET", &key);
        let err = to_error(RedisError::from((redis::ErrorKind::IoError, "connection reset")));

        assert!(matches!(err, TollgateError::Store(StoreError::KeyValue { .. })));
        let msg = err.to_string();
        assert!(msg.contains("GET failed"));
        assert!(msg.contains("connection reset"));
    }

    #[test]
    fn test_default_config() {
        assert_eq!(RedisConfig::default().url, "redis://127.0.0.1:6379");
    }
}
