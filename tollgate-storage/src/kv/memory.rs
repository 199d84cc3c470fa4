//! Process-local key-value store.

use super::{effective_ttl, ensure_key, KeyValueStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tollgate_core::{StoreError, TollgateResult};

#[derive(Debug, Clone, PartialEq, Eq)]
enum StoredValue {
    Text(String),
    List(Vec<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: StoredValue,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: StoredValue, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: effective_ttl(ttl).map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::key_value(format!(
        "WRONGTYPE operation against key '{}' holding the wrong kind of value",
        key
    ))
}

/// In-memory [`KeyValueStore`].
///
/// Expiry is tracked with `tokio::time::Instant`, so paused-clock tests can
/// advance through rate limit windows instantly. Expired entries are
/// dropped lazily by the next write that touches them.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining time-to-live of a live key. None for absent keys and keys
    /// without expiry.
    pub async fn time_to_live(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| e.is_live(now))
            .and_then(|e| e.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }

    /// Number of live keys.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries.values().filter(|e| e.is_live(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn live_value(&self, key: &str) -> Option<StoredValue> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone())
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> TollgateResult<()> {
        ensure_key(key)?;
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry::new(StoredValue::Text(value.to_string()), ttl),
        );
        Ok(())
    }

    async fn set_list(
        &self,
        key: &str,
        values: &[String],
        ttl: Option<Duration>,
    ) -> TollgateResult<()> {
        ensure_key(key)?;
        let mut entries = self.entries.write().await;
        entries.remove(key);
        if !values.is_empty() {
            entries.insert(
                key.to_string(),
                Entry::new(StoredValue::List(values.to_vec()), ttl),
            );
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> TollgateResult<Option<String>> {
        ensure_key(key)?;
        match self.live_value(key).await {
            None => Ok(None),
            Some(StoredValue::Text(value)) => Ok(Some(value)),
            Some(StoredValue::List(_)) => Err(wrong_type(key).into()),
        }
    }

    async fn get_list(&self, key: &str) -> TollgateResult<Vec<String>> {
        ensure_key(key)?;
        match self.live_value(key).await {
            None => Ok(Vec::new()),
            Some(StoredValue::List(values)) => Ok(values),
            Some(StoredValue::Text(_)) => Err(wrong_type(key).into()),
        }
    }

    async fn exists(&self, key: &str) -> TollgateResult<bool> {
        ensure_key(key)?;
        Ok(self.live_value(key).await.is_some())
    }

    async fn delete(&self, key: &str) -> TollgateResult<bool> {
        ensure_key(key)?;
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        Ok(entries.remove(key).is_some_and(|e| e.is_live(now)))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> TollgateResult<bool> {
        ensure_key(key)?;
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        match entries.get(key).map(|e| e.is_live(now)) {
            None => Ok(false),
            Some(false) => {
                entries.remove(key);
                Ok(false)
            }
            Some(true) if ttl.is_zero() => {
                entries.remove(key);
                Ok(true)
            }
            Some(true) => {
                if let Some(entry) = entries.get_mut(key) {
                    entry.expires_at = Some(now + ttl);
                }
                Ok(true)
            }
        }
    }

    async fn increment(&self, key: &str, delta: i64) -> TollgateResult<i64> {
        ensure_key(key)?;
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        if entries.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.remove(key);
        }

        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(StoredValue::Text("0".to_string()), None));

        let current = match &entry.value {
            StoredValue::Text(raw) => raw.parse::<i64>().map_err(|_| {
                StoreError::key_value(format!("value at '{}' is not an integer", key))
            })?,
            StoredValue::List(_) => return Err(wrong_type(key).into()),
        };
        let next = current.checked_add(delta).ok_or_else(|| {
            StoreError::key_value(format!("increment of '{}' would overflow", key))
        })?;

        entry.value = StoredValue::Text(next.to_string());
        Ok(next)
    }

    async fn keys_containing(&self, pattern: &str) -> TollgateResult<Vec<String>> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(k, e)| e.is_live(now) && k.contains(pattern))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_core::TollgateError;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let store = InMemoryKeyValueStore::new();
        store.set("department:D001", "{}", None).await.unwrap();

        assert_eq!(
            store.get("department:D001").await.unwrap().as_deref(),
            Some("{}")
        );
        assert!(store.exists("department:D001").await.unwrap());
        assert_eq!(store.get("department:D002").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_key_rejected() {
        let store = InMemoryKeyValueStore::new();
        let err = store.set("", "x", None).await.unwrap_err();
        assert!(matches!(err, TollgateError::InvalidArgument { .. }));
        assert!(store.increment("", 1).await.is_err());
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry() {
        let store = InMemoryKeyValueStore::new();
        store
            .set("k", "v", Some(Duration::from_secs(10)))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(store.exists("k").await.unwrap());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!store.exists("k").await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_never_expires() {
        let store = InMemoryKeyValueStore::new();
        store.set("k", "v", Some(Duration::ZERO)).await.unwrap();
        tokio::time::advance(Duration::from_secs(3600)).await;
        assert!(store.exists("k").await.unwrap());
        assert_eq!(store.time_to_live("k").await, None);
    }

    #[tokio::test]
    async fn test_set_list_replaces_and_empty_removes() {
        let store = InMemoryKeyValueStore::new();
        store
            .set_list("department-list", &list(&["a", "b"]), None)
            .await
            .unwrap();
        store
            .set_list("department-list", &list(&["c"]), None)
            .await
            .unwrap();
        assert_eq!(store.get_list("department-list").await.unwrap(), list(&["c"]));

        store.set_list("department-list", &[], None).await.unwrap();
        assert!(!store.exists("department-list").await.unwrap());
        assert!(store.get_list("department-list").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_increment_absent_starts_at_zero_without_expiry() {
        let store = InMemoryKeyValueStore::new();
        assert_eq!(store.increment("counter", 1).await.unwrap(), 1);
        assert_eq!(store.increment("counter", 4).await.unwrap(), 5);
        assert_eq!(store.time_to_live("counter").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_increment_preserves_expiry() {
        let store = InMemoryKeyValueStore::new();
        store
            .set("counter", "0", Some(Duration::from_secs(60)))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(20)).await;
        store.increment("counter", 1).await.unwrap();

        assert_eq!(
            store.time_to_live("counter").await,
            Some(Duration::from_secs(40))
        );
    }

    #[tokio::test]
    async fn test_increment_non_integer_fails() {
        let store = InMemoryKeyValueStore::new();
        store.set("k", "abc", None).await.unwrap();
        let err = store.increment("k", 1).await.unwrap_err();
        assert!(matches!(err, TollgateError::Store(StoreError::KeyValue { .. })));
    }

    #[tokio::test]
    async fn test_wrong_type_reads_fail() {
        let store = InMemoryKeyValueStore::new();
        store.set_list("l", &list(&["x"]), None).await.unwrap();
        store.set("s", "x", None).await.unwrap();
        assert!(store.get("l").await.is_err());
        assert!(store.get_list("s").await.is_err());
    }

    #[tokio::test]
    async fn test_expire_and_delete_report_presence() {
        let store = InMemoryKeyValueStore::new();
        assert!(!store.expire("missing", Duration::from_secs(1)).await.unwrap());
        assert!(!store.delete("missing").await.unwrap());

        store.set("k", "v", None).await.unwrap();
        assert!(store.expire("k", Duration::from_secs(30)).await.unwrap());
        assert!(store.time_to_live("k").await.is_some());
        assert!(store.delete("k").await.unwrap());
        assert!(!store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_keys_containing() {
        let store = InMemoryKeyValueStore::new();
        store.set("rate-limit:1.save-department", "1", None).await.unwrap();
        store.set("rate-limit:2.save-department", "1", None).await.unwrap();
        store.set("department:D001", "{}", None).await.unwrap();

        let keys = store.keys_containing("save-department").await.unwrap();
        assert_eq!(
            keys,
            list(&["rate-limit:1.save-department", "rate-limit:2.save-department"])
        );
        assert_eq!(store.keys_containing("").await.unwrap().len(), 3);
    }
}
