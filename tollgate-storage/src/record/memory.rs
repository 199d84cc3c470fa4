//! In-memory record store.

use super::RecordStore;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tollgate_core::{Entity, StoreError, TollgateResult};

/// [`RecordStore`] over a `BTreeMap`, so `get_all` is naturally id-ordered.
///
/// Enforces the same uniqueness rules as the relational schema: the id and
/// the entity's unique attribute may each appear only once.
#[derive(Debug)]
pub struct InMemoryRecordStore<E: Entity> {
    records: RwLock<BTreeMap<String, E>>,
}

impl<E: Entity> Default for InMemoryRecordStore<E> {
    fn default() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<E: Entity> InMemoryRecordStore<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store, bypassing uniqueness checks.
    pub fn with_records(records: impl IntoIterator<Item = E>) -> Self {
        let map = records
            .into_iter()
            .map(|e| (e.entity_id().to_string(), e))
            .collect();
        Self {
            records: RwLock::new(map),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn check_unique_attribute<E: Entity>(
    records: &BTreeMap<String, E>,
    candidate: &E,
) -> Result<(), StoreError> {
    let Some(attr) = candidate.unique_attribute() else {
        return Ok(());
    };
    let clash = records.values().any(|existing| {
        existing.entity_id() != candidate.entity_id() && existing.unique_attribute() == Some(attr)
    });
    if clash {
        return Err(StoreError::record(format!(
            "duplicate value '{}' violates unique constraint on {}",
            attr,
            E::KIND
        )));
    }
    Ok(())
}

#[async_trait]
impl<E: Entity> RecordStore<E> for InMemoryRecordStore<E> {
    async fn get_by_id(&self, id: &str) -> TollgateResult<Option<E>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn get_all(&self) -> TollgateResult<Vec<E>> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn insert(&self, entity: E) -> TollgateResult<E> {
        let mut records = self.records.write().await;
        if records.contains_key(entity.entity_id()) {
            return Err(StoreError::record(format!(
                "duplicate key '{}' violates primary key of {}",
                entity.entity_id(),
                E::KIND
            ))
            .into());
        }
        check_unique_attribute(&records, &entity)?;
        records.insert(entity.entity_id().to_string(), entity.clone());
        Ok(entity)
    }

    async fn save(&self, entity: E) -> TollgateResult<E> {
        let mut records = self.records.write().await;
        check_unique_attribute(&records, &entity)?;
        records.insert(entity.entity_id().to_string(), entity.clone());
        Ok(entity)
    }

    async fn delete_by_id(&self, id: &str) -> TollgateResult<bool> {
        Ok(self.records.write().await.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tollgate_core::{Department, Timestamp, TollgateError};

    fn ts() -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap()
    }

    fn dept(id: &str, name: &str) -> Department {
        Department::new(id, name, true, 1, ts())
    }

    #[tokio::test]
    async fn test_get_all_is_id_ordered() {
        let store = InMemoryRecordStore::new();
        store.insert(dept("D003", "Sales")).await.unwrap();
        store.insert(dept("D001", "Engineering")).await.unwrap();
        store.insert(dept("D002", "Finance")).await.unwrap();

        let ids: Vec<String> = store
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["D001", "D002", "D003"]);
    }

    #[tokio::test]
    async fn test_insert_duplicate_id_fails() {
        let store = InMemoryRecordStore::new();
        store.insert(dept("D001", "Engineering")).await.unwrap();
        let err = store.insert(dept("D001", "Other")).await.unwrap_err();
        assert!(matches!(err, TollgateError::Store(StoreError::Record { .. })));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_name_fails_on_insert_and_save() {
        let store = InMemoryRecordStore::new();
        store.insert(dept("D001", "Engineering")).await.unwrap();

        assert!(store.insert(dept("D002", "Engineering")).await.is_err());
        assert!(store.save(dept("D002", "Engineering")).await.is_err());
        // Re-saving the same record under its own name is fine.
        assert!(store.save(dept("D001", "Engineering")).await.is_ok());
    }

    #[tokio::test]
    async fn test_save_upserts_and_delete_reports() {
        let store = InMemoryRecordStore::new();
        store.save(dept("D001", "Engineering")).await.unwrap();
        store.save(dept("D001", "Platform")).await.unwrap();

        let found = store.get_by_id("D001").await.unwrap().unwrap();
        assert_eq!(found.name, "Platform");

        assert!(store.delete_by_id("D001").await.unwrap());
        assert!(!store.delete_by_id("D001").await.unwrap());
        assert!(store.is_empty().await);
    }
}
