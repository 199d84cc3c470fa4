//! Durable record stores, the source of truth for entities.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryRecordStore;
pub use postgres::{PgConfig, PgRecordStore};

use async_trait::async_trait;
use tollgate_core::{Entity, TollgateResult};

/// Durable, authoritative storage for one entity kind.
///
/// Constraint violations (duplicate id, duplicate unique attribute)
/// surface as `StoreError::Record`.
#[async_trait]
pub trait RecordStore<E: Entity>: Send + Sync {
    async fn get_by_id(&self, id: &str) -> TollgateResult<Option<E>>;

    /// Every record, in ascending id order.
    async fn get_all(&self) -> TollgateResult<Vec<E>>;

    /// Persist a new record. Fails if the id is already taken.
    async fn insert(&self, entity: E) -> TollgateResult<E>;

    /// Insert or replace the record with the entity's id.
    async fn save(&self, entity: E) -> TollgateResult<E>;

    /// Returns true if a record was removed.
    async fn delete_by_id(&self, id: &str) -> TollgateResult<bool>;
}
