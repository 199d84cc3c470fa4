//! Deterministic cache key construction.
//!
//! Two key families per entity kind:
//! - `"{namespace}:{id}"` holds one entity snapshot
//! - `"{namespace}-list"` holds the full id-ordered collection

use super::traits::CacheableEntity;

/// Key of the single-entity snapshot for `id`.
pub fn entity_key<E: CacheableEntity>(id: &str) -> String {
    format!("{}:{}", E::CACHE_NAMESPACE, id)
}

/// Key of the list snapshot.
pub fn list_key<E: CacheableEntity>() -> String {
    format!("{}-list", E::CACHE_NAMESPACE)
}
