//! Tollgate Test Utilities
//!
//! Shared test infrastructure for the Tollgate workspace:
//! - Proptest generators for departments, patches and rate limit rules
//! - Fixtures for the common scenarios
//! - Fault-injecting store doubles that record every call
//! - Assertions on the error taxonomy

// Re-export core types for convenience
pub use tollgate_core::{
    Department, DepartmentPatch, Endpoint, RateLimitPolicy, RateLimitRule, StoreError, Timestamp,
    TollgateError, TollgateResult, UserId,
};
pub use tollgate_storage::{InMemoryKeyValueStore, InMemoryRecordStore};

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tollgate_core::Entity;
use tollgate_storage::{KeyValueStore, RecordStore};

// ============================================================================
// FAULT INJECTION
// ============================================================================

/// Operations of a [`KeyValueStore`], for targeting injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KvOp {
    Set,
    SetList,
    Get,
    GetList,
    Exists,
    Delete,
    Expire,
    Increment,
    KeysContaining,
}

/// Operations of a [`RecordStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordOp {
    GetById,
    GetAll,
    Insert,
    Save,
    DeleteById,
}

/// Failure switches plus a call log, shared by both doubles.
#[derive(Debug)]
struct FaultPlan<Op> {
    failing: Mutex<HashSet<Op>>,
    calls: Mutex<HashMap<Op, usize>>,
}

impl<Op: Copy + Eq + Hash> FaultPlan<Op> {
    fn new() -> Self {
        Self {
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Record a call and report whether it should fail.
    fn enter(&self, op: Op) -> bool {
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(op)
            .or_insert(0) += 1;
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&op)
    }

    fn fail_on(&self, op: Op) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(op);
    }

    fn heal(&self, op: Op) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&op);
    }

    fn heal_all(&self) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn calls(&self, op: Op) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&op)
            .copied()
            .unwrap_or(0)
    }

    fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }
}

/// [`KeyValueStore`] wrapper that fails chosen operations on demand.
///
/// Every call is counted, failing or not, so tests can also assert that an
/// operation never reached the store.
#[derive(Debug)]
pub struct FaultyKeyValueStore<K: ?Sized = InMemoryKeyValueStore> {
    inner: Arc<K>,
    plan: FaultPlan<KvOp>,
}

impl FaultyKeyValueStore<InMemoryKeyValueStore> {
    /// Wrap a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryKeyValueStore::new()))
    }
}

impl<K: KeyValueStore + ?Sized> FaultyKeyValueStore<K> {
    pub fn new(inner: Arc<K>) -> Self {
        Self {
            inner,
            plan: FaultPlan::new(),
        }
    }

    pub fn inner(&self) -> &Arc<K> {
        &self.inner
    }

    pub fn fail_on(&self, op: KvOp) {
        self.plan.fail_on(op);
    }

    pub fn heal(&self, op: KvOp) {
        self.plan.heal(op);
    }

    pub fn heal_all(&self) {
        self.plan.heal_all();
    }

    pub fn calls(&self, op: KvOp) -> usize {
        self.plan.calls(op)
    }

    pub fn total_calls(&self) -> usize {
        self.plan.total_calls()
    }

    fn guard(&self, op: KvOp) -> TollgateResult<()> {
        if self.plan.enter(op) {
            return Err(StoreError::key_value(format!("injected {:?} failure", op)).into());
        }
        Ok(())
    }
}

#[async_trait]
impl<K: KeyValueStore + ?Sized> KeyValueStore for FaultyKeyValueStore<K> {
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> TollgateResult<()> {
        self.guard(KvOp::Set)?;
        self.inner.set(key, value, ttl).await
    }

    async fn set_list(
        &self,
        key: &str,
        values: &[String],
        ttl: Option<Duration>,
    ) -> TollgateResult<()> {
        self.guard(KvOp::SetList)?;
        self.inner.set_list(key, values, ttl).await
    }

    async fn get(&self, key: &str) -> TollgateResult<Option<String>> {
        self.guard(KvOp::Get)?;
        self.inner.get(key).await
    }

    async fn get_list(&self, key: &str) -> TollgateResult<Vec<String>> {
        self.guard(KvOp::GetList)?;
        self.inner.get_list(key).await
    }

    async fn exists(&self, key: &str) -> TollgateResult<bool> {
        self.guard(KvOp::Exists)?;
        self.inner.exists(key).await
    }

    async fn delete(&self, key: &str) -> TollgateResult<bool> {
        self.guard(KvOp::Delete)?;
        self.inner.delete(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> TollgateResult<bool> {
        self.guard(KvOp::Expire)?;
        self.inner.expire(key, ttl).await
    }

    async fn increment(&self, key: &str, delta: i64) -> TollgateResult<i64> {
        self.guard(KvOp::Increment)?;
        self.inner.increment(key, delta).await
    }

    async fn keys_containing(&self, pattern: &str) -> TollgateResult<Vec<String>> {
        self.guard(KvOp::KeysContaining)?;
        self.inner.keys_containing(pattern).await
    }
}

/// [`RecordStore`] wrapper that fails chosen operations on demand.
#[derive(Debug)]
pub struct FaultyRecordStore<E: Entity, R: ?Sized = InMemoryRecordStore<E>> {
    inner: Arc<R>,
    plan: FaultPlan<RecordOp>,
    _entity: std::marker::PhantomData<fn() -> E>,
}

impl<E: Entity> FaultyRecordStore<E, InMemoryRecordStore<E>> {
    /// Wrap a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryRecordStore::new()))
    }
}

impl<E: Entity, R: RecordStore<E> + ?Sized> FaultyRecordStore<E, R> {
    pub fn new(inner: Arc<R>) -> Self {
        Self {
            inner,
            plan: FaultPlan::new(),
            _entity: std::marker::PhantomData,
        }
    }

    pub fn inner(&self) -> &Arc<R> {
        &self.inner
    }

    pub fn fail_on(&self, op: RecordOp) {
        self.plan.fail_on(op);
    }

    pub fn heal(&self, op: RecordOp) {
        self.plan.heal(op);
    }

    pub fn heal_all(&self) {
        self.plan.heal_all();
    }

    pub fn calls(&self, op: RecordOp) -> usize {
        self.plan.calls(op)
    }

    pub fn total_calls(&self) -> usize {
        self.plan.total_calls()
    }

    fn guard(&self, op: RecordOp) -> TollgateResult<()> {
        if self.plan.enter(op) {
            return Err(StoreError::record(format!("injected {:?} failure", op)).into());
        }
        Ok(())
    }
}

#[async_trait]
impl<E: Entity, R: RecordStore<E> + ?Sized> RecordStore<E> for FaultyRecordStore<E, R> {
    async fn get_by_id(&self, id: &str) -> TollgateResult<Option<E>> {
        self.guard(RecordOp::GetById)?;
        self.inner.get_by_id(id).await
    }

    async fn get_all(&self) -> TollgateResult<Vec<E>> {
        self.guard(RecordOp::GetAll)?;
        self.inner.get_all().await
    }

    async fn insert(&self, entity: E) -> TollgateResult<E> {
        self.guard(RecordOp::Insert)?;
        self.inner.insert(entity).await
    }

    async fn save(&self, entity: E) -> TollgateResult<E> {
        self.guard(RecordOp::Save)?;
        self.inner.save(entity).await
    }

    async fn delete_by_id(&self, id: &str) -> TollgateResult<bool> {
        self.guard(RecordOp::DeleteById)?;
        self.inner.delete_by_id(id).await
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for Tollgate types.

    use super::*;
    use chrono::DateTime;
    use proptest::prelude::*;

    /// Department ids in the four-character `D000` format.
    pub fn arb_department_id() -> impl Strategy<Value = String> {
        "D[0-9]{3}"
    }

    /// Names within the 40-character column limit.
    pub fn arb_department_name() -> impl Strategy<Value = String> {
        "[A-Z][A-Za-z ]{2,39}".prop_map(|s| s.trim_end().to_string())
    }

    pub fn arb_user_id() -> impl Strategy<Value = UserId> {
        1i64..100_000
    }

    /// Generate a Timestamp between 2020 and 2030, whole seconds.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1_577_836_800i64..1_893_456_000i64).prop_filter_map("representable", |secs| {
            DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc())
        })
    }

    pub fn arb_department() -> impl Strategy<Value = Department> {
        (
            arb_department_id(),
            arb_department_name(),
            any::<bool>(),
            arb_user_id(),
            arb_timestamp(),
        )
            .prop_map(|(id, name, active, by, at)| Department::new(id, name, active, by, at))
    }

    pub fn arb_department_patch() -> impl Strategy<Value = DepartmentPatch> {
        (
            arb_department_name(),
            any::<bool>(),
            arb_user_id(),
            arb_timestamp(),
        )
            .prop_map(|(name, active, updated_by, updated_date)| DepartmentPatch {
                name,
                active,
                updated_by,
                updated_date,
            })
    }

    /// Departments with distinct ids and distinct names.
    pub fn arb_department_set(max: usize) -> impl Strategy<Value = Vec<Department>> {
        prop::collection::btree_map(arb_department_id(), arb_department(), 0..max).prop_map(
            |by_id| {
                by_id
                    .into_iter()
                    .enumerate()
                    .map(|(i, (id, mut dept))| {
                        dept.id = id;
                        dept.name = format!("{} {}", dept.name, i);
                        dept
                    })
                    .collect()
            },
        )
    }

    pub fn arb_rate_limit_rule() -> impl Strategy<Value = RateLimitRule> {
        (1u32..20, 1u64..600)
            .prop_map(|(max, secs)| RateLimitRule::new(max, Duration::from_secs(secs)))
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common scenarios.

    use super::*;
    use chrono::NaiveDate;

    /// 2024-01-15 09:00:00, the reference audit timestamp.
    pub fn fixed_timestamp() -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .unwrap_or_default()
    }

    pub fn department(id: &str, name: &str) -> Department {
        Department::new(id, name, true, 1, fixed_timestamp())
    }

    /// D001 Engineering, active.
    pub fn engineering() -> Department {
        department("D001", "Engineering")
    }

    pub fn finance() -> Department {
        department("D002", "Finance")
    }

    pub fn rename_patch(name: &str) -> DepartmentPatch {
        DepartmentPatch {
            name: name.to_string(),
            active: true,
            updated_by: 2,
            updated_date: fixed_timestamp() + chrono::Duration::days(1),
        }
    }

    /// Policy allowing `max_requests` per minute on every endpoint.
    pub fn per_minute_policy(max_requests: u32) -> RateLimitPolicy {
        RateLimitPolicy::uniform(RateLimitRule::new(max_requests, Duration::from_secs(60)))
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on the Tollgate error taxonomy.

    use super::*;

    /// Assert that a TollgateResult is a NotFound error for `id`.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &TollgateResult<T>, id: &str) {
        match result {
            Err(TollgateError::NotFound { id: got, .. }) => assert_eq!(got, id),
            other => panic!("Expected NotFound for {}, got: {:?}", id, other),
        }
    }

    #[track_caller]
    pub fn assert_already_exists<T: std::fmt::Debug>(result: &TollgateResult<T>, id: &str) {
        match result {
            Err(TollgateError::AlreadyExists { id: got, .. }) => assert_eq!(got, id),
            other => panic!("Expected AlreadyExists for {}, got: {:?}", id, other),
        }
    }

    #[track_caller]
    pub fn assert_invalid_argument<T: std::fmt::Debug>(result: &TollgateResult<T>) {
        match result {
            Err(TollgateError::InvalidArgument { .. }) => {}
            other => panic!("Expected InvalidArgument, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_store_error<T: std::fmt::Debug>(result: &TollgateResult<T>) {
        match result {
            Err(TollgateError::Store(_)) => {}
            other => panic!("Expected Store error, got: {:?}", other),
        }
    }
}
