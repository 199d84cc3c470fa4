#![cfg(feature = "external-tests")]
//! Tests against live Redis and PostgreSQL.
//!
//! Run with `--features external-tests` after pointing `TOLLGATE_REDIS_URL`
//! and the `TOLLGATE_DB_*` variables at disposable instances.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tollgate_core::{Department, DepartmentPatch};
use tollgate_storage::{
    CacheAsideStore, CacheConfig, EntityCache, FixedWindowRateLimiter, KeyValueStore, PgConfig,
    PgRecordStore, RateLimiter, RecordStore, RedisConfig, RedisKeyValueStore,
};

async fn redis() -> Arc<RedisKeyValueStore> {
    Arc::new(
        RedisKeyValueStore::connect(&RedisConfig::from_env())
            .await
            .expect("redis reachable"),
    )
}

async fn postgres() -> Arc<PgRecordStore> {
    let store = PgRecordStore::from_config(&PgConfig::from_env()).expect("pool");
    store.ensure_schema().await.expect("schema");
    Arc::new(store)
}

fn unique_suffix() -> String {
    format!("{}", std::process::id() % 1000)
}

#[tokio::test]
async fn redis_round_trips_every_operation() {
    let kv = redis().await;
    let key = format!("tollgate-test:{}", unique_suffix());

    kv.set(&key, "v", Some(Duration::from_secs(30))).await.unwrap();
    assert_eq!(kv.get(&key).await.unwrap().as_deref(), Some("v"));
    assert!(kv.exists(&key).await.unwrap());
    assert!(kv.expire(&key, Duration::from_secs(60)).await.unwrap());
    assert!(kv.delete(&key).await.unwrap());
    assert!(!kv.exists(&key).await.unwrap());

    let list = vec!["a".to_string(), "b".to_string()];
    kv.set_list(&key, &list, None).await.unwrap();
    assert_eq!(kv.get_list(&key).await.unwrap(), list);
    kv.set_list(&key, &[], None).await.unwrap();
    assert!(!kv.exists(&key).await.unwrap());

    assert_eq!(kv.increment(&key, 3).await.unwrap(), 3);
    assert!(kv.keys_containing(&key).await.unwrap().contains(&key));
    kv.delete(&key).await.unwrap();
}

#[tokio::test]
async fn redis_limiter_denies_after_budget() {
    let limiter = FixedWindowRateLimiter::new(redis().await);
    let key = format!("tollgate-test-{}.save-department", unique_suffix());

    for _ in 0..3 {
        assert!(limiter.is_allowed(&key, 3, Duration::from_secs(5)).await.unwrap());
    }
    assert!(!limiter.is_allowed(&key, 3, Duration::from_secs(5)).await.unwrap());
}

#[tokio::test]
async fn postgres_backed_cache_crud_cycle() {
    let records = postgres().await;
    let kv = redis().await;
    let cache = CacheAsideStore::new(Arc::clone(&records), kv, CacheConfig::new());

    let id = format!("T{}", unique_suffix());
    let _ = records.delete_by_id(&id).await;
    let at = NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap();

    cache
        .create(Department::new(id.clone(), format!("Test {}", id), true, 1, at))
        .await
        .unwrap();
    assert!(cache.read(&id).await.unwrap().is_some());

    let updated = cache
        .update(
            &id,
            DepartmentPatch {
                name: format!("Renamed {}", id),
                active: false,
                updated_by: 2,
                updated_date: at,
            },
        )
        .await
        .unwrap();
    assert!(!updated.active);

    let all = cache.read_all().await.unwrap();
    assert_eq!(all, records.get_all().await.unwrap());

    cache.delete(&id).await.unwrap();
    assert!(cache.read(&id).await.unwrap().is_none());
}
