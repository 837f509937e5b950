//! Integration tests for PostgresDispatchStore.
//! Requires a Postgres instance. Set DATABASE_TEST_URL or these tests are skipped.

use std::time::Duration;

use futures::future::join_all;
use sqlx::PgPool;
use tokio::sync::Mutex;

use lendingflow_dispatch::{Admission, DispatchStore, PostgresDispatchStore};
use lendingflow_common::DispatchStatus;

/// The tests share one table; serialize them so eviction windows and
/// truncation in one test cannot disturb another.
static TEST_LOCK: Mutex<()> = Mutex::const_new(());

const DAY: Duration = Duration::from_secs(24 * 3600);

/// Get a test store, or skip if no test DB is available.
async fn test_store(lease: Duration, retention: Duration) -> Option<(PostgresDispatchStore, PgPool)> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let pool = PgPool::connect(&url).await.ok()?;
    let store = PostgresDispatchStore::new(pool.clone(), lease, retention);
    store.migrate().await.ok()?;
    sqlx::query("TRUNCATE dispatch_records")
        .execute(&pool)
        .await
        .ok()?;
    Some((store, pool))
}

#[tokio::test]
async fn first_admission_wins_and_duplicates_are_rejected() {
    let _guard = TEST_LOCK.lock().await;
    let Some((store, _pool)) = test_store(Duration::from_secs(120), DAY).await else {
        return;
    };

    assert_eq!(store.admit("evt-1").await.unwrap(), Admission::Admitted);
    assert_eq!(
        store.admit("evt-1").await.unwrap(),
        Admission::AlreadyHandled
    );
}

#[tokio::test]
async fn concurrent_admissions_grant_exactly_one() {
    let _guard = TEST_LOCK.lock().await;
    let Some((store, _pool)) = test_store(Duration::from_secs(120), DAY).await else {
        return;
    };
    let store = std::sync::Arc::new(store);

    let admissions = join_all((0..50).map(|_| {
        let store = store.clone();
        tokio::spawn(async move { store.admit("evt-race").await.unwrap() })
    }))
    .await;

    let admitted = admissions
        .into_iter()
        .map(|r| r.unwrap())
        .filter(|a| *a == Admission::Admitted)
        .count();
    assert_eq!(admitted, 1);
}

#[tokio::test]
async fn submitted_records_stay_terminal() {
    let _guard = TEST_LOCK.lock().await;
    let Some((store, _pool)) = test_store(Duration::from_secs(120), DAY).await else {
        return;
    };

    store.admit("evt-1").await.unwrap();
    store.mark_submitted("evt-1", "job-9").await.unwrap();

    assert_eq!(
        store.admit("evt-1").await.unwrap(),
        Admission::AlreadyHandled
    );
    let record = store.get("evt-1").await.unwrap().unwrap();
    assert_eq!(record.status, DispatchStatus::Submitted);
    assert_eq!(record.job_handle.as_deref(), Some("job-9"));
    assert!(record.submitted_at.is_some());
}

#[tokio::test]
async fn failed_records_re_admit() {
    let _guard = TEST_LOCK.lock().await;
    let Some((store, _pool)) = test_store(Duration::from_secs(120), DAY).await else {
        return;
    };

    store.admit("evt-1").await.unwrap();
    store.mark_failed("evt-1", "profile not found").await.unwrap();

    assert_eq!(store.admit("evt-1").await.unwrap(), Admission::Admitted);
    let record = store.get("evt-1").await.unwrap().unwrap();
    assert_eq!(record.status, DispatchStatus::Pending);
    assert_eq!(record.failure_reason, None);
}

#[tokio::test]
async fn stale_pending_records_re_admit_after_the_lease() {
    let _guard = TEST_LOCK.lock().await;
    let Some((store, _pool)) = test_store(Duration::from_millis(50), DAY).await else {
        return;
    };

    store.admit("evt-1").await.unwrap();
    assert_eq!(
        store.admit("evt-1").await.unwrap(),
        Admission::AlreadyHandled
    );

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(store.admit("evt-1").await.unwrap(), Admission::Admitted);
}

#[tokio::test]
async fn eviction_is_time_based() {
    let _guard = TEST_LOCK.lock().await;
    let Some((store, _pool)) = test_store(Duration::from_secs(120), Duration::from_millis(50)).await
    else {
        return;
    };

    store.admit("evt-1").await.unwrap();
    store.mark_submitted("evt-1", "job-9").await.unwrap();

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(store.evict_expired().await.unwrap() >= 1);
    assert!(store.get("evt-1").await.unwrap().is_none());
}
