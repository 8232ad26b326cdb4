//! Eviction sweeper tests

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::cached_response;
use kickoff_cache::{CacheStore, EvictionSweeper, MemoryStore, Response};

const PARTITION: &str = "kickoff-club-dynamic-v1";

async fn seed(store: &MemoryStore, url: &str, age_ms: i64, max_age_ms: i64) {
    store
        .put(PARTITION, url, cached_response(url, "api", max_age_ms, age_ms))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_cap_evicts_oldest_first() {
    let store = Arc::new(MemoryStore::new());
    let sweeper = EvictionSweeper::new(store.clone());

    // A written first, then B, then C
    seed(&store, "/a", 3000, 0).await;
    seed(&store, "/b", 2000, 0).await;
    seed(&store, "/c", 1000, 0).await;

    let evicted = sweeper.enforce_max_entries(PARTITION, 2).await.unwrap();

    assert_eq!(evicted, 1);
    assert!(store.get(PARTITION, "/a").await.unwrap().is_none());
    assert!(store.get(PARTITION, "/b").await.unwrap().is_some());
    assert!(store.get(PARTITION, "/c").await.unwrap().is_some());
}

#[tokio::test]
async fn test_cap_leaves_exactly_max_entries() {
    let store = Arc::new(MemoryStore::new());
    let sweeper = EvictionSweeper::new(store.clone());

    for i in 0..10 {
        seed(&store, &format!("/entry-{i}"), (10 - i) * 1000, 0).await;
    }

    let evicted = sweeper.enforce_max_entries(PARTITION, 4).await.unwrap();

    assert_eq!(evicted, 6);
    assert_eq!(store.count(PARTITION).await.unwrap(), 4);

    // The four newest survive
    for i in 6..10 {
        assert!(
            store.get(PARTITION, &format!("/entry-{i}")).await.unwrap().is_some(),
            "entry-{i} should survive"
        );
    }
}

#[tokio::test]
async fn test_cap_under_limit_is_a_no_op() {
    let store = Arc::new(MemoryStore::new());
    let sweeper = EvictionSweeper::new(store.clone());

    seed(&store, "/a", 1000, 0).await;
    seed(&store, "/b", 2000, 0).await;

    let evicted = sweeper.enforce_max_entries(PARTITION, 5).await.unwrap();

    assert_eq!(evicted, 0);
    assert_eq!(store.count(PARTITION).await.unwrap(), 2);
}

#[tokio::test]
async fn test_untimestamped_entries_evict_first() {
    let store = Arc::new(MemoryStore::new());
    let sweeper = EvictionSweeper::new(store.clone());

    store
        .put(PARTITION, "/bare", Response::ok_with_body("no metadata"))
        .await
        .unwrap();
    seed(&store, "/recent", 1000, 0).await;

    sweeper.enforce_max_entries(PARTITION, 1).await.unwrap();

    assert!(store.get(PARTITION, "/bare").await.unwrap().is_none());
    assert!(store.get(PARTITION, "/recent").await.unwrap().is_some());
}

#[tokio::test]
async fn test_sweep_deletes_expired_entries_everywhere() {
    let store = Arc::new(MemoryStore::new());
    let sweeper = EvictionSweeper::new(store.clone());

    // Expired in one partition, fresh in another
    seed(&store, "/expired", 10 * 60 * 1000, 5 * 60 * 1000).await;
    store
        .put(
            "kickoff-club-static-v1",
            "/fresh.js",
            cached_response("fresh", "static", 24 * 60 * 60 * 1000, 1000),
        )
        .await
        .unwrap();

    let deleted = sweeper.sweep_expired().await.unwrap();

    assert_eq!(deleted, 1);
    assert!(store.get(PARTITION, "/expired").await.unwrap().is_none());
    assert!(store
        .get("kickoff-club-static-v1", "/fresh.js")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_sweep_exempts_zero_max_age() {
    let store = Arc::new(MemoryStore::new());
    let sweeper = EvictionSweeper::new(store.clone());

    // Ancient, but marked never-expiring
    seed(&store, "/pinned", 365 * 24 * 60 * 60 * 1000, 0).await;

    let deleted = sweeper.sweep_expired().await.unwrap();

    assert_eq!(deleted, 0);
    assert!(store.get(PARTITION, "/pinned").await.unwrap().is_some());
}

#[tokio::test]
async fn test_sweep_ignores_entries_without_metadata() {
    let store = Arc::new(MemoryStore::new());
    let sweeper = EvictionSweeper::new(store.clone());

    store
        .put(PARTITION, "/bare", Response::ok_with_body("no metadata"))
        .await
        .unwrap();

    let deleted = sweeper.sweep_expired().await.unwrap();

    assert_eq!(deleted, 0);
}

#[tokio::test(start_paused = true)]
async fn test_periodic_sweep_runs_on_its_interval() {
    let store = Arc::new(MemoryStore::new());
    let sweeper = EvictionSweeper::new(store.clone());

    seed(&store, "/expired", 10 * 60 * 1000, 5 * 60 * 1000).await;

    sweeper.start(Duration::from_secs(3600)).await;
    assert!(sweeper.is_running().await);

    // Not yet swept before the first interval elapses
    tokio::time::sleep(Duration::from_secs(1800)).await;
    assert!(store.get(PARTITION, "/expired").await.unwrap().is_some());

    tokio::time::sleep(Duration::from_secs(1801)).await;
    assert!(store.get(PARTITION, "/expired").await.unwrap().is_none());

    sweeper.stop().await;
    assert!(!sweeper.is_running().await);
}
