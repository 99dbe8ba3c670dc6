//! Contract Test: Cache Staleness & Read-Your-Write
//!
//! This test verifies the adapter cache discipline: reads are served from
//! the snapshot, refreshes happen only on staleness, and mutations are
//! visible to the rest of the same batch without extra backend calls.
//!
//! Constraints verified:
//! - Repeated reads within the staleness window trigger one backend list
//! - A stale cache triggers a refresh on the next read
//! - A whole convergence batch costs exactly one backend list call
//! - Mutations update the snapshot before returning (read-your-write)
//! - Failed init is fatal and carries the initialization error type
//!
//! If this test fails, adapters are either hammering the backend with list
//! calls or serving reads that contradict their own writes.

mod common;

use std::time::Duration;

use common::*;
use zonesync_core::error::Error;
use zonesync_core::record::{RecordFilter, RecordSpec, RecordType};
use zonesync_core::reconcile::Reconciler;
use zonesync_core::traits::DnsProvider;

#[tokio::test]
async fn fresh_cache_serves_reads_without_backend_calls() {
    let zone = MockZone::new();
    zone.insert(zone_record("a.example.com", RecordType::A, "192.0.2.1"));
    let provider = MockProvider::new(zone.clone());

    for _ in 0..5 {
        let records = provider
            .list_records(&RecordFilter::default())
            .await
            .expect("list succeeds");
        assert_eq!(records.len(), 1);
    }

    assert_eq!(zone.list_calls(), 1, "only the first read may hit the backend");
}

#[tokio::test]
async fn stale_cache_refreshes_on_read() {
    let zone = MockZone::new();
    // zero max age: every read finds the snapshot stale
    let provider = MockProvider::with_cache_max_age(zone.clone(), Duration::ZERO);

    provider
        .list_records(&RecordFilter::default())
        .await
        .expect("list succeeds");
    provider
        .list_records(&RecordFilter::default())
        .await
        .expect("list succeeds");

    assert_eq!(zone.list_calls(), 2);
}

#[tokio::test]
async fn external_changes_stay_invisible_until_stale() {
    let zone = MockZone::new();
    let provider = MockProvider::new(zone.clone());
    provider.init().await.expect("init succeeds");

    zone.insert(zone_record("late.example.com", RecordType::A, "192.0.2.9"));

    let records = provider
        .list_records(&RecordFilter::default())
        .await
        .expect("list succeeds");
    assert!(
        records.is_empty(),
        "a fresh snapshot must not pick up external changes mid-window"
    );
}

#[tokio::test]
async fn a_batch_costs_one_list_call() {
    let zone = MockZone::new();
    let reconciler = Reconciler::new(Box::new(MockProvider::new(zone.clone())));

    let specs: Vec<RecordSpec> = (1..=5)
        .map(|i| {
            RecordSpec::new(
                format!("host{}.example.com", i),
                RecordType::A,
                format!("192.0.2.{}", i),
            )
        })
        .collect();
    reconciler.converge(&specs).await.expect("converge succeeds");

    assert_eq!(
        zone.list_calls(),
        1,
        "per-item lookups must come from the cache, not the backend"
    );
}

#[tokio::test]
async fn creates_are_read_back_from_the_cache() {
    let zone = MockZone::new();
    let provider = MockProvider::new(zone.clone());

    let spec = RecordSpec::new("new.example.com", RecordType::A, "192.0.2.5");
    provider.list_records(&RecordFilter::default()).await.expect("warm");
    provider.create_record(&spec).await.expect("create succeeds");

    let found = provider
        .list_records(&RecordFilter::named("new.example.com", RecordType::A))
        .await
        .expect("list succeeds");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].content, "192.0.2.5");
    assert_eq!(zone.list_calls(), 1, "the create must land in the snapshot directly");
}

#[tokio::test]
async fn deletes_disappear_from_the_cache() {
    let zone = MockZone::new();
    zone.insert(zone_record("a.example.com", RecordType::A, "192.0.2.1"));
    let provider = MockProvider::new(zone.clone());

    let records = provider
        .list_records(&RecordFilter::default())
        .await
        .expect("list succeeds");
    provider.delete_record(&records[0]).await.expect("delete succeeds");

    let after = provider
        .list_records(&RecordFilter::default())
        .await
        .expect("list succeeds");
    assert!(after.is_empty());
    assert_eq!(zone.list_calls(), 1);
}

#[tokio::test]
async fn failed_init_is_an_initialization_error() {
    let zone = MockZone::new();
    zone.set_backend_down(true);
    let provider = MockProvider::new(zone.clone());

    let err = provider.init().await.expect_err("init must fail");
    assert!(matches!(err, Error::Init { .. }));
    assert!(err.is_fatal());
}
