//! Contract Test: Update Strategy Equivalence
//!
//! This test verifies that `update_record` is one logical operation no
//! matter how the backend realizes it: a native in-place update and a
//! delete-then-create composition must be indistinguishable to the
//! reconciler and to cache readers.
//!
//! Constraints verified:
//! - Both strategies produce the same convergence outcomes and final zone
//! - After a delete-then-create update, the cache holds the new content
//!   under the identity key and no trace of the old content
//! - A duplicate answer on the re-create step still converges
//!
//! If this test fails, backends without a native update primitive leak
//! their mechanics into the reconciler.

mod common;

use common::*;
use zonesync_core::record::{RecordFilter, RecordSpec, RecordType};
use zonesync_core::reconcile::Reconciler;
use zonesync_core::traits::{DnsProvider, UpdateStrategy};

fn drifted_zone() -> std::sync::Arc<MockZone> {
    let zone = MockZone::new();
    zone.insert(zone_record("app.example.com", RecordType::A, "198.51.100.1"));
    zone.insert(zone_record("www.example.com", RecordType::Cname, "app.example.com"));
    zone
}

fn desired() -> Vec<RecordSpec> {
    vec![
        RecordSpec::new("app.example.com", RecordType::A, "192.0.2.1"),
        RecordSpec::new("www.example.com", RecordType::Cname, "app.example.com"),
        RecordSpec::new("mail.example.com", RecordType::A, "192.0.2.2"),
    ]
}

#[tokio::test]
async fn strategies_converge_to_the_same_zone() {
    let native_zone = drifted_zone();
    let native = Reconciler::new(Box::new(MockProvider::new(native_zone.clone())));
    let native_report = native.converge(&desired()).await.expect("native converge");

    let composed_zone = drifted_zone();
    let composed = Reconciler::new(Box::new(
        MockProvider::new(composed_zone.clone()).with_strategy(UpdateStrategy::DeleteThenCreate),
    ));
    let composed_report = composed.converge(&desired()).await.expect("composed converge");

    assert_eq!(native_report.created_count(), composed_report.created_count());
    assert_eq!(native_report.updated_count(), composed_report.updated_count());
    assert_eq!(native_report.unchanged_count(), composed_report.unchanged_count());
    assert_eq!(native_report.failed_count(), 0);
    assert_eq!(composed_report.failed_count(), 0);

    let mut native_final: Vec<(String, String)> = native_zone
        .records()
        .iter()
        .map(|r| (r.name.clone(), r.content.clone()))
        .collect();
    let mut composed_final: Vec<(String, String)> = composed_zone
        .records()
        .iter()
        .map(|r| (r.name.clone(), r.content.clone()))
        .collect();
    native_final.sort();
    composed_final.sort();
    assert_eq!(native_final, composed_final);

    // the mechanics differ even though the outcome matches
    assert_eq!(native_zone.update_calls(), 1);
    assert_eq!(native_zone.delete_calls(), 0);
    assert_eq!(composed_zone.update_calls(), 0);
    assert_eq!(composed_zone.delete_calls(), 1);
}

#[tokio::test]
async fn composed_update_replaces_content_under_the_key() {
    let zone = MockZone::new();
    zone.insert(zone_record("app.example.com", RecordType::A, "198.51.100.1"));
    let provider =
        MockProvider::new(zone.clone()).with_strategy(UpdateStrategy::DeleteThenCreate);

    let existing = provider
        .list_records(&RecordFilter::named("app.example.com", RecordType::A))
        .await
        .expect("list succeeds")
        .remove(0);
    let spec = RecordSpec::new("app.example.com", RecordType::A, "192.0.2.1");
    let updated = provider
        .update_record(&existing, &spec)
        .await
        .expect("update succeeds");
    assert_eq!(updated.content, "192.0.2.1");

    // cache agrees without touching the backend again
    let cached = provider
        .list_records(&RecordFilter::named("app.example.com", RecordType::A))
        .await
        .expect("list succeeds");
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].content, "192.0.2.1");
    assert_eq!(zone.list_calls(), 1);
    assert!(!zone.records().iter().any(|r| r.content == "198.51.100.1"));
}

#[tokio::test]
async fn duplicate_on_recreate_still_converges() {
    // TXT identities carry content, so the replacement value can already
    // exist on the backend while the old value is being retired
    let zone = MockZone::new();
    zone.insert(zone_record("example.com", RecordType::Txt, "verification=old"));
    let provider =
        MockProvider::new(zone.clone()).with_strategy(UpdateStrategy::DeleteThenCreate);

    let existing = provider
        .list_records(&RecordFilter::named("example.com", RecordType::Txt))
        .await
        .expect("list succeeds")
        .remove(0);

    // the new value appears on the backend before our re-create lands
    zone.insert(zone_record("example.com", RecordType::Txt, "verification=new"));

    let spec = RecordSpec::new("example.com", RecordType::Txt, "verification=new");
    let updated = provider
        .update_record(&existing, &spec)
        .await
        .expect("update still succeeds");
    assert_eq!(updated.content, "verification=new");
    assert!(!zone.records().iter().any(|r| r.content == "verification=old"));
}
