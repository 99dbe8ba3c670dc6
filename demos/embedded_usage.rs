//! Minimal embedding example for zonesync-core
//!
//! This example demonstrates using zonesync-core as a library in a custom
//! application: a hand-rolled in-memory DnsProvider plugged into the
//! reconciler, no daemon involved.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

use zonesync_core::{
    CreateOutcome, DnsProvider, DnsRecord, RecordFilter, RecordSpec, RecordType, Reconciler,
    Result, UpdateStrategy,
};

/// In-memory DNS provider for embedded usage
///
/// The backing Vec IS the zone here, so there is no cache layer to manage.
struct EmbeddedProvider {
    records: Mutex<Vec<DnsRecord>>,
    next_id: AtomicU64,
}

impl EmbeddedProvider {
    fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl DnsProvider for EmbeddedProvider {
    fn provider_name(&self) -> &'static str {
        "embedded"
    }

    fn zone(&self) -> &str {
        "example.com"
    }

    fn update_strategy(&self) -> UpdateStrategy {
        UpdateStrategy::NativeUpdate
    }

    fn minimum_ttl(&self) -> u32 {
        1
    }

    fn supports_record_type(&self, _rtype: &RecordType) -> bool {
        true
    }

    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn list_records(&self, filter: &RecordFilter) -> Result<Vec<DnsRecord>> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn create_record(&self, spec: &RecordSpec) -> Result<CreateOutcome> {
        self.validate_record(spec)?;
        let mut records = self.records.lock().await;
        let mut record = DnsRecord::from_spec(spec, 300);
        if records.iter().any(|r| r.key() == record.key()) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        record.native_ref = Some(serde_json::json!({ "id": id }));
        records.push(record.clone());
        println!(
            "[embedded] created {} {} -> {}",
            record.rtype, record.name, record.content
        );
        Ok(CreateOutcome::Created(record))
    }

    async fn update_record(&self, existing: &DnsRecord, spec: &RecordSpec) -> Result<DnsRecord> {
        self.validate_record(spec)?;
        let mut records = self.records.lock().await;
        let mut replacement = DnsRecord::from_spec(spec, existing.ttl);
        replacement.native_ref = existing.native_ref.clone();
        records.retain(|r| r.key() != existing.key());
        records.push(replacement.clone());
        println!(
            "[embedded] updated {} {}: {} -> {}",
            replacement.rtype, replacement.name, existing.content, replacement.content
        );
        Ok(replacement)
    }

    async fn delete_record(&self, record: &DnsRecord) -> Result<bool> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|r| r.key() != record.key());
        println!("[embedded] deleted {} {}", record.rtype, record.name);
        Ok(records.len() < before)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Embedded zonesync-core Example ===\n");

    // Any DnsProvider implementation plugs into the reconciler
    let reconciler = Reconciler::new(Box::new(EmbeddedProvider::new()));
    reconciler.provider().init().await?;

    let desired = vec![
        RecordSpec::new("app.example.com", RecordType::A, "192.0.2.10").with_ttl(300),
        RecordSpec::new("www.example.com", RecordType::Cname, "app.example.com"),
        RecordSpec::new("example.com", RecordType::Mx, "mail.example.com").with_priority(10),
    ];

    println!("1. First convergence (empty zone, everything is created)");
    let report = reconciler.converge(&desired).await?;
    println!(
        "   created={} updated={} unchanged={} failed={}\n",
        report.created_count(),
        report.updated_count(),
        report.unchanged_count(),
        report.failed_count()
    );

    println!("2. Second convergence (zone already matches, zero mutations)");
    let report = reconciler.converge(&desired).await?;
    println!("   no-op: {}\n", report.is_noop());

    println!("3. Content drift (one record differs, exactly one update)");
    let mut drifted = desired.clone();
    drifted[0].content = "198.51.100.7".to_string();
    let report = reconciler.converge(&drifted).await?;
    println!(
        "   created={} updated={} unchanged={}\n",
        report.created_count(),
        report.updated_count(),
        report.unchanged_count()
    );

    println!("4. Removal (a retired record plus one that never existed)");
    let retired = vec![
        drifted[1].clone(),
        RecordSpec::new("gone.example.com", RecordType::A, "192.0.2.99"),
    ];
    let report = reconciler.remove(&retired).await?;
    println!(
        "   deleted={} already-absent={}\n",
        report.deleted_count(),
        report.unchanged_count()
    );

    println!("=== Embedding Successful ===");
    println!("Key points:");
    println!("- Any DnsProvider implementation plugs into the reconciler");
    println!("- Re-running an unchanged batch performs zero mutations");
    println!("- No daemon, no global state");

    Ok(())
}
