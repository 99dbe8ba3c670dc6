// # Cloudflare Provider Real Environment Validation Tool
//
// Exercises the Cloudflare adapter against the real Cloudflare API in a
// controlled environment.
//
// ## Usage
//
// ```bash
// # Check mode (default - read-only)
// ZONESYNC_MODE=check \
// CLOUDFLARE_API_TOKEN=your_token \
// ZONESYNC_ZONE=example.com \
// ZONESYNC_RECORD_NAME=sync-test.example.com \
// ZONESYNC_RECORD_CONTENT=192.0.2.55 \
// cargo run --bin cloudflare_validation
//
// # Apply mode (makes actual changes!)
// ZONESYNC_MODE=apply \
// CLOUDFLARE_API_TOKEN=your_token \
// ZONESYNC_ZONE=example.com \
// ZONESYNC_RECORD_NAME=sync-test.example.com \
// ZONESYNC_RECORD_CONTENT=192.0.2.55 \
// cargo run --bin cloudflare_validation
// ```
//
// ## Environment Variables
//
// Required:
// - `CLOUDFLARE_API_TOKEN`: Cloudflare API token
// - `ZONESYNC_ZONE`: Zone apex (e.g., "example.com")
// - `ZONESYNC_RECORD_NAME`: Full record name (e.g., "sync-test.example.com")
// - `ZONESYNC_RECORD_CONTENT`: Desired content for the test record
//
// Optional:
// - `CLOUDFLARE_ZONE_ID`: Zone ID (if not provided, will auto-discover)
// - `ZONESYNC_RECORD_TYPE`: Record type (default: A)
// - `ZONESYNC_MODE`: "check" or "apply" (default: check)

use std::env;
use std::time::Duration;

use zonesync_core::{DnsProvider, RecordFilter, RecordSpec, RecordType, Reconciler};
use zonesync_provider_cloudflare::CloudflareProvider;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("=== Cloudflare Provider Real Environment Validation ===");

    let api_token = require_env("CLOUDFLARE_API_TOKEN");
    let zone = require_env("ZONESYNC_ZONE");
    let record_name = require_env("ZONESYNC_RECORD_NAME");
    let content = require_env("ZONESYNC_RECORD_CONTENT");

    let zone_id = env::var("CLOUDFLARE_ZONE_ID").ok();
    let rtype =
        RecordType::from(env::var("ZONESYNC_RECORD_TYPE").unwrap_or_else(|_| "A".to_string()));
    let mode = env::var("ZONESYNC_MODE").unwrap_or_else(|_| "check".to_string());
    let apply = mode.to_lowercase() == "apply";

    if apply {
        tracing::warn!("Running in APPLY mode - will make actual DNS changes!");
    } else {
        tracing::warn!("Running in CHECK mode - read-only");
    }

    tracing::info!("Configuration:");
    tracing::info!("  Zone: {}", zone);
    tracing::info!("  Record: {} ({})", record_name, rtype);
    tracing::info!("  Content: {}", content);
    tracing::info!("  Mode: {}", mode);
    match zone_id {
        Some(ref zid) => tracing::info!("  Zone ID: {}", zid),
        None => tracing::info!("  Zone ID: (auto-discover)"),
    }

    tracing::info!("--- Step 1: Creating provider and warming the cache ---");
    let provider = CloudflareProvider::new(
        api_token,
        zone,
        zone_id,
        Duration::from_secs(30),
        Duration::from_secs(300),
    );
    provider.init().await?;
    tracing::info!("Provider initialized (API token validated, not shown)");

    tracing::info!("--- Step 2: Reading the zone through the cache ---");
    let all = provider.list_records(&RecordFilter::default()).await?;
    tracing::info!("Zone holds {} records", all.len());

    let spec = RecordSpec::new(&record_name, rtype.clone(), &content);
    let existing = provider
        .list_records(&RecordFilter::named(&record_name, rtype.clone()))
        .await?;
    match existing.iter().find(|r| r.key() == spec.key()) {
        Some(record) => tracing::info!(
            "Record present: {} {} -> {} (ttl {})",
            record.rtype,
            record.name,
            record.content,
            record.ttl
        ),
        None => tracing::info!("Record absent"),
    }

    if !apply {
        tracing::info!("=== CHECK COMPLETE ===");
        tracing::info!("No changes were made. To converge the record, set ZONESYNC_MODE=apply");
        return Ok(());
    }

    tracing::info!("--- Step 3: Converging the test record ---");
    let reconciler = Reconciler::new(Box::new(provider));
    let specs = vec![spec.clone()];
    let report = reconciler.converge(&specs).await?;
    tracing::info!(
        "Convergence: {} created, {} updated, {} unchanged, {} failed",
        report.created_count(),
        report.updated_count(),
        report.unchanged_count(),
        report.failed_count()
    );

    tracing::info!("--- Step 4: Idempotency (second run must be a no-op) ---");
    let report = reconciler.converge(&specs).await?;
    if report.is_noop() {
        tracing::info!("Idempotency verified (zero mutations on re-run)");
    } else {
        tracing::warn!("Second run performed mutations (unexpected)");
    }

    tracing::info!("--- Step 5: Cleaning up the test record ---");
    let report = reconciler.remove(&specs).await?;
    tracing::info!("Cleanup deleted {} record(s)", report.deleted_count());

    tracing::info!("=== APPLY COMPLETE ===");
    Ok(())
}

fn require_env(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| {
        tracing::error!("{} environment variable is required", name);
        std::process::exit(1);
    })
}
