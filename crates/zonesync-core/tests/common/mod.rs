//! Test doubles and common utilities for contract tests
//!
//! The provider double here is a complete in-memory adapter: a simulated
//! remote zone plus the same cache discipline real adapters follow, with a
//! counter on every simulated backend call so tests can assert exactly how
//! much API traffic a scenario generates.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use zonesync_core::cache::RecordCache;
use zonesync_core::error::{Error, Result};
use zonesync_core::record::{DnsRecord, RecordFilter, RecordSpec, RecordType};
use zonesync_core::traits::{CreateOutcome, DnsProvider, UpdateStrategy};

pub const MOCK_ZONE: &str = "example.com";
pub const MOCK_DEFAULT_TTL: u32 = 300;

/// Simulated remote zone, shared between a provider double and the test
///
/// Counters track backend calls, not method calls on the provider: a
/// `list_records` served from cache increments nothing.
#[derive(Default)]
pub struct MockZone {
    records: Mutex<Vec<DnsRecord>>,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    backend_down: AtomicBool,
    fail_create: Mutex<HashSet<String>>,
    fail_update: Mutex<HashSet<String>>,
    fail_delete: Mutex<HashSet<String>>,
}

impl MockZone {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seed a record directly into the simulated zone, bypassing counters
    /// (mimics a record created outside this process)
    pub fn insert(&self, record: DnsRecord) {
        self.records.lock().unwrap().push(record);
    }

    /// Snapshot of the zone as the backend holds it
    pub fn records(&self) -> Vec<DnsRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Total backend mutation calls (create + update + delete)
    pub fn mutation_calls(&self) -> usize {
        self.create_calls() + self.update_calls() + self.delete_calls()
    }

    /// Make list calls fail until cleared (also fails provider init)
    pub fn set_backend_down(&self, down: bool) {
        self.backend_down.store(down, Ordering::SeqCst);
    }

    /// Make create calls for this record name fail
    pub fn fail_create(&self, name: &str) {
        self.fail_create.lock().unwrap().insert(name.to_string());
    }

    /// Make native update calls for this record name fail
    pub fn fail_update(&self, name: &str) {
        self.fail_update.lock().unwrap().insert(name.to_string());
    }

    /// Make delete calls for this record name fail
    pub fn fail_delete(&self, name: &str) {
        self.fail_delete.lock().unwrap().insert(name.to_string());
    }

    // -- simulated backend API --

    fn api_list(&self) -> Result<Vec<DnsRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.backend_down.load(Ordering::SeqCst) {
            return Err(Error::network("mock backend is down"));
        }
        Ok(self.records.lock().unwrap().clone())
    }

    fn api_create(&self, spec: &RecordSpec) -> Result<Option<DnsRecord>> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.lock().unwrap().contains(&spec.name) {
            return Err(Error::api("mock", format!("create of {} failed", spec.name)));
        }
        let mut records = self.records.lock().unwrap();
        if records.iter().any(|r| r.key() == spec.key()) {
            // backend's "record already exists" answer
            return Ok(None);
        }
        let record = DnsRecord::from_spec(spec, MOCK_DEFAULT_TTL);
        records.push(record.clone());
        Ok(Some(record))
    }

    fn api_update(&self, existing: &DnsRecord, spec: &RecordSpec) -> Result<DnsRecord> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_update.lock().unwrap().contains(&spec.name) {
            return Err(Error::api("mock", format!("update of {} failed", spec.name)));
        }
        let mut records = self.records.lock().unwrap();
        let key = existing.key();
        match records.iter_mut().find(|r| r.key() == key) {
            Some(slot) => {
                let record = DnsRecord::from_spec(spec, MOCK_DEFAULT_TTL);
                *slot = record.clone();
                Ok(record)
            }
            None => Err(Error::api(
                "mock",
                format!("record {} not found for update", existing.name),
            )),
        }
    }

    fn api_delete(&self, record: &DnsRecord) -> Result<bool> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.lock().unwrap().contains(&record.name) {
            return Err(Error::api("mock", format!("delete of {} failed", record.name)));
        }
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        let key = record.key();
        records.retain(|r| r.key() != key);
        Ok(records.len() != before)
    }
}

/// Provider double wired to a [`MockZone`]
///
/// Follows the full adapter contract: cache staleness gates refreshes,
/// successful mutations write the cache back before returning, duplicate
/// creates surface as [`CreateOutcome::AlreadyExists`], absent deletes
/// return `false`.
pub struct MockProvider {
    backend: Arc<MockZone>,
    strategy: UpdateStrategy,
    cache: tokio::sync::Mutex<RecordCache>,
}

impl MockProvider {
    pub fn new(backend: Arc<MockZone>) -> Self {
        Self::with_cache_max_age(backend, Duration::from_secs(300))
    }

    pub fn with_cache_max_age(backend: Arc<MockZone>, max_age: Duration) -> Self {
        Self {
            backend,
            strategy: UpdateStrategy::NativeUpdate,
            cache: tokio::sync::Mutex::new(RecordCache::new(max_age)),
        }
    }

    pub fn with_strategy(mut self, strategy: UpdateStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    fn refresh_if_stale(&self, cache: &mut RecordCache) -> Result<()> {
        if !cache.is_fresh() {
            cache.replace(self.backend.api_list()?);
        }
        Ok(())
    }
}

#[async_trait]
impl DnsProvider for MockProvider {
    fn provider_name(&self) -> &'static str {
        "mock"
    }

    fn zone(&self) -> &str {
        MOCK_ZONE
    }

    fn update_strategy(&self) -> UpdateStrategy {
        self.strategy
    }

    fn minimum_ttl(&self) -> u32 {
        1
    }

    fn supports_record_type(&self, _rtype: &RecordType) -> bool {
        true
    }

    async fn init(&self) -> Result<()> {
        let mut cache = self.cache.lock().await;
        cache.replace(
            self.backend
                .api_list()
                .map_err(|e| Error::init("mock", e.to_string()))?,
        );
        Ok(())
    }

    async fn list_records(&self, filter: &RecordFilter) -> Result<Vec<DnsRecord>> {
        let mut cache = self.cache.lock().await;
        self.refresh_if_stale(&mut cache)?;
        Ok(cache.matching(filter))
    }

    async fn create_record(&self, spec: &RecordSpec) -> Result<CreateOutcome> {
        self.validate_record(spec)?;
        let mut cache = self.cache.lock().await;
        match self.backend.api_create(spec)? {
            Some(record) => {
                cache.upsert(record.clone());
                Ok(CreateOutcome::Created(record))
            }
            None => Ok(CreateOutcome::AlreadyExists),
        }
    }

    async fn update_record(&self, existing: &DnsRecord, spec: &RecordSpec) -> Result<DnsRecord> {
        self.validate_record(spec)?;
        let mut cache = self.cache.lock().await;
        match self.strategy {
            UpdateStrategy::NativeUpdate => {
                let record = self.backend.api_update(existing, spec)?;
                cache.upsert(record.clone());
                Ok(record)
            }
            UpdateStrategy::DeleteThenCreate => {
                self.backend.api_delete(existing)?;
                cache.remove(&existing.key());
                match self.backend.api_create(spec) {
                    Ok(Some(record)) => {
                        cache.upsert(record.clone());
                        Ok(record)
                    }
                    Ok(None) => {
                        // someone re-created it in the gap; zone now matches
                        let record = DnsRecord::from_spec(spec, MOCK_DEFAULT_TTL);
                        cache.upsert(record.clone());
                        Ok(record)
                    }
                    Err(e) => Err(Error::partial_update(
                        &spec.name,
                        spec.rtype.as_str(),
                        e.to_string(),
                    )),
                }
            }
        }
    }

    async fn delete_record(&self, record: &DnsRecord) -> Result<bool> {
        let mut cache = self.cache.lock().await;
        let deleted = self.backend.api_delete(record)?;
        if deleted {
            cache.remove(&record.key());
        }
        Ok(deleted)
    }
}

/// A record as the mock backend would hold it
pub fn zone_record(name: &str, rtype: RecordType, content: &str) -> DnsRecord {
    DnsRecord::from_spec(&RecordSpec::new(name, rtype, content), MOCK_DEFAULT_TTL)
}
