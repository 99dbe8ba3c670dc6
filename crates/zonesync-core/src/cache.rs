//! Per-adapter record cache
//!
//! One snapshot of the remote zone per adapter. A refresh replaces the whole
//! snapshot, never merges into it, and every successful mutation writes the
//! snapshot before control returns to the caller, so reads within one batch
//! see the writes the batch already made.

use std::time::{Duration, Instant};

use crate::record::{DnsRecord, RecordFilter, RecordKey};

/// Cached zone snapshot with a staleness threshold
#[derive(Debug)]
pub struct RecordCache {
    records: Vec<DnsRecord>,
    last_refreshed: Option<Instant>,
    max_age: Duration,
}

impl RecordCache {
    /// An empty cache; stays stale until the first [`replace`](Self::replace)
    pub fn new(max_age: Duration) -> Self {
        Self {
            records: Vec::new(),
            last_refreshed: None,
            max_age,
        }
    }

    /// Whether the snapshot is recent enough to serve reads.
    ///
    /// A cache that has never been populated is never fresh; an empty zone
    /// that was refreshed recently is.
    pub fn is_fresh(&self) -> bool {
        match self.last_refreshed {
            Some(at) => at.elapsed() < self.max_age,
            None => false,
        }
    }

    /// Replace the snapshot wholesale and stamp it
    pub fn replace(&mut self, records: Vec<DnsRecord>) {
        self.records = records;
        self.last_refreshed = Some(Instant::now());
    }

    /// Records matching `filter`, cloned out of the snapshot
    pub fn matching(&self, filter: &RecordFilter) -> Vec<DnsRecord> {
        self.records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect()
    }

    /// The record with this identity key, if the snapshot holds one
    pub fn find(&self, key: &RecordKey) -> Option<&DnsRecord> {
        self.records.iter().find(|r| r.key() == *key)
    }

    /// Insert `record`, replacing any snapshot entry with the same key
    pub fn upsert(&mut self, record: DnsRecord) {
        let key = record.key();
        match self.records.iter_mut().find(|r| r.key() == key) {
            Some(slot) => *slot = record,
            None => self.records.push(record),
        }
    }

    /// Drop the record with this key; returns whether one was present
    pub fn remove(&mut self, key: &RecordKey) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.key() != *key);
        self.records.len() != before
    }

    /// Number of records in the snapshot
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the snapshot holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
