//! Batch convergence
//!
//! The reconciler walks an ordered collection of desired records and drives
//! one provider's zone toward it: create what is absent, update what
//! differs, touch nothing that already matches. Individual failures are
//! collected, never propagated mid-batch, so one bad record cannot block
//! the rest.
//!
//! Re-running a batch against an unchanged zone performs zero mutations.

use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::record::{DnsRecord, RecordFilter, RecordSpec};
use crate::traits::{CreateOutcome, DnsProvider};

/// What happened to one desired spec during convergence or removal
#[derive(Debug)]
pub enum ItemOutcome {
    /// A record was created
    Created(DnsRecord),
    /// An existing record was replaced
    Updated(DnsRecord),
    /// An existing record was deleted
    Deleted(DnsRecord),
    /// The zone already matched; no mutation was issued
    Unchanged,
    /// The spec is marked `manage: false`
    Skipped,
    /// The backend reported the record already exists; nothing was mutated
    AlreadyExists,
    /// The item failed; the rest of the batch still ran
    Failed(Error),
}

impl ItemOutcome {
    /// Whether this outcome mutated the zone
    pub fn is_applied(&self) -> bool {
        matches!(
            self,
            ItemOutcome::Created(_) | ItemOutcome::Updated(_) | ItemOutcome::Deleted(_)
        )
    }
}

/// One spec's slot in a [`ReconcileReport`]
#[derive(Debug)]
pub struct ReconciledItem {
    pub spec: RecordSpec,
    pub outcome: ItemOutcome,
}

/// Per-batch convergence report, in input order
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub items: Vec<ReconciledItem>,
}

impl ReconcileReport {
    /// Specs whose records were mutated this run (created, updated, deleted)
    pub fn applied(&self) -> Vec<&RecordSpec> {
        self.items
            .iter()
            .filter(|i| i.outcome.is_applied())
            .map(|i| &i.spec)
            .collect()
    }

    /// Specs that failed, with their errors
    pub fn failures(&self) -> Vec<(&RecordSpec, &Error)> {
        self.items
            .iter()
            .filter_map(|i| match &i.outcome {
                ItemOutcome::Failed(e) => Some((&i.spec, e)),
                _ => None,
            })
            .collect()
    }

    /// Number of records created
    pub fn created_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Created(_)))
    }

    /// Number of records updated
    pub fn updated_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Updated(_)))
    }

    /// Number of records deleted
    pub fn deleted_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Deleted(_)))
    }

    /// Number of specs that matched the zone already
    pub fn unchanged_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Unchanged | ItemOutcome::AlreadyExists))
    }

    /// Number of specs that failed
    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed(_)))
    }

    /// Whether the batch performed no mutations at all
    pub fn is_noop(&self) -> bool {
        self.created_count() == 0 && self.updated_count() == 0 && self.deleted_count() == 0
    }

    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|i| pred(&i.outcome)).count()
    }

    fn push(&mut self, spec: RecordSpec, outcome: ItemOutcome) {
        self.items.push(ReconciledItem { spec, outcome });
    }
}

/// Drives one provider's zone toward a desired record set
pub struct Reconciler {
    provider: Box<dyn DnsProvider>,
}

impl Reconciler {
    /// Create a reconciler around an initialized provider
    pub fn new(provider: Box<dyn DnsProvider>) -> Self {
        Self { provider }
    }

    /// The provider this reconciler drives
    pub fn provider(&self) -> &dyn DnsProvider {
        self.provider.as_ref()
    }

    /// Converge the zone toward `specs`, in input order.
    ///
    /// Returns `Err` only when the opening cache refresh fails, since then
    /// no item can even be compared. Every later failure lands in the
    /// report instead.
    pub async fn converge(&self, specs: &[RecordSpec]) -> Result<ReconcileReport> {
        // One refresh up front covers the whole batch; read-your-write on
        // the cache keeps later lookups current without further list calls.
        self.provider.list_records(&RecordFilter::default()).await?;

        let mut report = ReconcileReport::default();
        for spec in specs {
            let outcome = self.converge_one(spec).await;
            report.push(spec.clone(), outcome);
        }

        info!(
            "Provider {} ({}): {} created, {} updated, {} unchanged, {} failed",
            self.provider.provider_name(),
            self.provider.zone(),
            report.created_count(),
            report.updated_count(),
            report.unchanged_count(),
            report.failed_count()
        );
        Ok(report)
    }

    async fn converge_one(&self, spec: &RecordSpec) -> ItemOutcome {
        if !spec.manage {
            debug!("Record {} ({}) is unmanaged, skipping", spec.name, spec.rtype);
            return ItemOutcome::Skipped;
        }

        let existing = match self.find_existing(spec).await {
            Ok(existing) => existing,
            Err(e) => {
                error!("Lookup for {} ({}) failed: {}", spec.name, spec.rtype, e);
                return ItemOutcome::Failed(e);
            }
        };

        match existing {
            None => match self.provider.create_record(spec).await {
                Ok(CreateOutcome::Created(record)) => {
                    info!(
                        "Created {} {} -> {}",
                        record.rtype, record.name, record.content
                    );
                    ItemOutcome::Created(record)
                }
                Ok(CreateOutcome::AlreadyExists) => {
                    debug!(
                        "Record {} ({}) already exists on the backend",
                        spec.name, spec.rtype
                    );
                    ItemOutcome::AlreadyExists
                }
                Err(e) => {
                    error!("Failed to create {} ({}): {}", spec.name, spec.rtype, e);
                    ItemOutcome::Failed(e)
                }
            },
            Some(existing) => {
                if !spec.differs_from(&existing) {
                    debug!(
                        "Record {} ({}) already matches, skipping",
                        spec.name, spec.rtype
                    );
                    return ItemOutcome::Unchanged;
                }
                match self.provider.update_record(&existing, spec).await {
                    Ok(record) => {
                        info!(
                            "Updated {} {}: {} -> {}",
                            record.rtype, record.name, existing.content, record.content
                        );
                        ItemOutcome::Updated(record)
                    }
                    Err(e @ Error::PartialUpdate { .. }) => {
                        error!("{}", e);
                        ItemOutcome::Failed(e)
                    }
                    Err(e) => {
                        error!("Failed to update {} ({}): {}", spec.name, spec.rtype, e);
                        ItemOutcome::Failed(e)
                    }
                }
            }
        }
    }

    /// Retire the records matching `specs`' identity keys, in input order.
    ///
    /// The counterpart of [`converge`](Self::converge) for records that are
    /// no longer desired, with the same error containment: `Err` only when
    /// the opening cache refresh fails, per-item failures in the report. A
    /// spec whose record is already absent comes back as `Unchanged`.
    pub async fn remove(&self, specs: &[RecordSpec]) -> Result<ReconcileReport> {
        self.provider.list_records(&RecordFilter::default()).await?;

        let mut report = ReconcileReport::default();
        for spec in specs {
            let outcome = self.remove_one(spec).await;
            report.push(spec.clone(), outcome);
        }

        info!(
            "Provider {} ({}): {} deleted, {} absent, {} failed",
            self.provider.provider_name(),
            self.provider.zone(),
            report.deleted_count(),
            report.unchanged_count(),
            report.failed_count()
        );
        Ok(report)
    }

    async fn remove_one(&self, spec: &RecordSpec) -> ItemOutcome {
        if !spec.manage {
            debug!("Record {} ({}) is unmanaged, skipping", spec.name, spec.rtype);
            return ItemOutcome::Skipped;
        }

        let existing = match self.find_existing(spec).await {
            Ok(existing) => existing,
            Err(e) => {
                error!("Lookup for {} ({}) failed: {}", spec.name, spec.rtype, e);
                return ItemOutcome::Failed(e);
            }
        };

        let Some(existing) = existing else {
            debug!("Record {} ({}) not present, nothing to delete", spec.name, spec.rtype);
            return ItemOutcome::Unchanged;
        };

        match self.provider.delete_record(&existing).await {
            Ok(true) => {
                info!("Deleted {} {}", existing.rtype, existing.name);
                ItemOutcome::Deleted(existing)
            }
            Ok(false) => {
                warn!(
                    "Record {} ({}) vanished before deletion",
                    spec.name, spec.rtype
                );
                ItemOutcome::Unchanged
            }
            Err(e) => {
                error!("Failed to delete {} ({}): {}", spec.name, spec.rtype, e);
                ItemOutcome::Failed(e)
            }
        }
    }

    /// Look up the cached record with `spec`'s identity key
    async fn find_existing(&self, spec: &RecordSpec) -> Result<Option<DnsRecord>> {
        let filter = RecordFilter::named(&spec.name, spec.rtype.clone());
        let candidates = self.provider.list_records(&filter).await?;
        let key = spec.key();
        Ok(candidates.into_iter().find(|r| r.key() == key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordType;

    fn spec(name: &str) -> RecordSpec {
        RecordSpec::new(name, RecordType::A, "192.0.2.1")
    }

    fn record(name: &str) -> DnsRecord {
        DnsRecord::from_spec(&spec(name), 300)
    }

    #[test]
    fn report_partitions_outcomes() {
        let mut report = ReconcileReport::default();
        report.push(spec("a.example.com"), ItemOutcome::Created(record("a.example.com")));
        report.push(spec("b.example.com"), ItemOutcome::Updated(record("b.example.com")));
        report.push(spec("c.example.com"), ItemOutcome::Unchanged);
        report.push(spec("d.example.com"), ItemOutcome::Skipped);
        report.push(spec("e.example.com"), ItemOutcome::AlreadyExists);
        report.push(
            spec("f.example.com"),
            ItemOutcome::Failed(Error::validation("bad record")),
        );
        report.push(spec("g.example.com"), ItemOutcome::Deleted(record("g.example.com")));

        assert_eq!(report.created_count(), 1);
        assert_eq!(report.updated_count(), 1);
        assert_eq!(report.deleted_count(), 1);
        assert_eq!(report.unchanged_count(), 2);
        assert_eq!(report.failed_count(), 1);
        assert!(!report.is_noop());

        let applied: Vec<&str> = report.applied().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(applied, vec!["a.example.com", "b.example.com", "g.example.com"]);

        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0.name, "f.example.com");
    }

    #[test]
    fn untouched_report_is_noop() {
        let mut report = ReconcileReport::default();
        report.push(spec("a.example.com"), ItemOutcome::Unchanged);
        assert!(report.is_noop());
        assert!(report.applied().is_empty());
    }
}
