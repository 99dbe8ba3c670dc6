// # DNS Provider Trait
//
// Defines the interface for managing DNS records via provider APIs.
//
// ## Implementations
//
// - Cloudflare: `zonesync-provider-cloudflare` crate
// - Technitium: `zonesync-provider-technitium` crate
// - Future: Route53, DigitalOcean, PowerDNS, etc.
//
// ## Usage
//
// ```rust,ignore
// use zonesync_core::{DnsProvider, RecordFilter, RecordType};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     provider.init().await?;
//
//     // Read through the adapter's cache
//     let records = provider
//         .list_records(&RecordFilter::named("app.example.com", RecordType::A))
//         .await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::record::{DnsRecord, RecordFilter, RecordSpec, RecordType};
use crate::validate;

/// How an adapter realizes `update_record`
///
/// Backends without a native update primitive compose it from delete and
/// create; the reconciler never needs to know, but the distinction matters
/// for failure reporting (see [`crate::Error::PartialUpdate`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStrategy {
    /// The backend mutates records in place
    NativeUpdate,
    /// The adapter deletes the old record, then creates the new one
    DeleteThenCreate,
}

/// Result of a DNS create operation
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    /// The record was created; carries the canonical record as the backend
    /// now holds it
    Created(DnsRecord),
    /// The backend reported the record already exists. Not an error:
    /// no mutation happened.
    AlreadyExists,
}

/// Trait for DNS provider implementations
///
/// One instance manages one zone on one backend. Implementations own a
/// record cache (see [`crate::cache::RecordCache`]): reads serve from it,
/// refreshing only when it is stale, and every successful mutation writes it
/// back before returning, so a reconciliation batch always sees its own
/// writes.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Idempotency
///
/// The mutation methods must report, not fail on, the two conditions a
/// repeated run produces: `create_record` returns
/// [`CreateOutcome::AlreadyExists`] when the backend says so, and
/// `delete_record` returns `false` when the record is already gone. Errors
/// are reserved for calls that may have left the zone in a different state
/// than reported.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;

    /// The zone this instance manages (apex name, e.g. "example.com")
    fn zone(&self) -> &str;

    /// How this adapter performs updates
    fn update_strategy(&self) -> UpdateStrategy;

    /// The smallest TTL the backend accepts
    ///
    /// Used by upstream defaulting logic to floor configured TTLs before
    /// they reach [`validate_record`](Self::validate_record).
    fn minimum_ttl(&self) -> u32;

    /// Whether this backend supports the given record type
    fn supports_record_type(&self, rtype: &RecordType) -> bool;

    /// Validate a desired record without touching the network
    ///
    /// The default applies the rules shared by every backend (see
    /// [`crate::validate`]) plus the type support and TTL floor this trait
    /// exposes. Adapters may override to add backend quirks, but must not
    /// relax the shared rules.
    fn validate_record(&self, spec: &RecordSpec) -> Result<(), crate::Error> {
        if !self.supports_record_type(&spec.rtype) {
            return Err(crate::Error::validation(format!(
                "{} does not support {} records",
                self.provider_name(),
                spec.rtype
            )));
        }
        validate::validate_spec(spec, self.zone())?;
        if let Some(ttl) = spec.ttl
            && ttl < self.minimum_ttl()
        {
            return Err(crate::Error::validation(format!(
                "TTL {} is below the {} minimum of {}",
                ttl,
                self.provider_name(),
                self.minimum_ttl()
            )));
        }
        Ok(())
    }

    /// Establish readiness: check credentials and zone access, warm the cache
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The adapter is ready for use
    /// - `Err(Error::Init)`: Credentials or zone are missing or the first
    ///   refresh failed. Fatal to process startup.
    async fn init(&self) -> Result<(), crate::Error>;

    /// List zone records matching an optional filter
    ///
    /// Serves from the cache; triggers a backend list call only when the
    /// cache is stale or has never been populated. Repeated reads within
    /// the staleness window must not produce backend calls.
    async fn list_records(&self, filter: &RecordFilter) -> Result<Vec<DnsRecord>, crate::Error>;

    /// Create a record from a desired spec
    ///
    /// Validates and converts the spec, then issues the backend create call.
    ///
    /// # Returns
    ///
    /// - `Ok(CreateOutcome::Created)`: The canonical record as created
    /// - `Ok(CreateOutcome::AlreadyExists)`: Backend reported a duplicate;
    ///   nothing was mutated
    /// - `Err(Error)`: Validation or backend failure
    async fn create_record(&self, spec: &RecordSpec) -> Result<CreateOutcome, crate::Error>;

    /// Replace an existing record with a desired spec
    ///
    /// One logical operation regardless of [`UpdateStrategy`]. `existing`
    /// is the cached record being replaced; its `native_ref` carries
    /// whatever handle the backend needs (record id, original rdata).
    ///
    /// # Returns
    ///
    /// - `Ok(DnsRecord)`: The canonical record as the backend now holds it
    /// - `Err(Error::PartialUpdate)`: Delete-then-create adapters only: the
    ///   old record was deleted but the new one could not be created, so the
    ///   record is currently missing rather than merely unchanged
    /// - `Err(Error)`: Ordinary validation or backend failure; the old
    ///   record still stands
    async fn update_record(
        &self,
        existing: &DnsRecord,
        spec: &RecordSpec,
    ) -> Result<DnsRecord, crate::Error>;

    /// Delete a record
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: The record was removed
    /// - `Ok(false)`: Backend reported not-found; nothing was mutated
    /// - `Err(Error)`: Backend failure
    async fn delete_record(&self, record: &DnsRecord) -> Result<bool, crate::Error>;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    ///
    /// Construction is offline: network validation belongs in
    /// [`DnsProvider::init`].
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
