// # Technitium DNS Provider
//
// This crate provides a Technitium DNS Server adapter for the zonesync
// record reconciliation system.
//
// ## Capabilities
//
// - Full record CRUD against one zone via the Technitium admin API
// - Updates composed from delete + create (the API has no in-place
//   replace that covers every record type); a delete that succeeds
//   followed by a create that fails surfaces as a partial update
// - Zone snapshot cache with staleness-gated refreshes
// - Idempotent no-op mapping from the server's error messages:
//   "already exists" on create and "not found" on delete are results,
//   not errors
// - All record types, including ANAME, PTR and Technitium extension
//   types (FWD, APP, ...), which pass through as generic payloads
//
// ## Security Requirements
//
// - The API token travels as a query parameter, so request URLs are
//   NEVER logged
// - Provider fails init() fast if the token or zone is empty
//
// ## API Reference
//
// - Technitium DNS Server HTTP API:
//   https://github.com/TechnitiumSoftware/DnsServer/blob/master/APIDOCS.md
// - List: GET `/api/zones/records/get?token=...&domain=<zone>&zone=<zone>&listZone=true`
// - Create: GET `/api/zones/records/add?token=...&domain=<name>&zone=<zone>&type=...&ttl=...&<rdata fields>`
// - Delete: GET `/api/zones/records/delete?token=...&domain=<name>&zone=<zone>&type=...&<rdata fields>`

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use zonesync_core::cache::RecordCache;
use zonesync_core::config::{BackendConfig, ProviderConfig};
use zonesync_core::record::{DnsRecord, RecordFilter, RecordSpec, RecordType};
use zonesync_core::traits::{CreateOutcome, DnsProvider, DnsProviderFactory, UpdateStrategy};
use zonesync_core::wire::{self, WireRecord};
use zonesync_core::{Error, Result};

/// TTL applied when a desired record leaves its TTL unset
const DEFAULT_TTL: u32 = 3600;

/// Substring the server reports when a created record is already present
const ALREADY_EXISTS_MARKER: &str = "already exists";

/// Substring the server reports when a deleted record is already gone
const NOT_FOUND_MARKER: &str = "not found";

/// Technitium DNS Server provider
///
/// One instance manages one zone on one server. Updates are composed from
/// delete-then-create, so the reconciler sees
/// [`UpdateStrategy::DeleteThenCreate`] and partial update failures are
/// possible.
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct TechnitiumProvider {
    /// Server base URL without a trailing slash (e.g. "http://dns.local:5380")
    base_url: String,

    /// Technitium API token
    /// ⚠️ NEVER log this value; it rides in every request's query string
    api_token: String,

    /// Zone apex name (e.g. "example.com")
    zone: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Zone snapshot cache
    cache: tokio::sync::Mutex<RecordCache>,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for TechnitiumProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TechnitiumProvider")
            .field("base_url", &self.base_url)
            .field("api_token", &"<REDACTED>")
            .field("zone", &self.zone)
            .finish()
    }
}

impl TechnitiumProvider {
    /// Create a new Technitium provider
    ///
    /// # Parameters
    ///
    /// - `base_url`: Server base URL (a trailing slash is tolerated)
    /// - `api_token`: API token with zone management permissions
    /// - `zone`: Zone apex name this instance manages
    /// - `timeout`: Outbound HTTP timeout
    /// - `cache_max_age`: Zone snapshot staleness threshold
    pub fn new(
        base_url: impl Into<String>,
        api_token: impl Into<String>,
        zone: impl Into<String>,
        timeout: Duration,
        cache_max_age: Duration,
    ) -> Self {
        // Build HTTP client with timeout
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
            zone: zone.into(),
            client,
            cache: tokio::sync::Mutex::new(RecordCache::new(cache_max_age)),
        }
    }

    /// Issue one API call and parse its envelope
    ///
    /// Only the endpoint path is ever logged; the query string carries the
    /// token.
    async fn call(&self, endpoint: &str, params: &[(String, String)]) -> Result<TnEnvelope> {
        let url = format!("{}/api/zones/records/{}", self.base_url, endpoint);
        debug!("Technitium API call: {} ({})", endpoint, self.zone);

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| Error::network(format!("Technitium request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::network(format!("Technitium response read failed: {}", e)))?;

        serde_json::from_str(&body).map_err(|_| {
            Error::api(
                "technitium",
                format!("record {} failed: HTTP {}", endpoint, status),
            )
        })
    }

    /// The parameters every call carries: token, record name, zone
    fn base_params(&self, domain: &str) -> Vec<(String, String)> {
        vec![
            ("token".to_string(), self.api_token.clone()),
            ("domain".to_string(), domain.to_string()),
            ("zone".to_string(), self.zone.clone()),
        ]
    }

    /// Fetch the whole zone and convert it into canonical records
    async fn fetch_all(&self) -> Result<Vec<DnsRecord>> {
        let mut params = self.base_params(&self.zone);
        params.push(("listZone".to_string(), "true".to_string()));

        let envelope = self.call("get", &params).await?;
        let response = envelope.into_response("list")?;
        let list: TnRecordList = serde_json::from_value(response)?;

        let records = list
            .records
            .into_iter()
            .map(|wire_record| {
                // Keep the server's own rdata for later delete calls
                let native = serde_json::to_value(&wire_record.r_data).ok();
                let mut record = wire::from_wire(&wire_record);
                record.native_ref = native;
                record
            })
            .collect::<Vec<_>>();

        debug!("Fetched {} records from zone {}", records.len(), self.zone);
        Ok(records)
    }

    /// Issue the create call for an already-validated, defaulted record
    async fn api_create(&self, record: &DnsRecord) -> Result<CreateOutcome> {
        let wire_record = wire::to_wire(record);
        let mut params = self.base_params(&record.name);
        params.push(("type".to_string(), wire_record.rtype.clone()));
        params.push(("ttl".to_string(), record.ttl.to_string()));
        params.extend(rdata_params(&wire_record)?);

        let envelope = self.call("add", &params).await?;
        if envelope.message_contains(ALREADY_EXISTS_MARKER) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        envelope.into_ok("create")?;

        let mut created = record.clone();
        created.native_ref = serde_json::to_value(&wire_record.r_data).ok();
        Ok(CreateOutcome::Created(created))
    }

    /// Issue the delete call; `Ok(false)` when the server says not-found
    async fn api_delete(&self, record: &DnsRecord) -> Result<bool> {
        let mut params = self.base_params(&record.name);
        params.push(("type".to_string(), record.rtype.as_str().to_string()));
        params.extend(delete_params(record)?);

        let envelope = self.call("delete", &params).await?;
        if envelope.message_contains(NOT_FOUND_MARKER) {
            return Ok(false);
        }
        envelope.into_ok("delete")?;
        Ok(true)
    }

    /// The canonical record a spec converges to, with server-side defaults
    /// filled in
    fn record_from_spec(&self, spec: &RecordSpec) -> DnsRecord {
        let mut defaulted = spec.clone();
        zonesync_core::validate::apply_server_defaults(&mut defaulted);
        DnsRecord::from_spec(&defaulted, DEFAULT_TTL)
    }
}

#[async_trait]
impl DnsProvider for TechnitiumProvider {
    fn provider_name(&self) -> &'static str {
        "technitium"
    }

    fn zone(&self) -> &str {
        &self.zone
    }

    fn update_strategy(&self) -> UpdateStrategy {
        UpdateStrategy::DeleteThenCreate
    }

    fn minimum_ttl(&self) -> u32 {
        1
    }

    /// Technitium accepts every type this system models, extension types
    /// included
    fn supports_record_type(&self, _rtype: &RecordType) -> bool {
        true
    }

    async fn init(&self) -> Result<()> {
        if self.api_token.is_empty() {
            return Err(Error::init("technitium", "API token is required"));
        }
        if self.zone.is_empty() {
            return Err(Error::init("technitium", "zone is required"));
        }

        let records = self
            .fetch_all()
            .await
            .map_err(|e| Error::init("technitium", format!("initial zone fetch failed: {}", e)))?;
        self.cache.lock().await.replace(records);
        Ok(())
    }

    async fn list_records(&self, filter: &RecordFilter) -> Result<Vec<DnsRecord>> {
        let mut cache = self.cache.lock().await;
        if !cache.is_fresh() {
            let records = self.fetch_all().await?;
            cache.replace(records);
        }
        Ok(cache.matching(filter))
    }

    async fn create_record(&self, spec: &RecordSpec) -> Result<CreateOutcome> {
        self.validate_record(spec)?;
        let record = self.record_from_spec(spec);

        let outcome = self.api_create(&record).await?;
        if let CreateOutcome::Created(ref created) = outcome {
            self.cache.lock().await.upsert(created.clone());
        }
        Ok(outcome)
    }

    async fn update_record(&self, existing: &DnsRecord, spec: &RecordSpec) -> Result<DnsRecord> {
        self.validate_record(spec)?;
        let replacement = self.record_from_spec(spec);

        // Delete failure here is ordinary: the old record still stands
        self.api_delete(existing).await?;
        self.cache.lock().await.remove(&existing.key());

        // From this point the old record is gone; a create failure leaves
        // the zone missing the record, which is its own error class
        match self.api_create(&replacement).await {
            Ok(CreateOutcome::Created(created)) => {
                self.cache.lock().await.upsert(created.clone());
                Ok(created)
            }
            Ok(CreateOutcome::AlreadyExists) => {
                // The exact replacement landed in the gap; adopt it
                self.cache.lock().await.upsert(replacement.clone());
                Ok(replacement)
            }
            Err(e) => Err(Error::partial_update(
                &spec.name,
                spec.rtype.as_str(),
                e.to_string(),
            )),
        }
    }

    async fn delete_record(&self, record: &DnsRecord) -> Result<bool> {
        let deleted = self.api_delete(record).await?;
        // Gone either way; drop the cached entry so reads agree
        self.cache.lock().await.remove(&record.key());
        Ok(deleted)
    }
}

/// The server's response envelope: `{status, response?, errorMessage?}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TnEnvelope {
    status: String,
    #[serde(default)]
    response: Option<Value>,
    #[serde(default)]
    error_message: Option<String>,
}

impl TnEnvelope {
    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    /// Case-insensitive check of the server's error message
    fn message_contains(&self, needle: &str) -> bool {
        !self.is_ok()
            && self
                .error_message
                .as_deref()
                .is_some_and(|m| m.to_ascii_lowercase().contains(needle))
    }

    /// Succeed with no payload, or map the error message
    fn into_ok(self, context: &str) -> Result<()> {
        if self.is_ok() {
            return Ok(());
        }
        Err(Error::api(
            "technitium",
            format!(
                "record {} failed: {}",
                context,
                self.error_message
                    .unwrap_or_else(|| "no error message".to_string())
            ),
        ))
    }

    /// Succeed with the response payload, or map the error message
    fn into_response(self, context: &str) -> Result<Value> {
        if !self.is_ok() {
            return Err(Error::api(
                "technitium",
                format!(
                    "record {} failed: {}",
                    context,
                    self.error_message
                        .unwrap_or_else(|| "no error message".to_string())
                ),
            ));
        }
        self.response.ok_or_else(|| {
            Error::api(
                "technitium",
                format!("record {} returned no response payload", context),
            )
        })
    }
}

/// The `response` payload of a zone list call
#[derive(Debug, Deserialize)]
struct TnRecordList {
    #[serde(default)]
    records: Vec<WireRecord>,
}

/// Flatten a wire record's rdata into query parameters
///
/// Strings pass through bare; numbers render in decimal. The server's field
/// names are exactly the wire names (`ipAddress`, `mailExchange`, ...).
fn rdata_params(wire_record: &WireRecord) -> Result<Vec<(String, String)>> {
    let rdata = serde_json::to_value(&wire_record.r_data)?;
    Ok(value_params(&rdata))
}

/// The rdata parameters identifying a record to the delete endpoint
///
/// Prefers the server's own representation captured at list time, falling
/// back to converting the canonical record.
fn delete_params(record: &DnsRecord) -> Result<Vec<(String, String)>> {
    if let Some(ref native) = record.native_ref
        && native.is_object()
    {
        return Ok(value_params(native));
    }
    rdata_params(&wire::to_wire(record))
}

fn value_params(value: &Value) -> Vec<(String, String)> {
    let Some(object) = value.as_object() else {
        return Vec::new();
    };
    object
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let rendered = match v.as_str() {
                Some(s) => s.to_string(),
                None => v.to_string(),
            };
            (k.clone(), rendered)
        })
        .collect()
}

/// Factory for creating Technitium providers
pub struct TechnitiumFactory;

impl DnsProviderFactory for TechnitiumFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match &config.backend {
            BackendConfig::Technitium {
                base_url,
                api_token,
                zone,
            } => {
                if base_url.is_empty() {
                    return Err(Error::config("Technitium base URL is required"));
                }
                if api_token.is_empty() {
                    return Err(Error::config("Technitium API token is required"));
                }
                if zone.is_empty() {
                    return Err(Error::config("Technitium zone is required"));
                }

                Ok(Box::new(TechnitiumProvider::new(
                    base_url.clone(),
                    api_token.clone(),
                    zone.clone(),
                    Duration::from_secs(config.timeout_secs),
                    Duration::from_secs(config.cache_max_age_secs),
                )))
            }
            _ => Err(Error::config("Invalid config for Technitium provider")),
        }
    }
}

/// Register the Technitium provider with a registry
///
/// This function should be called during initialization to make the
/// Technitium backend available.
///
/// # Example
///
/// ```rust
/// use zonesync_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// zonesync_provider_technitium::register(&registry);
/// ```
pub fn register(registry: &zonesync_core::ProviderRegistry) {
    registry.register_provider("technitium", Box::new(TechnitiumFactory));
}
