// # Cloudflare DNS Provider
//
// This crate provides a Cloudflare adapter for the zonesync record
// reconciliation system.
//
// ## Capabilities
//
// - Full record CRUD against one Cloudflare zone via API v4
// - Native in-place updates (PUT), no delete-then-create composition
// - Zone snapshot cache with staleness-gated refreshes
// - Idempotent no-op mapping: "record already exists" on create and
//   "record not found" on delete are results, not errors
// - Record types: A, AAAA, CNAME, MX, TXT, NS, SRV, CAA
//   (no ANAME - Cloudflare flattens apex CNAMEs instead; no PTR in
//   regular zones)
//
// ## Security Requirements
//
// - API token NEVER appears in logs
// - Provider fails init() fast if the token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?page=...&per_page=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use zonesync_core::cache::RecordCache;
use zonesync_core::config::{BackendConfig, ProviderConfig};
use zonesync_core::record::{DnsRecord, RecordFilter, RecordSpec, RecordType};
use zonesync_core::traits::{CreateOutcome, DnsProvider, DnsProviderFactory, UpdateStrategy};
use zonesync_core::{Error, Result};

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Records fetched per list page
const LIST_PAGE_SIZE: u32 = 100;

/// Smallest TTL Cloudflare accepts (other than 1 = automatic)
const MIN_TTL: u32 = 60;

/// TTL value Cloudflare treats as "automatic"
const TTL_AUTO: u32 = 1;

/// API error codes for "an identical record already exists"
const ALREADY_EXISTS_CODES: [u64; 2] = [81053, 81057];

/// API error code for "record does not exist"
const NOT_FOUND_CODE: u64 = 81044;

/// Cloudflare DNS provider
///
/// One instance manages one zone. The zone ID is taken from configuration
/// when present, otherwise discovered once from the zone name during
/// `init()` and remembered.
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Zone apex name (e.g. "example.com")
    zone: String,

    /// Zone ID from configuration, if given
    configured_zone_id: Option<String>,

    /// Zone ID discovered from the API
    discovered_zone_id: OnceLock<String>,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Zone snapshot cache
    cache: tokio::sync::Mutex<RecordCache>,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("zone", &self.zone)
            .field("configured_zone_id", &self.configured_zone_id)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    /// - `zone`: Zone apex name this instance manages
    /// - `zone_id`: Optional zone ID (discovered from `zone` when absent)
    /// - `timeout`: Outbound HTTP timeout
    /// - `cache_max_age`: Zone snapshot staleness threshold
    ///
    /// # Security
    ///
    /// The API token will NEVER be logged or displayed in error messages.
    pub fn new(
        api_token: impl Into<String>,
        zone: impl Into<String>,
        zone_id: Option<String>,
        timeout: Duration,
        cache_max_age: Duration,
    ) -> Self {
        // Build HTTP client with timeout
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            api_token: api_token.into(),
            zone: zone.into(),
            configured_zone_id: zone_id,
            discovered_zone_id: OnceLock::new(),
            client,
            cache: tokio::sync::Mutex::new(RecordCache::new(cache_max_age)),
        }
    }

    /// Get the zone ID, discovering it from the zone name on first use
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// Authorization: Bearer <token>
    /// ```
    async fn zone_id(&self) -> Result<String> {
        if let Some(ref zone_id) = self.configured_zone_id {
            return Ok(zone_id.clone());
        }
        if let Some(zone_id) = self.discovered_zone_id.get() {
            return Ok(zone_id.clone());
        }

        debug!("Looking up zone ID for zone: {}", self.zone);
        let url = format!("{}/zones?name={}", CLOUDFLARE_API_BASE, self.zone);
        let envelope: CfEnvelope<Vec<Value>> = self.get_json(&url, "zone lookup").await?;
        let zones = envelope.into_result("zone lookup")?;

        let zone_id = zones
            .first()
            .and_then(|zone| zone["id"].as_str())
            .ok_or_else(|| {
                Error::api("cloudflare", format!("Zone not found: {}", self.zone))
            })?
            .to_string();

        debug!("Found zone ID: {}", zone_id);
        let _ = self.discovered_zone_id.set(zone_id.clone());
        Ok(zone_id)
    }

    /// Fetch the whole zone, following pagination
    async fn fetch_all(&self) -> Result<Vec<DnsRecord>> {
        let zone_id = self.zone_id().await?;
        let mut records = Vec::new();
        let mut page = 1u32;

        loop {
            let url = format!(
                "{}/zones/{}/dns_records?page={}&per_page={}",
                CLOUDFLARE_API_BASE, zone_id, page, LIST_PAGE_SIZE
            );
            let envelope: CfEnvelope<Vec<CfRecord>> = self.get_json(&url, "record list").await?;
            let total_pages = envelope
                .result_info
                .as_ref()
                .map(|info| info.total_pages)
                .unwrap_or(1);
            let batch = envelope.into_result("record list")?;
            records.extend(batch.into_iter().map(CfRecord::into_canonical));

            if page >= total_pages {
                break;
            }
            page += 1;
        }

        debug!("Fetched {} records from zone {}", records.len(), self.zone);
        Ok(records)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        context: &str,
    ) -> Result<CfEnvelope<T>> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::network(format!("Cloudflare request failed: {}", e)))?;
        read_envelope(response, context).await
    }

    /// The request body for creating or replacing a record
    fn record_payload(&self, spec: &RecordSpec) -> Value {
        let ttl = spec.ttl.unwrap_or(TTL_AUTO);
        let mut payload = serde_json::json!({
            "type": spec.rtype.as_str(),
            "name": spec.name,
            "content": spec.content,
            "ttl": ttl,
        });
        match spec.rtype {
            RecordType::Mx => {
                payload["priority"] = spec.priority.unwrap_or(10).into();
            }
            RecordType::Srv => {
                payload["data"] = serde_json::json!({
                    "priority": spec.priority.unwrap_or(0),
                    "weight": spec.weight.unwrap_or(0),
                    "port": spec.port,
                    "target": spec.content,
                });
            }
            RecordType::Caa => {
                payload["data"] = serde_json::json!({
                    "flags": spec.flags.unwrap_or(0),
                    "tag": spec.tag,
                    "value": spec.content,
                });
            }
            _ => {}
        }
        payload
    }

    /// The record ID an earlier list call attached to this record
    fn record_id(record: &DnsRecord) -> Result<String> {
        record
            .native_ref
            .as_ref()
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                Error::api(
                    "cloudflare",
                    format!("record {} carries no Cloudflare record ID", record.name),
                )
            })
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }

    fn zone(&self) -> &str {
        &self.zone
    }

    fn update_strategy(&self) -> UpdateStrategy {
        UpdateStrategy::NativeUpdate
    }

    fn minimum_ttl(&self) -> u32 {
        MIN_TTL
    }

    fn supports_record_type(&self, rtype: &RecordType) -> bool {
        matches!(
            rtype,
            RecordType::A
                | RecordType::Aaaa
                | RecordType::Cname
                | RecordType::Mx
                | RecordType::Txt
                | RecordType::Ns
                | RecordType::Srv
                | RecordType::Caa
        )
    }

    /// The shared rules, except that TTL 1 means "automatic" to Cloudflare
    /// and passes the floor
    fn validate_record(&self, spec: &RecordSpec) -> Result<()> {
        if !self.supports_record_type(&spec.rtype) {
            return Err(Error::validation(format!(
                "cloudflare does not support {} records",
                spec.rtype
            )));
        }
        zonesync_core::validate::validate_spec(spec, self.zone())?;
        if let Some(ttl) = spec.ttl
            && ttl != TTL_AUTO
            && ttl < MIN_TTL
        {
            return Err(Error::validation(format!(
                "TTL {} is below the cloudflare minimum of {}",
                ttl, MIN_TTL
            )));
        }
        Ok(())
    }

    async fn init(&self) -> Result<()> {
        if self.api_token.is_empty() {
            return Err(Error::init("cloudflare", "API token is required"));
        }

        self.zone_id()
            .await
            .map_err(|e| Error::init("cloudflare", e.to_string()))?;

        let records = self
            .fetch_all()
            .await
            .map_err(|e| Error::init("cloudflare", format!("initial zone fetch failed: {}", e)))?;
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
        let zone_id = self.zone_id().await?;

        let url = format!("{}/zones/{}/dns_records", CLOUDFLARE_API_BASE, zone_id);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&self.record_payload(spec))
            .send()
            .await
            .map_err(|e| Error::network(format!("Cloudflare request failed: {}", e)))?;

        let envelope: CfEnvelope<CfRecord> = read_envelope(response, "record create").await?;
        if envelope.has_error_code(&ALREADY_EXISTS_CODES) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        let record = envelope.into_result("record create")?.into_canonical();
        self.cache.lock().await.upsert(record.clone());
        Ok(CreateOutcome::Created(record))
    }

    async fn update_record(&self, existing: &DnsRecord, spec: &RecordSpec) -> Result<DnsRecord> {
        self.validate_record(spec)?;
        let zone_id = self.zone_id().await?;
        let record_id = Self::record_id(existing)?;

        let url = format!(
            "{}/zones/{}/dns_records/{}",
            CLOUDFLARE_API_BASE, zone_id, record_id
        );
        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.api_token)
            .json(&self.record_payload(spec))
            .send()
            .await
            .map_err(|e| Error::network(format!("Cloudflare request failed: {}", e)))?;

        let envelope: CfEnvelope<CfRecord> = read_envelope(response, "record update").await?;
        let record = envelope.into_result("record update")?.into_canonical();
        let mut cache = self.cache.lock().await;
        cache.remove(&existing.key());
        cache.upsert(record.clone());
        Ok(record)
    }

    async fn delete_record(&self, record: &DnsRecord) -> Result<bool> {
        let zone_id = self.zone_id().await?;
        let record_id = Self::record_id(record)?;

        let url = format!(
            "{}/zones/{}/dns_records/{}",
            CLOUDFLARE_API_BASE, zone_id, record_id
        );
        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::network(format!("Cloudflare request failed: {}", e)))?;

        // A 404 or error code 81044 means the record is already gone. The
        // cached entry is stale either way, so drop it in both paths.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            self.cache.lock().await.remove(&record.key());
            return Ok(false);
        }
        let envelope: CfEnvelope<Value> = read_envelope(response, "record delete").await?;
        if envelope.has_error_code(&[NOT_FOUND_CODE]) {
            self.cache.lock().await.remove(&record.key());
            return Ok(false);
        }
        envelope.into_result("record delete")?;
        self.cache.lock().await.remove(&record.key());
        Ok(true)
    }
}

/// Cloudflare's response envelope: `{success, errors, result, result_info}`
#[derive(Debug, Deserialize)]
struct CfEnvelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<CfError>,
    result: Option<T>,
    #[serde(default)]
    result_info: Option<CfResultInfo>,
}

#[derive(Debug, Deserialize)]
struct CfError {
    code: u64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct CfResultInfo {
    #[serde(default)]
    total_pages: u32,
}

impl<T> CfEnvelope<T> {
    fn has_error_code(&self, codes: &[u64]) -> bool {
        self.errors.iter().any(|e| codes.contains(&e.code))
    }

    fn into_result(self, context: &str) -> Result<T> {
        if !self.success {
            let detail = self
                .errors
                .iter()
                .map(|e| format!("{} (code {})", e.message, e.code))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Error::api(
                "cloudflare",
                format!("{} failed: {}", context, detail),
            ));
        }
        self.result.ok_or_else(|| {
            Error::api(
                "cloudflare",
                format!("{} returned no result payload", context),
            )
        })
    }
}

/// Parse a response body into the envelope, mapping HTTP-level failures
/// that carry no envelope to API errors
async fn read_envelope<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    context: &str,
) -> Result<CfEnvelope<T>> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::network(format!("Cloudflare response read failed: {}", e)))?;

    serde_json::from_str(&body).map_err(|_| {
        let detail = match status.as_u16() {
            401 | 403 => "Authentication failed: invalid API token or insufficient permissions"
                .to_string(),
            429 => "Rate limit exceeded".to_string(),
            500..=599 => format!("Cloudflare server error: {}", status),
            _ => format!("HTTP {}", status),
        };
        Error::api("cloudflare", format!("{} failed: {}", context, detail))
    })
}

/// A DNS record as Cloudflare's API represents it
#[derive(Debug, Clone, Deserialize)]
struct CfRecord {
    id: String,
    name: String,
    #[serde(rename = "type")]
    rtype: String,
    #[serde(default)]
    content: String,
    ttl: u32,
    #[serde(default)]
    priority: Option<u16>,
    #[serde(default)]
    data: Option<CfRecordData>,
}

/// The `data` object Cloudflare attaches to SRV and CAA records
#[derive(Debug, Clone, Default, Deserialize)]
struct CfRecordData {
    #[serde(default)]
    priority: Option<u16>,
    #[serde(default)]
    weight: Option<u16>,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    flags: Option<u8>,
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    value: Option<String>,
}

impl CfRecord {
    /// Convert into the canonical record shape, remembering the record ID
    /// for later mutations
    fn into_canonical(self) -> DnsRecord {
        let rtype = RecordType::from(self.rtype);
        let data = self.data.unwrap_or_default();

        let (content, priority, weight, port, flags, tag) = match rtype {
            RecordType::Mx => (self.content, self.priority, None, None, None, None),
            RecordType::Srv => (
                data.target.unwrap_or(self.content),
                data.priority,
                data.weight,
                data.port,
                None,
                None,
            ),
            RecordType::Caa => (
                data.value.unwrap_or(self.content),
                None,
                None,
                None,
                data.flags,
                data.tag,
            ),
            _ => (self.content, None, None, None, None, None),
        };

        DnsRecord {
            name: self.name,
            rtype,
            content,
            ttl: self.ttl,
            priority,
            weight,
            port,
            flags,
            tag,
            native_ref: Some(Value::String(self.id)),
        }
    }
}

/// Factory for creating Cloudflare providers
pub struct CloudflareFactory;

impl DnsProviderFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match &config.backend {
            BackendConfig::Cloudflare {
                api_token,
                zone,
                zone_id,
            } => {
                if api_token.is_empty() {
                    return Err(Error::config("Cloudflare API token is required"));
                }
                if zone.is_empty() {
                    return Err(Error::config("Cloudflare zone is required"));
                }

                Ok(Box::new(CloudflareProvider::new(
                    api_token.clone(),
                    zone.clone(),
                    zone_id.clone(),
                    Duration::from_secs(config.timeout_secs),
                    Duration::from_secs(config.cache_max_age_secs),
                )))
            }
            _ => Err(Error::config("Invalid config for Cloudflare provider")),
        }
    }
}

/// Register the Cloudflare provider with a registry
///
/// This function should be called during initialization to make the
/// Cloudflare backend available.
///
/// # Example
///
/// ```rust
/// use zonesync_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// zonesync_provider_cloudflare::register(&registry);
/// ```
pub fn register(registry: &zonesync_core::ProviderRegistry) {
    registry.register_provider("cloudflare", Box::new(CloudflareFactory));
}
