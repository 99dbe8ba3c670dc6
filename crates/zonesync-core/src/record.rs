//! Canonical record model
//!
//! Defines the provider-independent record shape ([`DnsRecord`]), the desired
//! state supplied by callers ([`RecordSpec`]), and the identity key used to
//! match one against the other during reconciliation.

use serde::{Deserialize, Serialize};

/// DNS record type
///
/// Covers the types every adapter understands plus `Other` for
/// provider-specific extensions, which pass through conversion as a generic
/// payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Aname,
    Mx,
    Txt,
    Ns,
    Ptr,
    Srv,
    Caa,
    /// Provider-specific extension type (stored uppercase)
    Other(String),
}

impl RecordType {
    /// The wire name of the type
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Aname => "ANAME",
            RecordType::Mx => "MX",
            RecordType::Txt => "TXT",
            RecordType::Ns => "NS",
            RecordType::Ptr => "PTR",
            RecordType::Srv => "SRV",
            RecordType::Caa => "CAA",
            RecordType::Other(name) => name,
        }
    }

    /// Whether a zone may hold several records of this type sharing a name.
    ///
    /// For these types the identity key additionally discriminates by
    /// content; for all others `(name, type)` alone identifies the record.
    pub fn is_multi_valued(&self) -> bool {
        matches!(self, RecordType::Txt | RecordType::Srv | RecordType::Caa)
    }

    /// Whether the record's content is an IP address literal
    pub fn is_address(&self) -> bool {
        matches!(self, RecordType::A | RecordType::Aaaa)
    }
}

impl From<String> for RecordType {
    fn from(s: String) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            "CNAME" => RecordType::Cname,
            "ANAME" => RecordType::Aname,
            "MX" => RecordType::Mx,
            "TXT" => RecordType::Txt,
            "NS" => RecordType::Ns,
            "PTR" => RecordType::Ptr,
            "SRV" => RecordType::Srv,
            "CAA" => RecordType::Caa,
            other => RecordType::Other(other.to_string()),
        }
    }
}

impl From<RecordType> for String {
    fn from(rtype: RecordType) -> Self {
        rtype.as_str().to_string()
    }
}

impl std::str::FromStr for RecordType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(RecordType::from(s.to_string()))
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A canonical DNS record as known to one provider
///
/// Serializes to the canonical JSON shape
/// `{name, type, content, ttl, priority?, weight?, port?, flags?, tag?}`.
/// `native_ref` carries the provider's original representation (record id,
/// raw rdata) so mutations can round-trip it; it never leaves the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Fully-qualified record name
    pub name: String,

    /// Record type
    #[serde(rename = "type")]
    pub rtype: RecordType,

    /// Type-dependent content: IP literal, target hostname, text, ...
    pub content: String,

    /// Time-to-live in seconds (positive)
    pub ttl: u32,

    /// MX preference / SRV priority
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub priority: Option<u16>,

    /// SRV weight
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub weight: Option<u16>,

    /// SRV port
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub port: Option<u16>,

    /// CAA flags
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub flags: Option<u8>,

    /// CAA tag (issue, issuewild, iodef)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tag: Option<String>,

    /// The provider's original representation, opaque to everything but the
    /// owning adapter
    #[serde(skip)]
    pub native_ref: Option<serde_json::Value>,
}

impl DnsRecord {
    /// Build the canonical record an adapter reports after creating `spec`.
    ///
    /// `fallback_ttl` fills in when the spec leaves the TTL unset (adapters
    /// pass their minimum or configured default).
    pub fn from_spec(spec: &RecordSpec, fallback_ttl: u32) -> Self {
        Self {
            name: spec.name.clone(),
            rtype: spec.rtype.clone(),
            content: spec.content.clone(),
            ttl: spec.ttl.unwrap_or(fallback_ttl),
            priority: spec.priority,
            weight: spec.weight,
            port: spec.port,
            flags: spec.flags,
            tag: spec.tag.clone(),
            native_ref: None,
        }
    }

    /// Identity key of this record (see [`RecordKey`])
    pub fn key(&self) -> RecordKey {
        RecordKey::new(&self.name, &self.rtype, &self.content)
    }
}

/// A desired record supplied by the caller
///
/// Specs with `manage: false` are excluded from convergence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSpec {
    /// Fully-qualified record name
    pub name: String,

    /// Record type
    #[serde(rename = "type")]
    pub rtype: RecordType,

    /// Desired content; empty means "fill from defaults upstream"
    #[serde(default)]
    pub content: String,

    /// Desired TTL; unset means "whatever the backend defaults to"
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ttl: Option<u32>,

    /// MX preference / SRV priority
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub priority: Option<u16>,

    /// SRV weight
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub weight: Option<u16>,

    /// SRV port
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub port: Option<u16>,

    /// CAA flags
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub flags: Option<u8>,

    /// CAA tag
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tag: Option<String>,

    /// Whether the reconciler manages this record
    #[serde(default = "default_manage")]
    pub manage: bool,
}

impl RecordSpec {
    /// Create a spec with the given name, type and content
    pub fn new(name: impl Into<String>, rtype: RecordType, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rtype,
            content: content.into(),
            ttl: None,
            priority: None,
            weight: None,
            port: None,
            flags: None,
            tag: None,
            manage: true,
        }
    }

    /// Set the TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set the priority (MX preference / SRV priority)
    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Mark the spec managed or unmanaged
    pub fn with_manage(mut self, manage: bool) -> Self {
        self.manage = manage;
        self
    }

    /// Identity key of this spec (see [`RecordKey`])
    pub fn key(&self) -> RecordKey {
        RecordKey::new(&self.name, &self.rtype, &self.content)
    }

    /// Whether converging this spec onto `existing` requires a mutation.
    ///
    /// Content always participates. TTL and the type-specific fields only
    /// count when the spec sets them: an unset field means the caller does
    /// not care what the backend holds there.
    pub fn differs_from(&self, existing: &DnsRecord) -> bool {
        if self.content != existing.content {
            return true;
        }
        if let Some(ttl) = self.ttl
            && ttl != existing.ttl
        {
            return true;
        }
        if let Some(priority) = self.priority
            && existing.priority != Some(priority)
        {
            return true;
        }
        if let Some(weight) = self.weight
            && existing.weight != Some(weight)
        {
            return true;
        }
        if let Some(port) = self.port
            && existing.port != Some(port)
        {
            return true;
        }
        if let Some(flags) = self.flags
            && existing.flags != Some(flags)
        {
            return true;
        }
        if let Some(ref tag) = self.tag
            && existing.tag.as_deref() != Some(tag.as_str())
        {
            return true;
        }
        false
    }
}

fn default_manage() -> bool {
    true
}

/// Identity key matching desired specs against cached records
///
/// `(name, type)` for single-valued types; multi-valued types (TXT, SRV,
/// CAA) additionally carry the content, since a zone may legitimately hold
/// several of them under one name. Names compare case-insensitively and
/// ignore a trailing dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    name: String,
    rtype: RecordType,
    content: Option<String>,
}

impl RecordKey {
    fn new(name: &str, rtype: &RecordType, content: &str) -> Self {
        let content = rtype.is_multi_valued().then(|| content.to_string());
        Self {
            name: normalize_name(name),
            rtype: rtype.clone(),
            content,
        }
    }
}

/// Lowercase and strip the trailing dot for identity and apex comparisons
pub fn normalize_name(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

/// Optional `{name, type}` filter for cache reads
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    /// Match this fully-qualified name (case-insensitive)
    pub name: Option<String>,
    /// Match this record type
    pub rtype: Option<RecordType>,
}

impl RecordFilter {
    /// Filter on name and type
    pub fn named(name: impl Into<String>, rtype: RecordType) -> Self {
        Self {
            name: Some(name.into()),
            rtype: Some(rtype),
        }
    }

    /// Whether `record` passes the filter
    pub fn matches(&self, record: &DnsRecord) -> bool {
        if let Some(ref name) = self.name
            && normalize_name(name) != normalize_name(&record.name)
        {
            return false;
        }
        if let Some(ref rtype) = self.rtype
            && *rtype != record.rtype
        {
            return false;
        }
        true
    }
}
