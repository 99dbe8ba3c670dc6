//! Configuration types for the record synchronization system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::record::{RecordSpec, RecordType};

/// Main synchronization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// DNS providers to converge (one reconciler each)
    pub providers: Vec<ProviderConfig>,

    /// Public IP resolver settings
    #[serde(default)]
    pub ip: IpResolverConfig,

    /// Defaults applied to desired records before reconciliation
    #[serde(default)]
    pub defaults: RecordDefaults,

    /// Desired records, applied to every configured provider
    pub records: Vec<RecordSpec>,

    /// Seconds between reconciliation runs
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl SyncConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.providers.is_empty() {
            return Err(crate::Error::config("No providers configured"));
        }
        if self.records.is_empty() {
            return Err(crate::Error::config("No records configured"));
        }
        if self.poll_interval_secs == 0 {
            return Err(crate::Error::config("Poll interval must be > 0"));
        }

        for provider in &self.providers {
            provider.validate()?;
        }
        self.ip.validate()?;

        Ok(())
    }
}

/// Settings for one DNS provider instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Which backend to instantiate, with its credentials
    #[serde(flatten)]
    pub backend: BackendConfig,

    /// Seconds a cached zone snapshot stays fresh
    #[serde(default = "default_cache_max_age_secs")]
    pub cache_max_age_secs: u64,

    /// Outbound API call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    /// Cloudflare backend with default cache and timeout settings
    pub fn cloudflare(api_token: impl Into<String>, zone: impl Into<String>) -> Self {
        Self {
            backend: BackendConfig::Cloudflare {
                api_token: api_token.into(),
                zone: zone.into(),
                zone_id: None,
            },
            cache_max_age_secs: default_cache_max_age_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Technitium backend with default cache and timeout settings
    pub fn technitium(
        base_url: impl Into<String>,
        api_token: impl Into<String>,
        zone: impl Into<String>,
    ) -> Self {
        Self {
            backend: BackendConfig::Technitium {
                base_url: base_url.into(),
                api_token: api_token.into(),
                zone: zone.into(),
            },
            cache_max_age_secs: default_cache_max_age_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Custom backend resolved through the registry by factory name
    pub fn custom(factory: impl Into<String>) -> Self {
        Self {
            backend: BackendConfig::Custom {
                factory: factory.into(),
                config: serde_json::Value::Null,
            },
            cache_max_age_secs: default_cache_max_age_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("Provider timeout must be > 0"));
        }
        self.backend.validate()
    }

    /// Get the backend type name
    pub fn type_name(&self) -> &str {
        self.backend.type_name()
    }
}

/// DNS backend selection and credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Cloudflare DNS API
    Cloudflare {
        /// Cloudflare API token
        api_token: String,
        /// Zone apex name (e.g., "example.com")
        zone: String,
        /// Zone ID (optional, auto-detected from the zone name)
        zone_id: Option<String>,
    },

    /// Technitium DNS Server HTTP API
    Technitium {
        /// Server base URL (e.g., "http://dns.local:5380")
        base_url: String,
        /// API token
        api_token: String,
        /// Zone apex name
        zone: String,
    },

    /// Custom backend
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl BackendConfig {
    /// Validate the backend configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            BackendConfig::Cloudflare { api_token, zone, .. } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                if zone.is_empty() {
                    return Err(crate::Error::config("Cloudflare zone cannot be empty"));
                }
                Ok(())
            }
            BackendConfig::Technitium {
                base_url,
                api_token,
                zone,
            } => {
                if base_url.is_empty() {
                    return Err(crate::Error::config("Technitium base URL cannot be empty"));
                }
                if api_token.is_empty() {
                    return Err(crate::Error::config("Technitium API token cannot be empty"));
                }
                if zone.is_empty() {
                    return Err(crate::Error::config("Technitium zone cannot be empty"));
                }
                Ok(())
            }
            BackendConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom provider config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the backend type name
    pub fn type_name(&self) -> &str {
        match self {
            BackendConfig::Cloudflare { .. } => "cloudflare",
            BackendConfig::Technitium { .. } => "technitium",
            BackendConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Public IP resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpResolverConfig {
    /// Primary IPv4 lookup service URL
    #[serde(default = "default_primary_v4_url")]
    pub primary_v4_url: String,

    /// Fallback IPv4 lookup service URL, tried when the primary fails
    #[serde(default = "default_fallback_v4_url")]
    pub fallback_v4_url: Option<String>,

    /// IPv6 lookup service URL; set to null to disable IPv6 resolution
    #[serde(default = "default_v6_url")]
    pub v6_url: Option<String>,

    /// Seconds a resolved address stays fresh; also the periodic refresh
    /// interval
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Per-lookup timeout in seconds
    #[serde(default = "default_lookup_timeout_secs")]
    pub lookup_timeout_secs: u64,
}

impl IpResolverConfig {
    /// Validate the resolver configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.primary_v4_url.is_empty() {
            return Err(crate::Error::config("Primary IPv4 lookup URL cannot be empty"));
        }
        if self.refresh_interval_secs == 0 {
            return Err(crate::Error::config("IP refresh interval must be > 0"));
        }
        if self.lookup_timeout_secs == 0 {
            return Err(crate::Error::config("IP lookup timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for IpResolverConfig {
    fn default() -> Self {
        Self {
            primary_v4_url: default_primary_v4_url(),
            fallback_v4_url: default_fallback_v4_url(),
            v6_url: default_v6_url(),
            refresh_interval_secs: default_refresh_interval_secs(),
            lookup_timeout_secs: default_lookup_timeout_secs(),
        }
    }
}

/// Defaults applied to desired records before reconciliation
///
/// Filling happens upstream of the provider adapters: a spec field already
/// set always wins over a default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordDefaults {
    /// Default TTL for records that leave theirs unset
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ttl: Option<u32>,

    /// Per-record-type defaults, keyed by type name (e.g. "A", "MX")
    #[serde(default)]
    pub by_type: HashMap<String, TypeDefaults>,
}

impl RecordDefaults {
    /// Fill unset fields of `spec` from the configured defaults
    pub fn apply(&self, spec: &mut RecordSpec) {
        if let Some(defaults) = self.for_type(&spec.rtype) {
            if spec.content.is_empty()
                && let Some(ref content) = defaults.content
            {
                spec.content = content.clone();
            }
            if spec.ttl.is_none() {
                spec.ttl = defaults.ttl;
            }
            if spec.priority.is_none() {
                spec.priority = defaults.priority;
            }
            if spec.weight.is_none() {
                spec.weight = defaults.weight;
            }
            if spec.port.is_none() {
                spec.port = defaults.port;
            }
            if spec.flags.is_none() {
                spec.flags = defaults.flags;
            }
            if spec.tag.is_none() {
                spec.tag = defaults.tag.clone();
            }
        }
        if spec.ttl.is_none() {
            spec.ttl = self.ttl;
        }
    }

    fn for_type(&self, rtype: &RecordType) -> Option<&TypeDefaults> {
        self.by_type
            .iter()
            .find(|(key, _)| &RecordType::from((*key).clone()) == rtype)
            .map(|(_, defaults)| defaults)
    }
}

/// Default field values for one record type
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeDefaults {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ttl: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub priority: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub weight: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub flags: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tag: Option<String>,
}

fn default_poll_interval_secs() -> u64 {
    300
}

fn default_cache_max_age_secs() -> u64 {
    300
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_primary_v4_url() -> String {
    "https://api.ipify.org".to_string()
}

fn default_fallback_v4_url() -> Option<String> {
    Some("https://icanhazip.com".to_string())
}

fn default_v6_url() -> Option<String> {
    Some("https://api6.ipify.org".to_string())
}

fn default_refresh_interval_secs() -> u64 {
    300
}

fn default_lookup_timeout_secs() -> u64 {
    10
}
