// # HTTP IP Lookup
//
// This crate provides HTTP-based public IP lookup services for the
// zonesync system.
//
// ## Purpose
//
// Each [`HttpIpLookup`] wraps one external "what is my IP" service
// (e.g., api.ipify.org, icanhazip.com) that returns the caller's public
// address as plain text. The resolver in zonesync-core owns chaining,
// caching and periodic refresh; a lookup here is exactly one outbound
// HTTP call.
//
// ## Services
//
// Known-good public services return the bare address followed by at
// most a trailing newline:
// - https://api.ipify.org      (IPv4)
// - https://icanhazip.com      (IPv4 or IPv6 depending on connectivity)
// - https://api6.ipify.org     (IPv6)

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;

use zonesync_core::config::IpResolverConfig;
use zonesync_core::traits::{IpLookupService, IpVersion};
use zonesync_core::{Error, PublicIpResolver, Result};

/// One HTTP "what is my IP" service
pub struct HttpIpLookup {
    /// URL returning the caller's public address as plain text
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpLookup {
    /// Create a new HTTP IP lookup service
    ///
    /// # Parameters
    ///
    /// - `url`: Service URL (e.g., "https://api.ipify.org")
    /// - `timeout`: Per-lookup HTTP timeout
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl IpLookupService for HttpIpLookup {
    fn service_name(&self) -> &str {
        &self.url
    }

    async fn lookup(&self, version: IpVersion) -> Result<IpAddr> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::network(format!("request to {} failed: {}", self.url, e)))?;

        if !response.status().is_success() {
            return Err(Error::api(
                "http",
                format!("{} answered HTTP {}", self.url, response.status()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::network(format!("reading {} failed: {}", self.url, e)))?;

        parse_lookup_response(&body, version, &self.url)
    }
}

/// Parse a service's response body into an address of the expected version
///
/// Bodies carry the bare address, possibly with surrounding whitespace
/// (icanhazip appends a newline).
fn parse_lookup_response(body: &str, version: IpVersion, service: &str) -> Result<IpAddr> {
    let text = body.trim();

    let ip: IpAddr = text.parse().map_err(|_| {
        Error::api(
            "http",
            format!("{} returned '{}', not an IP address", service, text),
        )
    })?;

    let matches_version = match version {
        IpVersion::V4 => ip.is_ipv4(),
        IpVersion::V6 => ip.is_ipv6(),
    };
    if !matches_version {
        return Err(Error::api(
            "http",
            format!("expected an {} address from {}, got {}", version, service, ip),
        ));
    }

    Ok(ip)
}

/// Build the lookup services an [`IpResolverConfig`] describes
///
/// # Returns
///
/// The IPv4 chain (primary first, fallback after when configured) and the
/// optional IPv6 service.
pub fn services_from_config(
    config: &IpResolverConfig,
) -> (Vec<Box<dyn IpLookupService>>, Option<Box<dyn IpLookupService>>) {
    let timeout = Duration::from_secs(config.lookup_timeout_secs);

    let mut v4_chain: Vec<Box<dyn IpLookupService>> =
        vec![Box::new(HttpIpLookup::new(&config.primary_v4_url, timeout))];
    if let Some(ref fallback) = config.fallback_v4_url {
        v4_chain.push(Box::new(HttpIpLookup::new(fallback, timeout)));
    }

    let v6_service = config
        .v6_url
        .as_ref()
        .map(|url| Box::new(HttpIpLookup::new(url, timeout)) as Box<dyn IpLookupService>);

    (v4_chain, v6_service)
}

/// Build a ready-to-use resolver from configuration
pub fn resolver_from_config(config: &IpResolverConfig) -> PublicIpResolver {
    let (v4_chain, v6_service) = services_from_config(config);
    PublicIpResolver::new(
        v4_chain,
        v6_service,
        Duration::from_secs(config.refresh_interval_secs),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVICE: &str = "https://api.ipify.org";

    #[test]
    fn test_plain_v4_body_parses() {
        let ip = parse_lookup_response("203.0.113.9", IpVersion::V4, SERVICE).unwrap();
        assert_eq!(ip, "203.0.113.9".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_trailing_newline_is_tolerated() {
        let ip = parse_lookup_response("203.0.113.9\n", IpVersion::V4, SERVICE).unwrap();
        assert_eq!(ip.to_string(), "203.0.113.9");
    }

    #[test]
    fn test_v6_body_parses() {
        let ip = parse_lookup_response("2001:db8::1\n", IpVersion::V6, SERVICE).unwrap();
        assert!(ip.is_ipv6());
    }

    #[test]
    fn test_html_error_page_is_rejected() {
        let err =
            parse_lookup_response("<html>rate limited</html>", IpVersion::V4, SERVICE).unwrap_err();
        assert!(err.to_string().contains("not an IP address"));
    }

    #[test]
    fn test_wrong_family_is_rejected() {
        let err = parse_lookup_response("2001:db8::1", IpVersion::V4, SERVICE).unwrap_err();
        assert!(err.to_string().contains("expected an IPv4 address"));

        let err = parse_lookup_response("203.0.113.9", IpVersion::V6, SERVICE).unwrap_err();
        assert!(err.to_string().contains("expected an IPv6 address"));
    }

    #[test]
    fn test_service_name_is_the_url() {
        let service = HttpIpLookup::new(SERVICE, Duration::from_secs(10));
        assert_eq!(service.service_name(), SERVICE);
    }

    #[test]
    fn test_default_config_builds_full_chain() {
        let config = IpResolverConfig::default();
        let (v4_chain, v6_service) = services_from_config(&config);

        assert_eq!(v4_chain.len(), 2);
        assert_eq!(v4_chain[0].service_name(), "https://api.ipify.org");
        assert_eq!(v4_chain[1].service_name(), "https://icanhazip.com");
        assert!(v6_service.is_some());
    }

    #[test]
    fn test_disabled_extras_shrink_the_chain() {
        let config = IpResolverConfig {
            fallback_v4_url: None,
            v6_url: None,
            ..IpResolverConfig::default()
        };
        let (v4_chain, v6_service) = services_from_config(&config);

        assert_eq!(v4_chain.len(), 1);
        assert!(v6_service.is_none());
    }
}
