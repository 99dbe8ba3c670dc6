// # IP Lookup Trait
//
// Defines the interface for discovering the host's public IP address.
//
// ## Implementations
//
// - HTTP-based ("what is my IP" services): `zonesync-ip-http` crate
// - Future: STUN, router UPnP queries
//
// ## Usage
//
// ```rust,ignore
// use zonesync_core::{IpLookupService, IpVersion};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let service = /* IpLookupService implementation */;
//
//     let ip = service.lookup(IpVersion::V4).await?;
//     println!("public IPv4: {}", ip);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;

/// IP version (v4 or v6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpVersion {
    V4,
    V6,
}

impl std::fmt::Display for IpVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IpVersion::V4 => f.write_str("IPv4"),
            IpVersion::V6 => f.write_str("IPv6"),
        }
    }
}

/// Trait for public IP lookup implementations
///
/// One instance represents one external lookup service. The resolver owns
/// chains of these (primary plus fallbacks) and all caching; implementations
/// perform exactly one outbound call per `lookup` invocation.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait IpLookupService: Send + Sync {
    /// Get the service name (for logging/debugging)
    fn service_name(&self) -> &str;

    /// Look up the host's public address for one IP version
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: The discovered address, matching `version`
    /// - `Err(Error)`: The service failed, timed out, or returned an
    ///   address of the wrong version
    async fn lookup(&self, version: IpVersion) -> Result<IpAddr, crate::Error>;
}
