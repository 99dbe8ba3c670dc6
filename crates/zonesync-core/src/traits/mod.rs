//! Core traits for the record synchronization system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`DnsProvider`]: Full record CRUD against one backend zone
//! - [`IpLookupService`]: Discover the host's public IP address

pub mod dns_provider;
pub mod ip_lookup;

pub use dns_provider::{CreateOutcome, DnsProvider, DnsProviderFactory, UpdateStrategy};
pub use ip_lookup::{IpLookupService, IpVersion};
