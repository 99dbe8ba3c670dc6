// # zonesync-core
//
// Core library for provider-agnostic DNS record reconciliation.
//
// ## Architecture Overview
//
// This library provides the building blocks for converging DNS zones toward
// a desired record set:
// - **DnsRecord / RecordSpec**: Canonical record model and desired state
// - **DnsProvider**: Trait for full record CRUD against one backend zone
// - **Reconciler**: Diff-and-converge batches with partial-success semantics
// - **PublicIpResolver**: Cached, single-flight public IP discovery
// - **ProviderRegistry**: Plugin-based registry for DNS backends
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from backend adapters
// 2. **Cache-First Reads**: Each adapter serves reads from its zone snapshot
// 3. **Plugin-Based**: Backends are registered dynamically, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Idempotency**: Re-running an unchanged batch performs zero mutations

pub mod record;
pub mod validate;
pub mod wire;
pub mod cache;
pub mod traits;
pub mod reconcile;
pub mod resolver;
pub mod registry;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use record::{DnsRecord, RecordFilter, RecordSpec, RecordType};
pub use cache::RecordCache;
pub use traits::{
    CreateOutcome, DnsProvider, DnsProviderFactory, IpLookupService, IpVersion, UpdateStrategy,
};
pub use reconcile::{ItemOutcome, ReconcileReport, Reconciler};
pub use resolver::{IpSnapshot, PublicIpResolver};
pub use registry::ProviderRegistry;
pub use config::{BackendConfig, IpResolverConfig, ProviderConfig, RecordDefaults, SyncConfig};
pub use error::{Error, Result};
