//! Public IP resolution
//!
//! Keeps one cached `(ipv4, ipv6, checked_at)` snapshot used as default
//! content for address records. Refreshes are single-flight: however many
//! tasks ask at once, at most one outbound lookup sequence runs, and every
//! waiter receives that run's result. A periodic timer and ad hoc callers
//! share the same gate.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::traits::{IpLookupService, IpVersion};

/// The resolver's current view of the host's public addresses
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IpSnapshot {
    /// Last known public IPv4 address
    pub ipv4: Option<Ipv4Addr>,
    /// Last known public IPv6 address
    pub ipv6: Option<Ipv6Addr>,
    /// When the last refresh attempt completed
    pub checked_at: Option<DateTime<Utc>>,
}

struct ResolverState {
    snapshot: IpSnapshot,
    refreshed_at: Option<Instant>,
    // Bumped once per completed refresh; lets gate waiters tell "someone
    // refreshed while I was blocked" from "still stale, my turn"
    generation: u64,
}

impl ResolverState {
    fn is_fresh(&self, interval: Duration) -> bool {
        match self.refreshed_at {
            Some(at) => at.elapsed() < interval,
            None => false,
        }
    }
}

/// Cached, single-flight public IP resolver
///
/// IPv4 lookups walk a primary-then-fallback service chain; IPv6 gets one
/// attempt with no fallback and its failure is routine. A refresh never
/// discards the last known address on failure, so callers always see the
/// best value the resolver ever had.
pub struct PublicIpResolver {
    v4_chain: Vec<Box<dyn IpLookupService>>,
    v6_service: Option<Box<dyn IpLookupService>>,
    refresh_interval: Duration,
    state: Mutex<ResolverState>,
    refresh_gate: Mutex<()>,
}

impl PublicIpResolver {
    /// Create a resolver over the given lookup services
    ///
    /// `v4_chain` is tried in order until one service answers. An empty
    /// chain leaves `ipv4` permanently unset; same for a `None` v6 service.
    pub fn new(
        v4_chain: Vec<Box<dyn IpLookupService>>,
        v6_service: Option<Box<dyn IpLookupService>>,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            v4_chain,
            v6_service,
            refresh_interval,
            state: Mutex::new(ResolverState {
                snapshot: IpSnapshot::default(),
                refreshed_at: None,
                generation: 0,
            }),
            refresh_gate: Mutex::new(()),
        }
    }

    /// The snapshot as it stands, without triggering any refresh
    pub async fn current(&self) -> IpSnapshot {
        self.state.lock().await.snapshot.clone()
    }

    /// Resolve the public addresses, refreshing only when needed.
    ///
    /// Returns the cached snapshot immediately while it is fresh and holds
    /// an IPv4 address. Otherwise refreshes through the single-flight gate:
    /// if another task is mid-refresh, this call waits for that refresh and
    /// returns its result instead of issuing duplicate lookups.
    ///
    /// Lookup failures are logged, never propagated: the caller gets the
    /// last known snapshot, however empty.
    pub async fn resolve(&self) -> IpSnapshot {
        let generation_seen = {
            let state = self.state.lock().await;
            if state.is_fresh(self.refresh_interval) && state.snapshot.ipv4.is_some() {
                return state.snapshot.clone();
            }
            state.generation
        };

        let _guard = self.refresh_gate.lock().await;

        {
            let state = self.state.lock().await;
            if state.generation != generation_seen {
                // A refresh completed while we waited on the gate; its
                // result is ours too.
                return state.snapshot.clone();
            }
        }

        self.refresh().await
    }

    /// Spawn the periodic refresh task
    ///
    /// Ticks every refresh interval and funnels into [`resolve`], so the
    /// timer and ad hoc callers can never race a duplicate lookup. Abort
    /// the returned handle to stop it.
    pub fn spawn_refresh_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let resolver = Arc::clone(self);
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(resolver.refresh_interval);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // the first tick fires immediately; startup already resolved
            timer.tick().await;
            loop {
                timer.tick().await;
                resolver.resolve().await;
            }
        })
    }

    // Caller holds the refresh gate.
    async fn refresh(&self) -> IpSnapshot {
        let previous = self.current().await;

        let ipv4 = self.lookup_v4().await.or(previous.ipv4);
        let ipv6 = self.lookup_v6().await.or(previous.ipv6);

        log_address_change(IpVersion::V4, previous.ipv4.map(IpAddr::V4), ipv4.map(IpAddr::V4));
        log_address_change(IpVersion::V6, previous.ipv6.map(IpAddr::V6), ipv6.map(IpAddr::V6));

        let snapshot = IpSnapshot {
            ipv4,
            ipv6,
            checked_at: Some(Utc::now()),
        };

        let mut state = self.state.lock().await;
        state.snapshot = snapshot.clone();
        state.refreshed_at = Some(Instant::now());
        state.generation = state.generation.wrapping_add(1);
        snapshot
    }

    async fn lookup_v4(&self) -> Option<Ipv4Addr> {
        for service in &self.v4_chain {
            match service.lookup(IpVersion::V4).await {
                Ok(IpAddr::V4(ip)) => return Some(ip),
                Ok(IpAddr::V6(ip)) => {
                    warn!(
                        "IPv4 lookup via {} returned an IPv6 address ({}), trying next service",
                        service.service_name(),
                        ip
                    );
                }
                Err(e) => {
                    warn!(
                        "IPv4 lookup via {} failed: {}, trying next service",
                        service.service_name(),
                        e
                    );
                }
            }
        }
        if !self.v4_chain.is_empty() {
            warn!("All IPv4 lookup services failed, keeping last known address");
        }
        None
    }

    async fn lookup_v6(&self) -> Option<Ipv6Addr> {
        let service = self.v6_service.as_ref()?;
        match service.lookup(IpVersion::V6).await {
            Ok(IpAddr::V6(ip)) => Some(ip),
            Ok(IpAddr::V4(ip)) => {
                debug!(
                    "IPv6 lookup via {} returned an IPv4 address ({}), ignoring",
                    service.service_name(),
                    ip
                );
                None
            }
            Err(e) => {
                debug!("IPv6 lookup via {} failed: {}", service.service_name(), e);
                None
            }
        }
    }
}

// One informational line per address family per actual change.
fn log_address_change(version: IpVersion, previous: Option<IpAddr>, new: Option<IpAddr>) {
    match (previous, new) {
        (None, Some(ip)) => info!("Public {} address: {}", version, ip),
        (Some(old), Some(ip)) if old != ip => {
            info!("Public {} address changed: {} -> {}", version, old, ip)
        }
        (Some(_), Some(ip)) => debug!("Public {} address unchanged ({})", version, ip),
        _ => {}
    }
}
