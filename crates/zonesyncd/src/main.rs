// # zonesyncd - Zone Synchronization Daemon
//
// The zonesyncd daemon is responsible for:
// 1. Loading and validating configuration
// 2. Initializing the runtime and logging
// 3. Registering provider backends
// 4. Running the periodic reconciliation loop
//
// This is a thin integration layer: reconciliation logic lives in
// zonesync-core, backend specifics in the provider crates.
//
// ## Configuration
//
// Configuration is a JSON file named by the `ZONESYNC_CONFIG` environment
// variable or the first command line argument:
//
// ```json
// {
//   "providers": [
//     {"type": "cloudflare", "api_token": "...", "zone": "example.com"}
//   ],
//   "records": [
//     {"name": "app.example.com", "type": "A", "ttl": 300}
//   ],
//   "poll_interval_secs": 300
// }
// ```
//
// An A/AAAA record with empty content is filled from the public IP
// resolver each cycle, which is how dynamic-IP hosts keep their records
// current.
//
// `ZONESYNC_LOG` selects the log level (trace, debug, info, warn, error).
//
// ## Example
//
// ```bash
// export ZONESYNC_CONFIG=/etc/zonesync/config.json
// export ZONESYNC_LOG=info
//
// zonesyncd
// ```

use anyhow::{Context, Result};
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

use zonesync_core::{
    DnsProvider, IpSnapshot, ProviderRegistry, PublicIpResolver, Reconciler, RecordDefaults,
    RecordSpec, RecordType, SyncConfig,
};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum ZonesyncExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<ZonesyncExitCode> for ExitCode {
    fn from(code: ZonesyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// The configuration file path: `ZONESYNC_CONFIG` or the first argument
fn config_path() -> Result<String> {
    if let Ok(path) = env::var("ZONESYNC_CONFIG") {
        return Ok(path);
    }
    env::args().nth(1).context(
        "No configuration file given. \
        Set ZONESYNC_CONFIG or pass the path as the first argument",
    )
}

/// Load and validate the configuration file
fn load_config(path: &str) -> Result<SyncConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file {}", path))?;
    let config: SyncConfig = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse configuration file {}", path))?;
    config.validate()?;
    Ok(config)
}

fn main() -> ExitCode {
    // Load configuration before anything else; there is nothing to log to yet
    let config = match config_path().and_then(|path| load_config(&path)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return ZonesyncExitCode::ConfigError.into();
        }
    };

    // Initialize tracing
    let log_level = match env::var("ZONESYNC_LOG")
        .unwrap_or_default()
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ZonesyncExitCode::ConfigError.into();
    }

    info!("Starting zonesyncd");
    info!(
        "Configuration loaded: {} provider(s), {} record(s)",
        config.providers.len(),
        config.records.len()
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ZonesyncExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        match run_daemon(config).await {
            Ok(()) => ZonesyncExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                if is_startup_failure(&e) {
                    ZonesyncExitCode::ConfigError
                } else {
                    ZonesyncExitCode::RuntimeError
                }
            }
        }
    });

    code.into()
}

/// Whether an error belongs to the fatal startup class rather than runtime
fn is_startup_failure(e: &anyhow::Error) -> bool {
    e.downcast_ref::<zonesync_core::Error>()
        .is_some_and(zonesync_core::Error::is_fatal)
}

/// Run the daemon
async fn run_daemon(config: SyncConfig) -> Result<()> {
    // Create provider registry and register built-in backends
    let registry = ProviderRegistry::new();

    #[cfg(feature = "cloudflare")]
    {
        debug!("Registering Cloudflare provider");
        zonesync_provider_cloudflare::register(&registry);
    }

    #[cfg(feature = "technitium")]
    {
        debug!("Registering Technitium provider");
        zonesync_provider_technitium::register(&registry);
    }

    // Instantiate and initialize every configured provider; failure here
    // is fatal to startup
    let mut reconcilers = Vec::new();
    for provider_config in &config.providers {
        let provider = registry.create_provider(provider_config)?;
        provider.init().await?;
        info!(
            "Provider {} ready for zone {}",
            provider.provider_name(),
            provider.zone()
        );
        reconcilers.push(Reconciler::new(provider));
    }

    // The resolver keeps public addresses warm between poll cycles
    let resolver = Arc::new(zonesync_ip_http::resolver_from_config(&config.ip));
    let refresh_task = resolver.spawn_refresh_task();

    let poll_loop = async {
        let mut timer = tokio::time::interval(Duration::from_secs(config.poll_interval_secs));
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            // the first tick fires immediately, converging right at startup
            timer.tick().await;
            run_poll_cycle(&reconcilers, &resolver, &config).await;
        }
    };

    tokio::select! {
        signal = wait_for_shutdown() => {
            info!("Received shutdown signal: {}", signal?);
        }
        _ = poll_loop => {}
    }

    refresh_task.abort();
    info!("Shutting down zonesyncd");
    Ok(())
}

/// One reconciliation pass over every configured provider
async fn run_poll_cycle(
    reconcilers: &[Reconciler],
    resolver: &PublicIpResolver,
    config: &SyncConfig,
) {
    let snapshot = resolver.resolve().await;

    for reconciler in reconcilers {
        let provider = reconciler.provider();
        let specs = desired_records(&config.records, &config.defaults, &snapshot, provider);
        if let Err(e) = reconciler.converge(&specs).await {
            error!(
                "Reconciliation for {} ({}) failed: {}",
                provider.provider_name(),
                provider.zone(),
                e
            );
        }
    }
}

/// The desired record set for one provider this cycle
///
/// Applies configured defaults, fills empty A/AAAA content from the
/// resolver's snapshot (deferring the record when no address is known),
/// floors TTLs at the backend's minimum, and drops record types the
/// backend cannot hold.
fn desired_records(
    records: &[RecordSpec],
    defaults: &RecordDefaults,
    snapshot: &IpSnapshot,
    provider: &dyn DnsProvider,
) -> Vec<RecordSpec> {
    let mut specs = Vec::with_capacity(records.len());

    for base in records {
        let mut spec = base.clone();
        defaults.apply(&mut spec);

        if !provider.supports_record_type(&spec.rtype) {
            debug!(
                "Record {} ({}) is not supported by {}, skipping",
                spec.name,
                spec.rtype,
                provider.provider_name()
            );
            continue;
        }

        if spec.content.is_empty() {
            match spec.rtype {
                RecordType::A => match snapshot.ipv4 {
                    Some(ip) => spec.content = ip.to_string(),
                    None => {
                        debug!("No public IPv4 address yet, deferring {}", spec.name);
                        continue;
                    }
                },
                RecordType::Aaaa => match snapshot.ipv6 {
                    Some(ip) => spec.content = ip.to_string(),
                    None => {
                        debug!("No public IPv6 address yet, deferring {}", spec.name);
                        continue;
                    }
                },
                _ => {}
            }
        }

        if let Some(ttl) = spec.ttl
            && ttl < provider.minimum_ttl()
        {
            debug!(
                "Flooring TTL {} to {} for {} ({})",
                ttl,
                provider.minimum_ttl(),
                spec.name,
                provider.provider_name()
            );
            spec.ttl = Some(provider.minimum_ttl());
        }

        specs.push(spec);
    }

    specs
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown (CTRL-C only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
