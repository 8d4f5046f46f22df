// # ddnsd - DDNS Daemon
//
// Thin integration layer over `ddns-core`:
// 1. Parse flags and read the JSON configuration
// 2. Initialize logging and the runtime
// 3. Register the compiled-in providers and IP sources
// 4. Drive the engine from an interval (or once) until a signal arrives
//
// No reconciliation or retry logic lives here.
//
// ## Example
//
// ```bash
// ddnsd --config /etc/ddns/app.conf --interval 5m
// ddnsd --config app.conf --once --log-level debug
// ddnsd cloudflare --email ops@example.com --key $KEY list
// ```

#[cfg(feature = "cloudflare")]
mod admin;
mod cli;

use anyhow::Result;
use clap::Parser;
use cli::Args;
use ddns_core::{DdnsEngine, EngineEvent, ProviderRegistry};
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_level = match args.level() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    #[cfg(feature = "cloudflare")]
    if let Some(command) = &args.command {
        return run_command(command, &args).into();
    }

    let interval = match args.tick_interval() {
        Ok(interval) => interval,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    info!("Starting ddnsd daemon");
    info!(
        config = %args.config.display(),
        ifconfig = %config.resolver.ifconfig_url,
        ?interval,
        once = args.once,
        "Configuration loaded"
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let registry = build_registry();

        let (engine, events) = match DdnsEngine::from_config(&registry, &config) {
            Ok(built) => built,
            Err(e) => {
                error!("Configuration error: {}", e);
                return DdnsExitCode::ConfigError;
            }
        };

        tokio::spawn(log_events(events));

        let outcome = if args.once {
            run_once(engine).await
        } else {
            run_daemon(engine, interval).await
        };

        match outcome {
            Ok(()) => DdnsExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                DdnsExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Run a maintenance subcommand to completion
#[cfg(feature = "cloudflare")]
fn run_command(command: &cli::Command, args: &Args) -> DdnsExitCode {
    let http = ddns_core::http::HttpConfig {
        insecure_skip_verify: args.insecure_skip_verify,
        ..Default::default()
    };

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError;
        }
    };

    let outcome = rt.block_on(async {
        match command {
            cli::Command::Cloudflare(cf) => admin::run(cf, &http).await,
        }
    });

    match outcome {
        Ok(()) => DdnsExitCode::CleanShutdown,
        Err(e) => {
            error!("Command failed: {:#}", e);
            DdnsExitCode::RuntimeError
        }
    }
}

/// Registry with every driver and IP source compiled into this binary
fn build_registry() -> ProviderRegistry {
    let registry = ProviderRegistry::new();

    #[cfg(feature = "basic")]
    ddns_provider_basic::register(&registry);

    #[cfg(feature = "dnspod")]
    ddns_provider_dnspod::register(&registry);

    #[cfg(feature = "cloudflare")]
    ddns_provider_cloudflare::register(&registry);

    #[cfg(feature = "cloudxns")]
    ddns_provider_cloudxns::register(&registry);

    #[cfg(feature = "http")]
    ddns_ip_http::register(&registry);

    #[cfg(feature = "interface")]
    ddns_ip_interface::register(&registry);

    debug!(
        providers = ?registry.list_providers(),
        ip_sources = ?registry.list_ip_sources(),
        "Registry ready"
    );

    registry
}

/// Tick on `interval` until a shutdown signal, then abort what is still retrying
async fn run_daemon(mut engine: DdnsEngine, interval: Duration) -> Result<()> {
    let mut timer = tokio::time::interval(interval);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let ticks = IntervalStream::new(timer);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let signals = tokio::spawn(async move {
        match wait_for_shutdown().await {
            Ok(signal) => info!("Received shutdown signal: {}", signal),
            Err(e) => error!("Signal handling failed: {}", e),
        }
        let _ = shutdown_tx.send(());
    });

    info!("Ready to monitor address changes");
    let result = engine.run(ticks, Some(shutdown_rx)).await;

    signals.abort();
    engine.abort_all().await;
    info!("Shutting down daemon");

    result?;
    Ok(())
}

/// Single tick, then wait for every dispatched publish (or a signal)
async fn run_once(mut engine: DdnsEngine) -> Result<()> {
    let outcome = engine.run_once().await;
    info!(?outcome, "Tick finished");

    let interrupted = tokio::select! {
        _ = engine.wait_idle() => None,
        signal = wait_for_shutdown() => Some(signal?),
    };

    match interrupted {
        None => info!("All publishes finished"),
        Some(signal) => {
            warn!("Received {} before publishes finished", signal);
            engine.abort_all().await;
        }
    }

    Ok(())
}

/// Forward engine events to the log
///
/// Draining the channel keeps the engine from dropping events.
async fn log_events(mut events: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            EngineEvent::Published {
                target,
                attempts,
                result,
            } => info!(%target, attempts, ?result, "Target converged"),
            EngineEvent::GaveUp {
                target,
                attempts,
                error,
            } => error!(%target, attempts, %error, "Target abandoned"),
            other => debug!(event = ?other, "Engine event"),
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
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

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
