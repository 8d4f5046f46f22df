//! Reconciliation engine
//!
//! The DdnsEngine is responsible for:
//! - Resolving the current addresses on every tick
//! - Detecting which address classes changed since the last dispatch
//! - Fanning out one publish task per matching target
//! - Advancing the published state once the fan-out is dispatched
//!
//! ## Architecture
//!
//! ```text
//!   tick ──► AddressResolver ──► AddressSnapshot
//!                                      │
//!                      detect_changes(snapshot, PublishedState)
//!                                      │
//!               ┌──────────────────────┼──────────────────────┐
//!               ▼                      ▼                      ▼
//!        publish task           publish task           publish task
//!        (target A)             (target B)             (target C)
//!        retry loop             retry loop             retry loop
//! ```
//!
//! ## Tick States
//!
//! `Idle → Resolving → (NoChange | Reconciling) → Idle`
//!
//! A tick never waits for its tasks. Tasks from earlier ticks may still be
//! retrying when a later tick dispatches new ones for the same target; both
//! run to completion.

mod retry;

pub use retry::{PublishOutcome, RetryPolicy};

use crate::address::{AddressClass, Scope};
use crate::config::{DdnsConfig, EngineConfig, ProviderTarget};
use crate::detector::{AddressChange, detect_changes};
use crate::error::Result;
use crate::registry::ProviderRegistry;
use crate::resolver::AddressResolver;
use crate::state::PublishedState;
use crate::traits::{DnsProvider, UpdateResult};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, error, info, warn};

/// Events emitted by the DdnsEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A tick began resolving addresses
    TickStarted,

    /// No enabled class changed; nothing dispatched
    NoChange,

    /// A class changed and will be published
    ChangeDetected {
        class: AddressClass,
        new_ip: IpAddr,
        previous_ip: Option<IpAddr>,
    },

    /// A publish task was started for a target
    TaskDispatched {
        target: String,
        class: AddressClass,
        value: IpAddr,
    },

    /// One attempt of a publish task failed
    AttemptFailed {
        target: String,
        attempt: u32,
        error: String,
    },

    /// A publish task succeeded
    Published {
        target: String,
        attempts: u32,
        result: UpdateResult,
    },

    /// A bounded publish task ran out of attempts
    GaveUp {
        target: String,
        attempts: u32,
        error: String,
    },

    /// Engine stopped
    Stopped { reason: String },
}

/// Result of a single tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing changed
    NoChange,
    /// At least one class changed
    Dispatched {
        changes: Vec<AddressChange>,
        tasks: usize,
    },
}

/// A target paired with the driver bound to it
#[derive(Clone)]
pub(crate) struct TargetBinding {
    pub(crate) target: Arc<ProviderTarget>,
    pub(crate) provider: Arc<dyn DnsProvider>,
}

/// Core DDNS engine
///
/// ## Lifecycle
///
/// 1. Create with [`DdnsEngine::new()`] or [`DdnsEngine::from_config()`]
/// 2. Drive with [`DdnsEngine::run()`] (tick stream) or
///    [`DdnsEngine::run_once()`] (single tick)
/// 3. Optionally [`wait_idle()`](DdnsEngine::wait_idle) for in-flight tasks
/// 4. Dropping the engine aborts any task still retrying
///
/// ## Task Ownership
///
/// Publish tasks live in a `JoinSet` owned by the engine. Finished tasks
/// are reaped at the start of each tick.
pub struct DdnsEngine {
    /// Address discovery for the enabled classes
    resolver: AddressResolver,

    /// Configured targets in configuration order
    bindings: Vec<TargetBinding>,

    /// Last address dispatched per class
    state: PublishedState,

    /// Retry policy handed to every publish task
    policy: RetryPolicy,

    /// In-flight publish tasks
    tasks: JoinSet<PublishOutcome>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl DdnsEngine {
    /// Create a new DDNS engine
    ///
    /// # Parameters
    ///
    /// - `resolver`: Address resolver for the enabled classes
    /// - `providers`: Each configured target with its driver
    /// - `state`: Published state (shared with the caller for observation)
    /// - `config`: Engine settings
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        resolver: AddressResolver,
        providers: Vec<(ProviderTarget, Box<dyn DnsProvider>)>,
        state: PublishedState,
        config: &EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let bindings = providers
            .into_iter()
            .map(|(target, provider)| TargetBinding {
                target: Arc::new(target),
                provider: Arc::from(provider),
            })
            .collect();

        let engine = Self {
            resolver,
            bindings,
            state,
            policy: config.retry_policy(),
            tasks: JoinSet::new(),
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Build the engine from parsed configuration
    ///
    /// IP sources are only created for scopes some target uses.
    pub fn from_config(
        registry: &ProviderRegistry,
        config: &DdnsConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let http = config.engine.http();
        let enabled = config.enabled_classes();

        let external = if enabled.iter().any(|c| c.scope() == Scope::External) {
            Some(registry.create_ip_source(&config.resolver.external_source(), &http)?)
        } else {
            None
        };
        let internal = if enabled.iter().any(|c| c.scope() == Scope::Internal) {
            Some(registry.create_ip_source(&config.resolver.internal_source(), &http)?)
        } else {
            None
        };

        let providers = config
            .targets()?
            .into_iter()
            .map(|target| {
                let provider = registry.create_provider(&target, &http)?;
                Ok((target, provider))
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            targets = providers.len(),
            classes = ?enabled,
            "Engine configured"
        );

        Self::new(
            AddressResolver::new(external, internal, enabled),
            providers,
            PublishedState::new(),
            &config.engine,
        )
    }

    /// Handle to the published state
    pub fn state(&self) -> PublishedState {
        self.state.clone()
    }

    /// Number of publish tasks not yet reaped
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Run one tick
    pub async fn run_once(&mut self) -> TickOutcome {
        self.reap_finished();
        self.emit_event(EngineEvent::TickStarted);

        let snapshot = self.resolver.resolve().await;
        let published = self.state.snapshot().await;
        let changes = detect_changes(&snapshot, &published, self.resolver.enabled());

        if changes.is_empty() {
            debug!("No address change");
            self.emit_event(EngineEvent::NoChange);
            return TickOutcome::NoChange;
        }

        let mut dispatched = 0;
        for change in &changes {
            info!(
                class = %change.class,
                new_ip = %change.new_ip,
                previous_ip = ?change.previous_ip,
                "Address changed"
            );
            self.emit_event(EngineEvent::ChangeDetected {
                class: change.class,
                new_ip: change.new_ip,
                previous_ip: change.previous_ip,
            });

            for binding in self.bindings.iter().filter(|b| b.target.class() == change.class) {
                emit_event(
                    &self.event_tx,
                    EngineEvent::TaskDispatched {
                        target: binding.target.label(),
                        class: change.class,
                        value: change.new_ip,
                    },
                );
                self.tasks.spawn(retry::publish_until_done(
                    binding.clone(),
                    change.new_ip,
                    self.policy,
                    self.event_tx.clone(),
                ));
                dispatched += 1;
            }
        }

        self.state.advance(&changes).await;
        debug!(tasks = dispatched, in_flight = self.tasks.len(), "Fan-out dispatched");

        TickOutcome::Dispatched {
            changes,
            tasks: dispatched,
        }
    }

    /// Run the engine
    ///
    /// Runs one tick per item of `ticks` until the stream ends or `shutdown`
    /// fires. Returns without waiting for in-flight tasks.
    ///
    /// # Parameters
    ///
    /// - `ticks`: Tick source (interval, signal, single shot)
    /// - `shutdown`: Optional oneshot receiver to stop the loop
    pub async fn run<S>(&mut self, mut ticks: S, shutdown: Option<oneshot::Receiver<()>>) -> Result<()>
    where
        S: Stream + Unpin,
    {
        let mut shutdown = shutdown;

        let reason = loop {
            tokio::select! {
                tick = ticks.next() => match tick {
                    Some(_) => {
                        self.run_once().await;
                    }
                    None => break "Tick source ended",
                },

                _ = wait_for(&mut shutdown) => {
                    info!("Shutdown signal received");
                    break "Shutdown signal";
                }
            }
        };

        self.emit_event(EngineEvent::Stopped {
            reason: reason.to_string(),
        });
        info!(in_flight = self.tasks.len(), "Engine stopped: {}", reason);

        Ok(())
    }

    /// Wait until every in-flight task has finished
    ///
    /// With the default policy this only returns once every target has
    /// published.
    pub async fn wait_idle(&mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            log_join(joined);
        }
    }

    /// Abort every in-flight task and wait for them to unwind
    ///
    /// # Returns
    ///
    /// The number of tasks that were still registered
    pub async fn abort_all(&mut self) -> usize {
        let pending = self.tasks.len();
        self.tasks.shutdown().await;
        if pending > 0 {
            warn!(pending, "Aborted in-flight publish tasks");
        }
        pending
    }

    fn reap_finished(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            log_join(joined);
        }
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        emit_event(&self.event_tx, event);
    }
}

/// Send an event, dropping it with a warning if the channel is full
pub(crate) fn emit_event(tx: &mpsc::Sender<EngineEvent>, event: EngineEvent) {
    match tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("Event receiver dropped");
        }
    }
}

fn log_join(joined: std::result::Result<PublishOutcome, tokio::task::JoinError>) {
    match joined {
        Ok(outcome) => debug!(?outcome, "Publish task finished"),
        Err(e) if e.is_panic() => error!("Publish task panicked: {}", e),
        Err(_) => debug!("Publish task cancelled"),
    }
}

async fn wait_for(shutdown: &mut Option<oneshot::Receiver<()>>) {
    match shutdown.as_mut() {
        Some(rx) => {
            let _ = rx.await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_event_clone_eq() {
        let event = EngineEvent::ChangeDetected {
            class: AddressClass::ExternalV4,
            new_ip: IpAddr::from([203, 0, 113, 7]),
            previous_ip: None,
        };

        assert_eq!(event.clone(), event);
    }

    #[tokio::test]
    async fn test_empty_engine_is_idle() {
        let (mut engine, mut events) = DdnsEngine::new(
            AddressResolver::new(None, None, Vec::new()),
            Vec::new(),
            PublishedState::new(),
            &EngineConfig::default(),
        )
        .unwrap();

        assert_eq!(engine.run_once().await, TickOutcome::NoChange);
        assert_eq!(engine.in_flight(), 0);
        assert_eq!(events.recv().await, Some(EngineEvent::TickStarted));
        assert_eq!(events.recv().await, Some(EngineEvent::NoChange));
    }
}
