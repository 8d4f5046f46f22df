//! Test doubles and common utilities for architecture contract tests
//!
//! These doubles stand in for IP sources and provider drivers so the
//! engine's tick, fan-out and retry discipline can be observed directly.

#![allow(dead_code)]

use ddns_core::address::{AddressClass, Scope};
use ddns_core::config::{DnspodAuth, EngineConfig, ProviderConfig, ProviderTarget, Secret};
use ddns_core::error::{Error, Result};
use ddns_core::traits::{DnsProvider, IpSource, IpVersion, UpdateResult};
use ddns_core::{AddressResolver, DdnsEngine, EngineEvent, PublishedState};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Semaphore, mpsc};
use tokio::time::Instant;

/// An IpSource whose answers the test sets directly
#[derive(Clone, Default)]
pub struct StaticIpSource {
    addresses: Arc<Mutex<HashMap<IpVersion, IpAddr>>>,
    call_count: Arc<AtomicUsize>,
}

impl StaticIpSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source answering `ip` for its family
    pub fn with(ip: IpAddr) -> Self {
        let source = Self::new();
        source.set(ip);
        source
    }

    pub fn set(&self, ip: IpAddr) {
        self.addresses
            .lock()
            .unwrap()
            .insert(IpVersion::of(&ip), ip);
    }

    pub fn clear(&self, version: IpVersion) {
        self.addresses.lock().unwrap().remove(&version);
    }

    /// Get the number of times current() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpSource for StaticIpSource {
    async fn current(&self, version: IpVersion) -> Result<IpAddr> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.addresses
            .lock()
            .unwrap()
            .get(&version)
            .copied()
            .ok_or_else(|| Error::not_found(format!("no IP{} address", version)))
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}

/// A mock DnsProvider that tracks calls
pub struct MockDnsProvider {
    /// Call counter for reconcile()
    call_count: Arc<AtomicUsize>,
    /// Values passed to reconcile(), with the (tokio) time of each call
    calls: Arc<Mutex<Vec<(Instant, IpAddr)>>>,
    /// Number of leading calls that fail with a transport error
    failures_left: Arc<AtomicUsize>,
    /// When set, every call waits for a permit before answering
    gate: Option<Arc<Semaphore>>,
    /// Provider name
    pub name: &'static str,
}

impl MockDnsProvider {
    pub fn new(name: &'static str) -> Self {
        Self {
            call_count: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
            failures_left: Arc::new(AtomicUsize::new(0)),
            gate: None,
            name,
        }
    }

    /// Fail the first `n` calls
    pub fn failing_first(name: &'static str, n: usize) -> Self {
        let provider = Self::new(name);
        provider.failures_left.store(n, Ordering::SeqCst);
        provider
    }

    /// Fail every call
    pub fn always_failing(name: &'static str) -> Self {
        Self::failing_first(name, usize::MAX)
    }

    /// Block every call until [`release`](Self::release) hands out permits
    pub fn gated(name: &'static str) -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::new(name)
        }
    }

    pub fn release(&self, calls: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(calls);
        }
    }

    /// Get the number of times reconcile() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Values passed to reconcile(), in call order
    pub fn values(&self) -> Vec<IpAddr> {
        self.calls.lock().unwrap().iter().map(|(_, ip)| *ip).collect()
    }

    /// Instants of each reconcile() call
    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }

    /// Create a new MockDnsProvider that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            call_count: Arc::clone(&other.call_count),
            calls: Arc::clone(&other.calls),
            failures_left: Arc::clone(&other.failures_left),
            gate: other.gate.clone(),
            name: other.name,
        }
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn reconcile(&self, value: IpAddr) -> Result<UpdateResult> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push((Instant::now(), value));

        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| Error::transport("gate closed"))?;
            permit.forget();
        }

        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                left.checked_sub(1)
            })
            .is_ok();
        if should_fail {
            return Err(Error::transport("connection reset by peer"));
        }

        Ok(UpdateResult::Updated {
            record_id: "16894439".to_string(),
        })
    }

    fn provider_name(&self) -> &'static str {
        self.name
    }
}

/// A DNSPod-shaped target for `sub.example.com`
pub fn target(sub_domain: &str, scope: Scope, version: IpVersion) -> ProviderTarget {
    ProviderTarget::new(
        scope,
        version,
        ProviderConfig::Dnspod {
            auth: DnspodAuth::Token {
                id: "12345".to_string(),
                token: Secret::new("test-token"),
            },
            domain: "example.com".to_string(),
            sub_domain: sub_domain.to_string(),
            endpoint: None,
        },
    )
}

/// Engine settings with the given retry delay
pub fn engine_config(retry_delay_secs: u64) -> EngineConfig {
    EngineConfig {
        retry_delay_secs,
        event_channel_capacity: 100,
        ..EngineConfig::default()
    }
}

/// Build an engine over static sources and mock providers
///
/// Enabled classes are the classes of the given targets.
pub fn build_engine(
    external: &StaticIpSource,
    internal: &StaticIpSource,
    providers: Vec<(ProviderTarget, MockDnsProvider)>,
    state: PublishedState,
    config: &EngineConfig,
) -> (DdnsEngine, mpsc::Receiver<EngineEvent>) {
    let enabled: Vec<AddressClass> = AddressClass::ALL
        .into_iter()
        .filter(|class| providers.iter().any(|(t, _)| t.class() == *class))
        .collect();

    let resolver = AddressResolver::new(
        Some(Box::new(external.clone())),
        Some(Box::new(internal.clone())),
        enabled,
    );

    let providers = providers
        .into_iter()
        .map(|(t, p)| (t, Box::new(p) as Box<dyn DnsProvider>))
        .collect();

    DdnsEngine::new(resolver, providers, state, config).expect("engine construction succeeds")
}

/// Drain every event currently queued
pub fn drain(events: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().expect("valid test address")
}
