//! Architectural Contract Test: Dispatch-Based Idempotency
//!
//! This test verifies that the published state prevents duplicate fan-outs.
//!
//! Constraints verified:
//! - The same address is dispatched once, however many ticks observe it
//! - Change detection is based on "was a publish dispatched", not on
//!   provider confirmation
//! - A new address dispatches again, with the previous one reported
//!
//! If this test fails, state management is broken.

mod common;

use common::*;
use ddns_core::address::{AddressClass, Scope};
use ddns_core::traits::IpVersion;
use ddns_core::{EngineEvent, PublishedState, TickOutcome};

#[tokio::test]
async fn repeated_ticks_dispatch_once() {
    let external = StaticIpSource::with(ip("203.0.113.7"));
    let internal = StaticIpSource::new();

    let provider = MockDnsProvider::new("ext");
    let (mut engine, _events) = build_engine(
        &external,
        &internal,
        vec![(
            target("www", Scope::External, IpVersion::V4),
            MockDnsProvider::sharing_counters_with(&provider),
        )],
        PublishedState::new(),
        &engine_config(60),
    );

    assert!(matches!(engine.run_once().await, TickOutcome::Dispatched { tasks: 1, .. }));
    for _ in 0..3 {
        assert_eq!(engine.run_once().await, TickOutcome::NoChange);
    }
    engine.wait_idle().await;

    assert_eq!(
        provider.call_count(),
        1,
        "Expected exactly 1 publish for an unchanged address, got {}",
        provider.call_count()
    );
}

#[tokio::test]
async fn failing_target_does_not_trigger_redispatch() {
    let external = StaticIpSource::with(ip("203.0.113.7"));
    let internal = StaticIpSource::new();

    // Retries are the task's job; the detector must not re-dispatch.
    let provider = MockDnsProvider::always_failing("ext");
    let (mut engine, _events) = build_engine(
        &external,
        &internal,
        vec![(
            target("www", Scope::External, IpVersion::V4),
            MockDnsProvider::sharing_counters_with(&provider),
        )],
        PublishedState::new(),
        &engine_config(3600),
    );

    assert!(matches!(engine.run_once().await, TickOutcome::Dispatched { .. }));
    tokio::task::yield_now().await;
    assert_eq!(engine.run_once().await, TickOutcome::NoChange);
    assert_eq!(engine.run_once().await, TickOutcome::NoChange);

    assert_eq!(engine.in_flight(), 1, "Only the first tick's task should exist");
    engine.abort_all().await;
}

#[tokio::test]
async fn new_address_dispatches_again() {
    let external = StaticIpSource::with(ip("203.0.113.7"));
    let internal = StaticIpSource::new();

    let provider = MockDnsProvider::new("ext");
    let (mut engine, mut events) = build_engine(
        &external,
        &internal,
        vec![(
            target("www", Scope::External, IpVersion::V4),
            MockDnsProvider::sharing_counters_with(&provider),
        )],
        PublishedState::new(),
        &engine_config(60),
    );

    engine.run_once().await;
    external.set(ip("203.0.113.8"));
    engine.run_once().await;
    engine.wait_idle().await;

    assert_eq!(provider.values(), vec![ip("203.0.113.7"), ip("203.0.113.8")]);
    assert_eq!(
        engine.state().get(AddressClass::ExternalV4).await,
        Some(ip("203.0.113.8"))
    );

    let changes: Vec<_> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            EngineEvent::ChangeDetected { previous_ip, new_ip, .. } => Some((previous_ip, new_ip)),
            _ => None,
        })
        .collect();
    assert_eq!(
        changes,
        vec![
            (None, ip("203.0.113.7")),
            (Some(ip("203.0.113.7")), ip("203.0.113.8")),
        ]
    );
}

#[tokio::test]
async fn restart_publishes_again() {
    // State is process-lifetime only: a fresh engine has nothing published.
    let external = StaticIpSource::with(ip("203.0.113.7"));
    let internal = StaticIpSource::new();
    let provider = MockDnsProvider::new("ext");

    for _ in 0..2 {
        let (mut engine, _events) = build_engine(
            &external,
            &internal,
            vec![(
                target("www", Scope::External, IpVersion::V4),
                MockDnsProvider::sharing_counters_with(&provider),
            )],
            PublishedState::new(),
            &engine_config(60),
        );
        engine.run_once().await;
        engine.wait_idle().await;
    }

    assert_eq!(provider.call_count(), 2);
}
