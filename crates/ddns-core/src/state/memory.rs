// # Published State
//
// In-memory record of the last address dispatched per class.
//
// ## Lifetime
//
// - Created empty at process start
// - Advanced by the engine once a tick's fan-out is dispatched
// - Never persisted: after a restart every class is treated as new and
//   published again on the first tick
//
// ## Ownership
//
// The engine is the only writer. Clones share the same inner state so a
// caller (daemon, tests) can observe it while the engine runs.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::address::{AddressClass, AddressSnapshot};
use crate::detector::AddressChange;

#[derive(Debug, Default)]
struct Inner {
    published: AddressSnapshot,
    dispatched_at: HashMap<AddressClass, DateTime<Utc>>,
}

/// Last address dispatched for each class
///
/// # Example
///
/// ```rust,no_run
/// use ddns_core::address::AddressClass;
/// use ddns_core::state::PublishedState;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let state = PublishedState::new();
///
///     state.set(AddressClass::ExternalV4, "203.0.113.7".parse()?).await;
///     assert_eq!(state.get(AddressClass::ExternalV4).await, Some("203.0.113.7".parse()?));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct PublishedState {
    inner: Arc<RwLock<Inner>>,
}

impl PublishedState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current published values
    pub async fn snapshot(&self) -> AddressSnapshot {
        self.inner.read().await.published
    }

    pub async fn get(&self, class: AddressClass) -> Option<IpAddr> {
        self.inner.read().await.published.get(class)
    }

    /// Seed a class directly
    pub async fn set(&self, class: AddressClass, ip: IpAddr) {
        let mut guard = self.inner.write().await;
        guard.published.set(class, Some(ip));
        guard.dispatched_at.insert(class, Utc::now());
    }

    /// Record that `changes` were dispatched
    pub async fn advance(&self, changes: &[AddressChange]) {
        let now = Utc::now();
        let mut guard = self.inner.write().await;
        for change in changes {
            guard.published.set(change.class, Some(change.new_ip));
            guard.dispatched_at.insert(change.class, now);
        }
    }

    /// When a class was last dispatched
    pub async fn dispatched_at(&self, class: AddressClass) -> Option<DateTime<Utc>> {
        self.inner.read().await.dispatched_at.get(&class).copied()
    }
}
