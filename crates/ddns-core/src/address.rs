//! Address classes and per-tick snapshots
//!
//! Addresses are tracked per class: the cross product of scope
//! (external/internal) and family (v4/v6).

use crate::traits::IpVersion;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Which address a target publishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Address seen by the public internet
    External,
    /// Address bound to a local interface
    Internal,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::External => f.write_str("external"),
            Scope::Internal => f.write_str("internal"),
        }
    }
}

/// One of the four tracked address classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AddressClass {
    ExternalV4,
    ExternalV6,
    InternalV4,
    InternalV6,
}

impl AddressClass {
    /// All classes in detection order
    pub const ALL: [AddressClass; 4] = [
        AddressClass::ExternalV4,
        AddressClass::ExternalV6,
        AddressClass::InternalV4,
        AddressClass::InternalV6,
    ];

    pub fn new(scope: Scope, version: IpVersion) -> Self {
        match (scope, version) {
            (Scope::External, IpVersion::V4) => AddressClass::ExternalV4,
            (Scope::External, IpVersion::V6) => AddressClass::ExternalV6,
            (Scope::Internal, IpVersion::V4) => AddressClass::InternalV4,
            (Scope::Internal, IpVersion::V6) => AddressClass::InternalV6,
        }
    }

    pub fn scope(self) -> Scope {
        match self {
            AddressClass::ExternalV4 | AddressClass::ExternalV6 => Scope::External,
            AddressClass::InternalV4 | AddressClass::InternalV6 => Scope::Internal,
        }
    }

    pub fn version(self) -> IpVersion {
        match self {
            AddressClass::ExternalV4 | AddressClass::InternalV4 => IpVersion::V4,
            AddressClass::ExternalV6 | AddressClass::InternalV6 => IpVersion::V6,
        }
    }
}

impl fmt::Display for AddressClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.scope(), self.version())
    }
}

/// Addresses observed (or published) for each class
///
/// Used both for the fresh per-tick snapshot and for the last-published
/// state; `None` means "undiscovered" or "never published".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddressSnapshot {
    pub external_v4: Option<IpAddr>,
    pub external_v6: Option<IpAddr>,
    pub internal_v4: Option<IpAddr>,
    pub internal_v6: Option<IpAddr>,
}

impl AddressSnapshot {
    pub fn get(&self, class: AddressClass) -> Option<IpAddr> {
        match class {
            AddressClass::ExternalV4 => self.external_v4,
            AddressClass::ExternalV6 => self.external_v6,
            AddressClass::InternalV4 => self.internal_v4,
            AddressClass::InternalV6 => self.internal_v6,
        }
    }

    pub fn set(&mut self, class: AddressClass, ip: Option<IpAddr>) {
        let slot = match class {
            AddressClass::ExternalV4 => &mut self.external_v4,
            AddressClass::ExternalV6 => &mut self.external_v6,
            AddressClass::InternalV4 => &mut self.internal_v4,
            AddressClass::InternalV6 => &mut self.internal_v6,
        };
        *slot = ip;
    }

    /// Builder-style variant of [`set`](Self::set)
    pub fn with(mut self, class: AddressClass, ip: IpAddr) -> Self {
        self.set(class, Some(ip));
        self
    }

    pub fn is_empty(&self) -> bool {
        AddressClass::ALL.iter().all(|class| self.get(*class).is_none())
    }
}
