// # IP Source Trait
//
// Defines the interface for discovering the machine's current addresses.
//
// ## Implementations
//
// - External (what-is-my-ip over a pinned dial): `ddns-ip-http` crate
// - Internal (local interface enumeration): `ddns-ip-interface` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::IpSource;
// use ddns_core::traits::IpVersion;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* IpSource implementation */;
//
//     let v4 = source.current(IpVersion::V4).await?;
//     println!("current address: {v4}");
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// IP version (v4 or v6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    /// Whether `ip` belongs to this family
    pub fn matches(self, ip: &IpAddr) -> bool {
        matches!(
            (self, ip),
            (IpVersion::V4, IpAddr::V4(_)) | (IpVersion::V6, IpAddr::V6(_))
        )
    }

    /// The family of an address
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => IpVersion::V4,
            IpAddr::V6(_) => IpVersion::V6,
        }
    }

    /// DNS record type carrying an address of this family
    pub fn record_type(self) -> &'static str {
        match self {
            IpVersion::V4 => "A",
            IpVersion::V6 => "AAAA",
        }
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpVersion::V4 => f.write_str("v4"),
            IpVersion::V6 => f.write_str("v6"),
        }
    }
}

/// Trait for IP source implementations
///
/// A source answers one question: what is the current address of the
/// requested family? It is polled once per class per tick by the
/// `AddressResolver` and must not cache answers across calls.
///
/// # Failure
///
/// Any error means "undiscovered for this tick". The resolver logs it and
/// leaves the class empty; it never aborts the tick.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Get the current address of the requested family
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: An address of exactly the requested family
    /// - `Err(Error)`: If no such address could be determined
    async fn current(&self, version: IpVersion) -> Result<IpAddr, crate::Error>;

    /// Name used in log lines ("http", "interface", ...)
    fn source_name(&self) -> &'static str;
}

/// Helper trait for constructing IP sources from configuration
pub trait IpSourceFactory: Send + Sync {
    /// Create an IpSource instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration specific to this IP source type
    /// - `http`: Shared HTTP client settings (timeout, TLS toggle)
    fn create(
        &self,
        config: &crate::config::IpSourceConfig,
        http: &crate::http::HttpConfig,
    ) -> Result<Box<dyn IpSource>, crate::Error>;
}
