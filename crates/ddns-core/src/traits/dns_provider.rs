// # DNS Provider Trait
//
// Defines the interface every provider driver implements.
//
// ## Implementations
//
// - BasicAuth ping: `ddns-provider-basic` crate
// - DNSPod: `ddns-provider-dnspod` crate
// - Cloudflare (legacy api_json): `ddns-provider-cloudflare` crate
// - CloudXNS: `ddns-provider-cloudxns` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::DnsProvider;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation bound to one target */;
//
//     provider.reconcile("203.0.113.7".parse()?).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;

/// Outcome of one successful reconciliation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateResult {
    /// No matching record existed; one was created
    Created {
        /// Identifier assigned by the provider
        record_id: String,
    },
    /// An existing record was rewritten with the new value
    Updated {
        /// Identifier of the record that was rewritten
        record_id: String,
    },
    /// The target is a notification endpoint rather than a DNS record
    Notified {
        /// HTTP status returned by the endpoint
        status: u16,
    },
}

/// Trait for DNS provider drivers
///
/// A driver is bound to exactly one `ProviderTarget` when it is created and
/// runs the provider's find-or-create-then-update sequence for it.
///
/// # Idempotency
///
/// Calling `reconcile` repeatedly with the same value must converge to the
/// same remote state. Every attempt re-discovers the remote record, so a
/// create that the provider committed before a failure is found and updated
/// on the next attempt rather than duplicated.
///
/// # Retries
///
/// Drivers make a single attempt and return. Retry timing is owned by the
/// engine's per-target task.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Publish `value` for the bound target
    ///
    /// # Returns
    ///
    /// - `Ok(UpdateResult)`: The provider accepted the value
    /// - `Err(Error)`: Any transport, status, decode, lookup or auth failure
    async fn reconcile(&self, value: IpAddr) -> Result<UpdateResult, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a driver bound to `target`
    ///
    /// # Parameters
    ///
    /// - `target`: The target this driver will publish to
    /// - `http`: Shared HTTP client settings (timeout, TLS toggle)
    fn create(
        &self,
        target: &crate::config::ProviderTarget,
        http: &crate::http::HttpConfig,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
