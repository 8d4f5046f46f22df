//! Core traits for the DDNS system
//!
//! - [`IpSource`]: Discover the current address of a family
//! - [`DnsProvider`]: Publish an address for one configured target

pub mod ip_source;
pub mod dns_provider;

pub use ip_source::{IpSource, IpSourceFactory, IpVersion};
pub use dns_provider::{DnsProvider, DnsProviderFactory, UpdateResult};
