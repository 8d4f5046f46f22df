// # Interface IP Source
//
// Discovers internal addresses by enumerating the host's network interfaces.
//
// ## Selection
//
// - Loopback interfaces are skipped
// - Loopback and unspecified addresses are skipped
// - With an interface name configured, only that interface is considered
// - The first remaining address of the requested family wins
//
// Enumeration goes through `netdev`, which covers Linux, macOS, the BSDs
// and Windows with one API.

use ddns_core::config::IpSourceConfig;
use ddns_core::http::HttpConfig;
use ddns_core::traits::{IpSource, IpSourceFactory, IpVersion};
use ddns_core::{Error, ProviderRegistry, Result};

use std::net::IpAddr;

/// Addresses carried by one interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddrs {
    pub name: String,
    pub loopback: bool,
    pub addrs: Vec<IpAddr>,
}

impl InterfaceAddrs {
    fn from_netdev(iface: &netdev::Interface) -> Self {
        let v4 = iface.ipv4.iter().map(|net| IpAddr::V4(net.addr()));
        let v6 = iface.ipv6.iter().map(|net| IpAddr::V6(net.addr()));

        Self {
            name: iface.name.clone(),
            loopback: iface.is_loopback(),
            addrs: v4.chain(v6).collect(),
        }
    }
}

/// Pick the internal address of `version` from an interface listing
pub fn select_address(
    interfaces: &[InterfaceAddrs],
    name: Option<&str>,
    version: IpVersion,
) -> Option<IpAddr> {
    interfaces
        .iter()
        .filter(|iface| !iface.loopback)
        .filter(|iface| name.is_none_or(|n| iface.name == n))
        .flat_map(|iface| iface.addrs.iter().copied())
        .find(|ip| version.matches(ip) && !ip.is_loopback() && !ip.is_unspecified())
}

/// Interface-enumerating IP source
pub struct InterfaceIpSource {
    /// Restrict to one interface
    name: Option<String>,
}

impl InterfaceIpSource {
    pub fn new(name: Option<String>) -> Self {
        Self { name }
    }
}

#[async_trait::async_trait]
impl IpSource for InterfaceIpSource {
    async fn current(&self, version: IpVersion) -> Result<IpAddr> {
        let interfaces: Vec<InterfaceAddrs> = netdev::get_interfaces()
            .iter()
            .map(InterfaceAddrs::from_netdev)
            .collect();

        tracing::trace!(count = interfaces.len(), "Enumerated interfaces");

        select_address(&interfaces, self.name.as_deref(), version).ok_or_else(|| {
            Error::not_found(match &self.name {
                Some(name) => format!("No usable IP{} address on interface {}", version, name),
                None => format!("No usable IP{} address on any interface", version),
            })
        })
    }

    fn source_name(&self) -> &'static str {
        "interface"
    }
}

/// Factory for creating interface IP sources
pub struct InterfaceFactory;

impl IpSourceFactory for InterfaceFactory {
    fn create(&self, config: &IpSourceConfig, _http: &HttpConfig) -> Result<Box<dyn IpSource>> {
        match config {
            IpSourceConfig::Interface { name } => Ok(Box::new(InterfaceIpSource::new(name.clone()))),
            _ => Err(Error::config("Invalid config for interface IP source")),
        }
    }
}

/// Register the interface IP source with a registry
pub fn register(registry: &ProviderRegistry) {
    registry.register_ip_source("interface", Box::new(InterfaceFactory));
}
