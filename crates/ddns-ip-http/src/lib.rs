// # HTTP IP Source
//
// Discovers the external address by asking a what-is-my-ip service.
//
// ## Dialing
//
// The service's own hostname is resolved per family with hickory against a
// public resolver, and the TCP connection is pinned to that address. An
// IPv4 probe therefore leaves the host over IPv4 even on a dual-stack
// machine, which is what makes the echoed address meaningful. The URL keeps
// the hostname, so the Host header and TLS SNI are unchanged.
//
// An IP-literal host is dialed as-is.
//
// ## Body Format
//
// Services answer with the bare address, usually followed by a newline.
// Trailing bytes that cannot end an address of the probed family are
// stripped before a strict parse.

use ddns_core::config::IpSourceConfig;
use ddns_core::http::{HttpConfig, check_status};
use ddns_core::traits::{IpSource, IpSourceFactory, IpVersion};
use ddns_core::{Error, ProviderRegistry, Result};

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::{Resolver, TokioResolver};
use reqwest::Url;

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Services reply in plain text to curl
const USER_AGENT: &str = "curl/7.41.0";

/// What-is-my-ip service client
pub struct HttpIpSource {
    /// Service URL
    url: Url,

    /// Host component of the URL
    host: String,

    /// Set when the host is an IP literal
    literal: Option<IpAddr>,

    /// Lookup for the service hostname (absent for IP literals)
    resolver: Option<TokioResolver>,

    /// Timeout and TLS settings
    http: HttpConfig,
}

impl HttpIpSource {
    /// Create a source for the given service URL
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the URL does not parse or has no host.
    pub fn new(url: &str, http: HttpConfig) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| Error::config(format!("Invalid ifconfig URL '{}': {}", url, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| Error::config(format!("ifconfig URL '{}' has no host", url)))?
            .to_string();

        let literal = host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .ok();

        let resolver = match literal {
            Some(_) => None,
            None => Some(
                Resolver::builder_with_config(
                    ResolverConfig::default(),
                    TokioConnectionProvider::default(),
                )
                .with_options(ResolverOpts::default())
                .build(),
            ),
        };

        Ok(Self {
            url,
            host,
            literal,
            resolver,
            http,
        })
    }

    /// Address the request for `version` is dialed to
    async fn dial_address(&self, version: IpVersion) -> Result<IpAddr> {
        if let Some(ip) = self.literal {
            return Ok(ip);
        }

        let Some(resolver) = &self.resolver else {
            return Err(Error::config(format!("No resolver for {}", self.host)));
        };

        let found = match version {
            IpVersion::V4 => resolver
                .ipv4_lookup(self.host.as_str())
                .await
                .map_err(|e| Error::transport(format!("lookup {} A: {}", self.host, e)))?
                .iter()
                .map(|r| IpAddr::V4(r.0))
                .next(),
            IpVersion::V6 => resolver
                .ipv6_lookup(self.host.as_str())
                .await
                .map_err(|e| Error::transport(format!("lookup {} AAAA: {}", self.host, e)))?
                .iter()
                .map(|r| IpAddr::V6(r.0))
                .next(),
        };

        found.ok_or_else(|| {
            Error::transport(format!(
                "{} has no {} record",
                self.host,
                version.record_type()
            ))
        })
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self, version: IpVersion) -> Result<IpAddr> {
        let dial = self.dial_address(version).await?;
        tracing::debug!(url = %self.url, %dial, %version, "Querying ifconfig service");

        let mut builder = self.http.client_builder().user_agent(USER_AGENT);
        if self.literal.is_none() {
            builder = builder.resolve(&self.host, SocketAddr::new(dial, 0));
        }
        let client = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        let response = client.get(self.url.clone()).send().await?;
        let response = check_status("ifconfig", response).await?;
        let body = response.text().await?;

        parse_address(&body, version)
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}

/// Parse a what-is-my-ip body as an address of `version`
///
/// The whitespace-trimmed body is tried first. If that is not an address,
/// trailing bytes that are not digits (IPv4) or hex digits (IPv6) are
/// dropped and the remainder must be a complete address.
pub fn parse_address(body: &str, version: IpVersion) -> Result<IpAddr> {
    let strict = |text: &str| match version {
        IpVersion::V4 => text.parse::<Ipv4Addr>().map(IpAddr::V4).ok(),
        IpVersion::V6 => text.parse::<Ipv6Addr>().map(IpAddr::V6).ok(),
    };

    let parsed = strict(body.trim()).or_else(|| {
        let stripped = match version {
            IpVersion::V4 => body.trim_end_matches(|c: char| !c.is_ascii_digit()),
            IpVersion::V6 => body.trim_end_matches(|c: char| !c.is_ascii_hexdigit()),
        };
        strict(stripped)
    });

    parsed.ok_or_else(|| {
        Error::invalid_address(format!(
            "ifconfig answered {:?}, not an IP{} address",
            body.trim(),
            version
        ))
    })
}

/// Factory for creating HTTP IP sources
pub struct HttpFactory;

impl IpSourceFactory for HttpFactory {
    fn create(&self, config: &IpSourceConfig, http: &HttpConfig) -> Result<Box<dyn IpSource>> {
        match config {
            IpSourceConfig::Http { url } => Ok(Box::new(HttpIpSource::new(url, *http)?)),
            _ => Err(Error::config("Invalid config for HTTP IP source")),
        }
    }
}

/// Register the HTTP IP source with a registry
pub fn register(registry: &ProviderRegistry) {
    registry.register_ip_source("http", Box::new(HttpFactory));
}
