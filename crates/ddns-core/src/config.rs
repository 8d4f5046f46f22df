//! Configuration types for the DDNS system
//!
//! The on-disk format is a JSON object with one list per provider family
//! (`basic`, `dnspod`, `cloudflare`, `cloudxns`) plus optional `resolver`
//! and `engine` sections. [`DdnsConfig::targets`] flattens the lists into
//! the read-only [`ProviderTarget`]s the engine works with.

use crate::address::{AddressClass, Scope};
use crate::engine::RetryPolicy;
use crate::error::{Error, Result};
use crate::http::HttpConfig;
use crate::traits::IpVersion;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default what-is-my-ip service
pub const DEFAULT_IFCONFIG_URL: &str = "https://if.yii.li";

/// Credential string that never shows up in `Debug` output
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value, for building requests only
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<REDACTED>")
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Main DDNS configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// Authenticated GET notifications (router-embedded DDNS endpoints)
    #[serde(default)]
    pub basic: Vec<BasicTarget>,

    /// DNSPod records
    #[serde(default)]
    pub dnspod: Vec<DnspodTarget>,

    /// Cloudflare records (legacy client API)
    #[serde(default)]
    pub cloudflare: Vec<CloudflareTarget>,

    /// CloudXNS records
    #[serde(default)]
    pub cloudxns: Vec<CloudxnsTarget>,

    /// Address discovery settings
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl DdnsConfig {
    /// Create an empty configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the JSON configuration format
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Flatten the per-provider lists into targets, in file order
    /// (basic, dnspod, cloudflare, cloudxns)
    pub fn targets(&self) -> Result<Vec<ProviderTarget>> {
        let mut targets = Vec::new();

        for t in &self.basic {
            targets.push(ProviderTarget::new(
                scope_of(t.internal),
                version_of(t.ipv6),
                ProviderConfig::Basic {
                    username: t.username.clone(),
                    password: t.password.clone(),
                    url: t.url.clone(),
                },
            ));
        }

        for t in &self.dnspod {
            targets.push(ProviderTarget::new(
                scope_of(t.internal),
                version_of(t.ipv6),
                ProviderConfig::Dnspod {
                    auth: t.auth()?,
                    domain: t.domain.clone(),
                    sub_domain: t.sub_domain.clone(),
                    endpoint: t.endpoint.clone(),
                },
            ));
        }

        for t in &self.cloudflare {
            targets.push(ProviderTarget::new(
                scope_of(t.internal),
                version_of(t.ipv6),
                ProviderConfig::Cloudflare {
                    email: t.username.clone(),
                    token: t.token.clone(),
                    domain: t.domain.clone(),
                    sub_domain: t.sub_domain.clone(),
                    cname: t.cname.clone(),
                    endpoint: t.endpoint.clone(),
                },
            ));
        }

        for t in &self.cloudxns {
            targets.push(ProviderTarget::new(
                scope_of(t.internal),
                version_of(t.ipv6),
                ProviderConfig::Cloudxns {
                    api_key: t.apikey.clone(),
                    secret_key: t.secretkey.clone(),
                    domain: t.domain.clone(),
                    sub_domain: t.sub_domain.clone(),
                    endpoint: t.endpoint.clone(),
                },
            ));
        }

        Ok(targets)
    }

    /// Classes some configured target publishes, in detection order
    pub fn enabled_classes(&self) -> Vec<AddressClass> {
        let configured: Vec<AddressClass> = self
            .basic
            .iter()
            .map(|t| (t.internal, t.ipv6))
            .chain(self.dnspod.iter().map(|t| (t.internal, t.ipv6)))
            .chain(self.cloudflare.iter().map(|t| (t.internal, t.ipv6)))
            .chain(self.cloudxns.iter().map(|t| (t.internal, t.ipv6)))
            .map(|(internal, ipv6)| AddressClass::new(scope_of(internal), version_of(ipv6)))
            .collect();

        AddressClass::ALL
            .into_iter()
            .filter(|class| configured.contains(class))
            .filter(|class| self.resolver.family_enabled(class.version()))
            .collect()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let targets = self.targets()?;
        if targets.is_empty() {
            return Err(Error::config("No targets configured"));
        }

        for target in &targets {
            target.provider.validate()?;

            if !self.resolver.family_enabled(target.version) {
                return Err(Error::config(format!(
                    "{} publishes IP{} but that family is disabled in resolver settings",
                    target.label(),
                    target.version
                )));
            }
        }

        let needs_external = targets.iter().any(|t| t.scope == Scope::External);
        if needs_external && self.resolver.ifconfig_url.is_empty() {
            return Err(Error::config("resolver.ifconfig_url cannot be empty"));
        }

        self.engine.validate()?;

        Ok(())
    }
}

fn scope_of(internal: bool) -> Scope {
    if internal {
        Scope::Internal
    } else {
        Scope::External
    }
}

fn version_of(ipv6: bool) -> IpVersion {
    if ipv6 { IpVersion::V6 } else { IpVersion::V4 }
}

/// `basic` list entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BasicTarget {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: Secret,
    pub url: String,
    #[serde(default)]
    pub internal: bool,
    #[serde(default)]
    pub ipv6: bool,
}

/// `dnspod` list entry
///
/// Authenticates with the `id`/`token` pair when both are set, otherwise
/// with `username`/`password`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DnspodTarget {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: Secret,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub token: Secret,
    pub domain: String,
    #[serde(default)]
    pub sub_domain: String,
    #[serde(default)]
    pub internal: bool,
    #[serde(default)]
    pub ipv6: bool,
    /// API base override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl DnspodTarget {
    fn auth(&self) -> Result<DnspodAuth> {
        if !self.id.is_empty() && !self.token.is_empty() {
            Ok(DnspodAuth::Token {
                id: self.id.clone(),
                token: self.token.clone(),
            })
        } else if !self.username.is_empty() && !self.password.is_empty() {
            Ok(DnspodAuth::Credentials {
                email: self.username.clone(),
                password: self.password.clone(),
            })
        } else {
            Err(Error::config(format!(
                "dnspod target {} needs either id+token or username+password",
                self.domain
            )))
        }
    }
}

/// `cloudflare` list entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloudflareTarget {
    /// Account email
    pub username: String,
    pub token: Secret,
    pub domain: String,
    #[serde(default)]
    pub sub_domain: String,
    #[serde(default)]
    pub internal: bool,
    #[serde(default)]
    pub ipv6: bool,
    /// Publish a CNAME with this content instead of an address record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cname: Option<String>,
    /// API endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// `cloudxns` list entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloudxnsTarget {
    pub apikey: String,
    pub secretkey: Secret,
    pub domain: String,
    #[serde(default)]
    pub sub_domain: String,
    #[serde(default, alias = "Internal")]
    pub internal: bool,
    #[serde(default)]
    pub ipv6: bool,
    /// API base override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// DNSPod authentication mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnspodAuth {
    /// API token pair, sent as `login_token={id},{token}`
    Token { id: String, token: Secret },
    /// Account email and password
    Credentials { email: String, password: Secret },
}

/// Provider-specific part of a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderConfig {
    Basic {
        username: String,
        password: Secret,
        url: String,
    },
    Dnspod {
        auth: DnspodAuth,
        domain: String,
        sub_domain: String,
        endpoint: Option<String>,
    },
    Cloudflare {
        email: String,
        token: Secret,
        domain: String,
        sub_domain: String,
        cname: Option<String>,
        endpoint: Option<String>,
    },
    Cloudxns {
        api_key: String,
        secret_key: Secret,
        domain: String,
        sub_domain: String,
        endpoint: Option<String>,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<()> {
        match self {
            ProviderConfig::Basic { url, .. } => {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(Error::config(format!(
                        "basic target url must be http(s), got '{}'",
                        url
                    )));
                }
                Ok(())
            }
            ProviderConfig::Dnspod { domain, .. } => require_domain("dnspod", domain),
            ProviderConfig::Cloudflare {
                email,
                token,
                domain,
                ..
            } => {
                require_domain("cloudflare", domain)?;
                if email.is_empty() || token.is_empty() {
                    return Err(Error::config(format!(
                        "cloudflare target {} needs username and token",
                        domain
                    )));
                }
                Ok(())
            }
            ProviderConfig::Cloudxns {
                api_key,
                secret_key,
                domain,
                ..
            } => {
                require_domain("cloudxns", domain)?;
                if api_key.is_empty() || secret_key.is_empty() {
                    return Err(Error::config(format!(
                        "cloudxns target {} needs apikey and secretkey",
                        domain
                    )));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &'static str {
        match self {
            ProviderConfig::Basic { .. } => "basic",
            ProviderConfig::Dnspod { .. } => "dnspod",
            ProviderConfig::Cloudflare { .. } => "cloudflare",
            ProviderConfig::Cloudxns { .. } => "cloudxns",
        }
    }
}

fn require_domain(provider: &str, domain: &str) -> Result<()> {
    if domain.is_empty() {
        return Err(Error::config(format!("{} target domain cannot be empty", provider)));
    }
    Ok(())
}

/// One configured (provider, credentials, record, scope, family) tuple
///
/// Never mutated after load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderTarget {
    pub scope: Scope,
    pub version: IpVersion,
    pub provider: ProviderConfig,
}

impl ProviderTarget {
    pub fn new(scope: Scope, version: IpVersion, provider: ProviderConfig) -> Self {
        Self {
            scope,
            version,
            provider,
        }
    }

    /// The class whose changes this target publishes
    pub fn class(&self) -> AddressClass {
        AddressClass::new(self.scope, self.version)
    }

    /// Fully qualified record name, or the URL for notification targets
    pub fn record_name(&self) -> String {
        match &self.provider {
            ProviderConfig::Basic { url, .. } => url.clone(),
            ProviderConfig::Dnspod {
                domain, sub_domain, ..
            }
            | ProviderConfig::Cloudflare {
                domain, sub_domain, ..
            }
            | ProviderConfig::Cloudxns {
                domain, sub_domain, ..
            } => fqdn(sub_domain, domain),
        }
    }

    /// Identity used in logs and events: `provider:record`
    pub fn label(&self) -> String {
        format!("{}:{}", self.provider.type_name(), self.record_name())
    }
}

/// `sub.domain`, or `domain` for the apex (`""` or `"@"`)
pub fn fqdn(sub_domain: &str, domain: &str) -> String {
    if sub_domain.is_empty() || sub_domain == "@" {
        domain.to_string()
    } else {
        format!("{}.{}", sub_domain, domain)
    }
}

/// IP source configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IpSourceConfig {
    /// What-is-my-ip service reached over a pinned dial
    Http {
        /// URL to fetch the address from
        url: String,
    },

    /// Local interface enumeration
    Interface {
        /// Restrict to one interface (e.g., "eth0")
        name: Option<String>,
    },
}

impl IpSourceConfig {
    /// Registry key of the factory that builds this source
    pub fn type_name(&self) -> &'static str {
        match self {
            IpSourceConfig::Http { .. } => "http",
            IpSourceConfig::Interface { .. } => "interface",
        }
    }
}

/// Address discovery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// What-is-my-ip service for external addresses
    #[serde(default = "default_ifconfig_url")]
    pub ifconfig_url: String,

    /// Interface to read internal addresses from (first non-loopback if unset)
    #[serde(default)]
    pub interface: Option<String>,

    /// Track IPv4 classes
    #[serde(default = "default_true")]
    pub ipv4: bool,

    /// Track IPv6 classes
    #[serde(default)]
    pub ipv6: bool,
}

impl ResolverConfig {
    pub fn family_enabled(&self, version: IpVersion) -> bool {
        match version {
            IpVersion::V4 => self.ipv4,
            IpVersion::V6 => self.ipv6,
        }
    }

    /// Source for external classes
    pub fn external_source(&self) -> IpSourceConfig {
        IpSourceConfig::Http {
            url: self.ifconfig_url.clone(),
        }
    }

    /// Source for internal classes
    pub fn internal_source(&self) -> IpSourceConfig {
        IpSourceConfig::Interface {
            name: self.interface.clone(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            ifconfig_url: default_ifconfig_url(),
            interface: None,
            ipv4: true,
            ipv6: false,
        }
    }
}

fn default_ifconfig_url() -> String {
    DEFAULT_IFCONFIG_URL.to_string()
}

fn default_true() -> bool {
    true
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Delay between attempts of one target's task (in seconds)
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Give up after this many attempts; unset retries forever
    #[serde(default)]
    pub max_attempts: Option<u32>,

    /// Timeout for every outbound HTTP request (in seconds)
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Accept invalid TLS certificates on every outbound request
    #[serde(default)]
    pub insecure_skip_verify: bool,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<()> {
        if self.retry_delay_secs == 0 && self.max_attempts.is_none() {
            return Err(Error::config(
                "retry_delay_secs must be > 0 when retries are unbounded",
            ));
        }
        if self.max_attempts == Some(0) {
            return Err(Error::config("max_attempts must be at least 1"));
        }
        if self.http_timeout_secs == 0 {
            return Err(Error::config("http_timeout_secs must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(Error::config("event_channel_capacity must be > 0"));
        }
        Ok(())
    }

    /// HTTP client settings derived from this configuration
    pub fn http(&self) -> HttpConfig {
        HttpConfig {
            timeout: Duration::from_secs(self.http_timeout_secs),
            insecure_skip_verify: self.insecure_skip_verify,
        }
    }

    /// Retry policy for per-target tasks
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            delay: Duration::from_secs(self.retry_delay_secs),
            max_attempts: self.max_attempts,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry_delay_secs: default_retry_delay_secs(),
            max_attempts: None,
            http_timeout_secs: default_http_timeout_secs(),
            insecure_skip_verify: false,
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_retry_delay_secs() -> u64 {
    60
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_event_channel_capacity() -> usize {
    1000
}
