// # DNSPod DNS Provider
//
// Publishes A/AAAA records through the dnsapi.cn form API.
//
// ## Sequence
//
// 1. Resolve the domain id (cached, `Domain.List` on a miss)
// 2. `Record.List` for the domain, match by sub-domain and record type
// 3. `Record.Create` when nothing matches, `Record.Modify` otherwise
//
// Every attempt re-lists the records, so a create committed by an attempt
// that later failed is found and modified on the next one.
//
// ## Authentication
//
// Either `login_token={id},{token}` or `login_email` + `login_password`,
// sent with every request. Credentials never appear in logs.
//
// ## API Reference
//
// - POST `https://dnsapi.cn/Domain.List`
// - POST `https://dnsapi.cn/Record.List` (`domain_id`)
// - POST `https://dnsapi.cn/Record.Create` (`domain_id`, `sub_domain`,
//   `record_type`, `record_line`, `value`)
// - POST `https://dnsapi.cn/Record.Modify` (as Create, plus `record_id`)

mod api;
mod cache;

pub use cache::DnspodDomainCache;

use api::{CODE_NO_RECORDS, DomainList, RecordList, RecordWrite};
use async_trait::async_trait;
use ddns_core::config::{DnspodAuth, ProviderConfig, ProviderTarget};
use ddns_core::http::{HttpConfig, read_json};
use ddns_core::traits::{DnsProvider, DnsProviderFactory, IpVersion, UpdateResult};
use ddns_core::{Error, Result};
use serde::de::DeserializeOwned;
use std::net::IpAddr;

/// DNSPod API base URL
const DNSPOD_API_BASE: &str = "https://dnsapi.cn";

/// The default resolution line; DNSPod rejects writes without it
const DEFAULT_RECORD_LINE: &str = "默认";

/// DNSPod driver bound to one record
pub struct DnspodProvider {
    auth: DnspodAuth,
    domain: String,
    sub_domain: String,
    record_type: &'static str,
    base: String,
    client: reqwest::Client,
    cache: DnspodDomainCache,
}

impl std::fmt::Debug for DnspodProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // DnspodAuth holds Secret values, which redact themselves.
        f.debug_struct("DnspodProvider")
            .field("auth", &self.auth)
            .field("domain", &self.domain)
            .field("sub_domain", &self.sub_domain)
            .field("record_type", &self.record_type)
            .field("base", &self.base)
            .finish()
    }
}

impl DnspodProvider {
    /// Create a driver for `{sub_domain}.{domain}`
    ///
    /// # Parameters
    ///
    /// - `version`: Address family, picks A or AAAA
    /// - `endpoint`: API base override; `https://dnsapi.cn` when None
    /// - `cache`: Domain id cache shared with sibling drivers
    pub fn new(
        auth: DnspodAuth,
        domain: impl Into<String>,
        sub_domain: impl Into<String>,
        version: IpVersion,
        endpoint: Option<String>,
        cache: DnspodDomainCache,
        http: &HttpConfig,
    ) -> Result<Self> {
        let sub_domain = sub_domain.into();
        Ok(Self {
            auth,
            domain: domain.into(),
            // DNSPod names the apex "@"
            sub_domain: if sub_domain.is_empty() {
                "@".to_string()
            } else {
                sub_domain
            },
            record_type: version.record_type(),
            base: endpoint
                .unwrap_or_else(|| DNSPOD_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            client: http.client()?,
            cache,
        })
    }

    /// POST `action` with the login fields, `format=json` and `fields`
    async fn call<T: DeserializeOwned>(&self, action: &str, fields: &[(&str, &str)]) -> Result<T> {
        let login_token;
        let mut form: Vec<(&str, &str)> = match &self.auth {
            DnspodAuth::Token { id, token } => {
                login_token = format!("{},{}", id, token.expose());
                vec![("login_token", login_token.as_str())]
            }
            DnspodAuth::Credentials { email, password } => vec![
                ("login_email", email.as_str()),
                ("login_password", password.expose()),
            ],
        };
        form.push(("format", "json"));
        form.extend_from_slice(fields);

        tracing::debug!(action, domain = %self.domain, "Calling DNSPod API");

        let response = self
            .client
            .post(format!("{}/{}", self.base, action))
            .form(&form)
            .send()
            .await?;

        read_json("dnspod", response).await
    }

    /// Domain id, refetching the listing on a cache miss
    async fn domain_id(&self) -> Result<String> {
        if let Some(id) = self.cache.get(&self.domain).await {
            return Ok(id);
        }

        let list: DomainList = self.call("Domain.List", &[]).await?;
        list.status.into_result("Domain.List")?;

        self.cache
            .merge(list.domains.into_iter().map(|d| (d.name, d.id)))
            .await;

        self.cache
            .get(&self.domain)
            .await
            .ok_or_else(|| Error::not_found(format!("DNSPod domain {} does not exist", self.domain)))
    }

    /// Id of the record this driver owns, if it exists
    async fn find_record(&self, domain_id: &str) -> Result<Option<String>> {
        let list: RecordList = self.call("Record.List", &[("domain_id", domain_id)]).await?;
        if list.status.code == CODE_NO_RECORDS {
            return Ok(None);
        }
        list.status.into_result("Record.List")?;

        Ok(list
            .records
            .into_iter()
            .find(|r| {
                r.name == self.sub_domain
                    && r.record_type.as_deref().is_none_or(|t| t == self.record_type)
            })
            .map(|r| r.id))
    }
}

#[async_trait]
impl DnsProvider for DnspodProvider {
    async fn reconcile(&self, value: IpAddr) -> Result<UpdateResult> {
        let domain_id = self.domain_id().await?;
        let value_text = value.to_string();

        let mut fields = vec![
            ("domain_id", domain_id.as_str()),
            ("sub_domain", self.sub_domain.as_str()),
            ("record_type", self.record_type),
            ("record_line", DEFAULT_RECORD_LINE),
            ("value", value_text.as_str()),
        ];

        match self.find_record(&domain_id).await? {
            None => {
                let created: RecordWrite = self.call("Record.Create", &fields).await?;
                created.status.into_result("Record.Create")?;

                let record_id = created.record.map(|r| r.id).ok_or_else(|| {
                    Error::decode("DNSPod Record.Create response carries no record id")
                })?;

                tracing::info!(
                    record = %format!("{}.{}", self.sub_domain, self.domain),
                    record_type = self.record_type,
                    %value,
                    %record_id,
                    "DNSPod record created"
                );
                Ok(UpdateResult::Created { record_id })
            }
            Some(record_id) => {
                fields.push(("record_id", record_id.as_str()));
                let modified: RecordWrite = self.call("Record.Modify", &fields).await?;
                modified.status.into_result("Record.Modify")?;

                tracing::info!(
                    record = %format!("{}.{}", self.sub_domain, self.domain),
                    record_type = self.record_type,
                    %value,
                    %record_id,
                    "DNSPod record updated"
                );
                Ok(UpdateResult::Updated { record_id })
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "dnspod"
    }
}

/// Factory for creating DNSPod drivers
///
/// Owns the domain cache every driver it creates shares.
#[derive(Debug, Clone, Default)]
pub struct DnspodFactory {
    cache: DnspodDomainCache,
}

impl DnspodFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory whose drivers use `cache`
    pub fn with_cache(cache: DnspodDomainCache) -> Self {
        Self { cache }
    }
}

impl DnsProviderFactory for DnspodFactory {
    fn create(&self, target: &ProviderTarget, http: &HttpConfig) -> Result<Box<dyn DnsProvider>> {
        match &target.provider {
            ProviderConfig::Dnspod {
                auth,
                domain,
                sub_domain,
                endpoint,
            } => {
                target.provider.validate()?;
                Ok(Box::new(DnspodProvider::new(
                    auth.clone(),
                    domain.clone(),
                    sub_domain.clone(),
                    target.version,
                    endpoint.clone(),
                    self.cache.clone(),
                    http,
                )?))
            }
            _ => Err(Error::config("Invalid config for DNSPod provider")),
        }
    }
}

/// Register the DNSPod provider with a registry
pub fn register(registry: &ddns_core::ProviderRegistry) {
    registry.register_provider("dnspod", Box::new(DnspodFactory::new()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddns_core::config::Secret;

    fn provider(auth: DnspodAuth, sub_domain: &str) -> DnspodProvider {
        DnspodProvider::new(
            auth,
            "example.com",
            sub_domain,
            IpVersion::V4,
            None,
            DnspodDomainCache::new(),
            &HttpConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_apex_is_at_sign() {
        let p = provider(
            DnspodAuth::Token {
                id: "10086".to_string(),
                token: Secret::new("abcdef"),
            },
            "",
        );
        assert_eq!(p.sub_domain, "@");
        assert_eq!(p.base, DNSPOD_API_BASE);
        assert_eq!(p.provider_name(), "dnspod");
    }

    #[test]
    fn test_credentials_not_exposed_in_debug() {
        let p = provider(
            DnspodAuth::Credentials {
                email: "ops@example.com".to_string(),
                password: Secret::new("correct horse"),
            },
            "www",
        );

        let debug_str = format!("{:?}", p);
        assert!(!debug_str.contains("correct horse"));
        assert!(debug_str.contains("DnspodProvider"));
    }
}
