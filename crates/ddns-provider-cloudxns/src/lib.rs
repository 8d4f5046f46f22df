// # CloudXNS DNS Provider
//
// Publishes A/AAAA records through the CloudXNS REST API (api2).
//
// ## Sequence
//
// 1. `GET /domain`, match `"{domain}."`
// 2. `GET /host/{domain_id}?offset=0&row_num=2000`, match the sub-domain
// 3. `GET /record/{domain_id}?host_id={host_id}&offset=0&row_num=2000`,
//    match the record type
// 4. `PUT /record/{record_id}` when a record matched, otherwise
//    `POST /record` (which also creates a missing host)
//
// ## Signing
//
// Every request carries `API-KEY`, `API-REQUEST-DATE` and `API-HMAC`; see
// [`sign`]. The secret key never appears in logs.

mod api;
mod sign;

pub use sign::sign;

use api::{DomainList, HostList, RecordList, WriteResponse};
use async_trait::async_trait;
use ddns_core::config::{ProviderConfig, ProviderTarget, Secret};
use ddns_core::http::{HttpConfig, read_json};
use ddns_core::traits::{DnsProvider, DnsProviderFactory, IpVersion, UpdateResult};
use ddns_core::{Error, Result};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::net::IpAddr;

/// CloudXNS API base URL
const CLOUDXNS_API_BASE: &str = "https://www.cloudxns.net/api2";

/// Listing page size; a single page covers any realistic zone
const ROW_NUM: u32 = 2000;

/// Default resolution line for new records
const DEFAULT_LINE_ID: &str = "1";

/// CloudXNS driver bound to one record
pub struct CloudxnsProvider {
    api_key: String,

    /// ⚠️ NEVER log this value
    secret_key: Secret,

    domain: String,
    host: String,
    record_type: &'static str,
    base: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for CloudxnsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudxnsProvider")
            .field("api_key", &self.api_key)
            .field("secret_key", &"<REDACTED>")
            .field("domain", &self.domain)
            .field("host", &self.host)
            .field("record_type", &self.record_type)
            .finish()
    }
}

impl CloudxnsProvider {
    pub fn new(
        api_key: impl Into<String>,
        secret_key: Secret,
        domain: impl Into<String>,
        sub_domain: impl Into<String>,
        version: IpVersion,
        endpoint: Option<String>,
        http: &HttpConfig,
    ) -> Result<Self> {
        let sub_domain = sub_domain.into();
        Ok(Self {
            api_key: api_key.into(),
            secret_key,
            domain: domain.into(),
            host: if sub_domain.is_empty() {
                "@".to_string()
            } else {
                sub_domain
            },
            record_type: version.record_type(),
            base: endpoint
                .unwrap_or_else(|| CLOUDXNS_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            client: http.client()?,
        })
    }

    /// Send one signed request
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        url: String,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let body = body.map(|b| b.to_string());
        let date = sign::request_date();
        let hmac = sign(
            &self.api_key,
            &url,
            body.as_deref(),
            &date,
            self.secret_key.expose(),
        );

        tracing::debug!(%method, %url, "Calling CloudXNS API");

        let mut request = self
            .client
            .request(method, &url)
            .header("API-KEY", &self.api_key)
            .header("API-REQUEST-DATE", &date)
            .header("API-HMAC", hmac);
        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        read_json("cloudxns", request.send().await?).await
    }

    async fn domain_id(&self) -> Result<String> {
        let list: DomainList = self
            .call(Method::GET, format!("{}/domain", self.base), None)
            .await?;
        list.status.into_result("domain list")?;

        let qualified = format!("{}.", self.domain);
        list.data
            .into_iter()
            .find(|d| d.domain == qualified)
            .map(|d| d.id)
            .ok_or_else(|| Error::not_found(format!("CloudXNS domain {} does not exist", self.domain)))
    }

    async fn host_id(&self, domain_id: &str) -> Result<Option<String>> {
        let url = format!(
            "{}/host/{}?offset=0&row_num={}",
            self.base, domain_id, ROW_NUM
        );
        let list: HostList = self.call(Method::GET, url, None).await?;
        list.status.into_result("host list")?;

        Ok(list
            .hosts
            .into_iter()
            .find(|h| h.host == self.host)
            .map(|h| h.id))
    }

    /// Id of the host's record with this driver's type
    async fn find_record(&self, domain_id: &str, host_id: &str) -> Result<Option<String>> {
        let url = format!(
            "{}/record/{}?host_id={}&offset=0&row_num={}",
            self.base, domain_id, host_id, ROW_NUM
        );
        let list: RecordList = self.call(Method::GET, url, None).await?;
        list.status.into_result("record list")?;

        Ok(list
            .data
            .into_iter()
            .find(|r| r.record_type == self.record_type)
            .map(|r| r.record_id))
    }
}

#[async_trait]
impl DnsProvider for CloudxnsProvider {
    async fn reconcile(&self, value: IpAddr) -> Result<UpdateResult> {
        let domain_id = self.domain_id().await?;

        let existing = match self.host_id(&domain_id).await? {
            Some(host_id) => self.find_record(&domain_id, &host_id).await?,
            None => None,
        };

        match existing {
            Some(record_id) => {
                let body = json!({
                    "domain_id": numeric_id(&domain_id),
                    "host": self.host,
                    "value": value.to_string(),
                    "type": self.record_type,
                });
                let url = format!("{}/record/{}", self.base, record_id);
                let updated: WriteResponse = self.call(Method::PUT, url, Some(body)).await?;
                updated.status.into_result("record update")?;

                tracing::info!(
                    host = %self.host,
                    domain = %self.domain,
                    record_type = self.record_type,
                    %value,
                    %record_id,
                    "CloudXNS record updated"
                );
                Ok(UpdateResult::Updated { record_id })
            }
            None => {
                let body = json!({
                    "domain_id": domain_id,
                    "host": self.host,
                    "value": value.to_string(),
                    "type": self.record_type,
                    "line_id": DEFAULT_LINE_ID,
                });
                let url = format!("{}/record", self.base);
                let created: WriteResponse = self.call(Method::POST, url, Some(body)).await?;
                let record_id = created.first_record_id();
                created.status.into_result("record create")?;
                let record_id = record_id.ok_or_else(|| {
                    Error::decode("CloudXNS record create response carries no record_id")
                })?;

                tracing::info!(
                    host = %self.host,
                    domain = %self.domain,
                    record_type = self.record_type,
                    %value,
                    %record_id,
                    "CloudXNS record created"
                );
                Ok(UpdateResult::Created { record_id })
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "cloudxns"
    }
}

/// `PUT /record/{id}` takes the domain id as a JSON number
fn numeric_id(id: &str) -> serde_json::Value {
    id.parse::<u64>()
        .map(serde_json::Value::from)
        .unwrap_or_else(|_| serde_json::Value::from(id))
}

/// Factory for creating CloudXNS drivers
pub struct CloudxnsFactory;

impl DnsProviderFactory for CloudxnsFactory {
    fn create(&self, target: &ProviderTarget, http: &HttpConfig) -> Result<Box<dyn DnsProvider>> {
        match &target.provider {
            ProviderConfig::Cloudxns {
                api_key,
                secret_key,
                domain,
                sub_domain,
                endpoint,
            } => {
                target.provider.validate()?;
                Ok(Box::new(CloudxnsProvider::new(
                    api_key.clone(),
                    secret_key.clone(),
                    domain.clone(),
                    sub_domain.clone(),
                    target.version,
                    endpoint.clone(),
                    http,
                )?))
            }
            _ => Err(Error::config("Invalid config for CloudXNS provider")),
        }
    }
}

/// Register the CloudXNS provider with a registry
pub fn register(registry: &ddns_core::ProviderRegistry) {
    registry.register_provider("cloudxns", Box::new(CloudxnsFactory));
}
