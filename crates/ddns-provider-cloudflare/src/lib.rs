// # Cloudflare DNS Provider
//
// Publishes records through Cloudflare's client API: one form-encoded
// endpoint, with the verb carried in the `a` field.
//
// ## Sequence
//
// 1. `a=rec_load_all` for the zone, match by display name and record type
// 2. `a=rec_new` when nothing matches, capturing the new `rec_id`
// 3. `a=rec_edit` on the found or freshly created record, always
//
// A created record and a pre-existing one converge through the same final
// edit, so the edit's fields (`service_mode=0`, `ttl=1`) apply to both.
//
// ## CNAME Targets
//
// A target with `cname` set publishes a CNAME carrying that content. The
// resolved address only decides when the target is reconciled.
//
// ## Account Commands
//
// [`CloudflareAdmin`] reuses the same client API for operator work across
// every zone on the account (`ddnsd cloudflare ...`).
//
// ## Security
//
// The API token never appears in logs or `Debug` output.

pub mod admin;
mod api;

pub use admin::{ChangeReport, CloudflareAdmin, CnameOutcome, Edit, RecordRow};

use api::{AUTO_TTL, ClientApi, SERVICE_MODE_DNS_ONLY};
use async_trait::async_trait;
use ddns_core::config::{ProviderConfig, ProviderTarget, Secret};
use ddns_core::http::HttpConfig;
use ddns_core::traits::{DnsProvider, DnsProviderFactory, IpVersion, UpdateResult};
use ddns_core::{Error, Result};
use std::net::IpAddr;

/// Cloudflare driver bound to one record
pub struct CloudflareProvider {
    api: ClientApi,

    /// Zone (`z`)
    domain: String,

    /// Record name relative to the zone
    name: String,

    record_type: &'static str,

    /// Fixed content for CNAME targets
    cname: Option<String>,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api", &self.api)
            .field("domain", &self.domain)
            .field("name", &self.name)
            .field("record_type", &self.record_type)
            .field("cname", &self.cname)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a driver for `{sub_domain}.{domain}`
    ///
    /// # Parameters
    ///
    /// - `email`: Account email (`email` field)
    /// - `token`: Client API key (`tkn` field)
    /// - `version`: Address family; ignored when `cname` is set
    /// - `cname`: Publish a CNAME with this content instead of an address
    /// - `endpoint`: API URL override
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        email: impl Into<String>,
        token: Secret,
        domain: impl Into<String>,
        sub_domain: impl Into<String>,
        version: IpVersion,
        cname: Option<String>,
        endpoint: Option<String>,
        http: &HttpConfig,
    ) -> Result<Self> {
        let domain = domain.into();
        let sub_domain = sub_domain.into();

        let name = if sub_domain.is_empty() || sub_domain == "@" {
            domain.clone()
        } else {
            sub_domain
        };
        let record_type = if cname.is_some() {
            "CNAME"
        } else {
            version.record_type()
        };

        Ok(Self {
            api: ClientApi::new(email, token, endpoint, http)?,
            domain,
            name,
            record_type,
            cname,
        })
    }

    async fn find_record(&self) -> Result<Option<String>> {
        Ok(self
            .api
            .load_records(&self.domain)
            .await?
            .into_iter()
            .find(|r| r.display_name == self.name && r.record_type == self.record_type)
            .map(|r| r.rec_id))
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn reconcile(&self, value: IpAddr) -> Result<UpdateResult> {
        let value_text = value.to_string();
        let content = self.cname.as_deref().unwrap_or(&value_text);

        let (record_id, created) = match self.find_record().await? {
            Some(id) => (id, false),
            None => {
                let id = self
                    .api
                    .create_record(&self.domain, self.record_type, &self.name, content)
                    .await?;
                tracing::debug!(name = %self.name, rec_id = %id, "Cloudflare record created");
                (id, true)
            }
        };

        self.api
            .edit_record(
                &self.domain,
                &record_id,
                self.record_type,
                &self.name,
                content,
                AUTO_TTL,
                SERVICE_MODE_DNS_ONLY,
            )
            .await?;

        tracing::info!(
            name = %self.name,
            zone = %self.domain,
            record_type = self.record_type,
            content,
            rec_id = %record_id,
            created,
            "Cloudflare record published"
        );

        Ok(if created {
            UpdateResult::Created { record_id }
        } else {
            UpdateResult::Updated { record_id }
        })
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}

/// Factory for creating Cloudflare drivers
pub struct CloudflareFactory;

impl DnsProviderFactory for CloudflareFactory {
    fn create(&self, target: &ProviderTarget, http: &HttpConfig) -> Result<Box<dyn DnsProvider>> {
        match &target.provider {
            ProviderConfig::Cloudflare {
                email,
                token,
                domain,
                sub_domain,
                cname,
                endpoint,
            } => {
                target.provider.validate()?;
                Ok(Box::new(CloudflareProvider::new(
                    email.clone(),
                    token.clone(),
                    domain.clone(),
                    sub_domain.clone(),
                    target.version,
                    cname.clone(),
                    endpoint.clone(),
                    http,
                )?))
            }
            _ => Err(Error::config("Invalid config for Cloudflare provider")),
        }
    }
}

/// Register the Cloudflare provider with a registry
///
/// # Example
///
/// ```rust
/// use ddns_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// ddns_provider_cloudflare::register(&registry);
/// assert!(registry.has_provider("cloudflare"));
/// ```
pub fn register(registry: &ddns_core::ProviderRegistry) {
    registry.register_provider("cloudflare", Box::new(CloudflareFactory));
}
