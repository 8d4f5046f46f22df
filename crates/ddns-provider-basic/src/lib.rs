// # BasicAuth Notification Target
//
// Pings a URL with HTTP basic credentials. This is how router-embedded DDNS
// endpoints are told to refresh: the endpoint reads the caller's address
// from the connection itself, so the request carries no address.
//
// ## Outcome
//
// Any response counts as delivered. A non-2xx status is logged at `warn`
// and reported as `Notified { status }`; only transport failures are
// errors, and those are retried by the engine.

use async_trait::async_trait;
use ddns_core::config::{ProviderConfig, ProviderTarget, Secret};
use ddns_core::http::HttpConfig;
use ddns_core::traits::{DnsProvider, DnsProviderFactory, UpdateResult};
use ddns_core::{Error, Result};
use std::net::IpAddr;

/// Authenticated GET target
pub struct BasicAuthProvider {
    username: String,

    /// ⚠️ NEVER log this value
    password: Secret,

    url: String,

    client: reqwest::Client,
}

impl std::fmt::Debug for BasicAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuthProvider")
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("url", &self.url)
            .finish()
    }
}

impl BasicAuthProvider {
    pub fn new(
        username: impl Into<String>,
        password: Secret,
        url: impl Into<String>,
        http: &HttpConfig,
    ) -> Result<Self> {
        Ok(Self {
            username: username.into(),
            password,
            url: url.into(),
            client: http.client()?,
        })
    }
}

#[async_trait]
impl DnsProvider for BasicAuthProvider {
    async fn reconcile(&self, value: IpAddr) -> Result<UpdateResult> {
        tracing::debug!(url = %self.url, %value, "Sending basic auth notification");

        let response = self
            .client
            .get(&self.url)
            .basic_auth(&self.username, Some(self.password.expose()))
            .send()
            .await?;

        let status = response.status();

        // Drain the body so the exchange completes.
        response.text().await?;

        if status.is_success() {
            tracing::info!(url = %self.url, status = status.as_u16(), "Notification delivered");
        } else {
            tracing::warn!(
                url = %self.url,
                status = status.as_u16(),
                "Notification endpoint answered with a non-success status"
            );
        }

        Ok(UpdateResult::Notified {
            status: status.as_u16(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "basic"
    }
}

/// Factory for creating BasicAuth targets
pub struct BasicAuthFactory;

impl DnsProviderFactory for BasicAuthFactory {
    fn create(&self, target: &ProviderTarget, http: &HttpConfig) -> Result<Box<dyn DnsProvider>> {
        match &target.provider {
            ProviderConfig::Basic {
                username,
                password,
                url,
            } => {
                target.provider.validate()?;
                Ok(Box::new(BasicAuthProvider::new(
                    username.clone(),
                    password.clone(),
                    url.clone(),
                    http,
                )?))
            }
            _ => Err(Error::config("Invalid config for basic provider")),
        }
    }
}

/// Register the BasicAuth target with a registry
pub fn register(registry: &ddns_core::ProviderRegistry) {
    registry.register_provider("basic", Box::new(BasicAuthFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddns_core::address::Scope;
    use ddns_core::traits::IpVersion;
    use wiremock::matchers::{basic_auth, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(url: String) -> BasicAuthProvider {
        BasicAuthProvider::new("admin", Secret::new("hunter2"), url, &HttpConfig::default()).unwrap()
    }

    fn value() -> IpAddr {
        "203.0.113.7".parse().unwrap()
    }

    #[tokio::test]
    async fn test_sends_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nic/update"))
            .and(basic_auth("admin", "hunter2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("good"))
            .expect(1)
            .mount(&server)
            .await;

        let result = provider(format!("{}/nic/update", server.uri()))
            .reconcile(value())
            .await
            .unwrap();

        assert_eq!(result, UpdateResult::Notified { status: 200 });
    }

    #[tokio::test]
    async fn test_non_success_status_is_still_delivered() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let result = provider(server.uri()).reconcile(value()).await.unwrap();

        assert_eq!(result, UpdateResult::Notified { status: 401 });
    }

    #[tokio::test]
    async fn test_transport_failure_is_an_error() {
        // Nothing listens on the discard port.
        let result = provider("http://127.0.0.1:9/".to_string())
            .reconcile(value())
            .await;

        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[test]
    fn test_factory_validates_url() {
        let registry = ddns_core::ProviderRegistry::new();
        register(&registry);

        let target = |url: &str| {
            ProviderTarget::new(
                Scope::External,
                IpVersion::V4,
                ProviderConfig::Basic {
                    username: "admin".to_string(),
                    password: Secret::new("hunter2"),
                    url: url.to_string(),
                },
            )
        };

        assert!(registry
            .create_provider(&target("https://router.lan/ddns"), &HttpConfig::default())
            .is_ok());
        assert!(registry
            .create_provider(&target("router.lan/ddns"), &HttpConfig::default())
            .is_err());
    }

    #[test]
    fn test_password_not_exposed_in_debug() {
        let debug_str = format!("{:?}", provider("https://router.lan/ddns".to_string()));
        assert!(!debug_str.contains("hunter2"));
        assert!(debug_str.contains("BasicAuthProvider"));
    }
}
