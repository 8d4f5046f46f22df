//! Shared HTTP plumbing for IP sources and provider drivers
//!
//! Every driver builds its client from [`HttpConfig`] and funnels responses
//! through [`check_status`] / [`read_json`] so status codes map onto the
//! same error variants everywhere.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Default HTTP timeout for API requests (30 seconds)
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Client settings shared by every outbound request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpConfig {
    /// Per-request timeout; bounds how long a tick can block on I/O
    pub timeout: Duration,

    /// Accept any TLS certificate
    pub insecure_skip_verify: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_HTTP_TIMEOUT,
            insecure_skip_verify: false,
        }
    }
}

impl HttpConfig {
    /// Builder pre-loaded with the timeout and TLS policy
    pub fn client_builder(&self) -> reqwest::ClientBuilder {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .danger_accept_invalid_certs(self.insecure_skip_verify)
    }

    /// Build a client with these settings
    pub fn client(&self) -> Result<reqwest::Client> {
        self.client_builder()
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))
    }
}

/// Map a non-success status onto the error taxonomy
///
/// # Returns
///
/// The response unchanged when its status is 2xx.
pub async fn check_status(provider: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());

    Err(match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "{} rejected credentials or signature. Status: {}",
            provider, status
        )),
        404 => Error::not_found(format!("{} returned 404: {}", provider, error_text)),
        429 => Error::http(
            status.as_u16(),
            format!("{} rate limit exceeded, retry later", provider),
        ),
        500..=599 => Error::http(
            status.as_u16(),
            format!("{} server error (transient): {}", provider, error_text),
        ),
        code => Error::http(code, format!("{} request failed: {}", provider, error_text)),
    })
}

/// Check the status, then decode the body as JSON
pub async fn read_json<T: DeserializeOwned>(provider: &str, response: reqwest::Response) -> Result<T> {
    let response = check_status(provider, response).await?;
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        Error::decode(format!(
            "{} response did not match expected shape: {}",
            provider, e
        ))
    })
}

/// Deserialize an identifier the provider may send as a string or a number
pub fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}
