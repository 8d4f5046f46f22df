//! api_json.html plumbing shared by the driver and the admin commands
//!
//! Every call is a form POST to one URL. The verb rides in `a`, the
//! credentials in `tkn` / `email`, and the zone (when the verb has one) in `z`.

use ddns_core::config::Secret;
use ddns_core::http::{HttpConfig, deserialize_id, read_json};
use ddns_core::{Error, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Cloudflare client API endpoint
pub const CLOUDFLARE_API_URL: &str = "https://www.cloudflare.com/api_json.html";

/// `ttl=1` means automatic
pub const AUTO_TTL: &str = "1";

/// `service_mode=0` publishes the record unproxied
pub const SERVICE_MODE_DNS_ONLY: &str = "0";

/// Envelope around every answer
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: String,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    err_code: Option<String>,
    response: Option<T>,
}

impl<T> Envelope<T> {
    fn into_response(self, action: &str) -> Result<Option<T>> {
        if self.result == "success" {
            return Ok(self.response);
        }

        let message = format!(
            "{} failed: {}",
            action,
            self.msg.as_deref().unwrap_or("no message")
        );
        Err(match self.err_code.as_deref() {
            Some("E_UNAUTH") => Error::auth(message),
            _ => Error::provider("cloudflare", message),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ZoneLoadMulti {
    pub zones: Zones,
}

#[derive(Debug, Deserialize)]
pub struct Zones {
    #[serde(default)]
    pub objs: Vec<Zone>,
}

#[derive(Debug, Deserialize)]
pub struct Zone {
    pub zone_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoadAll {
    pub recs: Recs,
}

#[derive(Debug, Deserialize)]
pub struct Recs {
    #[serde(default)]
    pub objs: Vec<Rec>,
}

/// One row of `rec_load_all`
#[derive(Debug, Clone, Deserialize)]
pub struct Rec {
    #[serde(deserialize_with = "deserialize_id")]
    pub rec_id: String,

    /// Name relative to the zone (`www`), or the zone itself at the apex
    pub display_name: String,

    /// Fully qualified name
    #[serde(default)]
    pub name: String,

    #[serde(rename = "type")]
    pub record_type: String,

    #[serde(default)]
    pub content: String,

    #[serde(default = "auto_ttl", deserialize_with = "deserialize_id")]
    pub ttl: String,

    #[serde(default)]
    pub service_mode: Option<String>,
}

fn auto_ttl() -> String {
    AUTO_TTL.to_string()
}

#[derive(Debug, Deserialize)]
pub struct RecWrite {
    pub rec: RecObj,
}

#[derive(Debug, Deserialize)]
pub struct RecObj {
    pub obj: RecId,
}

#[derive(Debug, Deserialize)]
pub struct RecId {
    #[serde(deserialize_with = "deserialize_id")]
    pub rec_id: String,
}

/// Account credentials plus the endpoint they are sent to
pub struct ClientApi {
    email: String,

    /// ⚠️ NEVER log this value
    token: Secret,

    endpoint: String,

    client: reqwest::Client,
}

impl std::fmt::Debug for ClientApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientApi")
            .field("email", &self.email)
            .field("token", &"<REDACTED>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl ClientApi {
    pub fn new(
        email: impl Into<String>,
        token: Secret,
        endpoint: Option<String>,
        http: &HttpConfig,
    ) -> Result<Self> {
        Ok(Self {
            email: email.into(),
            token,
            endpoint: endpoint.unwrap_or_else(|| CLOUDFLARE_API_URL.to_string()),
            client: http.client()?,
        })
    }

    #[cfg(test)]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST action `a` with the credential fields, `z` when given, plus `fields`
    pub async fn call<T: DeserializeOwned>(
        &self,
        action: &str,
        zone: Option<&str>,
        fields: &[(&str, &str)],
    ) -> Result<Option<T>> {
        let mut form: Vec<(&str, &str)> = vec![
            ("a", action),
            ("tkn", self.token.expose()),
            ("email", self.email.as_str()),
        ];
        if let Some(zone) = zone {
            form.push(("z", zone));
        }
        form.extend_from_slice(fields);

        tracing::debug!(action, zone, "Calling Cloudflare API");

        let response = self.client.post(&self.endpoint).form(&form).send().await?;
        let envelope: Envelope<T> = read_json("cloudflare", response).await?;
        envelope.into_response(action)
    }

    /// Every record of `zone`
    pub async fn load_records(&self, zone: &str) -> Result<Vec<Rec>> {
        let loaded: Option<LoadAll> = self.call("rec_load_all", Some(zone), &[]).await?;
        Ok(loaded.map(|l| l.recs.objs).unwrap_or_default())
    }

    /// Names of every zone on the account
    pub async fn load_zones(&self) -> Result<Vec<String>> {
        let loaded: Option<ZoneLoadMulti> = self.call("zone_load_multi", None, &[]).await?;
        Ok(loaded
            .into_iter()
            .flat_map(|l| l.zones.objs)
            .map(|z| z.zone_name)
            .collect())
    }

    /// `rec_new`, returning the new record's id
    pub async fn create_record(
        &self,
        zone: &str,
        record_type: &str,
        name: &str,
        content: &str,
    ) -> Result<String> {
        let written: Option<RecWrite> = self
            .call(
                "rec_new",
                Some(zone),
                &[
                    ("ttl", AUTO_TTL),
                    ("type", record_type),
                    ("name", name),
                    ("content", content),
                ],
            )
            .await?;

        written
            .map(|w| w.rec.obj.rec_id)
            .ok_or_else(|| Error::decode("Cloudflare rec_new response carries no rec_id"))
    }

    /// `rec_edit` of an existing record
    #[allow(clippy::too_many_arguments)]
    pub async fn edit_record(
        &self,
        zone: &str,
        record_id: &str,
        record_type: &str,
        name: &str,
        content: &str,
        ttl: &str,
        service_mode: &str,
    ) -> Result<()> {
        let _: Option<serde::de::IgnoredAny> = self
            .call(
                "rec_edit",
                Some(zone),
                &[
                    ("type", record_type),
                    ("service_mode", service_mode),
                    ("ttl", ttl),
                    ("id", record_id),
                    ("name", name),
                    ("content", content),
                ],
            )
            .await?;
        Ok(())
    }
}
