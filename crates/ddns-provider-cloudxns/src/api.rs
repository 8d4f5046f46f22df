//! CloudXNS response shapes
//!
//! Ids arrive as strings or numbers depending on the endpoint. `code == 1`
//! is success.

use ddns_core::Error;
use ddns_core::http::deserialize_id;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Status {
    #[serde(deserialize_with = "deserialize_id")]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl Status {
    pub fn into_result(self, action: &str) -> Result<(), Error> {
        if self.code == "1" {
            return Ok(());
        }
        Err(Error::provider(
            "cloudxns",
            format!("{} failed ({}): {}", action, self.code, self.message),
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct DomainList {
    #[serde(flatten)]
    pub status: Status,
    #[serde(default)]
    pub data: Vec<DomainItem>,
}

#[derive(Debug, Deserialize)]
pub struct DomainItem {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// Fully qualified, with the trailing dot
    pub domain: String,
}

#[derive(Debug, Deserialize)]
pub struct HostList {
    #[serde(flatten)]
    pub status: Status,
    #[serde(default)]
    pub hosts: Vec<HostItem>,
}

#[derive(Debug, Deserialize)]
pub struct HostItem {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub host: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordList {
    #[serde(flatten)]
    pub status: Status,
    #[serde(default)]
    pub data: Vec<RecordItem>,
}

#[derive(Debug, Deserialize)]
pub struct RecordItem {
    #[serde(deserialize_with = "deserialize_id")]
    pub record_id: String,
    #[serde(rename = "type")]
    pub record_type: String,
}

/// POST / PUT `/record`
#[derive(Debug, Deserialize)]
pub struct WriteResponse {
    #[serde(flatten)]
    pub status: Status,
    /// Assigned ids on create; a list with one entry
    #[serde(default)]
    pub record_id: Option<serde_json::Value>,
}

impl WriteResponse {
    pub fn first_record_id(&self) -> Option<String> {
        match self.record_id.as_ref()? {
            serde_json::Value::Array(ids) => ids.first().and_then(id_text),
            other => id_text(other),
        }
    }
}

fn id_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
