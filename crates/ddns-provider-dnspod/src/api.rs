//! dnsapi.cn response shapes
//!
//! Every response carries a `status` object; `code == "1"` is success.

use ddns_core::Error;
use ddns_core::http::deserialize_id;
use serde::Deserialize;

/// Record.List answers this when the domain has no records at all
pub const CODE_NO_RECORDS: &str = "10";

#[derive(Debug, Deserialize)]
pub struct Status {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl Status {
    pub fn is_ok(&self) -> bool {
        self.code == "1"
    }

    /// Turn a failure status into an error
    pub fn into_result(self, action: &str) -> Result<(), Error> {
        if self.is_ok() {
            return Ok(());
        }

        let message = format!("{} failed ({}): {}", action, self.code, self.message);
        Err(match self.code.as_str() {
            // Login failed, account locked, or login region restricted
            "-1" | "-7" | "-8" => Error::auth(message),
            _ => Error::provider("dnspod", message),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct DomainList {
    pub status: Status,
    #[serde(default)]
    pub domains: Vec<DomainItem>,
}

#[derive(Debug, Deserialize)]
pub struct DomainItem {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordList {
    pub status: Status,
    #[serde(default)]
    pub records: Vec<RecordItem>,
}

#[derive(Debug, Deserialize)]
pub struct RecordItem {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default, rename = "type")]
    pub record_type: Option<String>,
}

/// Record.Create / Record.Modify
#[derive(Debug, Deserialize)]
pub struct RecordWrite {
    pub status: Status,
    #[serde(default)]
    pub record: Option<RecordRef>,
}

#[derive(Debug, Deserialize)]
pub struct RecordRef {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
}
