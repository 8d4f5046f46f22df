//! Account-wide record maintenance
//!
//! Operator commands that sit beside the per-record driver: listing what
//! the account publishes, pointing one named record somewhere else,
//! moving every record off an old address, and seeding numbered CNAMEs.
//!
//! A zone whose records cannot be loaded is logged and skipped. Only a
//! failure to list the zones themselves aborts a command.

use crate::api::{AUTO_TTL, ClientApi, Rec, SERVICE_MODE_DNS_ONLY};
use ddns_core::config::Secret;
use ddns_core::http::HttpConfig;
use ddns_core::traits::UpdateResult;
use ddns_core::{Error, Result};

/// Prefixes seeded by [`CloudflareAdmin::cname_batch`] when none are given
pub const DEFAULT_CNAME_PREFIXES: &str = "cn,kr,eu,tw,us,sg,jp,ru,hk";

/// Highest number seeded per prefix when none is given
pub const DEFAULT_CNAME_MAX: u32 = 9;

/// A record as listed across the account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRow {
    pub zone: String,
    pub rec_id: String,
    /// Fully qualified name
    pub name: String,
    pub record_type: String,
    pub content: String,
}

/// One content rewrite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub zone: String,
    pub name: String,
    pub record_type: String,
    pub from: String,
    pub to: String,
}

/// Outcome of [`CloudflareAdmin::change`]
#[derive(Debug, Default)]
pub struct ChangeReport {
    pub updated: Vec<Edit>,
    pub failed: Vec<(Edit, Error)>,
}

/// Outcome for one name of a CNAME batch
#[derive(Debug)]
pub struct CnameOutcome {
    /// Name relative to the zone (`cn-1`)
    pub name: String,
    pub target: String,
    pub result: Result<UpdateResult>,
}

impl Rec {
    fn fqdn(&self, zone: &str) -> String {
        if !self.name.is_empty() {
            self.name.clone()
        } else if self.display_name == zone {
            zone.to_string()
        } else {
            format!("{}.{}", self.display_name, zone)
        }
    }

    fn matches_type(&self, record_type: Option<&str>) -> bool {
        record_type.is_none_or(|t| self.record_type == t)
    }
}

/// Names seeded by a CNAME batch: `{prefix}-{n}` for n in `1..=max`
///
/// `prefixes` is comma-separated; blank entries are ignored.
pub fn cname_names(prefixes: &str, max: u32) -> Vec<String> {
    prefixes
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .flat_map(|prefix| (1..=max).map(move |n| format!("{}-{}", prefix, n)))
        .collect()
}

/// Client for the account-wide commands
#[derive(Debug)]
pub struct CloudflareAdmin {
    api: ClientApi,
}

impl CloudflareAdmin {
    pub fn new(
        email: impl Into<String>,
        token: Secret,
        endpoint: Option<String>,
        http: &HttpConfig,
    ) -> Result<Self> {
        if token.is_empty() {
            return Err(Error::config("Cloudflare API key is required"));
        }
        Ok(Self {
            api: ClientApi::new(email, token, endpoint, http)?,
        })
    }

    /// Every zone with its records, skipping zones that fail to load
    async fn zones_with_records(&self) -> Result<Vec<(String, Vec<Rec>)>> {
        let zones = self.api.load_zones().await?;
        let mut loaded = Vec::with_capacity(zones.len());

        for zone in zones {
            match self.api.load_records(&zone).await {
                Ok(records) => loaded.push((zone, records)),
                Err(e) => tracing::warn!(%zone, error = %e, "Loading Cloudflare records failed"),
            }
        }

        Ok(loaded)
    }

    async fn rewrite(&self, zone: &str, record: &Rec, content: &str) -> Result<()> {
        self.api
            .edit_record(
                zone,
                &record.rec_id,
                &record.record_type,
                &record.display_name,
                content,
                &record.ttl,
                record.service_mode.as_deref().unwrap_or(SERVICE_MODE_DNS_ONLY),
            )
            .await
    }

    /// Records of `record_type` (any type when `None`) across every zone
    pub async fn list(&self, record_type: Option<&str>) -> Result<Vec<RecordRow>> {
        let mut rows = Vec::new();
        for (zone, records) in self.zones_with_records().await? {
            rows.extend(
                records
                    .into_iter()
                    .filter(|r| r.matches_type(record_type))
                    .map(|r| RecordRow {
                        name: r.fqdn(&zone),
                        zone: zone.clone(),
                        rec_id: r.rec_id,
                        record_type: r.record_type,
                        content: r.content,
                    }),
            );
        }
        Ok(rows)
    }

    /// Point the first record called `name` at `content`
    ///
    /// `name` is fully qualified. Returns `None` when no zone holds a match.
    pub async fn modify(
        &self,
        name: &str,
        record_type: Option<&str>,
        content: &str,
    ) -> Result<Option<Edit>> {
        for (zone, records) in self.zones_with_records().await? {
            let Some(record) = records
                .iter()
                .find(|r| r.fqdn(&zone) == name && r.matches_type(record_type))
            else {
                continue;
            };

            self.rewrite(&zone, record, content).await?;

            let edit = Edit {
                name: record.fqdn(&zone),
                record_type: record.record_type.clone(),
                from: record.content.clone(),
                to: content.to_string(),
                zone,
            };
            tracing::info!(
                name = %edit.name,
                from = %edit.from,
                to = %edit.to,
                "Cloudflare record modified"
            );
            return Ok(Some(edit));
        }

        Ok(None)
    }

    /// Rewrite every record whose content is `from` to `to`, in every zone
    pub async fn change(
        &self,
        record_type: Option<&str>,
        from: &str,
        to: &str,
    ) -> Result<ChangeReport> {
        if from.is_empty() {
            return Err(Error::config("content to change from cannot be empty"));
        }

        let mut report = ChangeReport::default();
        for (zone, records) in self.zones_with_records().await? {
            for record in records
                .iter()
                .filter(|r| r.content == from && r.matches_type(record_type))
            {
                let edit = Edit {
                    zone: zone.clone(),
                    name: record.fqdn(&zone),
                    record_type: record.record_type.clone(),
                    from: from.to_string(),
                    to: to.to_string(),
                };

                match self.rewrite(&zone, record, to).await {
                    Ok(()) => {
                        tracing::info!(name = %edit.name, %from, %to, "Cloudflare record changed");
                        report.updated.push(edit);
                    }
                    Err(e) => {
                        tracing::warn!(name = %edit.name, error = %e, "Cloudflare record change failed");
                        report.failed.push((edit, e));
                    }
                }
            }
        }

        Ok(report)
    }

    /// Publish `{name}.{zone}` as a CNAME to `{name}.{suffix}` for every
    /// name of [`cname_names`]
    ///
    /// Existing CNAMEs are edited, missing ones created. A failure on one
    /// name does not stop the rest.
    pub async fn cname_batch(
        &self,
        zone: &str,
        suffix: &str,
        prefixes: &str,
        max: u32,
    ) -> Result<Vec<CnameOutcome>> {
        if zone.is_empty() || suffix.is_empty() {
            return Err(Error::config("CNAME batch needs both a zone and a suffix"));
        }

        let existing = self.api.load_records(zone).await?;
        let mut outcomes = Vec::new();

        for name in cname_names(prefixes, max) {
            let target = format!("{}.{}", name, suffix);
            let found = existing
                .iter()
                .find(|r| r.record_type == "CNAME" && r.display_name == name);

            let result = match found {
                Some(record) => self
                    .api
                    .edit_record(
                        zone,
                        &record.rec_id,
                        "CNAME",
                        &name,
                        &target,
                        AUTO_TTL,
                        SERVICE_MODE_DNS_ONLY,
                    )
                    .await
                    .map(|()| UpdateResult::Updated {
                        record_id: record.rec_id.clone(),
                    }),
                None => self
                    .api
                    .create_record(zone, "CNAME", &name, &target)
                    .await
                    .map(|record_id| UpdateResult::Created { record_id }),
            };

            match &result {
                Ok(published) => tracing::info!(%name, %zone, %target, ?published, "CNAME published"),
                Err(e) => tracing::warn!(%name, %zone, error = %e, "CNAME publish failed"),
            }
            outcomes.push(CnameOutcome {
                name,
                target,
                result,
            });
        }

        Ok(outcomes)
    }
}
