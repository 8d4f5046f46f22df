//! `ddnsd cloudflare ...`: account-wide record maintenance
//!
//! Runs one command against the Cloudflare client API and exits. The
//! daemon configuration file is not read.

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use ddns_core::config::Secret;
use ddns_core::http::HttpConfig;
use ddns_provider_cloudflare::CloudflareAdmin;
use ddns_provider_cloudflare::admin::{DEFAULT_CNAME_MAX, DEFAULT_CNAME_PREFIXES};
use tracing::{info, warn};

#[derive(clap::Args, Debug)]
pub struct CloudflareArgs {
    /// Account email
    #[arg(long, env = "CF_API_EMAIL")]
    pub email: String,

    /// Client API key
    #[arg(long, env = "CF_API_KEY", hide_env_values = true)]
    pub key: String,

    /// API URL override
    #[arg(long)]
    pub endpoint: Option<String>,

    #[command(subcommand)]
    pub action: CloudflareAction,
}

#[derive(Subcommand, Debug)]
pub enum CloudflareAction {
    /// Print records across every zone
    List {
        /// Record type to show; empty for every type
        #[arg(long = "type", default_value = "A")]
        record_type: String,
    },

    /// Point one fully qualified record at new content
    Modify {
        #[arg(long)]
        name: String,

        #[arg(long)]
        content: String,

        /// Record type to match; empty for any
        #[arg(long = "type", default_value = "A")]
        record_type: String,
    },

    /// Rewrite every record whose content is FROM, across every zone
    Change {
        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,

        /// Record type to match; empty for any
        #[arg(long = "type", default_value = "A")]
        record_type: String,
    },

    /// Publish `{prefix}-{n}.{domain}` as a CNAME to `{prefix}-{n}.{suffix}`
    Cname {
        /// Zone the CNAMEs live in
        #[arg(long)]
        domain: String,

        /// Zone the CNAMEs point into
        #[arg(long)]
        suffix: String,

        /// Comma-separated prefixes
        #[arg(long, default_value = DEFAULT_CNAME_PREFIXES)]
        prefix: String,

        /// Highest number per prefix
        #[arg(long, default_value_t = DEFAULT_CNAME_MAX)]
        max: u32,
    },
}

/// `--type ""` matches every type
fn type_filter(record_type: &str) -> Option<&str> {
    Some(record_type).filter(|t| !t.is_empty())
}

pub async fn run(args: &CloudflareArgs, http: &HttpConfig) -> Result<()> {
    let admin = CloudflareAdmin::new(
        args.email.clone(),
        Secret::new(args.key.clone()),
        args.endpoint.clone(),
        http,
    )?;

    match &args.action {
        CloudflareAction::List { record_type } => {
            let rows = admin
                .list(type_filter(record_type))
                .await
                .context("listing Cloudflare records failed")?;
            for row in rows {
                println!("record {} ({}) => {}", row.name, row.record_type, row.content);
            }
        }
        CloudflareAction::Modify {
            name,
            content,
            record_type,
        } => {
            let edit = admin
                .modify(name, type_filter(record_type), content)
                .await
                .with_context(|| format!("modifying {} failed", name))?;
            match edit {
                Some(edit) => info!(
                    name = %edit.name,
                    zone = %edit.zone,
                    from = %edit.from,
                    to = %edit.to,
                    "Record updated"
                ),
                None => bail!("no {} record named {} on this account", record_type, name),
            }
        }
        CloudflareAction::Change {
            from,
            to,
            record_type,
        } => {
            let report = admin
                .change(type_filter(record_type), from, to)
                .await
                .context("changing Cloudflare records failed")?;
            info!(
                updated = report.updated.len(),
                failed = report.failed.len(),
                %from,
                %to,
                "Change finished"
            );
            if !report.failed.is_empty() {
                bail!("{} record(s) could not be changed", report.failed.len());
            }
        }
        CloudflareAction::Cname {
            domain,
            suffix,
            prefix,
            max,
        } => {
            let outcomes = admin
                .cname_batch(domain, suffix, prefix, *max)
                .await
                .with_context(|| format!("CNAME batch for {} failed", domain))?;
            let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
            if failed > 0 {
                warn!(failed, total = outcomes.len(), "Some CNAMEs were not published");
                bail!("{} of {} CNAME(s) could not be published", failed, outcomes.len());
            }
            info!(total = outcomes.len(), "Done");
        }
    }

    Ok(())
}
