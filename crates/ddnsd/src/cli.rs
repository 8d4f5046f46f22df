//! Command-line surface of the daemon

use anyhow::{Context, Result, bail};
use clap::Parser;
#[cfg(feature = "cloudflare")]
use clap::Subcommand;
use ddns_core::DdnsConfig;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// Keeps DNS records in sync with this machine's addresses
#[derive(Parser, Debug)]
#[command(name = "ddnsd", version)]
pub struct Args {
    /// JSON configuration file
    #[arg(short, long, default_value = "app.conf", env = "DDNS_CONFIG")]
    pub config: PathBuf,

    /// What-is-my-ip service for external addresses
    #[arg(long, env = "DDNS_IFCONFIG")]
    pub ifconfig: Option<String>,

    /// Accept any TLS certificate on outbound requests
    #[arg(long, alias = "insecureSkipVerify", global = true)]
    pub insecure_skip_verify: bool,

    /// Time between ticks: `90`, `30s`, `5m`, `1h`, `1h30m`
    #[arg(long, default_value = "1m", env = "DDNS_INTERVAL")]
    pub interval: String,

    /// Run a single tick, wait for its publishes, then exit
    #[arg(long)]
    pub once: bool,

    /// trace, debug, info, warn or error
    #[arg(long, default_value = "info", env = "DDNS_LOG_LEVEL", global = true)]
    pub log_level: String,

    /// One-shot maintenance command instead of the daemon
    #[cfg(feature = "cloudflare")]
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[cfg(feature = "cloudflare")]
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Account-wide Cloudflare record maintenance
    Cloudflare(crate::admin::CloudflareArgs),
}

impl Args {
    /// Read and parse the configuration file, then apply flag overrides
    pub fn load_config(&self) -> Result<DdnsConfig> {
        let text = std::fs::read_to_string(&self.config)
            .with_context(|| format!("reading {} failed", self.config.display()))?;

        let mut config = DdnsConfig::from_json(&text)
            .with_context(|| format!("parsing {} failed", self.config.display()))?;

        self.apply(&mut config);
        Ok(config)
    }

    /// Flags win over the file's `resolver` / `engine` values
    pub fn apply(&self, config: &mut DdnsConfig) {
        if let Some(url) = &self.ifconfig {
            config.resolver.ifconfig_url = url.clone();
        }
        if self.insecure_skip_verify {
            config.engine.insecure_skip_verify = true;
        }
    }

    pub fn tick_interval(&self) -> Result<Duration> {
        parse_interval(&self.interval)
    }

    pub fn level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            other => bail!(
                "log level '{}' is not valid. Valid levels: trace, debug, info, warn, error",
                other
            ),
        }
    }
}

/// Parse a tick interval
///
/// A bare number is seconds. Otherwise one or more `<number><unit>` pairs
/// with units `ms`, `s`, `m` and `h`. Zero is rejected.
pub fn parse_interval(text: &str) -> Result<Duration> {
    let text = text.trim();
    if text.is_empty() {
        bail!("interval cannot be empty");
    }

    if let Ok(secs) = text.parse::<u64>() {
        return non_zero(Duration::from_secs(secs), text);
    }

    let mut total = Duration::ZERO;
    let mut rest = text;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            bail!("invalid interval '{}': expected a number", text);
        }
        let value: u64 = rest[..digits]
            .parse()
            .with_context(|| format!("invalid interval '{}'", text))?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let part = match &rest[..unit_len] {
            "ms" => Duration::from_millis(value),
            "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(scaled(value, 60, text)?),
            "h" => Duration::from_secs(scaled(value, 3600, text)?),
            "" => bail!("invalid interval '{}': missing unit", text),
            unit => bail!("invalid interval '{}': unknown unit '{}'", text, unit),
        };
        rest = &rest[unit_len..];
        total = total
            .checked_add(part)
            .with_context(|| format!("interval '{}' is too large", text))?;
    }

    non_zero(total, text)
}

fn scaled(value: u64, factor: u64, text: &str) -> Result<u64> {
    value
        .checked_mul(factor)
        .with_context(|| format!("interval '{}' is too large", text))
}

fn non_zero(duration: Duration, text: &str) -> Result<Duration> {
    if duration.is_zero() {
        bail!("interval '{}' must be greater than zero", text);
    }
    Ok(duration)
}
