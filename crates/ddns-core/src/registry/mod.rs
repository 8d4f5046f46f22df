//! Plugin-based provider registry
//!
//! Provider drivers and IP sources live in their own crates and register a
//! factory here under their type name. The engine never matches on
//! provider kinds itself.
//!
//! ## Registration
//!
//! ```rust,ignore
//! use ddns_core::ProviderRegistry;
//!
//! let registry = ProviderRegistry::new();
//! ddns_provider_dnspod::register(&registry);
//! ddns_ip_http::register(&registry);
//!
//! for target in config.targets()? {
//!     let provider = registry.create_provider(&target, &http)?;
//! }
//! ```

use crate::config::{IpSourceConfig, ProviderTarget};
use crate::error::{Error, Result};
use crate::http::HttpConfig;
use crate::traits::{DnsProvider, DnsProviderFactory, IpSource, IpSourceFactory};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Provider registry for plugin-based driver creation
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ProviderRegistry {
    /// Registered DNS provider factories
    providers: RwLock<HashMap<String, Box<dyn DnsProviderFactory>>>,

    /// Registered IP source factories
    ip_sources: RwLock<HashMap<String, Box<dyn IpSourceFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a DNS provider factory
    ///
    /// # Parameters
    ///
    /// - `name`: Provider type name (e.g., "dnspod", "cloudxns")
    /// - `factory`: Factory object for creating driver instances
    pub fn register_provider(&self, name: impl Into<String>, factory: Box<dyn DnsProviderFactory>) {
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        providers.insert(name.into(), factory);
    }

    /// Register an IP source factory
    ///
    /// # Parameters
    ///
    /// - `name`: IP source type name (e.g., "http", "interface")
    /// - `factory`: Factory object for creating IP source instances
    pub fn register_ip_source(&self, name: impl Into<String>, factory: Box<dyn IpSourceFactory>) {
        let mut sources = self
            .ip_sources
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        sources.insert(name.into(), factory);
    }

    /// Create a driver bound to `target`
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn DnsProvider>)`: Created driver
    /// - `Err(Error)`: If the provider type is not registered or creation fails
    pub fn create_provider(
        &self,
        target: &ProviderTarget,
        http: &HttpConfig,
    ) -> Result<Box<dyn DnsProvider>> {
        let provider_type = target.provider.type_name();
        let providers = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let factory = providers.get(provider_type).ok_or_else(|| {
            Error::config(format!(
                "Unknown provider type: {} (is its feature enabled?)",
                provider_type
            ))
        })?;

        factory.create(target, http)
    }

    /// Create an IP source from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn IpSource>)`: Created IP source instance
    /// - `Err(Error)`: If source type is not registered or creation fails
    pub fn create_ip_source(
        &self,
        config: &IpSourceConfig,
        http: &HttpConfig,
    ) -> Result<Box<dyn IpSource>> {
        let source_type = config.type_name();
        let sources = self
            .ip_sources
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let factory = sources
            .get(source_type)
            .ok_or_else(|| Error::config(format!("Unknown IP source type: {}", source_type)))?;

        factory.create(config, http)
    }

    /// List all registered provider types
    pub fn list_providers(&self) -> Vec<String> {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// List all registered IP source types
    pub fn list_ip_sources(&self) -> Vec<String> {
        let sources = self
            .ip_sources
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = sources.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a provider type is registered
    pub fn has_provider(&self, name: &str) -> bool {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Check if an IP source type is registered
    pub fn has_ip_source(&self, name: &str) -> bool {
        self.ip_sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}
