//! Address resolution
//!
//! Produces a best-effort [`AddressSnapshot`] for the enabled classes. Each
//! class is probed independently and concurrently; a failed probe leaves its
//! class empty for this tick and never aborts the others.

use crate::address::{AddressClass, AddressSnapshot, Scope};
use crate::traits::IpSource;
use std::net::IpAddr;
use tracing::{debug, warn};

/// Resolves the current address of every enabled class
pub struct AddressResolver {
    external: Option<Box<dyn IpSource>>,
    internal: Option<Box<dyn IpSource>>,
    enabled: Vec<AddressClass>,
}

impl AddressResolver {
    /// # Parameters
    ///
    /// - `external`: Source for external classes (None if no external target)
    /// - `internal`: Source for internal classes (None if no internal target)
    /// - `enabled`: Classes to probe
    pub fn new(
        external: Option<Box<dyn IpSource>>,
        internal: Option<Box<dyn IpSource>>,
        enabled: Vec<AddressClass>,
    ) -> Self {
        Self {
            external,
            internal,
            enabled,
        }
    }

    pub fn enabled(&self) -> &[AddressClass] {
        &self.enabled
    }

    /// Probe all enabled classes
    pub async fn resolve(&self) -> AddressSnapshot {
        let (external_v4, external_v6, internal_v4, internal_v6) = tokio::join!(
            self.probe(AddressClass::ExternalV4),
            self.probe(AddressClass::ExternalV6),
            self.probe(AddressClass::InternalV4),
            self.probe(AddressClass::InternalV6),
        );

        AddressSnapshot {
            external_v4,
            external_v6,
            internal_v4,
            internal_v6,
        }
    }

    async fn probe(&self, class: AddressClass) -> Option<IpAddr> {
        if !self.enabled.contains(&class) {
            return None;
        }

        let source = match class.scope() {
            Scope::External => self.external.as_deref(),
            Scope::Internal => self.internal.as_deref(),
        };
        let Some(source) = source else {
            warn!(%class, "No IP source configured for enabled class");
            return None;
        };

        match source.current(class.version()).await {
            Ok(ip) if class.version().matches(&ip) => {
                debug!(%class, %ip, source = source.source_name(), "Resolved address");
                Some(ip)
            }
            Ok(ip) => {
                warn!(%class, %ip, source = source.source_name(), "Source returned address of the wrong family");
                None
            }
            Err(e) => {
                warn!(%class, source = source.source_name(), error = %e, "Address undiscovered this tick");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::traits::IpVersion;
    use async_trait::async_trait;

    struct FixedSource {
        v4: Option<IpAddr>,
        v6: Option<IpAddr>,
    }

    #[async_trait]
    impl IpSource for FixedSource {
        async fn current(&self, version: IpVersion) -> Result<IpAddr> {
            match version {
                IpVersion::V4 => self.v4,
                IpVersion::V6 => self.v6,
            }
            .ok_or_else(|| Error::not_found("no address"))
        }

        fn source_name(&self) -> &'static str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_only_enabled_classes_are_probed() {
        let resolver = AddressResolver::new(
            Some(Box::new(FixedSource {
                v4: Some("203.0.113.7".parse().unwrap()),
                v6: Some("2001:db8::7".parse().unwrap()),
            })),
            None,
            vec![AddressClass::ExternalV4],
        );

        let snapshot = resolver.resolve().await;
        assert_eq!(snapshot.external_v4, Some("203.0.113.7".parse().unwrap()));
        assert_eq!(snapshot.external_v6, None);
    }

    #[tokio::test]
    async fn test_failure_leaves_class_empty() {
        let resolver = AddressResolver::new(
            Some(Box::new(FixedSource { v4: None, v6: None })),
            Some(Box::new(FixedSource {
                v4: Some("192.168.1.20".parse().unwrap()),
                v6: None,
            })),
            vec![AddressClass::ExternalV4, AddressClass::InternalV4],
        );

        let snapshot = resolver.resolve().await;
        assert_eq!(snapshot.external_v4, None);
        assert_eq!(snapshot.internal_v4, Some("192.168.1.20".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_wrong_family_is_rejected() {
        let resolver = AddressResolver::new(
            Some(Box::new(FixedSource {
                v4: Some("2001:db8::7".parse().unwrap()),
                v6: None,
            })),
            None,
            vec![AddressClass::ExternalV4],
        );

        assert!(resolver.resolve().await.is_empty());
    }
}
