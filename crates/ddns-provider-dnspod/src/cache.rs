//! Domain name to DNSPod domain id mapping
//!
//! Shared by every DNSPod driver a factory creates, so one `Domain.List`
//! call serves all targets on the same account. Two drivers that miss at
//! the same time may both refetch; merging is idempotent.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default)]
pub struct DnspodDomainCache {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl DnspodDomainCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached id for `domain`
    pub async fn get(&self, domain: &str) -> Option<String> {
        self.inner.lock().await.get(domain).cloned()
    }

    /// Add a fetched listing, replacing stale ids
    pub async fn merge(&self, domains: impl IntoIterator<Item = (String, String)>) {
        self.inner.lock().await.extend(domains);
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_merge_keeps_other_domains() {
        let cache = DnspodDomainCache::new();
        assert!(cache.is_empty().await);

        cache
            .merge([("example.com".to_string(), "2317".to_string())])
            .await;
        cache
            .merge([
                ("example.org".to_string(), "9001".to_string()),
                ("example.com".to_string(), "2318".to_string()),
            ])
            .await;

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get("example.com").await.as_deref(), Some("2318"));
        assert_eq!(cache.get("example.net").await, None);
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let cache = DnspodDomainCache::new();
        let clone = cache.clone();

        clone
            .merge([("example.com".to_string(), "2317".to_string())])
            .await;

        assert_eq!(cache.get("example.com").await.as_deref(), Some("2317"));
    }
}
