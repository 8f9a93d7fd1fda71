use crate::batch::BatchCoordinator;
use crate::cache::{CacheBackend, CacheConfig, CacheManager, MemoryCache};
use crate::config::ProxyConfig;
use crate::policy::CachePolicy;
use crate::proxy::core::ProxyService;
use crate::transport::HttpTransport;
use crate::Result;
use std::sync::Arc;

/// Builder for [`ProxyService`].
///
/// Starts from [`ProxyConfig::default`]; pass a loaded config with
/// [`ProxyServiceBuilder::config`].
pub struct ProxyServiceBuilder {
    config: ProxyConfig,
    backend: Option<Box<dyn CacheBackend>>,
    cache: Option<Arc<CacheManager>>,
    cache_enabled: bool,
    /// Override base URL (primarily for testing with mock servers)
    base_url_override: Option<String>,
}

impl ProxyServiceBuilder {
    pub fn new() -> Self {
        Self {
            config: ProxyConfig::default(),
            backend: None,
            cache: None,
            cache_enabled: true,
            base_url_override: None,
        }
    }

    pub fn config(mut self, config: ProxyConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the configured upstream base URL.
    pub fn base_url_override(mut self, base_url: impl Into<String>) -> Self {
        self.base_url_override = Some(base_url.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    /// Use a custom store. Default is [`MemoryCache`].
    pub fn cache_backend(mut self, backend: Box<dyn CacheBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Share an existing cache service (takes precedence over `cache_backend`).
    pub fn cache_manager(mut self, cache: Arc<CacheManager>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Forward everything without caching.
    pub fn disable_cache(mut self) -> Self {
        self.cache_enabled = false;
        self
    }

    pub fn build(self) -> Result<ProxyService> {
        let mut config = self.config;
        if let Some(url) = self.base_url_override {
            config.base_url = url;
        }
        config.validate()?;

        let cache = match self.cache {
            Some(cache) => cache,
            None => {
                let backend = self
                    .backend
                    .unwrap_or_else(|| Box::new(MemoryCache::new()));
                let cache_config = CacheConfig::new()
                    .with_ttl(config.default_ttl)
                    .with_enabled(self.cache_enabled);
                Arc::new(CacheManager::new(cache_config, backend))
            }
        };
        let transport = Arc::new(HttpTransport::new(&config)?);
        let policy = Arc::new(CachePolicy::from_config(&config));
        let batch = BatchCoordinator::new(
            Arc::clone(&cache),
            Arc::clone(&transport),
            Arc::clone(&policy),
        );

        Ok(ProxyService {
            cache,
            transport,
            policy,
            batch,
        })
    }
}

impl Default for ProxyServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_build_applies_config() {
        let service = ProxyServiceBuilder::new()
            .config(
                ProxyConfig::new()
                    .with_default_ttl(Duration::from_secs(42))
                    .with_batch_prefix("/bulk"),
            )
            .base_url_override("http://127.0.0.1:1234/")
            .build()
            .unwrap();

        assert_eq!(service.cache().default_ttl(), Duration::from_secs(42));
        assert_eq!(service.policy().batch_prefix(), "/bulk");
        assert_eq!(service.transport().base_url(), "http://127.0.0.1:1234");
    }

    #[test]
    fn test_invalid_base_url_fails_build() {
        assert!(ProxyServiceBuilder::new()
            .base_url_override("not a url")
            .build()
            .is_err());
    }

    #[test]
    fn test_disable_cache() {
        let service = ProxyServiceBuilder::new().disable_cache().build().unwrap();
        assert!(!service.cache().config().enabled);
    }

    #[test]
    fn test_shared_cache_manager() {
        let cache = Arc::new(CacheManager::default());
        let service = ProxyServiceBuilder::new()
            .cache_manager(Arc::clone(&cache))
            .build()
            .unwrap();
        assert!(Arc::ptr_eq(service.cache(), &cache));
    }
}
