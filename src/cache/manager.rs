//! Cache manager.

use super::backend::CacheBackend;
use super::key::{CacheKey, CacheKeyGenerator};
use crate::types::HttpMethod;
use crate::Result;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub default_ttl: Duration,
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            enabled: true,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub errors: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    errors: AtomicU64,
}

impl AtomicStats {
    fn to_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Cache service shared by the proxy and the admin routes.
///
/// Constructed once at startup and handed around as `Arc<CacheManager>`;
/// tests build isolated instances.
pub struct CacheManager {
    config: CacheConfig,
    backend: Box<dyn CacheBackend>,
    keys: CacheKeyGenerator,
    stats: AtomicStats,
}

impl CacheManager {
    pub fn new(config: CacheConfig, backend: Box<dyn CacheBackend>) -> Self {
        Self {
            config,
            backend,
            keys: CacheKeyGenerator::new(),
            stats: AtomicStats::default(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn default_ttl(&self) -> Duration {
        self.config.default_ttl
    }

    pub fn keys(&self) -> &CacheKeyGenerator {
        &self.keys
    }

    pub async fn get(&self, key: &CacheKey) -> Result<Option<Value>> {
        if !self.config.enabled {
            return Ok(None);
        }
        match self.backend.get(key).await {
            Ok(Some(v)) => {
                AtomicStats::bump(&self.stats.hits);
                debug!(%key, "cache hit");
                Ok(Some(v))
            }
            Ok(None) => {
                AtomicStats::bump(&self.stats.misses);
                debug!(%key, "cache miss");
                Ok(None)
            }
            Err(e) => {
                AtomicStats::bump(&self.stats.errors);
                Err(e)
            }
        }
    }

    pub async fn set(&self, key: &CacheKey, value: Value) -> Result<()> {
        self.set_with_ttl(key, value, self.config.default_ttl).await
    }

    pub async fn set_with_ttl(&self, key: &CacheKey, value: Value, ttl: Duration) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        match self.backend.set(key, value, ttl).await {
            Ok(()) => {
                AtomicStats::bump(&self.stats.sets);
                Ok(())
            }
            Err(e) => {
                AtomicStats::bump(&self.stats.errors);
                Err(e)
            }
        }
    }

    pub async fn delete(&self, key: &CacheKey) -> Result<bool> {
        let deleted = self.backend.delete(key).await?;
        if deleted {
            AtomicStats::bump(&self.stats.deletes);
        }
        Ok(deleted)
    }

    pub async fn clear(&self) -> Result<()> {
        self.backend.clear().await
    }

    pub async fn clear_by_prefix(&self, prefix: &str) -> Result<usize> {
        let removed = self.backend.clear_by_prefix(prefix).await?;
        self.stats
            .deletes
            .fetch_add(removed as u64, Ordering::Relaxed);
        Ok(removed)
    }

    /// Drop every cached variant of endpoints starting with `endpoint_prefix`,
    /// across all methods.
    pub async fn invalidate_endpoint(&self, endpoint_prefix: &str) -> Result<usize> {
        let mut removed = 0;
        for method in HttpMethod::ALL {
            removed += self
                .clear_by_prefix(&self.keys.prefix(method, endpoint_prefix))
                .await?;
        }
        debug!(endpoint_prefix, removed, "invalidated endpoint");
        Ok(removed)
    }

    pub async fn purge_expired(&self) -> Result<usize> {
        self.backend.purge_expired().await
    }

    pub async fn len(&self) -> Result<usize> {
        self.backend.len().await
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.to_stats()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Periodically purge expired entries until the returned handle is aborted.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match cache.purge_expired().await {
                    Ok(0) => {}
                    Ok(n) => debug!(purged = n, "swept expired cache entries"),
                    Err(e) => warn!(error = %e, "cache sweep failed"),
                }
            }
        })
    }
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::new(
            CacheConfig::default(),
            Box::new(super::backend::MemoryCache::new()),
        )
    }
}
