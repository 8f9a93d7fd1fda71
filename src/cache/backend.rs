//! Cache backend implementations.

use super::key::CacheKey;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(value: Value, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    /// Valid iff `now < expires_at`.
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Key/value store with per-entry expiry.
///
/// `set` is an unconditional overwrite; concurrent writers to the same key
/// resolve last-write-wins.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<Value>>;
    async fn set(&self, key: &CacheKey, value: Value, ttl: Duration) -> Result<()>;
    async fn delete(&self, key: &CacheKey) -> Result<bool>;
    async fn clear(&self) -> Result<()>;
    /// Remove every entry whose key starts with `prefix`. Returns how many went.
    async fn clear_by_prefix(&self, prefix: &str) -> Result<usize>;
    /// Drop entries that have already expired.
    async fn purge_expired(&self) -> Result<usize>;
    async fn len(&self) -> Result<usize>;
    fn name(&self) -> &'static str;
}

/// Process-local store. Expired entries are evicted lazily on read, or in
/// bulk through [`CacheBackend::purge_expired`].
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, CacheEntry>>> {
        self.entries.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, CacheEntry>>> {
        self.entries.write().map_err(|_| poisoned())
    }
}

fn poisoned() -> Error {
    Error::runtime_with_context(
        "cache store lock poisoned",
        ErrorContext::new().with_source("memory_cache"),
    )
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Value>> {
        let now = Instant::now();
        {
            let entries = self.read()?;
            match entries.get(key.as_str()) {
                Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // Stale: re-check under the write lock so a concurrent fresh `set` survives.
        let mut entries = self.write()?;
        if entries
            .get(key.as_str())
            .is_some_and(|e| !e.is_live(Instant::now()))
        {
            entries.remove(key.as_str());
        }
        Ok(None)
    }

    async fn set(&self, key: &CacheKey, value: Value, ttl: Duration) -> Result<()> {
        self.write()?
            .insert(key.as_str().to_string(), CacheEntry::new(value, ttl));
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.write()?.remove(key.as_str()).is_some())
    }

    async fn clear(&self) -> Result<()> {
        self.write()?.clear();
        Ok(())
    }

    async fn clear_by_prefix(&self, prefix: &str) -> Result<usize> {
        let mut entries = self.write()?;
        let before = entries.len();
        entries.retain(|k, _| !k.starts_with(prefix));
        Ok(before - entries.len())
    }

    async fn purge_expired(&self) -> Result<usize> {
        let now = Instant::now();
        let mut entries = self.write()?;
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        Ok(before - entries.len())
    }

    async fn len(&self) -> Result<usize> {
        let now = Instant::now();
        Ok(self.read()?.values().filter(|e| e.is_live(now)).count())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Backend that never stores anything; turns the proxy into a pure forwarder.
pub struct NullCache;
impl NullCache {
    pub fn new() -> Self {
        Self
    }
}
impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for NullCache {
    async fn get(&self, _: &CacheKey) -> Result<Option<Value>> {
        Ok(None)
    }
    async fn set(&self, _: &CacheKey, _: Value, _: Duration) -> Result<()> {
        Ok(())
    }
    async fn delete(&self, _: &CacheKey) -> Result<bool> {
        Ok(false)
    }
    async fn clear(&self) -> Result<()> {
        Ok(())
    }
    async fn clear_by_prefix(&self, _: &str) -> Result<usize> {
        Ok(0)
    }
    async fn purge_expired(&self) -> Result<usize> {
        Ok(0)
    }
    async fn len(&self) -> Result<usize> {
        Ok(0)
    }
    fn name(&self) -> &'static str {
        "null"
    }
}
