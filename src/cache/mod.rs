//! 响应缓存模块：基于 TTL 的进程内缓存，用于去重上游 GET 请求。
//!
//! # Response Cache Module
//!
//! In-memory, TTL-based response cache keyed by a deterministic request
//! fingerprint. Freshness, not capacity, is the goal: there is no size-based
//! eviction, only expiry and explicit invalidation.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheManager`] | Cache service with default TTL, statistics and endpoint invalidation |
//! | [`CacheConfig`] | Default TTL and on/off switch |
//! | [`CacheBackend`] | Trait for store implementations |
//! | [`MemoryCache`] | Process-local store with lazy expiry |
//! | [`NullCache`] | No-op store for disabling caching |
//! | [`CacheKeyGenerator`] | `METHOD:endpoint:body:params` fingerprints |
//!
//! ## Example
//!
//! ```rust
//! use omnipanel_proxy::cache::{CacheConfig, CacheManager, MemoryCache};
//! use std::time::Duration;
//!
//! let cache = CacheManager::new(
//!     CacheConfig::new().with_ttl(Duration::from_secs(120)),
//!     Box::new(MemoryCache::new()),
//! );
//! assert_eq!(cache.default_ttl(), Duration::from_secs(120));
//! ```

mod backend;
mod key;
mod manager;

pub use backend::{CacheBackend, MemoryCache, NullCache};
pub use key::{canonical_json, CacheKey, CacheKeyGenerator};
pub use manager::{CacheConfig, CacheManager, CacheStats, DEFAULT_TTL};
