//! Per-request cache participation.

use crate::config::{ProxyConfig, DEFAULT_ALWAYS_FRESH, DEFAULT_BATCH_PREFIX};
use crate::types::ProxyRequest;
use crate::Result;

/// Outcome of [`CachePolicy::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    /// Batch path; the coordinator decides per item.
    Batch,
    /// Neither read nor write the cache.
    Bypass(BypassReason),
    /// GET eligible for read-through caching.
    ReadThrough,
    /// Non-GET: forwarded, never cached.
    PassThrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassReason {
    SkipRequested,
    AlwaysFresh,
}

impl CacheDecision {
    pub fn uses_cache(&self) -> bool {
        matches!(self, CacheDecision::ReadThrough)
    }
}

#[derive(Debug, Clone)]
pub struct CachePolicy {
    batch_prefix: String,
    always_fresh: Vec<String>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_BATCH_PREFIX,
            DEFAULT_ALWAYS_FRESH.iter().map(|s| s.to_string()),
        )
    }
}

impl CachePolicy {
    pub fn new<I, S>(batch_prefix: impl Into<String>, always_fresh: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            batch_prefix: batch_prefix.into().trim_end_matches('/').to_string(),
            always_fresh: always_fresh
                .into_iter()
                .map(Into::into)
                .filter(|m: &String| !m.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &ProxyConfig) -> Self {
        Self::new(config.batch_prefix.clone(), config.always_fresh.iter().cloned())
    }

    pub fn batch_prefix(&self) -> &str {
        &self.batch_prefix
    }

    /// `true` for `{prefix}` and `{prefix}/...`, not for `{prefix}suffix`.
    pub fn is_batch(&self, endpoint: &str) -> bool {
        match endpoint.strip_prefix(&self.batch_prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Item endpoint behind a batch path: `/admin/batch/users` -> `/users`.
    ///
    /// `None` when the endpoint is not a batch path or names no item endpoint.
    pub fn batch_item_endpoint<'a>(&self, endpoint: &'a str) -> Option<&'a str> {
        if !self.is_batch(endpoint) {
            return None;
        }
        let rest = &endpoint[self.batch_prefix.len()..];
        let trimmed = rest.trim_end_matches('/');
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }

    pub fn is_always_fresh(&self, endpoint: &str) -> bool {
        self.always_fresh.iter().any(|m| endpoint.contains(m.as_str()))
    }

    pub fn decide(&self, request: &ProxyRequest) -> Result<CacheDecision> {
        if self.is_batch(&request.endpoint) {
            return Ok(CacheDecision::Batch);
        }
        if request.skip_cache {
            return Ok(CacheDecision::Bypass(BypassReason::SkipRequested));
        }
        if self.is_always_fresh(&request.endpoint) {
            return Ok(CacheDecision::Bypass(BypassReason::AlwaysFresh));
        }
        if request.http_method()?.is_get() {
            Ok(CacheDecision::ReadThrough)
        } else {
            Ok(CacheDecision::PassThrough)
        }
    }

    /// Whether a batch item fetched from `item_endpoint` may use the cache.
    pub fn caches_batch_item(&self, skip_cache: bool, item_endpoint: &str) -> bool {
        !skip_cache && !self.is_always_fresh(item_endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HttpMethod;

    #[test]
    fn test_get_is_read_through() {
        let policy = CachePolicy::default();
        let req = ProxyRequest::get("/admin/users");
        assert_eq!(policy.decide(&req).unwrap(), CacheDecision::ReadThrough);
        assert!(policy.decide(&req).unwrap().uses_cache());
    }

    #[test]
    fn test_writes_pass_through() {
        let policy = CachePolicy::default();
        for m in [HttpMethod::Post, HttpMethod::Put, HttpMethod::Delete] {
            let req = ProxyRequest::new(m, "/admin/users");
            assert_eq!(policy.decide(&req).unwrap(), CacheDecision::PassThrough);
        }
    }

    #[test]
    fn test_skip_cache_wins_over_method() {
        let policy = CachePolicy::default();
        let req = ProxyRequest::get("/admin/users").skip_cache(true);
        assert_eq!(
            policy.decide(&req).unwrap(),
            CacheDecision::Bypass(BypassReason::SkipRequested)
        );
    }

    #[test]
    fn test_always_fresh_endpoint_bypasses() {
        let policy = CachePolicy::default();
        let req = ProxyRequest::get("/admin/users/a@x.io/credit-history");
        assert_eq!(
            policy.decide(&req).unwrap(),
            CacheDecision::Bypass(BypassReason::AlwaysFresh)
        );
    }

    #[test]
    fn test_batch_detection_checks_segment_boundary() {
        let policy = CachePolicy::default();
        assert!(policy.is_batch("/admin/batch/users"));
        assert!(policy.is_batch("/admin/batch"));
        assert!(!policy.is_batch("/admin/batches/users"));
        assert!(!policy.is_batch("/admin/users"));

        let req = ProxyRequest::new(HttpMethod::Post, "/admin/batch/users").skip_cache(true);
        assert_eq!(policy.decide(&req).unwrap(), CacheDecision::Batch);
    }

    #[test]
    fn test_batch_item_endpoint() {
        let policy = CachePolicy::default();
        assert_eq!(policy.batch_item_endpoint("/admin/batch/users"), Some("/users"));
        assert_eq!(
            policy.batch_item_endpoint("/admin/batch/admin/users/"),
            Some("/admin/users")
        );
        assert_eq!(policy.batch_item_endpoint("/admin/batch"), None);
        assert_eq!(policy.batch_item_endpoint("/admin/batch/"), None);
        assert_eq!(policy.batch_item_endpoint("/users"), None);
    }

    #[test]
    fn test_custom_prefix_and_markers() {
        let policy = CachePolicy::new("/bulk/", ["ledger"]);
        assert_eq!(policy.batch_prefix(), "/bulk");
        assert!(policy.is_batch("/bulk/items"));
        assert!(policy.is_always_fresh("/accounts/ledger"));
        assert!(!policy.is_always_fresh("/accounts/credit-history"));
        assert!(!policy.caches_batch_item(false, "/accounts/ledger"));
        assert!(!policy.caches_batch_item(true, "/accounts"));
        assert!(policy.caches_batch_item(false, "/accounts"));
    }
}
