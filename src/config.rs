//! Runtime configuration.
//!
//! Every value has a default, can be overridden from the environment with
//! [`ProxyConfig::from_env`], and again per field with the `with_*` methods
//! (the binary maps its CLI flags onto those).

use crate::{Error, ErrorContext, Result};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

pub const ENV_BASE_URL: &str = "OMNIPANEL_API_BASE_URL";
pub const ENV_API_KEY: &str = "OMNIPANEL_API_KEY";
pub const ENV_CACHE_TTL_SECS: &str = "OMNIPANEL_CACHE_TTL_SECS";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "OMNIPANEL_HTTP_TIMEOUT_SECS";
pub const ENV_BIND_ADDR: &str = "OMNIPANEL_BIND_ADDR";
pub const ENV_CACHE_SWEEP_SECS: &str = "OMNIPANEL_CACHE_SWEEP_SECS";
pub const ENV_ALWAYS_FRESH: &str = "OMNIPANEL_ALWAYS_FRESH";
pub const ENV_UPSTREAM_PROXY: &str = "OMNIPANEL_UPSTREAM_PROXY";

pub const DEFAULT_BATCH_PREFIX: &str = "/admin/batch";
/// Endpoint fragments whose data is never served from cache.
pub const DEFAULT_ALWAYS_FRESH: &[&str] = &["credit-history", "transactions"];

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Upstream API base, prepended to relative endpoints.
    pub base_url: String,
    /// Credential sent as the `key` query parameter when a request carries none.
    pub api_key: Option<String>,
    pub default_ttl: Duration,
    /// Per upstream call, covers connect through body read.
    pub request_timeout: Duration,
    pub bind_addr: SocketAddr,
    /// Zero disables the background sweep; expiry is then purely lazy.
    pub sweep_interval: Duration,
    pub batch_prefix: String,
    pub always_fresh: Vec<String>,
    pub upstream_proxy: Option<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_key: None,
            default_ttl: crate::cache::DEFAULT_TTL,
            request_timeout: Duration::from_secs(30),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            sweep_interval: Duration::from_secs(60),
            batch_prefix: DEFAULT_BATCH_PREFIX.to_string(),
            always_fresh: DEFAULT_ALWAYS_FRESH.iter().map(|s| s.to_string()).collect(),
            upstream_proxy: None,
        }
    }
}

impl ProxyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with whatever `OMNIPANEL_*` variables are set.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(v) = non_empty_var(ENV_BASE_URL) {
            cfg.base_url = v;
        }
        cfg.api_key = non_empty_var(ENV_API_KEY);
        if let Some(secs) = parse_var::<u64>(ENV_CACHE_TTL_SECS)? {
            cfg.default_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(ENV_HTTP_TIMEOUT_SECS)? {
            cfg.request_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(addr) = parse_var::<SocketAddr>(ENV_BIND_ADDR)? {
            cfg.bind_addr = addr;
        }
        if let Some(secs) = parse_var::<u64>(ENV_CACHE_SWEEP_SECS)? {
            cfg.sweep_interval = Duration::from_secs(secs);
        }
        if let Some(list) = non_empty_var(ENV_ALWAYS_FRESH) {
            cfg.always_fresh = split_list(&list);
        }
        cfg.upstream_proxy = non_empty_var(ENV_UPSTREAM_PROXY);

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn with_sweep_interval(mut self, every: Duration) -> Self {
        self.sweep_interval = every;
        self
    }

    pub fn with_batch_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.batch_prefix = prefix.into();
        self
    }

    pub fn with_always_fresh<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.always_fresh = markers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_upstream_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.upstream_proxy = Some(proxy.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        let base = self.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(Error::configuration_with_context(
                "upstream base URL must be absolute",
                ErrorContext::new()
                    .with_field_path("base_url")
                    .with_details(format!("got '{}'", self.base_url)),
            ));
        }
        if !self.batch_prefix.starts_with('/') {
            return Err(Error::configuration_with_context(
                "batch prefix must start with '/'",
                ErrorContext::new().with_field_path("batch_prefix"),
            ));
        }
        Ok(())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty_var(name) {
        None => Ok(None),
        Some(raw) => raw.parse::<T>().map(Some).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid value for {}", name),
                ErrorContext::new()
                    .with_field_path(name)
                    .with_details(format!("'{}': {}", raw, e)),
            )
        }),
    }
}

pub(crate) fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = ProxyConfig::default();
        assert_eq!(cfg.default_ttl, Duration::from_secs(300));
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
        assert_eq!(cfg.batch_prefix, "/admin/batch");
        assert!(cfg.always_fresh.iter().any(|m| m == "credit-history"));
        assert!(cfg.api_key.is_none());
        cfg.validate().unwrap();
    }

    #[test]
    fn test_builder_overrides() {
        let cfg = ProxyConfig::new()
            .with_base_url("https://api.example.com/v1")
            .with_api_key("k")
            .with_default_ttl(Duration::from_secs(10))
            .with_always_fresh(["history"]);
        assert_eq!(cfg.base_url, "https://api.example.com/v1");
        assert_eq!(cfg.api_key.as_deref(), Some("k"));
        assert_eq!(cfg.always_fresh, vec!["history".to_string()]);
    }

    #[test]
    fn test_relative_base_url_rejected() {
        let err = ProxyConfig::new()
            .with_base_url("api.example.com")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list(" credit-history, ,transactions "),
            vec!["credit-history".to_string(), "transactions".to_string()]
        );
    }
}
