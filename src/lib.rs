//! # omnipanel-proxy
//!
//! 管理后台的请求代理：为上游 REST API 附加凭证、转发请求，并缓存 GET 响应。
//!
//! Caching request proxy for the OmniPanel admin API.
//!
//! ## Overview
//!
//! The dashboard never talks to the upstream API directly. It posts a
//! description of the call (`endpoint`, `method`, `data`, `queryParams`, ...)
//! to the proxy, which attaches the API key, forwards the request and wraps
//! the answer in a uniform `{status, statusText, data}` envelope.
//!
//! GET responses are kept in a process-local TTL cache keyed by
//! `METHOD:endpoint:body:params`, so repeated reads within the TTL cost no
//! upstream call. A batch path (`/admin/batch/<resource>` with `{ids}`)
//! resolves many items at once, fetching only the ids missing from cache.
//!
//! ## Request flow
//!
//! 1. [`policy::CachePolicy`] decides whether the call may use the cache.
//! 2. Eligible GETs are answered from [`cache::CacheManager`] when fresh.
//! 3. Otherwise [`transport::HttpTransport`] (or [`batch::BatchCoordinator`]
//!    for batch paths) performs the call.
//! 4. Successful GET responses populate the cache.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use omnipanel_proxy::{ProxyConfig, ProxyRequest, ProxyService};
//!
//! #[tokio::main]
//! async fn main() -> omnipanel_proxy::Result<()> {
//!     let proxy = ProxyService::builder()
//!         .config(ProxyConfig::from_env()?)
//!         .build()?;
//!
//!     let users = proxy.handle(&ProxyRequest::get("/admin/users")).await?;
//!     println!("{} {}", users.status, users.data);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | TTL store, key derivation, statistics, invalidation |
//! | [`policy`] | Per-request cache participation |
//! | [`transport`] | Upstream HTTP forwarding |
//! | [`batch`] | Batch item resolution |
//! | [`proxy`] | [`ProxyService`] and its builder |
//! | [`server`] | axum routes |
//! | [`types`] | Request, envelope and batch payload types |
//! | [`config`] | Environment-backed configuration |

pub mod batch;
pub mod cache;
pub mod config;
pub mod policy;
pub mod proxy;
pub mod server;
pub mod transport;
pub mod types;

pub use config::ProxyConfig;
pub use proxy::{ProxyService, ProxyServiceBuilder};
pub use types::{BatchRequest, HttpMethod, ProxyEnvelope, ProxyRequest};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
