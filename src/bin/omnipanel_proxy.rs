//! omnipanel-proxy: caching request proxy for the OmniPanel admin API
//!
//! Usage:
//!   omnipanel-proxy [--bind <addr>] [--base-url <url>] [--cache-ttl-secs <n>] ...
//!
//! Every flag can also be given through its `OMNIPANEL_*` environment variable.

use anyhow::Context;
use clap::Parser;
use omnipanel_proxy::config::ProxyConfig;
use omnipanel_proxy::{server, ProxyService};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "omnipanel-proxy", version, about)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "OMNIPANEL_BIND_ADDR")]
    bind: Option<SocketAddr>,

    /// Upstream API base URL
    #[arg(long, env = "OMNIPANEL_API_BASE_URL")]
    base_url: Option<String>,

    /// Default API key, sent as the `key` query parameter
    #[arg(long, env = "OMNIPANEL_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Default cache lifetime in seconds
    #[arg(long, env = "OMNIPANEL_CACHE_TTL_SECS")]
    cache_ttl_secs: Option<u64>,

    /// Upstream request timeout in seconds
    #[arg(long, env = "OMNIPANEL_HTTP_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Interval of the expired-entry sweep in seconds (0 disables)
    #[arg(long, env = "OMNIPANEL_CACHE_SWEEP_SECS")]
    sweep_secs: Option<u64>,

    /// Comma-separated endpoint fragments that are never cached
    #[arg(long, env = "OMNIPANEL_ALWAYS_FRESH", value_delimiter = ',')]
    always_fresh: Option<Vec<String>>,

    /// Run as a plain forwarder
    #[arg(long)]
    no_cache: bool,
}

impl Cli {
    fn into_config(self) -> omnipanel_proxy::Result<ProxyConfig> {
        let mut cfg = ProxyConfig::from_env()?;
        if let Some(addr) = self.bind {
            cfg = cfg.with_bind_addr(addr);
        }
        if let Some(url) = self.base_url {
            cfg = cfg.with_base_url(url);
        }
        if let Some(key) = self.api_key {
            cfg = cfg.with_api_key(key);
        }
        if let Some(secs) = self.cache_ttl_secs {
            cfg = cfg.with_default_ttl(Duration::from_secs(secs));
        }
        if let Some(secs) = self.timeout_secs {
            cfg = cfg.with_request_timeout(Duration::from_secs(secs.max(1)));
        }
        if let Some(secs) = self.sweep_secs {
            cfg = cfg.with_sweep_interval(Duration::from_secs(secs));
        }
        if let Some(markers) = self.always_fresh {
            cfg = cfg.with_always_fresh(markers.into_iter().map(|m| m.trim().to_string()));
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let no_cache = cli.no_cache;
    let config = cli.into_config().context("invalid configuration")?;

    let mut builder = ProxyService::builder().config(config.clone());
    if no_cache {
        builder = builder.disable_cache();
    }
    let proxy = Arc::new(builder.build().context("failed to build proxy")?);

    info!(
        upstream = %config.base_url,
        default_ttl_secs = config.default_ttl.as_secs(),
        cache = proxy.cache().config().enabled,
        "starting omnipanel-proxy"
    );

    let sweeper = (!config.sweep_interval.is_zero() && !no_cache)
        .then(|| proxy.cache().spawn_sweeper(config.sweep_interval));

    server::serve(Arc::clone(&proxy), config.bind_addr, shutdown_signal())
        .await
        .context("server error")?;

    if let Some(handle) = sweeper {
        handle.abort();
    }
    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
