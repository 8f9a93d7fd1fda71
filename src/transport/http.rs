use crate::config::ProxyConfig;
use crate::types::{ProxyEnvelope, ProxyRequest};
use crate::{Error, ErrorContext, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Proxy;
use serde_json::Value;
use std::env;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Forwards [`ProxyRequest`]s to the upstream API.
///
/// Does not retry and does not touch the cache.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    default_api_key: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &ProxyConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(
                env::var("OMNIPANEL_HTTP_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(32),
            )
            .pool_idle_timeout(Some(Duration::from_secs(
                env::var("OMNIPANEL_HTTP_POOL_IDLE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(90),
            )));

        if let Some(proxy_url) = &config.upstream_proxy {
            let proxy = Proxy::all(proxy_url).map_err(|e| {
                Error::configuration_with_context(
                    "invalid upstream proxy",
                    ErrorContext::new()
                        .with_field_path("upstream_proxy")
                        .with_details(e.to_string()),
                )
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_api_key: config.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Target URL: absolute endpoints verbatim, relative ones under the base
    /// URL, then `key=<credential>` and the request's query parameters.
    pub fn build_url(&self, request: &ProxyRequest) -> Result<Url> {
        let endpoint = request.endpoint.trim();
        let raw = if has_scheme(endpoint) {
            endpoint.to_string()
        } else if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        };

        let mut url = Url::parse(&raw).map_err(|e| {
            Error::validation_with_context(
                "endpoint does not form a valid URL",
                ErrorContext::new()
                    .with_field_path("endpoint")
                    .with_details(format!("'{}': {}", raw, e)),
            )
        })?;

        let api_key = request
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .or(self.default_api_key.as_deref());
        {
            let mut pairs = url.query_pairs_mut();
            match api_key {
                Some(key) => {
                    pairs.append_pair("key", key);
                }
                None => warn!(endpoint, "no API key configured; forwarding without credential"),
            }
            if let Some(params) = &request.query_params {
                for (k, v) in params {
                    pairs.append_pair(k, v);
                }
            }
        }
        // `query_pairs_mut` leaves an empty `?` behind when nothing was appended.
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }

    fn build_headers(&self, request: &ProxyRequest, request_id: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(id) = request_id {
            if let Ok(v) = HeaderValue::from_str(id) {
                headers.insert(REQUEST_ID_HEADER, v);
            }
        }
        for (name, value) in &request.headers {
            let invalid = |details: String| {
                Error::validation_with_context(
                    "invalid header",
                    ErrorContext::new()
                        .with_field_path(format!("headers.{}", name))
                        .with_details(details),
                )
            };
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
            let value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    /// Execute one upstream call.
    ///
    /// Any upstream status is returned as an envelope; only transport-level
    /// failures (connect, timeout, body read) are errors.
    pub async fn forward(
        &self,
        request: &ProxyRequest,
        request_id: Option<&str>,
    ) -> Result<ProxyEnvelope> {
        let method = request.http_method()?;
        let url = self.build_url(request)?;
        let headers = self.build_headers(request, request_id)?;

        info!(method = %method, url = %redact_key(&url), "proxying request");

        let mut req = self
            .client
            .request(reqwest::Method::from(method), url)
            .headers(headers);
        if let Some(body) = request.body.as_ref().filter(|b| !b.is_null()) {
            req = req.body(serde_json::to_vec(body)?);
        }

        let response = req.send().await.map_err(|e| {
            warn!(
                method = %method,
                endpoint = %request.endpoint,
                error = %e,
                "upstream request failed"
            );
            Error::Transport(TransportError::Http(e))
        })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;
        let data = serde_json::from_slice::<Value>(&bytes).unwrap_or(Value::Null);

        Ok(ProxyEnvelope::new(
            status.as_u16(),
            status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| status.as_str().to_string()),
            data,
        ))
    }
}

fn has_scheme(endpoint: &str) -> bool {
    let lower = endpoint.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// URL rendering safe for logs.
pub fn redact_key(url: &Url) -> String {
    if !url.query_pairs().any(|(k, _)| k == "key") {
        return url.to_string();
    }
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "key" { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}
