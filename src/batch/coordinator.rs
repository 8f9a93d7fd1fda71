//! Resolves a batch of item ids against one item endpoint.

use super::executor::BatchExecutor;
use crate::cache::{CacheKey, CacheManager};
use crate::policy::CachePolicy;
use crate::transport::HttpTransport;
use crate::types::{BatchRequest, HttpMethod, ProxyEnvelope, ProxyRequest};
use crate::{Error, ErrorContext, Result};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Collapses N per-item GETs into one call: cached items are served from the
/// store, only the misses go upstream, all of them at once.
#[derive(Clone)]
pub struct BatchCoordinator {
    cache: Arc<CacheManager>,
    transport: Arc<HttpTransport>,
    policy: Arc<CachePolicy>,
    executor: BatchExecutor,
}

struct PendingItem {
    id: String,
    request: ProxyRequest,
    key: Option<CacheKey>,
}

impl BatchCoordinator {
    pub fn new(
        cache: Arc<CacheManager>,
        transport: Arc<HttpTransport>,
        policy: Arc<CachePolicy>,
    ) -> Self {
        Self {
            cache,
            transport,
            policy,
            executor: BatchExecutor::new(),
        }
    }

    /// Per-item request derived from the batch request: same credential,
    /// headers and query parameters, GET on `{item_endpoint}/{id}`.
    pub fn item_request(batch: &ProxyRequest, item_endpoint: &str, id: &str) -> ProxyRequest {
        ProxyRequest {
            endpoint: format!("{}/{}", item_endpoint, id),
            method: Some(HttpMethod::Get.as_str().to_string()),
            headers: batch.headers.clone(),
            body: None,
            query_params: batch.query_params.clone(),
            api_key: batch.api_key.clone(),
            cache_ttl_ms: batch.cache_ttl_ms,
            skip_cache: batch.skip_cache,
        }
    }

    pub async fn resolve(
        &self,
        request: &ProxyRequest,
        request_id: Option<&str>,
    ) -> Result<ProxyEnvelope> {
        let item_endpoint = self
            .policy
            .batch_item_endpoint(&request.endpoint)
            .ok_or_else(|| {
                Error::validation_with_context(
                    "batch path names no item endpoint",
                    ErrorContext::new()
                        .with_field_path("endpoint")
                        .with_details(format!(
                            "expected {}/<resource>, got '{}'",
                            self.policy.batch_prefix(),
                            request.endpoint
                        ))
                        .with_source("batch_coordinator"),
                )
            })?;
        let batch = BatchRequest::from_body(request.body.as_ref())?;
        let use_cache = self
            .policy
            .caches_batch_item(request.skip_cache, item_endpoint);
        let ttl = request.cache_ttl().unwrap_or_else(|| self.cache.default_ttl());

        let mut results = Map::new();
        let mut pending = Vec::new();
        for id in &batch.ids {
            let item = Self::item_request(request, item_endpoint, id);
            if !use_cache {
                pending.push(PendingItem {
                    id: id.clone(),
                    request: item,
                    key: None,
                });
                continue;
            }
            let key = self.cache.keys().generate_for(&item)?;
            match self.cache.get(&key).await? {
                Some(value) => {
                    results.insert(id.clone(), value);
                }
                None => pending.push(PendingItem {
                    id: id.clone(),
                    request: item,
                    key: Some(key),
                }),
            }
        }

        if !batch.is_empty() && pending.is_empty() {
            debug!(item_endpoint, items = batch.len(), "batch fully served from cache");
            return Ok(ProxyEnvelope::cached(Value::Object(results)));
        }

        let cached = results.len();
        let transport = self.transport.as_ref();
        let cache = self.cache.as_ref();
        let outcome = self
            .executor
            .execute_parallel(pending, move |item: PendingItem| async move {
                let envelope = transport.forward(&item.request, request_id).await?;
                if !envelope.is_success() {
                    return Err(Error::runtime_with_context(
                        format!("upstream returned {} for item '{}'", envelope.status, item.id),
                        ErrorContext::new()
                            .with_field_path(item.request.endpoint.clone())
                            .with_source("batch_coordinator"),
                    ));
                }
                if let Some(key) = &item.key {
                    if let Err(e) = cache.set_with_ttl(key, envelope.data.clone(), ttl).await {
                        warn!(%key, error = %e, "failed to cache batch item");
                    }
                }
                Ok((item.id, envelope.data))
            })
            .await;

        for (_, error) in &outcome.failures {
            debug!(item_endpoint, error = %error, "batch item dropped");
        }
        debug!(
            item_endpoint,
            cached,
            fetched = outcome.success_count(),
            failed = outcome.failure_count(),
            elapsed_ms = outcome.execution_time.as_millis() as u64,
            "batch resolved"
        );
        for (_, (id, data)) in outcome.successes {
            results.insert(id, data);
        }

        Ok(ProxyEnvelope::ok(Value::Object(results)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn test_item_request_inherits_batch_settings() {
        let mut params = BTreeMap::new();
        params.insert("fields".to_string(), "credits".to_string());
        let batch = ProxyRequest {
            endpoint: "/admin/batch/users".into(),
            method: Some("POST".into()),
            body: Some(json!({"ids": ["a"]})),
            query_params: Some(params.clone()),
            api_key: Some("k".into()),
            cache_ttl_ms: Some(1000),
            ..Default::default()
        }
        .with_header("x-admin", "1");

        let item = BatchCoordinator::item_request(&batch, "/users", "a@x.io");
        assert_eq!(item.endpoint, "/users/a@x.io");
        assert_eq!(item.http_method().unwrap(), HttpMethod::Get);
        assert!(item.body.is_none());
        assert_eq!(item.query_params, Some(params));
        assert_eq!(item.api_key.as_deref(), Some("k"));
        assert_eq!(item.cache_ttl_ms, Some(1000));
        assert_eq!(item.headers.get("x-admin").map(String::as_str), Some("1"));
    }
}
