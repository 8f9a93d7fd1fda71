use crate::batch::BatchCoordinator;
use crate::cache::CacheManager;
use crate::policy::{CacheDecision, CachePolicy};
use crate::transport::HttpTransport;
use crate::types::{ProxyEnvelope, ProxyRequest};
use crate::Result;
use std::sync::Arc;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

/// Caching request proxy.
pub struct ProxyService {
    pub(crate) cache: Arc<CacheManager>,
    pub(crate) transport: Arc<HttpTransport>,
    pub(crate) policy: Arc<CachePolicy>,
    pub(crate) batch: BatchCoordinator,
}

impl ProxyService {
    pub fn builder() -> super::ProxyServiceBuilder {
        super::ProxyServiceBuilder::new()
    }

    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn transport(&self) -> &HttpTransport {
        &self.transport
    }

    /// Handle one inbound request under a fresh request id.
    pub async fn handle(&self, request: &ProxyRequest) -> Result<ProxyEnvelope> {
        let request_id = Uuid::new_v4().to_string();
        self.handle_with_id(request, &request_id).await
    }

    pub async fn handle_with_id(
        &self,
        request: &ProxyRequest,
        request_id: &str,
    ) -> Result<ProxyEnvelope> {
        let span = info_span!("proxy", request_id, endpoint = %request.endpoint);
        self.dispatch(request, request_id).instrument(span).await
    }

    async fn dispatch(&self, request: &ProxyRequest, request_id: &str) -> Result<ProxyEnvelope> {
        request.validate()?;
        let decision = self.policy.decide(request)?;
        debug!(?decision, "cache decision");

        match decision {
            CacheDecision::Batch => self.batch.resolve(request, Some(request_id)).await,
            CacheDecision::ReadThrough => self.read_through(request, request_id).await,
            CacheDecision::Bypass(_) | CacheDecision::PassThrough => {
                self.transport.forward(request, Some(request_id)).await
            }
        }
    }

    async fn read_through(
        &self,
        request: &ProxyRequest,
        request_id: &str,
    ) -> Result<ProxyEnvelope> {
        let key = self.cache.keys().generate_for(request)?;
        if let Some(data) = self.cache.get(&key).await? {
            return Ok(ProxyEnvelope::cached(data));
        }

        let envelope = self.transport.forward(request, Some(request_id)).await?;
        if envelope.is_success() {
            let ttl = request
                .cache_ttl()
                .unwrap_or_else(|| self.cache.default_ttl());
            if let Err(e) = self
                .cache
                .set_with_ttl(&key, envelope.data.clone(), ttl)
                .await
            {
                warn!(%key, error = %e, "failed to populate cache");
            }
        }
        Ok(envelope)
    }
}
