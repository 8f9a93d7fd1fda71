//! HTTP surface of the proxy.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /api/proxy` | Forward (or serve from cache) one [`ProxyRequest`] |
//! | `POST /api/cache/invalidate` | Drop cached variants of an endpoint prefix |
//! | `DELETE /api/cache` | Drop every cached entry |
//! | `GET /api/cache/stats` | Hit/miss counters and live entry count |
//! | `GET /health` | Liveness |

use crate::proxy::ProxyService;
use crate::types::{ErrorBody, ProxyRequest};
use crate::{Error, ErrorContext};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = crate::transport::http::REQUEST_ID_HEADER;

/// Error as it leaves the HTTP boundary: `{error}` with 400 or 500.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(Error::validation_with_context(
            "malformed request body",
            ErrorContext::new()
                .with_details(rejection.body_text())
                .with_source("server"),
        ))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self.0, "proxy error");
        }
        (status, Json(ErrorBody::new(self.0.to_string()))).into_response()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidateRequest {
    pub endpoint_prefix: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub backend: &'static str,
    pub entries: usize,
    #[serde(flatten)]
    pub stats: crate::cache::CacheStats,
    pub hit_ratio: f64,
}

pub fn router(proxy: Arc<ProxyService>) -> Router {
    Router::new()
        .route("/api/proxy", post(proxy_handler))
        .route("/api/cache/invalidate", post(invalidate_handler))
        .route("/api/cache", delete(clear_handler))
        .route("/api/cache/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(proxy)
}

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

async fn proxy_handler(
    State(proxy): State<Arc<ProxyService>>,
    headers: HeaderMap,
    payload: Result<Json<ProxyRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let id = request_id(&headers);
    let envelope = proxy.handle_with_id(&request, &id).await?;

    let mut response = Json(envelope).into_response();
    if let Ok(v) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, v);
    }
    Ok(response)
}

async fn invalidate_handler(
    State(proxy): State<Arc<ProxyService>>,
    payload: Result<Json<InvalidateRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(req) = payload?;
    if req.endpoint_prefix.trim().is_empty() {
        return Err(Error::validation_with_context(
            "endpointPrefix must not be empty",
            ErrorContext::new().with_field_path("endpointPrefix"),
        )
        .into());
    }
    let removed = proxy.cache().invalidate_endpoint(&req.endpoint_prefix).await?;
    info!(endpoint_prefix = %req.endpoint_prefix, removed, "cache invalidated");
    Ok(Json(json!({ "removed": removed })))
}

async fn clear_handler(State(proxy): State<Arc<ProxyService>>) -> Result<StatusCode, ApiError> {
    proxy.cache().clear().await?;
    info!("cache cleared");
    Ok(StatusCode::NO_CONTENT)
}

async fn stats_handler(
    State(proxy): State<Arc<ProxyService>>,
) -> Result<Json<StatsResponse>, ApiError> {
    let cache = proxy.cache();
    let stats = cache.stats();
    Ok(Json(StatsResponse {
        backend: cache.backend_name(),
        entries: cache.len().await?,
        hit_ratio: stats.hit_ratio(),
        stats,
    }))
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Serve until `shutdown` resolves, then drain in-flight requests.
pub async fn serve<F>(proxy: Arc<ProxyService>, addr: SocketAddr, shutdown: F) -> crate::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "proxy listening");
    axum::serve(listener, router(proxy))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
