//! Mock upstream setup for integration tests

#![allow(dead_code)]

use mockito::{Matcher, Mock, Server, ServerGuard};
use omnipanel_proxy::{ProxyConfig, ProxyService};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const TEST_API_KEY: &str = "test-key";

/// Test fixture that manages a mock upstream API
pub struct MockUpstream {
    pub server: Arc<Mutex<ServerGuard>>,
    pub base_url: String,
}

impl MockUpstream {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self {
            server: Arc::new(Mutex::new(server)),
            base_url,
        }
    }

    /// Proxy pointed at the mock server with the default configuration
    pub fn proxy(&self) -> ProxyService {
        self.proxy_with(ProxyConfig::new())
    }

    pub fn proxy_with(&self, config: ProxyConfig) -> ProxyService {
        ProxyService::builder()
            .config(config)
            .base_url_override(&self.base_url)
            .api_key(TEST_API_KEY)
            .build()
            .expect("failed to build proxy")
    }

    /// Mock a JSON GET that must be called exactly `hits` times
    pub async fn mock_get(&self, path: &str, status: usize, body: &str, hits: usize) -> Mock {
        self.mock_json("GET", path, status, body, hits).await
    }

    pub async fn mock_json(
        &self,
        method: &str,
        path: &str,
        status: usize,
        body: &str,
        hits: usize,
    ) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock(method, path)
            .match_query(Matcher::UrlEncoded("key".into(), TEST_API_KEY.into()))
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }
}
