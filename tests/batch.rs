//! Batch resolution against a mock upstream.

mod common;

use common::MockUpstream;
use omnipanel_proxy::cache::CacheKey;
use omnipanel_proxy::{HttpMethod, ProxyRequest, ProxyService};
use serde_json::{json, Value};

fn batch(ids: &[&str]) -> ProxyRequest {
    ProxyRequest::new(HttpMethod::Post, "/admin/batch/users").with_body(json!({ "ids": ids }))
}

async fn seed(proxy: &ProxyService, id: &str, value: Value) {
    let key = CacheKey::from(format!("GET:/users/{}:{{}}:{{}}", id));
    proxy.cache().set(&key, value).await.unwrap();
}

#[tokio::test]
async fn test_only_misses_are_fetched() {
    let upstream = MockUpstream::new().await;
    let a = upstream.mock_get("/users/a", 200, r#"{"id":"a"}"#, 0).await;
    let c = upstream.mock_get("/users/c", 200, r#"{"id":"c","fresh":true}"#, 1).await;
    let proxy = upstream.proxy();
    seed(&proxy, "a", json!({"id": "a"})).await;
    seed(&proxy, "b", json!({"id": "b"})).await;

    let envelope = proxy.handle(&batch(&["a", "b", "c"])).await.unwrap();

    assert_eq!(envelope.status, 200);
    assert_eq!(envelope.status_text, "OK");
    assert_eq!(
        envelope.data,
        json!({
            "a": {"id": "a"},
            "b": {"id": "b"},
            "c": {"id": "c", "fresh": true},
        })
    );
    a.assert_async().await;
    c.assert_async().await;

    // the fetched item is now cached too
    let again = proxy.handle(&batch(&["a", "b", "c"])).await.unwrap();
    assert_eq!(again.status_text, "OK (Cached)");
    c.assert_async().await;
}

#[tokio::test]
async fn test_fully_cached_batch_makes_no_calls() {
    let upstream = MockUpstream::new().await;
    let any = upstream.mock_get("/users/a", 200, "{}", 0).await;
    let proxy = upstream.proxy();
    seed(&proxy, "a", json!(1)).await;
    seed(&proxy, "b", json!(2)).await;

    let envelope = proxy.handle(&batch(&["a", "b"])).await.unwrap();

    assert_eq!(envelope.status_text, "OK (Cached)");
    assert_eq!(envelope.data, json!({"a": 1, "b": 2}));
    any.assert_async().await;
}

#[tokio::test]
async fn test_failed_item_is_absent() {
    let upstream = MockUpstream::new().await;
    let ok = upstream.mock_get("/users/a", 200, r#"{"id":"a"}"#, 1).await;
    let missing = upstream
        .mock_get("/users/gone", 404, r#"{"message":"no such user"}"#, 1)
        .await;
    let broken = upstream.mock_get("/users/bad", 500, "oops", 1).await;
    let proxy = upstream.proxy();

    let envelope = proxy.handle(&batch(&["a", "gone", "bad"])).await.unwrap();

    assert_eq!(envelope.status, 200);
    assert_eq!(envelope.status_text, "OK");
    assert_eq!(envelope.data, json!({"a": {"id": "a"}}));
    ok.assert_async().await;
    missing.assert_async().await;
    broken.assert_async().await;

    assert!(proxy
        .cache()
        .get(&CacheKey::from("GET:/users/gone:{}:{}"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_skip_cache_fetches_every_id() {
    let upstream = MockUpstream::new().await;
    let a = upstream.mock_get("/users/a", 200, r#""fresh-a""#, 1).await;
    let b = upstream.mock_get("/users/b", 200, r#""fresh-b""#, 1).await;
    let proxy = upstream.proxy();
    seed(&proxy, "a", json!("stale-a")).await;

    let request = batch(&["a", "b"]).skip_cache(true);
    let envelope = proxy.handle(&request).await.unwrap();

    assert_eq!(envelope.status_text, "OK");
    assert_eq!(envelope.data, json!({"a": "fresh-a", "b": "fresh-b"}));
    a.assert_async().await;
    b.assert_async().await;
    // nothing written back
    assert_eq!(proxy.cache().len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_duplicate_ids_collapse_in_result() {
    let upstream = MockUpstream::new().await;
    let a = upstream.mock_get("/users/a", 200, "7", 2).await;
    let proxy = upstream.proxy();

    let envelope = proxy.handle(&batch(&["a", "a"])).await.unwrap();

    assert_eq!(envelope.data, json!({"a": 7}));
    a.assert_async().await;
}

#[tokio::test]
async fn test_empty_ids_returns_empty_map() {
    let upstream = MockUpstream::new().await;
    let proxy = upstream.proxy();

    let envelope = proxy.handle(&batch(&[])).await.unwrap();

    assert_eq!(envelope.status, 200);
    assert_eq!(envelope.status_text, "OK");
    assert_eq!(envelope.data, json!({}));
}

#[tokio::test]
async fn test_missing_ids_is_validation_error() {
    let upstream = MockUpstream::new().await;
    let proxy = upstream.proxy();

    let request = ProxyRequest::new(HttpMethod::Post, "/admin/batch/users")
        .with_body(json!({"users": ["a"]}));
    let err = proxy.handle(&request).await.unwrap_err();
    assert_eq!(err.status_code(), 400);

    let err = proxy
        .handle(&ProxyRequest::new(HttpMethod::Post, "/admin/batch"))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn test_batch_items_share_cache_with_single_reads() {
    let upstream = MockUpstream::new().await;
    let a = upstream.mock_get("/users/a", 200, r#"{"id":"a"}"#, 1).await;
    let proxy = upstream.proxy();

    proxy.handle(&batch(&["a"])).await.unwrap();
    let single = proxy.handle(&ProxyRequest::get("/users/a")).await.unwrap();

    assert!(single.is_cached());
    assert_eq!(single.data, json!({"id": "a"}));
    a.assert_async().await;
}

#[tokio::test]
async fn test_ids_outside_the_item_path_are_rejected_before_any_call() {
    let upstream = MockUpstream::new().await;
    let a = upstream.mock_get("/users/a", 200, r#"{"id":"a"}"#, 0).await;
    let proxy = upstream.proxy();

    let err = proxy
        .handle(&batch(&["a?admin=1", "a#frag"]))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 400);
    a.assert_async().await;
    assert_eq!(proxy.cache().len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_unreachable_upstream_leaves_items_absent() {
    // nothing listens on the discard port
    let proxy = ProxyService::builder()
        .base_url_override("http://127.0.0.1:9")
        .api_key(common::TEST_API_KEY)
        .build()
        .unwrap();
    seed(&proxy, "a", json!({"id": "a"})).await;

    let envelope = proxy.handle(&batch(&["a", "b", "c"])).await.unwrap();

    assert_eq!(envelope.status, 200);
    assert_eq!(envelope.status_text, "OK");
    assert_eq!(envelope.data, json!({"a": {"id": "a"}}));
    assert_eq!(proxy.cache().len().await.unwrap(), 1);
}
