//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use nscache::{api::create_router, AppState, CacheConfig};
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app() -> Router {
    create_router(AppState::new(CacheConfig::default()))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn put_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// == SET Endpoint Tests ==

#[tokio::test]
async fn test_set_endpoint_success() {
    let app = create_test_app();

    let response = app
        .oneshot(put_json("/cache/api/user:1", r#"{"value":{"name":"a"}}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["key"], "user:1");
    assert_eq!(json["namespace"], "api");
    assert_eq!(json["value"], json!({"name": "a"}));
}

#[tokio::test]
async fn test_set_endpoint_rejects_bad_body() {
    let app = create_test_app();

    let response = app
        .oneshot(put_json("/cache/api/k", "not json"))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_set_endpoint_rejects_long_key() {
    let app = create_test_app();
    let uri = format!("/cache/api/{}", "k".repeat(300));

    let response = app
        .oneshot(put_json(&uri, r#"{"value":1}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().starts_with("Invalid request"));
}

// == GET Endpoint Tests ==

#[tokio::test]
async fn test_get_endpoint_success() {
    let app = create_test_app();

    let set_response = app
        .clone()
        .oneshot(put_json("/cache/api/get_key", r#"{"value":"get_value","ttl":60}"#))
        .await
        .unwrap();
    assert_eq!(set_response.status(), StatusCode::OK);

    let get_response = app
        .oneshot(request("GET", "/cache/api/get_key"))
        .await
        .unwrap();

    assert_eq!(get_response.status(), StatusCode::OK);
    let json = body_to_json(get_response.into_body()).await;
    assert_eq!(json["key"], "get_key");
    assert_eq!(json["value"], "get_value");
}

#[tokio::test]
async fn test_get_endpoint_not_found() {
    let app = create_test_app();

    let response = app
        .oneshot(request("GET", "/cache/default/nonexistent_key"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("nonexistent_key"));
}

#[tokio::test]
async fn test_namespaces_are_isolated() {
    let app = create_test_app();

    for (ns, value) in [("x", "1"), ("y", "2")] {
        let response = app
            .clone()
            .oneshot(put_json(&format!("/cache/{}/a", ns), &format!(r#"{{"value":{}}}"#, value)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let x = body_to_json(
        app.clone()
            .oneshot(request("GET", "/cache/x/a"))
            .await
            .unwrap()
            .into_body(),
    )
    .await;
    let y = body_to_json(
        app.oneshot(request("GET", "/cache/y/a"))
            .await
            .unwrap()
            .into_body(),
    )
    .await;

    assert_eq!(x["value"], 1);
    assert_eq!(y["value"], 2);
}

// == TTL Tests ==

#[tokio::test]
async fn test_ttl_expiration() {
    let app = create_test_app();

    let response = app
        .clone()
        .oneshot(put_json("/cache/api/short", r#"{"value":"v","ttl":1}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let exists = body_to_json(
        app.clone()
            .oneshot(request("GET", "/cache/api/short/exists"))
            .await
            .unwrap()
            .into_body(),
    )
    .await;
    assert_eq!(exists["exists"], true);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let response = app
        .oneshot(request("GET", "/cache/api/short"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ttl_update_endpoint() {
    let app = create_test_app();

    app.clone()
        .oneshot(put_json("/cache/api/k", r#"{"value":1,"ttl":1}"#))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(put_json("/cache/api/k/ttl", r#"{"ttl":null}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["updated"], true);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let response = app.oneshot(request("GET", "/cache/api/k")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// == DELETE Endpoint Tests ==

#[tokio::test]
async fn test_delete_endpoint() {
    let app = create_test_app();

    app.clone()
        .oneshot(put_json("/cache/default/delete_key", r#"{"value":"v"}"#))
        .await
        .unwrap();

    let del_response = app
        .clone()
        .oneshot(request("DELETE", "/cache/default/delete_key"))
        .await
        .unwrap();
    assert_eq!(del_response.status(), StatusCode::OK);
    assert_eq!(body_to_json(del_response.into_body()).await["deleted"], true);

    let again = app
        .clone()
        .oneshot(request("DELETE", "/cache/default/delete_key"))
        .await
        .unwrap();
    assert_eq!(body_to_json(again.into_body()).await["deleted"], false);

    let get_response = app
        .oneshot(request("GET", "/cache/default/delete_key"))
        .await
        .unwrap();
    assert_eq!(get_response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_clear_endpoint() {
    let app = create_test_app();

    for key in ["a", "b"] {
        app.clone()
            .oneshot(put_json(&format!("/cache/bulk/{}", key), r#"{"value":0}"#))
            .await
            .unwrap();
    }

    let response = app
        .clone()
        .oneshot(request("DELETE", "/cache/bulk"))
        .await
        .unwrap();
    assert_eq!(body_to_json(response.into_body()).await["cleared"], true);

    let stats = body_to_json(
        app.oneshot(request("GET", "/stats/bulk"))
            .await
            .unwrap()
            .into_body(),
    )
    .await;
    assert_eq!(stats["namespaces"]["bulk"]["items"], 0);
    assert_eq!(stats["namespaces"]["bulk"]["evictions"]["clear"], 2);
}

// == STATS / METRICS Endpoint Tests ==

#[tokio::test]
async fn test_stats_endpoint_tracks_hits_and_misses() {
    let app = create_test_app();

    app.clone()
        .oneshot(put_json("/cache/default/stats_key", r#"{"value":"v"}"#))
        .await
        .unwrap();
    app.clone()
        .oneshot(request("GET", "/cache/default/stats_key"))
        .await
        .unwrap();
    app.clone()
        .oneshot(request("GET", "/cache/default/missing"))
        .await
        .unwrap();

    let response = app.oneshot(request("GET", "/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["enabled"], true);
    assert_eq!(json["eviction_policy"], "lru");
    assert_eq!(json["cache_type"], "memory");
    let ns = &json["namespaces"]["default"];
    assert_eq!(ns["hits"], 1);
    assert_eq!(ns["misses"], 1);
    assert_eq!(ns["hit_rate"], 0.5);
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_counters() {
    let app = create_test_app();

    app.clone()
        .oneshot(put_json("/cache/api/k", r#"{"value":1}"#))
        .await
        .unwrap();
    app.clone()
        .oneshot(request("GET", "/cache/api/k"))
        .await
        .unwrap();

    let response = app.oneshot(request("GET", "/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let text = body_to_string(response.into_body()).await;
    assert!(text.contains("cache_hits_total{namespace=\"api\"} 1"));
    assert!(text.contains("cache_items{namespace=\"api\"} 1"));
}

// == HEALTH Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let response = app.oneshot(request("GET", "/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
}

// == Live Server Tests ==

#[tokio::test]
async fn test_live_server_round_trip() {
    let state = AppState::new(CacheConfig::default());
    let app = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let base = format!("http://{}", addr);

    let set = client
        .put(format!("{}/cache/live/greeting", base))
        .json(&json!({"value": "hello", "metadata": {"lang": "en"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(set.status(), reqwest::StatusCode::OK);

    let got: Value = client
        .get(format!("{}/cache/live/greeting", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(got["value"], "hello");

    server.abort();
    state.cache.shutdown().await;
}
