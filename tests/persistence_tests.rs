//! Integration Tests for Persistent Mode
//!
//! Restarts a cache over the same directory and checks what survives.

use nscache::{CacheConfig, CacheManager, CacheType, SetOptions};
use serde_json::json;
use tempfile::TempDir;

fn persistent_config(dir: &TempDir) -> CacheConfig {
    CacheConfig {
        cache_type: CacheType::Persistent,
        persistent_path: dir.path().to_path_buf(),
        ..CacheConfig::default()
    }
}

#[tokio::test]
async fn test_restart_restores_items_and_metadata() {
    let dir = TempDir::new().unwrap();

    let cache = CacheManager::new(persistent_config(&dir));
    cache.initialize().await.unwrap();
    let mut metadata = serde_json::Map::new();
    metadata.insert("source".to_string(), json!("db"));
    cache
        .set_with(
            "user/1",
            json!({"name": "a"}),
            SetOptions::new().namespace("users").metadata(metadata),
        )
        .await;
    cache.set("plain", json!(42)).await;
    cache.shutdown().await;

    let restarted = CacheManager::new(persistent_config(&dir));
    restarted.initialize().await.unwrap();

    assert_eq!(
        restarted.get("user/1", "users").await,
        Some(json!({"name": "a"}))
    );
    assert_eq!(restarted.get("plain", "default").await, Some(json!(42)));
    restarted.shutdown().await;
}

#[tokio::test]
async fn test_restart_drops_deleted_and_expired_items() {
    let dir = TempDir::new().unwrap();

    let cache = CacheManager::new(persistent_config(&dir));
    cache.initialize().await.unwrap();
    cache.set("gone", json!(1)).await;
    cache.set("kept", json!(2)).await;
    cache
        .set_with("short", json!(3), SetOptions::new().ttl_seconds(1))
        .await;
    assert!(cache.delete("gone", "default").await);
    cache.shutdown().await;

    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

    let restarted = CacheManager::new(persistent_config(&dir));
    restarted.initialize().await.unwrap();

    assert!(!restarted.has("gone", "default").await);
    assert!(!restarted.has("short", "default").await);
    assert!(restarted.has("kept", "default").await);
    restarted.shutdown().await;
}

#[tokio::test]
async fn test_clear_removes_namespace_from_disk() {
    let dir = TempDir::new().unwrap();

    let cache = CacheManager::new(persistent_config(&dir));
    cache.initialize().await.unwrap();
    cache
        .set_with("a", json!(1), SetOptions::new().namespace("tmp"))
        .await;
    assert!(cache.clear("tmp").await);
    cache.shutdown().await;

    let restarted = CacheManager::new(persistent_config(&dir));
    restarted.initialize().await.unwrap();
    assert!(!restarted.has("a", "tmp").await);
    restarted.shutdown().await;
}
