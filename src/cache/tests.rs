//! Tests for the response cache

use super::*;
use crate::types::JsonObject;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn params(pairs: &[(&str, serde_json::Value)]) -> JsonObject {
    let mut map = JsonObject::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

// ============================================================================
// Key Tests
// ============================================================================

#[test]
fn test_cache_key_format() {
    let key = cache_key(
        "https://ise/ers/config/sgt",
        &params(&[("size", json!(100))]),
    );
    assert_eq!(key, r#"https://ise/ers/config/sgt:{"size":100}"#);
}

#[test]
fn test_cache_key_empty_params() {
    let key = cache_key("https://ise/ers/config/sgt", &JsonObject::new());
    assert_eq!(key, "https://ise/ers/config/sgt:{}");
}

#[test]
fn test_cache_key_order_independent() {
    let a = params(&[
        ("size", json!(100)),
        ("filter", json!("name.EQ.core")),
        ("page", json!(2)),
    ]);
    let b = params(&[
        ("page", json!(2)),
        ("filter", json!("name.EQ.core")),
        ("size", json!(100)),
    ]);
    assert_eq!(cache_key("u", &a), cache_key("u", &b));
}

#[test]
fn test_cache_key_nested_order_independent() {
    let a = params(&[("opts", json!({"b": 1, "a": 2}))]);
    let b = params(&[("opts", json!({"a": 2, "b": 1}))]);
    assert_eq!(cache_key("u", &a), cache_key("u", &b));
}

#[test]
fn test_cache_key_distinguishes_values() {
    let a = params(&[("page", json!(1))]);
    let b = params(&[("page", json!(2))]);
    assert_ne!(cache_key("u", &a), cache_key("u", &b));
    assert_ne!(cache_key("u1", &a), cache_key("u2", &a));
}

#[test]
fn test_paginated_key_ignores_page() {
    let p1 = params(&[("size", json!(100)), ("page", json!(1))]);
    let p3 = params(&[("size", json!(100)), ("page", json!(3))]);

    let key = paginated_cache_key("u", &p1);
    assert_eq!(key, paginated_cache_key("u", &p3));
    assert!(key.starts_with(PAGINATED_PREFIX));
    assert_eq!(key, r#"paginated:u:{"size":100}"#);
    assert_ne!(key, cache_key("u", &p1));
}

// ============================================================================
// Store Tests
// ============================================================================

#[test]
fn test_cache_config_defaults() {
    let config = CacheConfig::default();
    assert!(config.enabled);
    assert_eq!(config.ttl, Duration::from_secs(300));
    assert_eq!(config.partial_ttl, Duration::from_secs(30));
    assert_eq!(config.max_entries, 10_000);
}

#[tokio::test]
async fn test_set_then_get() {
    let cache = ResponseCache::default();
    assert!(cache.get("k").await.is_none());

    cache.set("k", r#"{"a":1}"#, Duration::from_secs(60)).await;
    assert_eq!(cache.get("k").await.as_deref(), Some(r#"{"a":1}"#));
}

#[tokio::test]
async fn test_entry_expires_after_ttl() {
    let cache = ResponseCache::default();
    cache.set("k", "v", Duration::from_millis(100)).await;
    assert!(cache.get("k").await.is_some());

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(cache.get("k").await.is_none());
}

#[tokio::test]
async fn test_replace_resets_ttl() {
    let cache = ResponseCache::default();
    cache.set("k", "old", Duration::from_millis(100)).await;
    cache.set("k", "new", Duration::from_secs(60)).await;

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(cache.get("k").await.as_deref(), Some("new"));
}

#[tokio::test]
async fn test_get_json_roundtrips_document() {
    let cache = ResponseCache::default();
    let doc = json!({"SearchResult": {"total": 1, "resources": [{"id": "a"}]}});
    cache
        .set_json("device", "k", &doc, Duration::from_secs(60))
        .await;

    assert_eq!(cache.get_json("k").await, Some(doc));
}

#[tokio::test]
async fn test_get_json_drops_corrupt_entry() {
    let cache = ResponseCache::default();
    cache.set("k", "{not json", Duration::from_secs(60)).await;

    assert!(cache.get_json("k").await.is_none());
    assert!(cache.get("k").await.is_none());
}

#[tokio::test]
async fn test_clear_all() {
    let cache = ResponseCache::default();
    cache.set("a", "1", Duration::from_secs(60)).await;
    cache.set_in("device", "b", "2", Duration::from_secs(60)).await;

    assert_eq!(cache.clear(None).await, 2);
    assert!(cache.get("a").await.is_none());
    assert!(cache.get("b").await.is_none());
}

#[tokio::test]
async fn test_clear_namespace_only() {
    let cache = ResponseCache::default();
    cache.set_in("device", "d1", "1", Duration::from_secs(60)).await;
    cache.set_in("device", "d2", "2", Duration::from_secs(60)).await;
    cache.set_in("auth", "a1", "3", Duration::from_secs(60)).await;
    cache.set("plain", "4", Duration::from_secs(60)).await;

    assert_eq!(cache.clear(Some("device")).await, 2);
    assert!(cache.get("d1").await.is_none());
    assert!(cache.get("d2").await.is_none());
    assert!(cache.get("a1").await.is_some());
    assert!(cache.get("plain").await.is_some());
}

#[tokio::test]
async fn test_info_samples_at_most_100_keys() {
    let cache = ResponseCache::new(&CacheConfig::new().ttl(Duration::from_secs(120)));
    for i in 0..150 {
        cache.set(format!("key-{i}"), "x", Duration::from_secs(60)).await;
    }

    let info = cache.info().await;
    assert_eq!(info.cache_type, "memory");
    assert_eq!(info.cache_size, 150);
    assert_eq!(info.cache_keys.len(), MAX_SAMPLED_KEYS);
    assert_eq!(info.cache_ttl, 120);
    assert!(info.cache_enabled);
}

#[tokio::test]
async fn test_ttl_and_enabled_are_live() {
    let cache = ResponseCache::new(&CacheConfig::new().disabled());
    assert!(!cache.is_enabled());

    cache.set_enabled(true);
    cache.set_ttl(Duration::from_secs(10));
    assert!(cache.is_enabled());
    assert_eq!(cache.ttl(), Duration::from_secs(10));
    assert_eq!(cache.info().await.cache_ttl, 10);
}

#[test]
fn test_partial_ttl_never_exceeds_ttl() {
    let cache = ResponseCache::new(
        &CacheConfig::new()
            .ttl(Duration::from_secs(20))
            .partial_ttl(Duration::from_secs(30)),
    );
    assert_eq!(cache.partial_ttl(), Duration::from_secs(20));

    cache.set_ttl(Duration::from_secs(300));
    assert_eq!(cache.partial_ttl(), Duration::from_secs(30));
}

#[tokio::test]
async fn test_concurrent_access_on_distinct_keys() {
    let cache = Arc::new(ResponseCache::default());
    let mut handles = Vec::new();

    for i in 0..32 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            let key = format!("key-{i}");
            let body = format!("{{\"n\":{i}}}");
            cache.set(key.clone(), body.clone(), Duration::from_secs(60)).await;
            assert_eq!(cache.get(&key).await, Some(body));
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn test_concurrent_writes_same_key_never_torn() {
    let cache = Arc::new(ResponseCache::default());
    let bodies: Vec<String> = (0..16).map(|i| "x".repeat(1000 + i)).collect();

    let mut handles = Vec::new();
    for body in bodies.clone() {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            cache.set("shared", body, Duration::from_secs(60)).await;
            cache.get("shared").await
        }));
    }

    for handle in handles {
        let seen = handle.await.unwrap().unwrap();
        assert!(bodies.contains(&seen));
    }
}
