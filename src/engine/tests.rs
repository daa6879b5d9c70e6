//! Tests for engine module

use super::*;
use crate::catalog::{default_category_patterns, EndpointEntry};
use crate::http::testing::ScriptedTransport;
use crate::http::Outcome;
use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use test_case::test_case;

const BASE: &str = "https://ise.test:9060";

fn config() -> EngineConfig {
    let mut config = EngineConfig::new(BASE);
    config.rate_limit.enabled = false;
    config
}

fn catalog() -> EndpointCatalog {
    EndpointCatalog::new(
        default_category_patterns(),
        vec![
            EndpointEntry::new("Network Devices", "/ers/config/networkdevice")
                .with_filterable_fields(vec!["name".into(), "ipaddress".into()]),
            EndpointEntry::new("Deployment Nodes", "/api/v1/deployment/node"),
        ],
    )
    .unwrap()
}

fn engine(outcomes: Vec<Outcome>) -> (FetchEngine, Arc<ScriptedTransport>) {
    let transport = Arc::new(ScriptedTransport::new(outcomes));
    let engine = FetchEngine::builder(config())
        .catalog(catalog())
        .transport(transport.clone())
        .build()
        .unwrap();
    (engine, transport)
}

fn page(total: u64, ids: std::ops::Range<u64>) -> Outcome {
    let resources: Vec<JsonValue> = ids.map(|i| json!({"id": i})).collect();
    Outcome::Success(json!({"SearchResult": {"total": total, "resources": resources}}))
}

fn params(pairs: &[(&str, JsonValue)]) -> JsonObject {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

// ============================================================================
// FetchOptions / FetchRequest Tests
// ============================================================================

#[test]
fn test_fetch_options_default() {
    let options = FetchOptions::default();
    assert!(options.auto_paginate);
    assert_eq!(options.use_cache, None);

    let single = FetchOptions::single_page().use_cache(false);
    assert!(!single.auto_paginate);
    assert_eq!(single.use_cache, Some(false));
}

#[test]
fn test_fetch_request_extracts_reserved_keys() {
    let query = params(&[
        ("size", json!(50)),
        ("page", json!(2)),
        ("auto_paginate", json!(false)),
        ("use_cache", json!(false)),
        ("sortasc", json!("name")),
    ]);

    let request = FetchRequest::from_query(Some("name.CONTAINS.core"), Some(query));

    assert_eq!(
        request.options,
        FetchOptions {
            auto_paginate: false,
            use_cache: Some(false)
        }
    );
    assert_eq!(
        request.params,
        params(&[
            ("filter", json!("name.CONTAINS.core")),
            ("page", json!(2)),
            ("size", json!(50)),
            ("sortasc", json!("name")),
        ])
    );
}

#[test_case(json!(true), Some(true) ; "bool")]
#[test_case(json!("False"), Some(false) ; "string")]
#[test_case(json!(3), None ; "unreadable ignored")]
fn test_fetch_request_use_cache_values(value: JsonValue, expected: Option<bool>) {
    let request = FetchRequest::from_query(None, Some(params(&[("use_cache", value)])));
    assert_eq!(request.options.use_cache, expected);
    assert!(request.params.is_empty());
}

#[test]
fn test_fetch_request_empty() {
    let request = FetchRequest::from_query(None, None);
    assert!(request.params.is_empty());
    assert_eq!(request.options, FetchOptions::default());
}

// ============================================================================
// Builder Tests
// ============================================================================

#[test]
fn test_builder_rejects_invalid_config() {
    let err = FetchEngine::builder(EngineConfig::default())
        .build()
        .unwrap_err();
    assert!(err.is_config());
}

#[test]
fn test_builder_uses_configured_patterns_without_catalog() {
    let mut config = config();
    config.endpoint_categories = vec![crate::catalog::CategoryPattern::new(
        "/custom",
        EndpointCategory::Auth,
    )];
    let engine = FetchEngine::builder(config).build().unwrap();

    assert_eq!(engine.category_for("/custom/thing"), EndpointCategory::Auth);
    assert_eq!(
        engine.category_for("/ers/config/networkdevice"),
        EndpointCategory::Default
    );
    assert!(engine.endpoints().is_empty());
}

#[test_case("/ers/config/sgt", "https://ise.test:9060/ers/config/sgt")]
#[test_case("ers/config/sgt", "https://ise.test:9060/ers/config/sgt")]
fn test_url_for(endpoint: &str, expected: &str) {
    let mut config = config();
    config.base_url = format!("{BASE}/");
    let engine = FetchEngine::builder(config).build().unwrap();
    assert_eq!(engine.url_for(endpoint), expected);
}

// ============================================================================
// get Tests
// ============================================================================

#[tokio::test]
async fn test_get_single_page_uses_cache() {
    let (engine, transport) = engine(vec![Outcome::Success(json!({"items": [1]}))]);

    let first = engine
        .get(
            "/api/v1/deployment/node",
            &JsonObject::new(),
            FetchOptions::single_page(),
        )
        .await
        .unwrap();
    let second = engine
        .get(
            "/api/v1/deployment/node",
            &JsonObject::new(),
            FetchOptions::single_page(),
        )
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(transport.call_count(), 1);
    assert_eq!(transport.calls()[0].url, format!("{BASE}/api/v1/deployment/node"));
}

#[tokio::test]
async fn test_get_bypasses_cache_when_asked() {
    let (engine, transport) = engine(vec![
        Outcome::Success(json!({"n": 1})),
        Outcome::Success(json!({"n": 2})),
    ]);
    let options = FetchOptions::single_page().use_cache(false);

    engine
        .get("/api/v1/deployment/node", &JsonObject::new(), options)
        .await
        .unwrap();
    let second = engine
        .get("/api/v1/deployment/node", &JsonObject::new(), options)
        .await
        .unwrap();

    assert_eq!(second, json!({"n": 2}));
    assert_eq!(transport.call_count(), 2);
    assert_eq!(engine.cache_info().await.cache_size, 0);
}

#[tokio::test]
async fn test_get_follows_engine_cache_setting() {
    let (engine, transport) = engine(vec![
        Outcome::Success(json!({"n": 1})),
        Outcome::Success(json!({"n": 2})),
    ]);
    engine
        .configure_cache(&CacheUpdate {
            enabled: Some(false),
            ttl_secs: None,
        })
        .unwrap();

    for _ in 0..2 {
        engine
            .get(
                "/api/v1/deployment/node",
                &JsonObject::new(),
                FetchOptions::single_page(),
            )
            .await
            .unwrap();
    }

    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn test_get_auto_paginates() {
    let (engine, transport) = engine(vec![
        page(250, 0..100),
        page(250, 100..200),
        page(250, 200..250),
    ]);

    let merged = engine
        .get(
            "/ers/config/networkdevice",
            &JsonObject::new(),
            FetchOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(
        merged["SearchResult"]["resources"].as_array().unwrap().len(),
        250
    );
    let pages: Vec<_> = transport
        .calls()
        .iter()
        .map(|c| c.param("page").unwrap().to_string())
        .collect();
    assert_eq!(pages, vec!["1", "2", "3"]);
    assert!(transport.calls().iter().all(|c| c.param("size") == Some("100")));

    // Merged result plus three pages, all in the device namespace
    assert_eq!(engine.clear_cache(Some("device")).await, 4);
}

#[tokio::test]
async fn test_get_error_propagates() {
    let (engine, _) = engine(vec![Outcome::HttpError {
        status: 401,
        body: "Unauthorized".into(),
    }]);

    let err = engine
        .get("/ers/config/sgt", &JsonObject::new(), FetchOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 401, .. }));
}

// ============================================================================
// fetch Tests
// ============================================================================

#[tokio::test]
async fn test_fetch_sends_filter() {
    let (engine, transport) = engine(vec![page(1, 0..1)]);

    engine
        .fetch(
            "/ers/config/networkdevice",
            Some("name.EQ.core-sw1"),
            None,
        )
        .await
        .unwrap();

    let call = &transport.calls()[0];
    assert_eq!(call.param("filter"), Some("name.EQ.core-sw1"));
    assert_eq!(call.param("auto_paginate"), None);
}

#[tokio::test]
async fn test_fetch_rejects_filter_on_unfilterable_endpoint() {
    let (engine, transport) = engine(vec![]);

    let err = engine
        .fetch("/api/v1/deployment/node", Some("name.EQ.x"), None)
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::FilterNotSupported { ref endpoint } if endpoint == "/api/v1/deployment/node")
    );
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_fetch_allows_filter_on_unlisted_endpoint() {
    let (engine, transport) = engine(vec![Outcome::Success(json!({}))]);

    engine
        .fetch("/ers/config/sgt", Some("name.EQ.x"), None)
        .await
        .unwrap();
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn test_fetch_single_page_forwards_size_and_page() {
    let (engine, transport) = engine(vec![page(500, 200..250)]);
    let query = params(&[
        ("size", json!(50)),
        ("page", json!(5)),
        ("auto_paginate", json!(false)),
    ]);

    let doc = engine
        .fetch("/ers/config/networkdevice", None, Some(query))
        .await
        .unwrap();

    assert_eq!(doc["SearchResult"]["resources"][0]["id"], 200);
    let call = &transport.calls()[0];
    assert_eq!(call.param("size"), Some("50"));
    assert_eq!(call.param("page"), Some("5"));
    assert_eq!(transport.call_count(), 1);
}

// ============================================================================
// Timeout / Streaming Tests
// ============================================================================

#[tokio::test]
async fn test_get_with_timeout_expires() {
    let mut config = config();
    config.rate_limit.enabled = true;
    config.rate_limit.global_rate_limit = 1;
    let engine = FetchEngine::builder(config)
        .transport(Arc::new(ScriptedTransport::new(vec![
            Outcome::Success(json!({"n": 1})),
            Outcome::Success(json!({"n": 2})),
        ])))
        .build()
        .unwrap();
    let options = FetchOptions::single_page().use_cache(false);

    // First call takes the only token; the second waits about a second
    engine
        .get("/ers/config/sgt", &JsonObject::new(), options)
        .await
        .unwrap();
    let err = engine
        .get_with_timeout(
            "/ers/config/sgt",
            &JsonObject::new(),
            options,
            Duration::from_millis(100),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout { timeout_ms: 100 }));
}

#[tokio::test]
async fn test_cache_hits_take_no_rate_limit_token() {
    let mut config = config();
    config.rate_limit.enabled = true;
    config.rate_limit.global_rate_limit = 1;
    let transport = Arc::new(ScriptedTransport::new(vec![Outcome::Success(
        json!({"ERSResponse": {"id": "abc"}}),
    )]));
    let engine = FetchEngine::builder(config)
        .transport(transport.clone())
        .build()
        .unwrap();
    let options = FetchOptions::single_page().use_cache(true);

    // Only the first call reaches the limiter; at 1/s any second token
    // would cost a full second
    let start = std::time::Instant::now();
    for _ in 0..5 {
        let doc = engine
            .get("/ers/config/sgt/abc", &JsonObject::new(), options)
            .await
            .unwrap();
        assert_eq!(doc["ERSResponse"]["id"], "abc");
    }

    assert!(start.elapsed() < Duration::from_millis(500));
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn test_stream_pages() {
    let (engine, _) = engine(vec![page(150, 0..100), page(150, 100..150)]);
    let params = JsonObject::new();

    let pages: Vec<_> = engine
        .stream_pages("/ers/config/networkdevice", &params, Some(false))
        .collect()
        .await;

    assert_eq!(pages.len(), 2);
    assert_eq!(
        pages[1].as_ref().unwrap()["SearchResult"]["resources"][0]["id"],
        100
    );
}

#[tokio::test]
async fn test_fetch_stream_forwards_filter_and_size() {
    let (engine, transport) = engine(vec![page(3, 0..2), page(3, 2..3)]);
    let query = params(&[("size", json!(2)), ("use_cache", json!("false"))]);

    let pages: Vec<_> = engine
        .fetch_stream(
            "/ers/config/networkdevice",
            Some("name.STARTSWITH.core"),
            Some(query),
        )
        .unwrap()
        .collect()
        .await;

    assert_eq!(pages.len(), 2);
    let calls = transport.calls();
    assert_eq!(calls[0].param("filter"), Some("name.STARTSWITH.core"));
    assert_eq!(calls[0].param("size"), Some("2"));
    assert_eq!(calls[1].param("page"), Some("2"));
    assert_eq!(calls[0].param("use_cache"), None);
    assert_eq!(engine.cache_info().await.cache_size, 0);
}

#[tokio::test]
async fn test_fetch_stream_rejects_filter_on_unfilterable_endpoint() {
    let (engine, transport) = engine(vec![]);

    let Err(err) = engine.fetch_stream("/api/v1/deployment/node", Some("name.EQ.x"), None) else {
        panic!("filter should be rejected");
    };

    assert!(matches!(err, Error::FilterNotSupported { .. }));
    assert_eq!(transport.call_count(), 0);
}

// ============================================================================
// Administration Tests
// ============================================================================

#[tokio::test]
async fn test_configure_cache() {
    let (engine, _) = engine(vec![]);

    let report = engine
        .configure_cache(&CacheUpdate {
            enabled: None,
            ttl_secs: Some(60),
        })
        .unwrap();
    assert_eq!(
        report,
        CacheSettingsReport {
            cache_enabled: true,
            cache_ttl: 60
        }
    );
    assert_eq!(engine.cache_info().await.cache_ttl, 60);

    assert!(engine
        .configure_cache(&CacheUpdate {
            enabled: None,
            ttl_secs: Some(0)
        })
        .is_err());
}

#[test]
fn test_rate_limit_report() {
    let (engine, _) = engine(vec![]);
    let report = engine.rate_limit_info();

    assert!(!report.limits.rate_limit_enabled);
    assert_eq!(report.limits.global_rate_limit, 30);
    assert_eq!(report.backoff_settings.max_retries, 3);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["global_rate_limit"], 30);
    assert_eq!(json["category_limits"]["device"], 15);
    assert_eq!(json["backoff_settings"]["min_backoff_time"], 0.5);
}

#[test]
fn test_configure_rate_limiting() {
    let (engine, _) = engine(vec![]);

    let report = engine
        .configure_rate_limiting(&RateLimitUpdate {
            enabled: Some(true),
            global_rate_limit: Some(60),
            category_limits: [(EndpointCategory::Policy, 2)].into(),
        })
        .unwrap();

    assert!(report.limits.rate_limit_enabled);
    assert_eq!(report.limits.global_rate_limit, 60);
    assert_eq!(report.limits.category_limits[&EndpointCategory::Policy], 2);
    assert!(engine.limiter().is_enabled());

    assert!(engine
        .configure_rate_limiting(&RateLimitUpdate {
            global_rate_limit: Some(0),
            ..Default::default()
        })
        .is_err());
}
