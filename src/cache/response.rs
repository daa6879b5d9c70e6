//! In-memory response cache with per-entry expiry.
//!
//! Entries carry their own TTL through a moka [`Expiry`] policy, so a merged
//! result written with a short TTL and a page written with the default TTL
//! can live side by side. Expired entries are never returned by [`get`];
//! moka evicts them lazily and enforces the capacity bound.
//!
//! Every entry may carry a namespace. The fetch path uses the endpoint
//! category label, which lets [`clear`] drop one category's data while
//! leaving the rest warm.
//!
//! [`get`]: ResponseCache::get
//! [`clear`]: ResponseCache::clear

use crate::types::JsonValue;
use moka::future::Cache;
use moka::Expiry;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Upper bound on the number of keys reported by [`ResponseCache::info`]
pub const MAX_SAMPLED_KEYS: usize = 100;

/// Configuration for the response cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether callers use the cache by default
    pub enabled: bool,
    /// TTL for single pages and complete merged results. Default: 5 minutes.
    pub ttl: Duration,
    /// TTL for merged results that stopped early. Default: 30 seconds.
    pub partial_ttl: Duration,
    /// Maximum number of entries. Default: 10,000.
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(300),
            partial_ttl: Duration::from_secs(30),
            max_entries: 10_000,
        }
    }
}

impl CacheConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default TTL
    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the TTL for partial merges
    #[must_use]
    pub fn partial_ttl(mut self, ttl: Duration) -> Self {
        self.partial_ttl = ttl;
        self
    }

    /// Set the maximum number of entries
    #[must_use]
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Disable the cache by default
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Snapshot of the cache state, for observability only
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheInfo {
    /// Storage backend
    pub cache_type: &'static str,
    /// Number of live entries
    pub cache_size: u64,
    /// Up to [`MAX_SAMPLED_KEYS`] live keys
    pub cache_keys: Vec<String>,
    /// Default TTL in seconds
    pub cache_ttl: u64,
    /// Whether callers use the cache by default
    pub cache_enabled: bool,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    body: Arc<str>,
    namespace: Option<Arc<str>>,
    ttl: Duration,
}

struct EntryExpiry;

impl Expiry<String, CacheEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Shared response cache
///
/// Safe for concurrent use; an entry is always replaced as a whole.
pub struct ResponseCache {
    cache: Cache<String, CacheEntry>,
    ttl_ms: AtomicU64,
    partial_ttl_ms: AtomicU64,
    enabled: AtomicBool,
}

impl ResponseCache {
    /// Create a cache with the given configuration
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .expire_after(EntryExpiry)
            .build();

        Self {
            cache,
            ttl_ms: AtomicU64::new(duration_ms(config.ttl)),
            partial_ttl_ms: AtomicU64::new(duration_ms(config.partial_ttl)),
            enabled: AtomicBool::new(config.enabled),
        }
    }

    /// Look up a serialized body; `None` on miss or expiry
    pub async fn get(&self, key: &str) -> Option<String> {
        self.cache.get(key).await.map(|entry| entry.body.to_string())
    }

    /// Look up and decode a JSON body
    ///
    /// An entry that no longer decodes is dropped and reported as a miss.
    pub async fn get_json(&self, key: &str) -> Option<JsonValue> {
        let body = self.get(key).await?;
        match serde_json::from_str(&body) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Dropping undecodable cache entry {key}: {e}");
                self.cache.invalidate(key).await;
                None
            }
        }
    }

    /// Store a body with no namespace
    pub async fn set(&self, key: impl Into<String>, body: impl Into<String>, ttl: Duration) {
        self.insert(key.into(), body.into(), None, ttl).await;
    }

    /// Store a body under `namespace`
    pub async fn set_in(
        &self,
        namespace: &str,
        key: impl Into<String>,
        body: impl Into<String>,
        ttl: Duration,
    ) {
        self.insert(key.into(), body.into(), Some(Arc::from(namespace)), ttl)
            .await;
    }

    /// Serialize and store a JSON document under `namespace`
    pub async fn set_json(&self, namespace: &str, key: &str, value: &JsonValue, ttl: Duration) {
        match serde_json::to_string(value) {
            Ok(body) => self.set_in(namespace, key, body, ttl).await,
            Err(e) => warn!("Not caching {key}: {e}"),
        }
    }

    async fn insert(&self, key: String, body: String, namespace: Option<Arc<str>>, ttl: Duration) {
        debug!("Cached response (key: {key}, ttl: {ttl:?})");
        let entry = CacheEntry {
            body: Arc::from(body),
            namespace,
            ttl,
        };
        self.cache.insert(key, entry).await;
    }

    /// Remove entries, returning how many were dropped
    ///
    /// With a namespace only entries stored under it are removed.
    pub async fn clear(&self, namespace: Option<&str>) -> u64 {
        match namespace {
            None => {
                let count = self.cache.iter().count() as u64;
                info!("Clearing cache");
                self.cache.invalidate_all();
                self.cache.run_pending_tasks().await;
                count
            }
            Some(ns) => {
                info!("Clearing cache for namespace: {ns}");
                let keys: Vec<Arc<String>> = self
                    .cache
                    .iter()
                    .filter(|(_, entry)| entry.namespace.as_deref() == Some(ns))
                    .map(|(key, _)| key)
                    .collect();
                for key in &keys {
                    self.cache.invalidate(key.as_str()).await;
                }
                keys.len() as u64
            }
        }
    }

    /// Entry count, sampled keys, TTL and the enabled flag
    pub async fn info(&self) -> CacheInfo {
        self.cache.run_pending_tasks().await;
        let mut size = 0u64;
        let mut keys = Vec::new();
        for (key, _) in self.cache.iter() {
            size += 1;
            if keys.len() < MAX_SAMPLED_KEYS {
                keys.push(key.as_ref().clone());
            }
        }

        CacheInfo {
            cache_type: "memory",
            cache_size: size,
            cache_keys: keys,
            cache_ttl: self.ttl().as_secs(),
            cache_enabled: self.is_enabled(),
        }
    }

    /// Default TTL
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms.load(Ordering::Relaxed))
    }

    /// Change the default TTL; existing entries keep the TTL they were written with
    pub fn set_ttl(&self, ttl: Duration) {
        self.ttl_ms.store(duration_ms(ttl), Ordering::Relaxed);
    }

    /// TTL for partial merges, never longer than the default TTL
    pub fn partial_ttl(&self) -> Duration {
        let partial = Duration::from_millis(self.partial_ttl_ms.load(Ordering::Relaxed));
        partial.min(self.ttl())
    }

    /// Whether callers use the cache by default
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Turn default cache use on or off
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("ttl", &self.ttl())
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
