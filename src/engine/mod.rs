//! Fetch engine module
//!
//! The facade callers use to read from the backend.
//!
//! # Overview
//!
//! The engine module provides:
//! - `FetchEngine` - Owns the cache, limiter, retry controller and paginator
//! - `FetchEngineBuilder` - Wires the engine from config, catalog and transport
//! - `FetchOptions` / `FetchRequest` - Per-call options and reserved-key parsing
//! - Administrative reports for the cache and the rate limiter
//!
//! Engines hold no global state; several may coexist in one process.

mod types;

pub use types::{
    CacheSettingsReport, CacheUpdate, FetchOptions, FetchRequest, RateLimitReport,
    AUTO_PAGINATE_KEY, FILTER_KEY, USE_CACHE_KEY,
};

use crate::cache::{cache_key, CacheInfo, ResponseCache};
use crate::catalog::{EndpointCatalog, EndpointCategory, EndpointEntry};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::http::{
    BackoffSettings, BasicAuth, HttpTransport, RateLimitUpdate, RateLimiter, RetryController,
    Transport,
};
use crate::pagination::{PageSource, Paginator};
use crate::types::{JsonObject, JsonValue};
use async_trait::async_trait;
use futures::Stream;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Single-page fetch with cache read-through
struct PageFetcher {
    base_url: String,
    catalog: Arc<EndpointCatalog>,
    cache: Arc<ResponseCache>,
    retry: RetryController,
}

#[async_trait]
impl PageSource for PageFetcher {
    fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    fn category_for(&self, endpoint: &str) -> EndpointCategory {
        self.catalog.category_for(endpoint)
    }

    async fn fetch_page(
        &self,
        endpoint: &str,
        params: &JsonObject,
        use_cache: bool,
    ) -> Result<JsonValue> {
        let url = self.url_for(endpoint);

        if use_cache {
            let key = cache_key(&url, params);
            if let Some(cached) = self.cache.get_json(&key).await {
                info!("Cache hit for: {url}");
                return Ok(cached);
            }
        }

        let category = self.category_for(endpoint);
        debug!("Fetching {url} (category: {category})");
        self.retry.request(category, &url, params, use_cache).await
    }
}

/// Read-only client for the backend's REST API
///
/// Applies rate limiting, 429 backoff, response caching and page merging.
pub struct FetchEngine {
    fetcher: PageFetcher,
    paginator: Paginator,
    limiter: Arc<RateLimiter>,
    cache: Arc<ResponseCache>,
}

impl FetchEngine {
    /// Create an engine with the reqwest transport and no credentials
    pub fn new(config: EngineConfig, catalog: EndpointCatalog) -> Result<Self> {
        Self::builder(config).catalog(catalog).build()
    }

    /// Start building an engine
    pub fn builder(config: EngineConfig) -> FetchEngineBuilder {
        FetchEngineBuilder::new(config)
    }

    /// Fetch `endpoint`
    ///
    /// With `auto_paginate` every page is fetched and merged; otherwise
    /// exactly the requested page is returned. A cache hit never consumes
    /// a rate-limit token.
    pub async fn get(
        &self,
        endpoint: &str,
        params: &JsonObject,
        options: FetchOptions,
    ) -> Result<JsonValue> {
        let use_cache = options.use_cache.unwrap_or_else(|| self.cache.is_enabled());

        if options.auto_paginate {
            self.paginator
                .fetch_all(&self.fetcher, endpoint, params, use_cache)
                .await
        } else {
            self.fetcher.fetch_page(endpoint, params, use_cache).await
        }
    }

    /// Caller-facing fetch with an optional filter and free-form query
    ///
    /// Reserved keys in `query` (`auto_paginate`, `use_cache`) steer the
    /// engine; everything else, including `size` and `page`, is forwarded.
    pub async fn fetch(
        &self,
        path: &str,
        filter: Option<&str>,
        query: Option<JsonObject>,
    ) -> Result<JsonValue> {
        let request = self.caller_request(path, filter, query)?;
        self.get(path, &request.params, request.options).await
    }

    /// Caller-facing page stream
    ///
    /// Takes the same filter and query as [`fetch`](Self::fetch) but yields
    /// every page as it arrives; `auto_paginate` has no effect here.
    pub fn fetch_stream<'a>(
        &'a self,
        path: &'a str,
        filter: Option<&str>,
        query: Option<JsonObject>,
    ) -> Result<impl Stream<Item = Result<JsonValue>> + Send + 'a> {
        let request = self.caller_request(path, filter, query)?;
        Ok(self.stream_pages(path, &request.params, request.options.use_cache))
    }

    fn caller_request(
        &self,
        path: &str,
        filter: Option<&str>,
        query: Option<JsonObject>,
    ) -> Result<FetchRequest> {
        if filter.is_some() && !self.fetcher.catalog.supports_filter(path) {
            return Err(Error::FilterNotSupported {
                endpoint: path.to_string(),
            });
        }
        Ok(FetchRequest::from_query(filter, query))
    }

    /// [`get`](Self::get) with a deadline
    ///
    /// The in-flight request and any pending rate-limit wait are dropped
    /// when the deadline passes.
    pub async fn get_with_timeout(
        &self,
        endpoint: &str,
        params: &JsonObject,
        options: FetchOptions,
        timeout: Duration,
    ) -> Result<JsonValue> {
        tokio::time::timeout(timeout, self.get(endpoint, params, options))
            .await
            .map_err(|_| Error::Timeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })?
    }

    /// Yield each page of `endpoint` in order
    pub fn stream_pages<'a>(
        &'a self,
        endpoint: &'a str,
        params: &JsonObject,
        use_cache: Option<bool>,
    ) -> impl Stream<Item = Result<JsonValue>> + Send + 'a {
        let use_cache = use_cache.unwrap_or_else(|| self.cache.is_enabled());
        self.paginator
            .stream_pages(&self.fetcher, endpoint, params, use_cache)
    }

    // ------------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------------

    /// The endpoint catalog
    pub fn catalog(&self) -> &EndpointCatalog {
        &self.fetcher.catalog
    }

    /// Known endpoints
    pub fn endpoints(&self) -> &[EndpointEntry] {
        self.fetcher.catalog.entries()
    }

    /// Rate-limit category of `endpoint`
    pub fn category_for(&self, endpoint: &str) -> EndpointCategory {
        self.fetcher.category_for(endpoint)
    }

    /// Full URL of `endpoint`
    pub fn url_for(&self, endpoint: &str) -> String {
        self.fetcher.url_for(endpoint)
    }

    // ------------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------------

    /// Drop cached responses, optionally only one category's
    pub async fn clear_cache(&self, namespace: Option<&str>) -> u64 {
        self.cache.clear(namespace).await
    }

    /// Cache size, sampled keys and settings
    pub async fn cache_info(&self) -> CacheInfo {
        self.cache.info().await
    }

    /// Change the default cache use or TTL
    ///
    /// A new TTL applies to entries written afterwards.
    pub fn configure_cache(&self, update: &CacheUpdate) -> Result<CacheSettingsReport> {
        if let Some(ttl) = update.ttl_secs {
            if ttl == 0 {
                return Err(Error::invalid_value("ttl", "must be greater than zero"));
            }
            self.cache.set_ttl(Duration::from_secs(ttl));
        }
        if let Some(enabled) = update.enabled {
            self.cache.set_enabled(enabled);
        }
        info!(
            "Cache configured (enabled: {}, ttl: {}s)",
            self.cache.is_enabled(),
            self.cache.ttl().as_secs()
        );
        Ok(CacheSettingsReport {
            cache_enabled: self.cache.is_enabled(),
            cache_ttl: self.cache.ttl().as_secs(),
        })
    }

    /// Limiter and backoff settings
    pub fn rate_limit_info(&self) -> RateLimitReport {
        RateLimitReport {
            limits: self.limiter.info(),
            backoff_settings: BackoffSettings::from(self.fetcher.retry.config()),
        }
    }

    /// Turn rate limiting on or off, or change rates
    pub fn configure_rate_limiting(&self, update: &RateLimitUpdate) -> Result<RateLimitReport> {
        self.limiter.reconfigure(update)?;
        Ok(self.rate_limit_info())
    }

    /// The shared response cache
    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// The shared rate limiter
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }
}

impl std::fmt::Debug for FetchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchEngine")
            .field("base_url", &self.fetcher.base_url)
            .field("cache", &self.cache)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

/// Builder for [`FetchEngine`]
pub struct FetchEngineBuilder {
    config: EngineConfig,
    catalog: Option<EndpointCatalog>,
    transport: Option<Arc<dyn Transport>>,
    credentials: Option<BasicAuth>,
}

impl FetchEngineBuilder {
    /// Start from a configuration
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            catalog: None,
            transport: None,
            credentials: None,
        }
    }

    /// Use this catalog instead of one built from the configured patterns
    #[must_use]
    pub fn catalog(mut self, catalog: EndpointCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Use a custom transport; credentials are then ignored
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// HTTP basic credentials for the reqwest transport
    #[must_use]
    pub fn credentials(mut self, credentials: BasicAuth) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Validate the configuration and wire the engine
    pub fn build(self) -> Result<FetchEngine> {
        let config = self.config;
        config.validate()?;

        let catalog = match self.catalog {
            Some(catalog) => catalog,
            None => EndpointCatalog::new(config.endpoint_categories.clone(), Vec::new())?,
        };

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => {
                let mut transport_config = config.transport_config();
                if let Some(credentials) = self.credentials {
                    transport_config = transport_config.basic_auth(credentials);
                }
                Arc::new(HttpTransport::new(transport_config)?)
            }
        };

        let cache = Arc::new(ResponseCache::new(&config.cache_config()));
        let limiter = Arc::new(RateLimiter::new(&config.rate_limiter_config()));
        let retry = RetryController::new(
            transport,
            Arc::clone(&limiter),
            Arc::clone(&cache),
            config.headers.clone(),
            config.retry_config(),
        );

        let fetcher = PageFetcher {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            catalog: Arc::new(catalog),
            cache: Arc::clone(&cache),
            retry,
        };
        let paginator = Paginator::new(Arc::clone(&cache), config.pagination_config());

        info!(
            "Fetch engine ready for {} (rate limiting: {}, cache ttl: {}s)",
            fetcher.base_url,
            if limiter.is_enabled() { "on" } else { "off" },
            cache.ttl().as_secs()
        );

        Ok(FetchEngine {
            fetcher,
            paginator,
            limiter,
            cache,
        })
    }
}

#[cfg(test)]
mod tests;
