//! Engine types
//!
//! Per-call options, the parsed caller request and administrative reports.

use crate::http::{BackoffSettings, RateLimitInfo};
use crate::types::{as_bool, JsonObject, JsonValue};
use serde::Serialize;
use tracing::warn;

/// Query keys that steer the engine instead of going to the backend
pub const AUTO_PAGINATE_KEY: &str = "auto_paginate";
/// See [`AUTO_PAGINATE_KEY`]
pub const USE_CACHE_KEY: &str = "use_cache";
/// Backend parameter carrying a filter expression
pub const FILTER_KEY: &str = "filter";

/// Options for one [`get`](super::FetchEngine::get) call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Walk every page and merge the results
    pub auto_paginate: bool,
    /// Use the cache; `None` follows the engine's current setting
    pub use_cache: Option<bool>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            auto_paginate: true,
            use_cache: None,
        }
    }
}

impl FetchOptions {
    /// Auto-paginating, cache per engine setting
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch exactly the requested page
    pub fn single_page() -> Self {
        Self {
            auto_paginate: false,
            use_cache: None,
        }
    }

    /// Set auto-pagination
    #[must_use]
    pub fn auto_paginate(mut self, auto_paginate: bool) -> Self {
        self.auto_paginate = auto_paginate;
        self
    }

    /// Force cache use on or off for this call
    #[must_use]
    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = Some(use_cache);
        self
    }
}

/// A caller request split into backend parameters and engine options
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    /// Parameters forwarded to the backend, including `size` and `page`
    pub params: JsonObject,
    /// Options taken from the reserved keys
    pub options: FetchOptions,
}

impl FetchRequest {
    /// Separate reserved keys from `query` and attach `filter`
    ///
    /// `auto_paginate` and `use_cache` are removed from the parameters;
    /// unreadable values are ignored. `size` and `page` stay in place.
    pub fn from_query(filter: Option<&str>, query: Option<JsonObject>) -> Self {
        let mut params = JsonObject::new();
        if let Some(filter) = filter {
            params.insert(FILTER_KEY.into(), JsonValue::String(filter.to_string()));
        }

        let mut options = FetchOptions::default();
        if let Some(mut query) = query {
            if let Some(value) = query.remove(AUTO_PAGINATE_KEY) {
                match as_bool(&value) {
                    Some(flag) => options.auto_paginate = flag,
                    None => warn!("Ignoring unreadable {AUTO_PAGINATE_KEY}: {value}"),
                }
            }
            if let Some(value) = query.remove(USE_CACHE_KEY) {
                match as_bool(&value) {
                    Some(flag) => options.use_cache = Some(flag),
                    None => warn!("Ignoring unreadable {USE_CACHE_KEY}: {value}"),
                }
            }
            params.extend(query);
        }

        Self { params, options }
    }
}

/// Requested cache changes; `None` keeps the current value
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheUpdate {
    /// Use the cache by default
    pub enabled: Option<bool>,
    /// New default TTL in seconds
    pub ttl_secs: Option<u64>,
}

/// Cache settings after an update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheSettingsReport {
    /// Whether callers use the cache by default
    pub cache_enabled: bool,
    /// Default TTL in seconds
    pub cache_ttl: u64,
}

/// Limiter settings plus backoff settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimitReport {
    /// Current rates and enabled flag
    #[serde(flatten)]
    pub limits: RateLimitInfo,
    /// Backoff applied to 429 responses
    pub backoff_settings: BackoffSettings,
}
