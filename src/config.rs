//! Engine configuration
//!
//! Settings are loaded from YAML, then selectively overridden from the
//! environment. Every section has defaults, so a file only needs `base_url`.

use crate::cache::CacheConfig;
use crate::catalog::{default_category_patterns, CategoryPattern, EndpointCategory};
use crate::error::{Error, Result};
use crate::http::{RateLimiterConfig, RetryConfig, TlsVerify, TransportConfig};
use crate::pagination::{PaginationConfig, MAX_PAGE_SIZE};
use crate::types::StringMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Backend base URL
pub const ENV_BASE_URL: &str = "ISE_BASE";
/// Global requests per second
pub const ENV_GLOBAL_RATE_LIMIT: &str = "ISE_GLOBAL_RATE_LIMIT";
/// `true` enables admission control; anything else disables it
pub const ENV_RATE_LIMIT_ENABLED: &str = "ISE_RATE_LIMIT_ENABLED";
/// Default cache TTL in seconds
pub const ENV_CACHE_TTL: &str = "ISE_CACHE_TTL";
/// `true`, `false` or a CA bundle path
pub const ENV_VERIFY_SSL: &str = "ISE_VERIFY_SSL";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Backend base URL, e.g. `https://ise.example.com`
    #[serde(default)]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// `true`, `false` or a CA bundle path
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: String,

    /// Headers sent with every request
    #[serde(default = "default_headers")]
    pub headers: StringMap,

    /// Response cache settings
    #[serde(default)]
    pub cache: CacheSettings,

    /// Rate limiting settings
    #[serde(default)]
    pub rate_limit: RateLimitSettings,

    /// Backoff settings for 429 responses
    #[serde(default)]
    pub retry: RetrySettings,

    /// Page size limits
    #[serde(default)]
    pub pagination: PaginationSettings,

    /// Ordered path patterns; first match wins
    #[serde(default = "default_category_patterns")]
    pub endpoint_categories: Vec<CategoryPattern>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: default_timeout(),
            verify_ssl: default_verify_ssl(),
            headers: default_headers(),
            cache: CacheSettings::default(),
            rate_limit: RateLimitSettings::default(),
            retry: RetrySettings::default(),
            pagination: PaginationSettings::default(),
            endpoint_categories: default_category_patterns(),
        }
    }
}

fn default_timeout() -> u64 {
    15
}

fn default_verify_ssl() -> String {
    "true".to_string()
}

fn default_headers() -> StringMap {
    StringMap::from([
        ("Accept".to_string(), "application/json".to_string()),
        ("Content-Type".to_string(), "application/json".to_string()),
    ])
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Sections
// ============================================================================

/// Response cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Use the cache unless a request says otherwise
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// TTL for pages and complete merged results
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,

    /// TTL for merged results that stopped early
    #[serde(default = "default_partial_ttl")]
    pub partial_ttl_secs: u64,

    /// Capacity bound
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_cache_ttl(),
            partial_ttl_secs: default_partial_ttl(),
            max_entries: default_max_entries(),
        }
    }
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_partial_ttl() -> u64 {
    30
}

fn default_max_entries() -> u64 {
    10_000
}

/// Rate limiting settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Apply admission control
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Requests per second across all categories
    #[serde(default = "default_global_rate")]
    pub global_rate_limit: u32,

    /// Tokens each bucket can hold
    ///
    /// Defaults to 1, spacing requests evenly. Set it to the rate to let a
    /// full second's worth through at once.
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Requests per second per category; `default` covers unlisted ones
    #[serde(default = "default_category_limits")]
    pub category_limits: HashMap<EndpointCategory, u32>,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            global_rate_limit: default_global_rate(),
            burst: default_burst(),
            category_limits: default_category_limits(),
        }
    }
}

fn default_global_rate() -> u32 {
    crate::http::DEFAULT_GLOBAL_RATE_LIMIT
}

fn default_burst() -> u32 {
    1
}

fn default_category_limits() -> HashMap<EndpointCategory, u32> {
    RateLimiterConfig::default().category_limits
}

/// Backoff settings for rate-limited responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First delay in milliseconds
    #[serde(default = "default_min_backoff")]
    pub min_backoff_ms: u64,

    /// Delay ceiling in milliseconds
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            min_backoff_ms: default_min_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_min_backoff() -> u64 {
    500
}

fn default_max_backoff() -> u64 {
    10_000
}

/// Page size limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationSettings {
    /// Used when a requested size is unreadable
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Used when no size is requested; also the clamp
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_page_size() -> u32 {
    crate::pagination::DEFAULT_PAGE_SIZE
}

fn default_max_page_size() -> u32 {
    MAX_PAGE_SIZE
}

// ============================================================================
// Loading
// ============================================================================

impl EngineConfig {
    /// Config with defaults for everything but the base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Parse YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&contents)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base) = lookup(ENV_BASE_URL) {
            self.base_url = base;
        }
        if let Some(rate) = lookup(ENV_GLOBAL_RATE_LIMIT) {
            self.rate_limit.global_rate_limit = rate.trim().parse().map_err(|_| {
                Error::invalid_value(ENV_GLOBAL_RATE_LIMIT, format!("not a number: '{rate}'"))
            })?;
        }
        if let Some(enabled) = lookup(ENV_RATE_LIMIT_ENABLED) {
            self.rate_limit.enabled = enabled.trim().eq_ignore_ascii_case("true");
        }
        if let Some(ttl) = lookup(ENV_CACHE_TTL) {
            self.cache.ttl_secs = ttl.trim().parse().map_err(|_| {
                Error::invalid_value(ENV_CACHE_TTL, format!("not a number: '{ttl}'"))
            })?;
        }
        if let Some(verify) = lookup(ENV_VERIFY_SSL) {
            self.verify_ssl = verify;
        }
        Ok(())
    }

    /// Reject settings that could never work
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::missing_field("base_url"));
        }
        let parsed = url::Url::parse(&self.base_url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::invalid_value(
                "base_url",
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(Error::invalid_value("timeout_secs", "must be greater than zero"));
        }
        if self.cache.ttl_secs == 0 {
            return Err(Error::invalid_value("cache.ttl_secs", "must be greater than zero"));
        }

        let max = self.pagination.max_page_size;
        if !(1..=MAX_PAGE_SIZE).contains(&max) {
            return Err(Error::invalid_value(
                "pagination.max_page_size",
                format!("must be between 1 and {MAX_PAGE_SIZE}, got {max}"),
            ));
        }
        if self.pagination.default_page_size == 0 || self.pagination.default_page_size > max {
            return Err(Error::invalid_value(
                "pagination.default_page_size",
                format!("must be between 1 and {max}"),
            ));
        }

        if self.retry.min_backoff_ms > self.retry.max_backoff_ms {
            return Err(Error::invalid_value(
                "retry.min_backoff_ms",
                "must not exceed retry.max_backoff_ms",
            ));
        }

        if let Some(pattern) = self.endpoint_categories.iter().find(|p| p.pattern.is_empty()) {
            return Err(Error::invalid_value(
                "endpoint_categories",
                format!("empty pattern for category '{}'", pattern.category),
            ));
        }

        if !self.rate_limit.enabled {
            warn!("Rate limiting is disabled");
        }
        self.rate_limiter_config().validate()
    }

    // ------------------------------------------------------------------------
    // Component configs
    // ------------------------------------------------------------------------

    /// Response cache configuration
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            enabled: self.cache.enabled,
            ttl: Duration::from_secs(self.cache.ttl_secs),
            partial_ttl: Duration::from_secs(self.cache.partial_ttl_secs),
            max_entries: self.cache.max_entries,
        }
    }

    /// Rate limiter configuration
    pub fn rate_limiter_config(&self) -> RateLimiterConfig {
        let mut config = RateLimiterConfig::new(self.rate_limit.global_rate_limit)
            .burst(self.rate_limit.burst);
        config
            .category_limits
            .extend(self.rate_limit.category_limits.iter().map(|(c, r)| (*c, *r)));
        config.enabled = self.rate_limit.enabled;
        config
    }

    /// Retry configuration
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.retry.max_retries,
            min_backoff: Duration::from_millis(self.retry.min_backoff_ms),
            max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
        }
    }

    /// Transport configuration, without credentials
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig::default()
            .timeout(Duration::from_secs(self.timeout_secs))
            .tls(TlsVerify::parse(&self.verify_ssl))
    }

    /// Page size limits
    pub fn pagination_config(&self) -> PaginationConfig {
        PaginationConfig {
            default_page_size: self.pagination.default_page_size,
            max_page_size: self.pagination.max_page_size,
        }
    }
}
