//! Rate limiting implementation
//!
//! Two-tier token buckets built on the governor crate: one global bucket
//! shared by every request, plus one bucket per endpoint category.
//! Every admission waits on its category bucket, then takes the global
//! token; the pair is taken together or not at all.

use crate::catalog::EndpointCategory;
use crate::error::{Error, Result};
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

type Bucket = Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Global requests per second when not configured
pub const DEFAULT_GLOBAL_RATE_LIMIT: u32 = 30;

/// Category requests per second for categories without an explicit limit
pub const DEFAULT_CATEGORY_RATE_LIMIT: u32 = 10;

/// Configuration for rate limiting
///
/// Every bucket holds `burst_size` tokens. The default of 1 spaces
/// admissions evenly at `1/rate`, so `N` requests take at least
/// `(N-1)/rate` seconds. A limiter that lets a whole second's quota through
/// at once needs `burst(rate)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Whether admission control is applied at all
    pub enabled: bool,
    /// Requests per second across all categories
    pub global_rate_limit: u32,
    /// Requests per second per category
    pub category_limits: HashMap<EndpointCategory, u32>,
    /// Burst size (max tokens in each bucket)
    pub burst_size: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        let category_limits = HashMap::from([
            (EndpointCategory::Auth, 5),
            (EndpointCategory::Device, 15),
            (EndpointCategory::Policy, 8),
            (EndpointCategory::Default, DEFAULT_CATEGORY_RATE_LIMIT),
        ]);
        Self {
            enabled: true,
            global_rate_limit: DEFAULT_GLOBAL_RATE_LIMIT,
            category_limits,
            burst_size: 1,
        }
    }
}

impl RateLimiterConfig {
    /// Create a config with the given global rate and default category rates
    pub fn new(global_rate_limit: u32) -> Self {
        Self {
            global_rate_limit,
            ..Self::default()
        }
    }

    /// Set the rate for one category
    #[must_use]
    pub fn category(mut self, category: EndpointCategory, rate: u32) -> Self {
        self.category_limits.insert(category, rate);
        self
    }

    /// Set the burst size
    #[must_use]
    pub fn burst(mut self, burst_size: u32) -> Self {
        self.burst_size = burst_size;
        self
    }

    /// Turn admission control off
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Effective rate for `category`, falling back to the `default` category
    pub fn rate_for(&self, category: EndpointCategory) -> u32 {
        self.category_limits
            .get(&category)
            .or_else(|| self.category_limits.get(&EndpointCategory::Default))
            .copied()
            .unwrap_or(DEFAULT_CATEGORY_RATE_LIMIT)
    }

    /// Reject zero rates
    pub fn validate(&self) -> Result<()> {
        if self.global_rate_limit == 0 {
            return Err(Error::invalid_value(
                "rate_limit.global_rate_limit",
                "must be greater than zero",
            ));
        }
        if self.burst_size == 0 {
            return Err(Error::invalid_value(
                "rate_limit.burst",
                "must be greater than zero",
            ));
        }
        let mut limits: Vec<_> = self.category_limits.iter().collect();
        limits.sort();
        for (category, rate) in limits {
            if *rate == 0 {
                return Err(Error::invalid_value(
                    format!("rate_limit.category_limits.{category}"),
                    "must be greater than zero",
                ));
            }
        }
        Ok(())
    }
}

/// Requested changes to a running limiter; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct RateLimitUpdate {
    /// Turn admission control on or off
    pub enabled: Option<bool>,
    /// New global rate
    pub global_rate_limit: Option<u32>,
    /// New per-category rates
    pub category_limits: HashMap<EndpointCategory, u32>,
}

impl RateLimitUpdate {
    fn changes_rates(&self) -> bool {
        self.global_rate_limit.is_some() || !self.category_limits.is_empty()
    }
}

/// Current limiter settings, for observability
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitInfo {
    /// Whether admission control is applied
    pub rate_limit_enabled: bool,
    /// Global requests per second
    pub global_rate_limit: u32,
    /// Effective requests per second for every category
    pub category_limits: BTreeMap<EndpointCategory, u32>,
    /// Tokens each bucket can hold
    pub burst_size: u32,
}

struct BucketSet {
    config: RateLimiterConfig,
    global: Bucket,
    categories: HashMap<EndpointCategory, Bucket>,
}

impl BucketSet {
    fn build(config: RateLimiterConfig) -> Self {
        let global = bucket(config.global_rate_limit, config.burst_size);
        let categories = EndpointCategory::ALL
            .into_iter()
            .map(|c| (c, bucket(config.rate_for(c), config.burst_size)))
            .collect();
        Self {
            config,
            global,
            categories,
        }
    }

    /// Admit one request, taking a global and a category token as a pair
    ///
    /// The category wait comes first and holds no global capacity, so an
    /// abandoned wait leaves the global bucket untouched. Once the category
    /// token is taken the global token is committed on a spawned task, so a
    /// caller dropped in between still consumes both.
    async fn acquire(self: Arc<Self>, category: EndpointCategory) {
        if let Some(bucket) = self.categories.get(&category) {
            bucket.until_ready().await;
        }
        if self.global.check().is_ok() {
            return;
        }

        debug!("Global bucket full, waiting for {category} admission");
        let committed = tokio::spawn(async move { self.global.until_ready().await });
        if let Err(e) = committed.await {
            warn!("Global rate limit wait did not complete: {e}");
        }
    }
}

fn bucket(rate: u32, burst: u32) -> Bucket {
    let quota = Quota::per_second(NonZeroU32::new(rate).unwrap_or(NonZeroU32::MIN))
        .allow_burst(NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN));
    Governor::direct(quota)
}

/// Two-tier token bucket rate limiter
///
/// Rate changes build a fresh bucket set and swap it in; calls already
/// waiting finish against the set they started with.
pub struct RateLimiter {
    buckets: RwLock<Arc<BucketSet>>,
    enabled: AtomicBool,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config
    pub fn new(config: &RateLimiterConfig) -> Self {
        Self {
            enabled: AtomicBool::new(config.enabled),
            buckets: RwLock::new(Arc::new(BucketSet::build(config.clone()))),
        }
    }

    /// Wait until both the global and the category bucket admit one request
    ///
    /// Returns immediately when rate limiting is disabled. Dropping the
    /// returned future abandons the wait; tokens are only spent in pairs.
    pub async fn acquire(&self, category: EndpointCategory) {
        if !self.is_enabled() {
            return;
        }
        self.current().acquire(category).await;
    }

    /// Wait with a timeout; `false` if the deadline passed first
    pub async fn acquire_with_timeout(&self, category: EndpointCategory, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.acquire(category))
            .await
            .is_ok()
    }

    /// Check if admission control is applied
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Turn admission control on or off
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
        info!(
            "Rate limiting {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    /// Apply an update, rebuilding the buckets when rates change
    pub fn reconfigure(&self, update: &RateLimitUpdate) -> Result<RateLimitInfo> {
        if update.changes_rates() {
            let mut config = self.current().config.clone();
            if let Some(global) = update.global_rate_limit {
                config.global_rate_limit = global;
            }
            for (category, rate) in &update.category_limits {
                config.category_limits.insert(*category, *rate);
            }
            config.validate()?;

            info!(
                "Rebuilding rate limit buckets (global: {}/sec)",
                config.global_rate_limit
            );
            let fresh = Arc::new(BucketSet::build(config));
            *self.buckets.write().unwrap_or_else(PoisonError::into_inner) = fresh;
        }
        if let Some(enabled) = update.enabled {
            self.set_enabled(enabled);
        }
        Ok(self.info())
    }

    /// Current rates and the enabled flag
    pub fn info(&self) -> RateLimitInfo {
        let buckets = self.current();
        let config = &buckets.config;
        RateLimitInfo {
            rate_limit_enabled: self.is_enabled(),
            global_rate_limit: config.global_rate_limit,
            category_limits: EndpointCategory::ALL
                .into_iter()
                .map(|c| (c, config.rate_for(c)))
                .collect(),
            burst_size: config.burst_size,
        }
    }

    fn current(&self) -> Arc<BucketSet> {
        Arc::clone(&self.buckets.read().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(&RateLimiterConfig::default())
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}
