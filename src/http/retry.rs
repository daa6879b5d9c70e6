//! Retry controller
//!
//! Wraps the transport and the rate limiter. Only backend overload (429) is
//! retried, with capped exponential backoff; every other failure surfaces
//! on the first attempt.

use super::rate_limit::RateLimiter;
use super::transport::{Outcome, Transport};
use crate::cache::{cache_key, ResponseCache};
use crate::catalog::EndpointCategory;
use crate::error::{Error, Result};
use crate::types::{to_query_pairs, JsonObject, JsonValue, StringMap};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Backoff settings for rate-limited responses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub min_backoff: Duration,
    /// Ceiling for any single delay
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt + 1`: `min(min_backoff * 2^attempt, max_backoff)`
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        std::cmp::min(self.min_backoff.saturating_mul(factor), self.max_backoff)
    }
}

/// Backoff settings as reported to operators
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackoffSettings {
    /// Seconds before the first retry
    pub min_backoff_time: f64,
    /// Ceiling in seconds
    pub max_backoff_time: f64,
    /// Retries after the first attempt
    pub max_retries: u32,
}

impl From<&RetryConfig> for BackoffSettings {
    fn from(config: &RetryConfig) -> Self {
        Self {
            min_backoff_time: config.min_backoff.as_secs_f64(),
            max_backoff_time: config.max_backoff.as_secs_f64(),
            max_retries: config.max_retries,
        }
    }
}

/// Issues rate-limited requests with backoff on 429
pub struct RetryController {
    transport: Arc<dyn Transport>,
    limiter: Arc<RateLimiter>,
    cache: Arc<ResponseCache>,
    headers: StringMap,
    config: RetryConfig,
}

impl RetryController {
    /// Create a controller
    pub fn new(
        transport: Arc<dyn Transport>,
        limiter: Arc<RateLimiter>,
        cache: Arc<ResponseCache>,
        headers: StringMap,
        config: RetryConfig,
    ) -> Self {
        Self {
            transport,
            limiter,
            cache,
            headers,
            config,
        }
    }

    /// Retry settings
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Fetch `url`, retrying on backend overload
    ///
    /// A successful body is written to the cache under the category's
    /// namespace when `cacheable` is set. The cache is never read here.
    pub async fn request(
        &self,
        category: EndpointCategory,
        url: &str,
        params: &JsonObject,
        cacheable: bool,
    ) -> Result<JsonValue> {
        let query = to_query_pairs(params);
        let mut attempt = 0;

        loop {
            self.limiter.acquire(category).await;

            info!("Calling {url} with params: {query:?}");
            match self.transport.execute(url, &self.headers, &query).await {
                Outcome::Success(body) => {
                    if cacheable {
                        let key = cache_key(url, params);
                        self.cache
                            .set_json(category.as_str(), &key, &body, self.cache.ttl())
                            .await;
                    }
                    return Ok(body);
                }
                Outcome::RateLimited(body) => {
                    if attempt >= self.config.max_retries {
                        error!("Rate limit exceeded, max retries reached: {body}");
                        return Err(Error::RateLimited {
                            attempts: attempt + 1,
                            body,
                        });
                    }
                    let delay = self.config.calculate_backoff(attempt);
                    warn!(
                        "Rate limit hit, backing off for {:.2}s (retry {}/{})",
                        delay.as_secs_f64(),
                        attempt + 1,
                        self.config.max_retries
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Outcome::HttpError { status, body } => {
                    error!("HTTP error occurred: {status} - {body}");
                    return Err(Error::http_status(status, body));
                }
                Outcome::NetworkError(message) => {
                    error!("Request error occurred: {message}");
                    return Err(Error::network(message));
                }
                Outcome::UnknownError(message) => {
                    error!("An unexpected error occurred: {message}");
                    return Err(Error::unknown(message));
                }
            }
        }
    }
}

impl std::fmt::Debug for RetryController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryController")
            .field("config", &self.config)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}
