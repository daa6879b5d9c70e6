//! HTTP module
//!
//! Transport, admission control and retry for backend requests.
//!
//! # Features
//!
//! - **Transport**: One-shot GET classified into a closed set of outcomes
//! - **Rate Limiting**: Global plus per-category token buckets using governor
//! - **Backoff**: Exponential backoff on 429, nothing else is retried

mod rate_limit;
mod retry;
mod transport;

pub use rate_limit::{
    RateLimitInfo, RateLimitUpdate, RateLimiter, RateLimiterConfig, DEFAULT_CATEGORY_RATE_LIMIT,
    DEFAULT_GLOBAL_RATE_LIMIT,
};
pub use retry::{BackoffSettings, RetryConfig, RetryController};
pub use transport::{BasicAuth, HttpTransport, Outcome, TlsVerify, Transport, TransportConfig};

#[cfg(test)]
pub(crate) mod testing;
