//! Response cache module
//!
//! Time-bounded key/value store for backend responses.
//!
//! # Overview
//!
//! - `ResponseCache` - moka-backed store with per-entry TTL and namespaces
//! - `CacheConfig` - Capacity, TTLs and the enabled flag
//! - `cache_key` / `paginated_cache_key` - Deterministic request keys
//!
//! Two key classes share the store: single-page responses keyed by
//! `"<url>:<sorted params>"`, and merged multi-page results keyed by
//! `"paginated:<url>:<sorted params without page>"`.

mod keys;
mod response;

pub use keys::{cache_key, paginated_cache_key, PAGINATED_PREFIX};
pub use response::{CacheConfig, CacheInfo, ResponseCache, MAX_SAMPLED_KEYS};

#[cfg(test)]
mod tests;
