// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # ise-fetch
//!
//! A rate-limited, cached, auto-paginating fetch engine for the Cisco ISE
//! configuration REST APIs (ERS and OpenAPI).
//!
//! ## Features
//!
//! - **Admission Control**: Global plus per-category token buckets
//! - **Backoff**: Exponential backoff on HTTP 429, nothing else retried
//! - **Response Cache**: TTL cache for pages and merged results
//! - **Auto-Pagination**: Merges `SearchResult.resources` across pages
//! - **Endpoint Catalog**: Path patterns to categories, filter support per endpoint
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ise_fetch::{EndpointCatalog, EngineConfig, FetchEngine, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut config = EngineConfig::load("ise.yaml")?;
//!     config.apply_env_overrides()?;
//!
//!     let engine = FetchEngine::new(config, EndpointCatalog::with_default_patterns())?;
//!
//!     // All pages of network devices, merged
//!     let devices = engine
//!         .fetch("/ers/config/networkdevice", Some("name.STARTSWITH.core"), None)
//!         .await?;
//!     println!("{}", devices["SearchResult"]["total"]);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        FetchEngine                           │
//! │  get() / fetch() / get_with_timeout() / stream_pages()       │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//! ┌─────────────┬───────────────┴──┬───────────────┬────────────┐
//! │  Paginator  │ RetryController  │  RateLimiter  │ Transport  │
//! ├─────────────┼──────────────────┼───────────────┼────────────┤
//! │ page 1..N   │ 429 backoff      │ global bucket │ reqwest GET│
//! │ merge       │ write-through    │ category      │ classify   │
//! └─────────────┴──────────────────┴───────────────┴────────────┘
//!                               │
//!                        ResponseCache (moka)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Endpoint categories and the endpoint catalog
pub mod catalog;

/// Response cache
pub mod cache;

/// Transport, rate limiting and retry
pub mod http;

/// Page walking and merging
pub mod pagination;

/// Fetch engine facade
pub mod engine;

/// Engine configuration
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use cache::{CacheConfig, CacheInfo, ResponseCache};
pub use catalog::{load_catalog, CategoryPattern, EndpointCatalog, EndpointCategory, EndpointEntry};
pub use config::EngineConfig;
pub use engine::{CacheUpdate, FetchEngine, FetchEngineBuilder, FetchOptions};
pub use http::{BasicAuth, RateLimitUpdate, RateLimiter, RateLimiterConfig, Transport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
