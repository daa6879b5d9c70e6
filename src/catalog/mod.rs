//! Endpoint catalog module
//!
//! Maps endpoint paths to rate-limit categories and records which
//! endpoints accept a filter expression.
//!
//! # Overview
//!
//! - `EndpointCategory` - The rate-limit bucket an endpoint belongs to
//! - `CategoryPattern` - Ordered path-substring rule; first match wins
//! - `EndpointCatalog` - Patterns plus the known endpoint entries

mod loader;
mod types;

pub use loader::load_catalog;
pub use types::{
    default_category_patterns, CategoryPattern, EndpointCatalog, EndpointCategory, EndpointEntry,
};
