//! Common types used throughout ise-fetch
//!
//! This module contains shared type definitions, type aliases,
//! and small helpers used across multiple modules.

use std::collections::HashMap;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type, used as the free-form parameter bag
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Generic key-value map with string keys and values
pub type StringMap = HashMap<String, String>;

// ============================================================================
// Query Parameters
// ============================================================================

/// Render a JSON value as a query-string value
///
/// Strings are sent verbatim (no surrounding quotes); `null` becomes empty.
pub fn query_value(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

/// Flatten a parameter bag into ordered `(key, value)` query pairs
pub fn to_query_pairs(params: &JsonObject) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (k.clone(), query_value(v)))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    pairs
}

/// Read a positive integer parameter that may be a JSON number or a numeric string
pub fn as_u64(value: &JsonValue) -> Option<u64> {
    match value {
        JsonValue::Number(n) => n.as_u64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a boolean parameter that may be a JSON bool or a `"true"`/`"false"` string
pub fn as_bool(value: &JsonValue) -> Option<bool> {
    match value {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
