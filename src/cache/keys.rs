//! Cache key derivation

use crate::types::{JsonObject, JsonValue};

/// Prefix marking merged multi-page entries
pub const PAGINATED_PREFIX: &str = "paginated:";

/// Key for a single request: `"<url>:<params as JSON with sorted keys>"`
///
/// Parameter maps that differ only in insertion order produce the same key.
pub fn cache_key(url: &str, params: &JsonObject) -> String {
    let canonical = canonicalize(&JsonValue::Object(params.clone()));
    format!("{url}:{canonical}")
}

/// Key for the merged result of a paginated fetch
///
/// The `page` parameter is ignored so every page of one walk maps to the
/// same merged entry.
pub fn paginated_cache_key(url: &str, params: &JsonObject) -> String {
    let mut base = params.clone();
    base.remove("page");
    format!("{PAGINATED_PREFIX}{}", cache_key(url, &base))
}

/// Rebuild objects with keys in lexicographic order, at every depth
fn canonicalize(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = JsonObject::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key.as_str()]));
            }
            JsonValue::Object(sorted)
        }
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
