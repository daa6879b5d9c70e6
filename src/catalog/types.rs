//! Endpoint catalog types

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rate-limit category of an endpoint
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EndpointCategory {
    /// Identity, user and directory endpoints
    Auth,
    /// Network device and endpoint inventory
    Device,
    /// Policy, profile and security-group endpoints
    Policy,
    /// Anything not matched by a pattern
    #[default]
    Default,
}

impl EndpointCategory {
    /// All categories, in a stable order
    pub const ALL: [EndpointCategory; 4] = [
        EndpointCategory::Auth,
        EndpointCategory::Device,
        EndpointCategory::Policy,
        EndpointCategory::Default,
    ];

    /// Lowercase label, also used as the cache namespace
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointCategory::Auth => "auth",
            EndpointCategory::Device => "device",
            EndpointCategory::Policy => "policy",
            EndpointCategory::Default => "default",
        }
    }

    /// Parse a label such as `"device"`
    pub fn parse(label: &str) -> Result<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "auth" => Ok(EndpointCategory::Auth),
            "device" => Ok(EndpointCategory::Device),
            "policy" => Ok(EndpointCategory::Policy),
            "default" => Ok(EndpointCategory::Default),
            other => Err(Error::invalid_value(
                "category",
                format!("unknown endpoint category '{other}'"),
            )),
        }
    }
}

impl fmt::Display for EndpointCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A path-substring rule mapping endpoints to a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPattern {
    /// Substring searched for in the endpoint path
    pub pattern: String,
    /// Category assigned on match
    pub category: EndpointCategory,
}

impl CategoryPattern {
    /// Create a new pattern
    pub fn new(pattern: impl Into<String>, category: EndpointCategory) -> Self {
        Self {
            pattern: pattern.into(),
            category,
        }
    }

    /// Check whether this rule applies to `path`
    pub fn matches(&self, path: &str) -> bool {
        path.contains(self.pattern.as_str())
    }
}

static DEFAULT_PATTERNS: Lazy<Vec<CategoryPattern>> = Lazy::new(|| {
    use EndpointCategory::{Auth, Device, Policy};
    [
        ("/ers/config/identitygroup", Auth),
        ("/ers/config/idstoresequence", Auth),
        ("/ers/config/internaluser", Auth),
        ("/ers/config/adminuser", Auth),
        ("/ers/config/activedirectory", Auth),
        ("/ers/config/networkdevice", Device),
        ("/ers/config/endpoint", Device),
        ("/ers/config/node", Device),
        ("/ers/config/endpointgroup", Device),
        ("/api/v1/policy", Policy),
        ("/ers/config/authorizationprofile", Policy),
        ("/ers/config/allowedprotocols", Policy),
        ("/ers/config/sgacl", Policy),
        ("/ers/config/sgt", Policy),
    ]
    .into_iter()
    .map(|(pattern, category)| CategoryPattern::new(pattern, category))
    .collect()
});

/// The built-in category table
pub fn default_category_patterns() -> Vec<CategoryPattern> {
    DEFAULT_PATTERNS.clone()
}

/// One known endpoint, as listed in the catalog file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointEntry {
    /// Human-readable name (e.g. "Network Devices")
    #[serde(rename = "Name", default)]
    pub name: String,
    /// Endpoint path relative to the base URL
    #[serde(rename = "URL", default)]
    pub url: String,
    /// Fields accepted in a filter expression; empty means no filtering
    #[serde(rename = "FilterableFields", default)]
    pub filterable_fields: Vec<String>,
}

impl EndpointEntry {
    /// Create a new entry
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            filterable_fields: Vec::new(),
        }
    }

    /// Set filterable fields
    #[must_use]
    pub fn with_filterable_fields(mut self, fields: Vec<String>) -> Self {
        self.filterable_fields = fields;
        self
    }

    /// Whether a filter expression may be sent to this endpoint
    pub fn supports_filter(&self) -> bool {
        !self.filterable_fields.is_empty()
    }

    fn validate(&self, index: usize) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::missing_field(format!("endpoints[{index}].Name")));
        }
        if self.url.trim().is_empty() {
            return Err(Error::missing_field(format!("endpoints[{index}].URL")));
        }
        Ok(())
    }
}

/// Static lookup table for endpoint categories and capabilities
///
/// Consumed once at startup and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct EndpointCatalog {
    patterns: Vec<CategoryPattern>,
    entries: Vec<EndpointEntry>,
}

impl EndpointCatalog {
    /// Create a catalog from category patterns and endpoint entries
    ///
    /// Entries missing a name or path are rejected.
    pub fn new(patterns: Vec<CategoryPattern>, entries: Vec<EndpointEntry>) -> Result<Self> {
        for (index, entry) in entries.iter().enumerate() {
            entry.validate(index)?;
        }
        if let Some(empty) = patterns.iter().position(|p| p.pattern.is_empty()) {
            return Err(Error::invalid_value(
                format!("endpoint_categories[{empty}].pattern"),
                "pattern must not be empty",
            ));
        }
        Ok(Self { patterns, entries })
    }

    /// Catalog with the built-in patterns and no endpoint entries
    pub fn with_default_patterns() -> Self {
        Self {
            patterns: default_category_patterns(),
            entries: Vec::new(),
        }
    }

    /// Parse endpoint entries from a JSON array, using `patterns` for categories
    pub fn from_json_str(json: &str, patterns: Vec<CategoryPattern>) -> Result<Self> {
        let entries: Vec<EndpointEntry> = serde_json::from_str(json)?;
        Self::new(patterns, entries)
    }

    /// Resolve the rate-limit category of `path`
    pub fn category_for(&self, path: &str) -> EndpointCategory {
        self.patterns
            .iter()
            .find(|p| p.matches(path))
            .map_or(EndpointCategory::Default, |p| p.category)
    }

    /// Look up an endpoint by exact path
    pub fn endpoint(&self, path: &str) -> Option<&EndpointEntry> {
        self.entries.iter().find(|e| e.url == path)
    }

    /// Look up an endpoint by name, case-insensitively
    pub fn find_by_name(&self, name: &str) -> Option<&EndpointEntry> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }

    /// Whether `path` accepts a filter expression
    ///
    /// Paths not listed in the catalog are not restricted.
    pub fn supports_filter(&self, path: &str) -> bool {
        self.endpoint(path).map_or(true, EndpointEntry::supports_filter)
    }

    /// All endpoint entries, in file order
    pub fn entries(&self) -> &[EndpointEntry] {
        &self.entries
    }

    /// Category patterns, in match order
    pub fn patterns(&self) -> &[CategoryPattern] {
        &self.patterns
    }
}
