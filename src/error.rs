//! Error types for ise-fetch
//!
//! This module defines the error hierarchy for the fetch engine.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for ise-fetch
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    /// Configuration could not be used as given
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong
        message: String,
    },

    /// A required setting is absent or empty
    #[error("Missing required config field: {field}")]
    MissingConfigField {
        /// Dotted name of the setting
        field: String,
    },

    /// A setting is present but out of range or unreadable
    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue {
        /// Dotted name of the setting
        field: String,
        /// Why the value was rejected
        message: String,
    },

    /// Config file is not valid YAML for [`EngineConfig`](crate::EngineConfig)
    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON document or catalog could not be parsed
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Base URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Backend Errors
    // ============================================================================
    /// Backend kept answering 429 after every retry
    #[error("Rate limit exceeded after {attempts} attempts: {body}")]
    RateLimited {
        /// Requests made, including the first
        attempts: u32,
        /// Body of the last 429 response
        body: String,
    },

    /// Non-2xx status other than 429
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// Response status code
        status: u16,
        /// Response body text
        body: String,
    },

    /// Connection, DNS, timeout or body read failure
    #[error("Network error: {message}")]
    Network {
        /// Transport detail
        message: String,
    },

    /// Any other request failure, such as a 2xx body that is not JSON
    #[error("Unexpected error: {message}")]
    Unknown {
        /// Failure detail
        message: String,
    },

    /// Caller deadline passed before the fetch finished
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout {
        /// The deadline that was exceeded
        timeout_ms: u64,
    },

    // ============================================================================
    // Caller Errors
    // ============================================================================
    /// A filter was given for an endpoint with no filterable fields
    #[error("Endpoint '{endpoint}' does not support filtering")]
    FilterNotSupported {
        /// Endpoint path as requested
        endpoint: String,
    },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    /// File read failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create an unknown error
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    ///
    /// Only backend overload is transient; the retry budget is not spent on
    /// anything else.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::RateLimited { .. })
    }

    /// Check if this error was raised while loading configuration
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::Config { .. }
                | Error::MissingConfigField { .. }
                | Error::InvalidConfigValue { .. }
                | Error::YamlParse(_)
                | Error::InvalidUrl(_)
        )
    }
}

/// Result type alias for ise-fetch
pub type Result<T> = std::result::Result<T, Error>;
