//! One-shot HTTP transport
//!
//! Performs a single GET and classifies the result. No retries and no
//! caching happen here; see [`RetryController`](super::RetryController).

use crate::error::{Error, Result};
use crate::types::{JsonValue, StringMap};
use async_trait::async_trait;
use reqwest::{Certificate, Client, StatusCode};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Classified result of one request
///
/// Every way a request can end maps to exactly one variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// 2xx with a JSON body
    Success(JsonValue),
    /// HTTP 429, with the backend's body text
    RateLimited(String),
    /// Any other non-2xx status
    HttpError {
        /// Response status code
        status: u16,
        /// Response body text
        body: String,
    },
    /// Connection, DNS, timeout or body read failure
    NetworkError(String),
    /// Anything else, including a 2xx body that is not JSON
    UnknownError(String),
}

impl Outcome {
    /// Check if this is a success
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Executes single GET requests
///
/// Implemented by [`HttpTransport`]; tests and embedders may supply their own.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one GET of `url` with the given headers and query parameters
    async fn execute(&self, url: &str, headers: &StringMap, params: &[(String, String)])
        -> Outcome;
}

/// Caller-supplied HTTP basic credentials
#[derive(Clone)]
pub struct BasicAuth {
    /// Username
    pub username: String,
    /// Password
    pub password: String,
}

impl BasicAuth {
    /// Create credentials
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// How server certificates are checked
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerify {
    /// Verify against the built-in roots
    #[default]
    Enabled,
    /// Accept any certificate
    Disabled,
    /// Also trust the PEM bundle at this path
    CaBundle(PathBuf),
}

impl TlsVerify {
    /// Parse `"true"`, `"false"` or a CA bundle path
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "true" => Self::Enabled,
            "false" => Self::Disabled,
            _ => Self::CaBundle(PathBuf::from(value.trim())),
        }
    }
}

/// Configuration for [`HttpTransport`]
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Optional basic credentials
    pub basic_auth: Option<BasicAuth>,
    /// Certificate verification
    pub tls: TlsVerify,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            user_agent: format!("ise-fetch/{}", env!("CARGO_PKG_VERSION")),
            basic_auth: None,
            tls: TlsVerify::Enabled,
        }
    }
}

impl TransportConfig {
    /// Set the per-request timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set basic credentials
    #[must_use]
    pub fn basic_auth(mut self, auth: BasicAuth) -> Self {
        self.basic_auth = Some(auth);
        self
    }

    /// Set certificate verification
    #[must_use]
    pub fn tls(mut self, tls: TlsVerify) -> Self {
        self.tls = tls;
        self
    }
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
    config: TransportConfig,
}

impl HttpTransport {
    /// Create a transport with the given configuration
    pub fn new(config: TransportConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent);

        match &config.tls {
            TlsVerify::Enabled => {}
            TlsVerify::Disabled => {
                warn!("TLS certificate verification is disabled");
                builder = builder.danger_accept_invalid_certs(true);
            }
            TlsVerify::CaBundle(path) => {
                let pem = std::fs::read(path)?;
                let cert = Certificate::from_pem(&pem).map_err(|e| {
                    Error::invalid_value("verify_ssl", format!("{}: {e}", path.display()))
                })?;
                info!("Using CA bundle at {}", path.display());
                builder = builder.add_root_certificate(cert);
            }
        }

        let client = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        url: &str,
        headers: &StringMap,
        params: &[(String, String)],
    ) -> Outcome {
        let mut req = self.client.get(url).timeout(self.config.timeout);

        for (key, value) in headers {
            req = req.header(key.as_str(), value.as_str());
        }

        if !params.is_empty() {
            req = req.query(params);
        }

        if let Some(ref auth) = self.config.basic_auth {
            req = req.basic_auth(&auth.username, Some(&auth.password));
        }

        let response = match req.send().await {
            Ok(response) => response,
            Err(e) => return classify_error(&e),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Outcome::NetworkError(format!("Failed to read response body: {e}")),
        };
        debug!("GET {} -> {}", url, status.as_u16());

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Outcome::RateLimited(body);
        }

        if !status.is_success() {
            return Outcome::HttpError {
                status: status.as_u16(),
                body,
            };
        }

        match serde_json::from_str(&body) {
            Ok(json) => Outcome::Success(json),
            Err(e) => Outcome::UnknownError(format!("Invalid JSON in response: {e}")),
        }
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Map a reqwest send failure onto an outcome
fn classify_error(e: &reqwest::Error) -> Outcome {
    if e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() {
        Outcome::NetworkError(e.to_string())
    } else {
        Outcome::UnknownError(e.to_string())
    }
}
