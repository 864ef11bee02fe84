//! Provider error taxonomy shared by all SCM clients.
//!
//! Goals:
//! - Single error type for the whole crate, ergonomic `?` via `From` impls.
//! - Status-aware mapping (401→Unauthorized, 429→RateLimited, 5xx→Server).
//! - `is_transient()` drives the bounded retry helper for content fetches.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type ScmResult<T> = Result<T, ProviderError>;

/// Error for any SCM provider operation (GitHub/GitLab/Bitbucket/Azure DevOps).
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Unauthorized (HTTP 401).
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden (HTTP 403).
    #[error("forbidden")]
    Forbidden,

    /// Not found (HTTP 404).
    #[error("not found")]
    NotFound,

    /// Rate limited (HTTP 429).
    #[error("rate limited")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Gateway/Server error (HTTP 5xx).
    #[error("server error: status {0}")]
    Server(u16),

    /// Other HTTP status (4xx/3xx) not covered above.
    #[error("http status error: {0}")]
    HttpStatus(u16),

    /// Timeout at transport level.
    #[error("timeout")]
    Timeout,

    /// Network/transport failure without status (DNS/connect/reset).
    #[error("network error: {0}")]
    Network(String),

    /// JSON deserialization error.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Unexpected/invalid shape of provider response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// File content could not be decoded (bad base64 / non-UTF-8 bytes).
    #[error("content decode error: {0}")]
    ContentDecode(String),

    /// Configuration problems (missing token, bad base URL).
    #[error("provider config error: {0}")]
    Config(String),

    /// Operation not supported by this provider.
    #[error("unsupported provider operation")]
    Unsupported,
}

impl ProviderError {
    /// True for failures worth retrying with a delay (rate limits, 5xx,
    /// timeouts, transport drops).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited { .. }
                | ProviderError::Server(_)
                | ProviderError::Timeout
                | ProviderError::Network(_)
        )
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return ProviderError::Timeout;
        }
        if let Some(status) = e.status() {
            let code = status.as_u16();
            return match code {
                401 => ProviderError::Unauthorized,
                403 => ProviderError::Forbidden,
                404 => ProviderError::NotFound,
                429 => ProviderError::RateLimited {
                    retry_after_secs: None,
                },
                500..=599 => ProviderError::Server(code),
                _ => ProviderError::HttpStatus(code),
            };
        }
        ProviderError::Network(e.to_string())
    }
}
