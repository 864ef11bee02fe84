//! Unified error handling for `llm-runner`.

use thiserror::Error;

/// Unified result alias for the crate.
pub type LlmResult<T> = Result<T, LlmError>;

/// Top-level error for the `llm-runner` crate.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LlmError {
    /// Endpoint is empty or does not start with http/https.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Provider requires an API key but none was configured.
    #[error("missing api key for provider {0}")]
    MissingApiKey(&'static str),

    /// Upstream returned a non-successful HTTP status.
    #[error("http {status}: {snippet}")]
    HttpStatus { status: u16, snippet: String },

    /// Underlying HTTP transport error.
    #[error("transport error: {0}")]
    HttpTransport(#[from] reqwest::Error),

    /// Response body could not be decoded into the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// Chat completion returned no usable choice.
    #[error("empty completion choices")]
    EmptyChoices,

    /// Reply text did not parse as the requested JSON shape.
    #[error("structured parse error: {0}")]
    StructuredParse(String),

    /// Both the primary and fallback providers failed.
    #[error("all providers failed; last error: {last}")]
    AllProvidersFailed { last: String },
}

/// Trims a response body to a short, log-friendly snippet.
pub(crate) fn make_snippet(body: &str) -> String {
    const MAX: usize = 240;
    let trimmed = body.trim();
    if trimmed.len() <= MAX {
        trimmed.to_string()
    } else {
        let mut cut = MAX;
        while !trimmed.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}…", &trimmed[..cut])
    }
}
