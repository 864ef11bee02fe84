//! Crate-wide error hierarchy for rules-sync.
//!
//! Goals:
//! - Single root `Error` for all public functions.
//! - `From` conversions for `?` ergonomics across the provider, LLM and
//!   store layers.
//! - Per-file failures inside a sync pass are *not* represented here; they
//!   are recorded into the pass report and never abort the loop.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type SyncResult<T> = Result<T, Error>;

/// Root error type for the rules-sync crate.
#[derive(Debug, Error)]
pub enum Error {
    /// SCM platform adapter failure.
    #[error(transparent)]
    Provider(#[from] scm_providers::ProviderError),

    /// LLM runner failure (only surfaced from store-independent helpers;
    /// extraction itself degrades to an empty result instead).
    #[error(transparent)]
    Llm(#[from] llm_runner::LlmError),

    /// Rule store / review-config store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Input validation errors (bad target, empty repository id, etc.).
    #[error("validation error: {0}")]
    Validation(String),

    /// Generic catch-all error when nothing else fits.
    #[error("other error: {0}")]
    Other(String),
}

/// Persistence-layer errors (file I/O / JSON for the bundled store).
/// A lookup miss is not an error; stores report it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Store(StoreError::Io(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Store(StoreError::Serde(e))
    }
}
