//! Model/provider configuration value objects.
//!
//! A config is an immutable value constructed per call site (or once at
//! startup and cloned). Nothing here holds live connections or mutable state,
//! so one in-flight request can never leak model choice or credentials into
//! another.

use crate::errors::{LlmError, LlmResult};

/// The backend used for LLM inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    /// Local Ollama runtime.
    Ollama,
    /// OpenAI-compatible chat completions API.
    OpenAi,
}

impl LlmProvider {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "openai" | "open-ai" | "chatgpt" => Some(Self::OpenAi),
            _ => None,
        }
    }
}

/// Configuration for one LLM model invocation.
#[derive(Debug, Clone)]
pub struct LlmModelConfig {
    /// The LLM provider/backend.
    pub provider: LlmProvider,
    /// Model identifier string (e.g. `"gpt-4o-mini"`, `"qwen3:14b"`).
    pub model: String,
    /// Inference endpoint (local URL or remote API base).
    pub endpoint: String,
    /// Optional API key for providers that require authentication.
    pub api_key: Option<String>,
    /// Maximum number of tokens to generate.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Optional request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl LlmModelConfig {
    /// Validates the endpoint scheme; services call this in their constructors.
    pub fn validated_endpoint(&self) -> LlmResult<String> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(LlmError::InvalidEndpoint(self.endpoint.clone()));
        }
        Ok(endpoint.trim_end_matches('/').to_string())
    }

    /// Reads the primary model config from env.
    ///
    /// Variables: `LLM_PROVIDER` (default `ollama`), `LLM_MODEL`,
    /// `LLM_ENDPOINT`, `LLM_API_KEY`, `LLM_MAX_TOKENS`, `LLM_TEMPERATURE`,
    /// `LLM_TIMEOUT_SECS`.
    pub fn primary_from_env() -> Self {
        Self::from_env_prefix("LLM")
    }

    /// Reads the fallback model config from env (`LLM_FALLBACK_*`).
    ///
    /// Returns `None` when `LLM_FALLBACK_MODEL` is unset, meaning no fallback
    /// provider is configured.
    pub fn fallback_from_env() -> Option<Self> {
        std::env::var("LLM_FALLBACK_MODEL")
            .ok()
            .map(|_| Self::from_env_prefix("LLM_FALLBACK"))
    }

    fn from_env_prefix(prefix: &str) -> Self {
        let var = |suffix: &str| std::env::var(format!("{prefix}_{suffix}")).ok();
        let provider = var("PROVIDER")
            .and_then(|s| LlmProvider::parse(&s))
            .unwrap_or(LlmProvider::Ollama);
        let endpoint = var("ENDPOINT").unwrap_or_else(|| match provider {
            LlmProvider::Ollama => "http://127.0.0.1:11434".to_string(),
            LlmProvider::OpenAi => "https://api.openai.com".to_string(),
        });
        Self {
            provider,
            model: var("MODEL").unwrap_or_else(|| "qwen3:14b".to_string()),
            endpoint,
            api_key: var("API_KEY"),
            max_tokens: var("MAX_TOKENS").and_then(|s| s.parse().ok()),
            temperature: var("TEMPERATURE").and_then(|s| s.parse().ok()),
            timeout_secs: var("TIMEOUT_SECS").and_then(|s| s.parse().ok()),
        }
    }
}
