//! Per-call prompt chain: primary provider with optional fallback.
//!
//! A `PromptChain` is an immutable value object built for one logical call.
//! It owns nothing long-lived and shares no mutable state, so concurrent
//! sync passes can never observe each other's model choice or credentials.
//!
//! Two run modes:
//! - [`PromptChain::run_raw`] — plain text reply.
//! - [`PromptChain::run_structured`] — strict-JSON parse of the reply into a
//!   caller-chosen `Deserialize` type; a reply that is not clean JSON is an
//!   error here (callers degrade to their own raw-extraction path).

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::{LlmModelConfig, LlmProvider};
use crate::errors::{LlmError, LlmResult};
use crate::ollama::OllamaService;
use crate::openai::OpenAiService;

/// Role tag for one prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptRole {
    System,
    User,
}

/// One role-tagged prompt string.
#[derive(Debug, Clone)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::User,
            content: content.into(),
        }
    }
}

/// Primary + optional fallback model configuration for one call.
#[derive(Debug, Clone)]
pub struct PromptChain {
    pub primary: LlmModelConfig,
    pub fallback: Option<LlmModelConfig>,
}

impl PromptChain {
    pub fn new(primary: LlmModelConfig, fallback: Option<LlmModelConfig>) -> Self {
        Self { primary, fallback }
    }

    /// Builds a chain from env (`LLM_*` primary, `LLM_FALLBACK_*` fallback).
    pub fn from_env() -> Self {
        Self {
            primary: LlmModelConfig::primary_from_env(),
            fallback: LlmModelConfig::fallback_from_env(),
        }
    }

    /// Runs the prompt through the primary provider; on failure retries the
    /// fallback provider. Returns the raw reply text.
    pub async fn run_raw(&self, messages: &[PromptMessage]) -> LlmResult<String> {
        let (system, prompt) = split_messages(messages);
        let system_ref = if system.is_empty() {
            None
        } else {
            Some(system.as_str())
        };

        match generate_once(&self.primary, &prompt, system_ref).await {
            Ok(text) => Ok(text),
            Err(primary_err) => {
                let Some(fb) = &self.fallback else {
                    return Err(primary_err);
                };
                warn!(
                    error = %primary_err,
                    fallback_model = %fb.model,
                    "primary provider failed, trying fallback"
                );
                generate_once(fb, &prompt, system_ref)
                    .await
                    .map_err(|e| LlmError::AllProvidersFailed {
                        last: e.to_string(),
                    })
            }
        }
    }

    /// Runs the prompt and parses the reply as strict JSON into `T`.
    ///
    /// Each provider in the chain gets its own generate + parse attempt: a
    /// primary reply that fails to parse falls through to the fallback
    /// provider rather than being hand-repaired here.
    pub async fn run_structured<T: DeserializeOwned>(
        &self,
        messages: &[PromptMessage],
    ) -> LlmResult<T> {
        let (system, prompt) = split_messages(messages);
        let system_ref = if system.is_empty() {
            None
        } else {
            Some(system.as_str())
        };

        let mut last_err: Option<LlmError> = None;
        for cfg in std::iter::once(&self.primary).chain(self.fallback.iter()) {
            match generate_once(cfg, &prompt, system_ref).await {
                Ok(text) => match serde_json::from_str::<T>(text.trim()) {
                    Ok(v) => return Ok(v),
                    Err(e) => {
                        debug!(model = %cfg.model, error = %e, "reply is not clean JSON");
                        last_err = Some(LlmError::StructuredParse(e.to_string()));
                    }
                },
                Err(e) => {
                    warn!(model = %cfg.model, error = %e, "provider call failed");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or(LlmError::EmptyChoices))
    }
}

/// Joins system messages and user messages into the two-part shape the thin
/// provider clients accept.
fn split_messages(messages: &[PromptMessage]) -> (String, String) {
    let mut system = String::new();
    let mut prompt = String::new();
    for m in messages {
        let buf = match m.role {
            PromptRole::System => &mut system,
            PromptRole::User => &mut prompt,
        };
        if !buf.is_empty() {
            buf.push_str("\n\n");
        }
        buf.push_str(&m.content);
    }
    (system, prompt)
}

/// Constructs the concrete service for `cfg` and performs one generation.
///
/// Services are built per call; they are cheap (one reqwest client) and this
/// keeps the chain free of shared mutable provider state.
async fn generate_once(
    cfg: &LlmModelConfig,
    prompt: &str,
    system: Option<&str>,
) -> LlmResult<String> {
    match cfg.provider {
        LlmProvider::Ollama => OllamaService::new(cfg.clone())?.generate(prompt, system).await,
        LlmProvider::OpenAi => OpenAiService::new(cfg.clone())?.generate(prompt, system).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_roles_in_order() {
        let msgs = vec![
            PromptMessage::system("rules first"),
            PromptMessage::user("file A"),
            PromptMessage::user("file B"),
        ];
        let (system, prompt) = split_messages(&msgs);
        assert_eq!(system, "rules first");
        assert_eq!(prompt, "file A\n\nfile B");
    }
}
