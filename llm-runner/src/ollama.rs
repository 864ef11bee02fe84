//! Thin non-streaming client for the Ollama `/api/generate` endpoint.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::LlmModelConfig;
use crate::errors::{LlmError, LlmResult, make_snippet};

#[derive(Debug)]
pub struct OllamaService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_generate: String,
}

impl OllamaService {
    /// Creates an Ollama client from the given config.
    ///
    /// Validates the endpoint scheme and builds an HTTP client with the
    /// configured timeout (default 120s; local generation can be slow).
    pub fn new(cfg: LlmModelConfig) -> LlmResult<Self> {
        let base = cfg.validated_endpoint()?;
        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(120));
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let url_generate = format!("{base}/api/generate");
        Ok(Self {
            client,
            cfg,
            url_generate,
        })
    }

    /// Performs a non-streaming generation request and returns plain text.
    ///
    /// Ollama has no separate system role on `/api/generate`; when `system`
    /// is present it is sent via the request's `system` field.
    pub async fn generate(&self, prompt: &str, system: Option<&str>) -> LlmResult<String> {
        let started = Instant::now();
        let body = GenerateRequest {
            model: &self.cfg.model,
            prompt,
            system,
            stream: false,
            options: Options {
                temperature: self.cfg.temperature,
                num_predict: self.cfg.max_tokens,
            },
        };

        debug!(
            model = %self.cfg.model,
            prompt_len = prompt.len(),
            has_system = system.is_some(),
            "POST {}", self.url_generate
        );

        let resp = self.client.post(&self.url_generate).json(&body).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);
            error!(status, %snippet, model = %self.cfg.model, "ollama generate failed");
            return Err(LlmError::HttpStatus { status, snippet });
        }

        let out: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Decode(format!("ollama response: {e}")))?;

        debug!(
            model = %self.cfg.model,
            latency_ms = started.elapsed().as_millis() as u64,
            reply_len = out.response.len(),
            "ollama generation completed"
        );
        Ok(out.response)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: Options,
}

#[derive(Debug, Serialize)]
struct Options {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}
