//! Rule extraction engine: file content in, normalized rule candidates out.
//!
//! Every conversion follows the same degradation ladder:
//! 1. structured attempt — the runner parses the reply as strict JSON;
//! 2. raw fallback — a simpler prompt, then [`json_extract`] digs the payload
//!    out of free text (fences, commentary, string-encoded JSON);
//! 3. total failure — log and return an empty vec. Extraction never returns
//!    an error to the caller's loop over other files.

pub mod json_extract;
pub mod normalize;
pub mod prompt;

use serde_json::Value;
use tracing::{debug, error};

use crate::types::RuleCandidate;
use llm_runner::{LlmError, PromptChain, PromptMessage};

/// Cap for batch-mode output: top rules ranked by impact.
pub const BATCH_RULE_CAP: usize = 3;

/// Seam between extraction and the LLM layer.
///
/// `run_structured` must yield an already-parsed JSON value (strict parse of
/// the model reply); `run_raw` yields the untouched reply text for the
/// fallback path. Implemented by [`llm_runner::PromptChain`] and by in-test
/// fakes.
pub trait RulePromptRunner {
    fn run_structured(
        &self,
        messages: &[PromptMessage],
    ) -> impl Future<Output = Result<Value, LlmError>> + Send;

    fn run_raw(
        &self,
        messages: &[PromptMessage],
    ) -> impl Future<Output = Result<String, LlmError>> + Send;
}

impl RulePromptRunner for PromptChain {
    async fn run_structured(&self, messages: &[PromptMessage]) -> Result<Value, LlmError> {
        PromptChain::run_structured::<Value>(self, messages).await
    }

    async fn run_raw(&self, messages: &[PromptMessage]) -> Result<String, LlmError> {
        PromptChain::run_raw(self, messages).await
    }
}

/// Converts one rule file into candidates (one merged rule per file by
/// prompt contract; normalization tolerates more).
pub async fn convert_file_to_rules<R: RulePromptRunner>(
    runner: &R,
    path: &str,
    content: &str,
) -> Vec<RuleCandidate> {
    let primary = prompt::build_file_rule_prompt(path, content);
    let fallback = prompt::build_file_rule_prompt_fallback(path, content);
    convert_with_fallback(runner, &primary, &fallback, path).await
}

/// Batch variant: one LLM call for several files, output capped at the top
/// [`BATCH_RULE_CAP`] rules by impact.
pub async fn convert_files_to_rules_fast_batch<R: RulePromptRunner>(
    runner: &R,
    files: &[(String, String)],
) -> Vec<RuleCandidate> {
    if files.is_empty() {
        return Vec::new();
    }
    let primary = prompt::build_batch_rule_prompt(files, BATCH_RULE_CAP);
    let mut out = convert_with_fallback(runner, &primary, &primary, &files[0].0).await;
    out.truncate(BATCH_RULE_CAP);
    out
}

/// Manifest variant: dependency descriptors carry no rule text, so the model
/// infers stack-appropriate rules instead.
pub async fn convert_manifest_files_to_rules<R: RulePromptRunner>(
    runner: &R,
    files: &[(String, String)],
) -> Vec<RuleCandidate> {
    if files.is_empty() {
        return Vec::new();
    }
    let primary = prompt::build_manifest_rule_prompt(files, BATCH_RULE_CAP);
    let mut out = convert_with_fallback(runner, &primary, &primary, &files[0].0).await;
    out.truncate(BATCH_RULE_CAP);
    out
}

/// Shared ladder: structured attempt, raw fallback, empty on total failure.
async fn convert_with_fallback<R: RulePromptRunner>(
    runner: &R,
    primary: &[PromptMessage],
    fallback: &[PromptMessage],
    default_path: &str,
) -> Vec<RuleCandidate> {
    match runner.run_structured(primary).await {
        Ok(payload) => {
            let candidates = normalize::normalize_candidates(&payload, default_path);
            if !candidates.is_empty() {
                return candidates;
            }
            debug!(path = default_path, "structured reply held no usable rules");
        }
        Err(e) => {
            debug!(path = default_path, error = %e, "structured extraction failed, degrading to raw");
        }
    }

    match runner.run_raw(fallback).await {
        Ok(text) => match json_extract::extract_json_payload(&text) {
            Some(payload) => normalize::normalize_candidates(&payload, default_path),
            None => {
                error!(
                    path = default_path,
                    reply_len = text.len(),
                    "no JSON payload found in fallback reply"
                );
                Vec::new()
            }
        },
        Err(e) => {
            error!(path = default_path, error = %e, "rule extraction failed on both paths");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;
    use serde_json::json;
    use std::sync::Mutex;

    /// Scripted runner: a queue of structured results and raw results.
    struct ScriptedRunner {
        structured: Mutex<Vec<Result<Value, LlmError>>>,
        raw: Mutex<Vec<Result<String, LlmError>>>,
    }

    impl ScriptedRunner {
        fn new(
            structured: Vec<Result<Value, LlmError>>,
            raw: Vec<Result<String, LlmError>>,
        ) -> Self {
            Self {
                structured: Mutex::new(structured),
                raw: Mutex::new(raw),
            }
        }
    }

    impl RulePromptRunner for ScriptedRunner {
        async fn run_structured(&self, _m: &[PromptMessage]) -> Result<Value, LlmError> {
            self.structured
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(LlmError::EmptyChoices))
        }

        async fn run_raw(&self, _m: &[PromptMessage]) -> Result<String, LlmError> {
            self.raw
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(LlmError::EmptyChoices))
        }
    }

    #[tokio::test]
    async fn structured_path_wins_when_clean() {
        let runner = ScriptedRunner::new(
            vec![Ok(json!([{"title": "T", "rule": "R", "severity": "high"}]))],
            vec![],
        );
        let out = convert_file_to_rules(&runner, "a.md", "content").await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].severity, Severity::High);
        assert_eq!(out[0].source_path, "a.md");
    }

    #[tokio::test]
    async fn falls_back_to_raw_extraction() {
        let runner = ScriptedRunner::new(
            vec![Err(LlmError::StructuredParse("not json".into()))],
            vec![Ok(
                "Sure! ```json\n[{\"title\":\"T\",\"rule\":\"R\"}]\n```".to_string()
            )],
        );
        let out = convert_file_to_rules(&runner, "a.md", "content").await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "T");
    }

    #[tokio::test]
    async fn total_failure_yields_empty_not_error() {
        let runner = ScriptedRunner::new(
            vec![Err(LlmError::EmptyChoices)],
            vec![Ok("no json in this reply".to_string())],
        );
        let out = convert_file_to_rules(&runner, "a.md", "content").await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn batch_output_is_capped() {
        let many: Vec<Value> = (0..7)
            .map(|i| json!({"title": format!("T{i}"), "rule": "R"}))
            .collect();
        let runner = ScriptedRunner::new(vec![Ok(Value::Array(many))], vec![]);
        let files = vec![("a.md".to_string(), "x".to_string())];
        let out = convert_files_to_rules_fast_batch(&runner, &files).await;
        assert_eq!(out.len(), BATCH_RULE_CAP);
    }
}
