//! LLM prompt runner with provider fallback.
//!
//! Small crate exposing:
//! - [`config::LlmModelConfig`] / [`config::LlmProvider`] — immutable
//!   per-call configuration value objects (env-loadable).
//! - [`ollama::OllamaService`] / [`openai::OpenAiService`] — thin,
//!   non-streaming reqwest clients.
//! - [`chain::PromptChain`] — primary + fallback orchestration with a raw
//!   text mode and a strict-JSON structured mode.
//!
//! No async-trait and no heap trait objects; dispatch over providers is
//! enum-based and each call constructs its own immutable chain.

pub mod chain;
pub mod config;
pub mod errors;
pub mod ollama;
pub mod openai;

pub use chain::{PromptChain, PromptMessage, PromptRole};
pub use config::{LlmModelConfig, LlmProvider};
pub use errors::{LlmError, LlmResult};
