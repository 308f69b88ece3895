//! Generation backend contract.
//!
//! The algorithms never talk to a model server directly; they consume the
//! [`GenerationBackend`] trait. A production implementation lives in the
//! `ponder` crate (OpenAI-compatible HTTP), and [`ScriptedBackend`]
//! provides a deterministic in-memory double for tests and offline demos.

mod scripted;

pub use scripted::ScriptedBackend;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One generated sample returned by a backend.
///
/// Immutable once returned. `logprobs` holds one entry per generated
/// token and is empty when log-probabilities were not requested or the
/// backend declined to produce them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Generated text.
    pub text: String,
    /// Per-token log-probabilities, in generation order.
    #[serde(default)]
    pub logprobs: Vec<f64>,
    /// Why generation stopped, if the backend reported it.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl GenerationResult {
    /// Create a result with no finish reason.
    pub fn new(text: impl Into<String>, logprobs: Vec<f64>) -> Self {
        Self {
            text: text.into(),
            logprobs,
            finish_reason: None,
        }
    }
}

/// Sampling parameters for a [`GenerationBackend::generate`] call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateParams {
    /// Number of independent samples to request in this one call.
    pub n: usize,
    /// Sampling temperature.
    pub temperature: f64,
    /// Nucleus sampling mass.
    pub top_p: f64,
    /// Maximum tokens to generate per sample.
    pub max_tokens: u32,
    /// Whether to request per-token log-probabilities.
    pub logprobs: bool,
    /// Stop sequences, if any.
    pub stop: Option<Vec<String>>,
}

impl Default for GenerateParams {
    fn default() -> Self {
        Self {
            n: 1,
            temperature: 0.7,
            top_p: 1.0,
            max_tokens: 512,
            logprobs: false,
            stop: None,
        }
    }
}

/// One message in a chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role (`user`, `assistant`, `system`).
    pub role: String,
    /// Message content.
    pub content: String,
}

impl ChatMessage {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A text-completion backend the search algorithms run against.
///
/// The handle carries only configuration and is shared read-only across
/// algorithms and problems. Every call is a single blocking round trip;
/// any transport or protocol failure surfaces as a
/// [`BackendError`](crate::BackendError) and aborts the in-progress run.
pub trait GenerationBackend: Send + Sync {
    /// Generate `params.n` independent completions of `prompt`.
    ///
    /// When `params.logprobs` is false, every returned result has empty
    /// `logprobs`.
    fn generate(&self, prompt: &str, params: &GenerateParams) -> Result<Vec<GenerationResult>>;

    /// Send a chat request and return the answer text.
    ///
    /// Used only for self-evaluation scoring.
    fn chat(&self, messages: &[ChatMessage], temperature: f64, max_tokens: u32) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_params_defaults() {
        let params = GenerateParams::default();
        assert_eq!(params.n, 1);
        assert_eq!(params.temperature, 0.7);
        assert_eq!(params.top_p, 1.0);
        assert_eq!(params.max_tokens, 512);
        assert!(!params.logprobs);
        assert!(params.stop.is_none());
    }

    #[test]
    fn chat_message_user_role() {
        let msg = ChatMessage::user("こんにちは");
        assert_eq!(msg.role, "user");
        assert_eq!(msg.content, "こんにちは");
    }
}
