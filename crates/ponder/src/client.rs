//! OpenAI-compatible HTTP backend.
//!
//! Talks to any server implementing the OpenAI completions API format —
//! vLLM, llama.cpp, LM Studio, or a hosted endpoint. `generate` uses
//! `/completions` so per-token log-probabilities come back; `chat` uses
//! `/chat/completions` and is only needed for self-evaluation scoring.
//!
//! Calls block until the server responds; failures map to
//! [`BackendError`] and abort the in-progress algorithm run — retry
//! policy, if any, belongs to the server side or a wrapping backend.

use ponder_core::backend::{ChatMessage, GenerateParams, GenerationBackend, GenerationResult};
use ponder_core::{BackendError, Result};
use reqwest::blocking::Client;
use serde_json::{json, Value};
use tracing::debug;

/// Blocking client for an OpenAI-compatible completion server.
pub struct HttpBackend {
    base_url: String,
    model: String,
    api_key: String,
    client: Client,
}

impl HttpBackend {
    /// Create a client for the server at `base_url` (e.g.
    /// `http://localhost:8000/v1`) and the given model name.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: "dummy".to_string(),
            client: Client::new(),
        }
    }

    /// Set the bearer token; local servers usually accept the default.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    fn post(&self, path: &str, body: Value) -> Result<Value> {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json()
            .map_err(|e| BackendError::Protocol(e.to_string()))
    }
}

impl Default for HttpBackend {
    fn default() -> Self {
        Self::new("http://localhost:8000/v1", "default")
    }
}

impl GenerationBackend for HttpBackend {
    fn generate(&self, prompt: &str, params: &GenerateParams) -> Result<Vec<GenerationResult>> {
        debug!(
            n = params.n,
            max_tokens = params.max_tokens,
            logprobs = params.logprobs,
            "completion request"
        );
        let body = completion_body(&self.model, prompt, params);
        let response = self.post("completions", body)?;
        parse_completion_choices(&response, params.logprobs)
    }

    fn chat(&self, messages: &[ChatMessage], temperature: f64, max_tokens: u32) -> Result<String> {
        debug!(messages = messages.len(), max_tokens, "chat request");
        let body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": temperature,
            "max_tokens": max_tokens,
        });
        let response = self.post("chat/completions", body)?;
        parse_chat_content(&response)
    }
}

/// Build the `/completions` request body.
fn completion_body(model: &str, prompt: &str, params: &GenerateParams) -> Value {
    let mut body = json!({
        "model": model,
        "prompt": prompt,
        "n": params.n,
        "temperature": params.temperature,
        "top_p": params.top_p,
        "max_tokens": params.max_tokens,
    });
    if params.logprobs {
        body["logprobs"] = json!(1);
    }
    if let Some(stop) = &params.stop {
        body["stop"] = json!(stop);
    }
    body
}

/// Parse `/completions` choices into generation results.
///
/// Servers report a `null` log-probability for some tokens (typically the
/// first); those entries are dropped, matching the token accounting the
/// algorithms expect.
fn parse_completion_choices(response: &Value, want_logprobs: bool) -> Result<Vec<GenerationResult>> {
    let choices = response
        .get("choices")
        .and_then(|v| v.as_array())
        .ok_or_else(|| BackendError::Protocol("response has no choices array".to_string()))?;

    let mut results = Vec::with_capacity(choices.len());
    for choice in choices {
        let text = choice
            .get("text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| BackendError::Protocol("choice has no text".to_string()))?
            .to_string();

        let logprobs = if want_logprobs {
            choice
                .get("logprobs")
                .and_then(|v| v.get("token_logprobs"))
                .and_then(|v| v.as_array())
                .map(|values| values.iter().filter_map(|v| v.as_f64()).collect())
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        let finish_reason = choice
            .get("finish_reason")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        results.push(GenerationResult {
            text,
            logprobs,
            finish_reason,
        });
    }
    Ok(results)
}

/// Parse the answer text out of a `/chat/completions` response.
fn parse_chat_content(response: &Value) -> Result<String> {
    let content = response
        .get("choices")
        .and_then(|v| v.as_array())
        .and_then(|choices| choices.first())
        .ok_or_else(|| BackendError::Protocol("chat response has no choices".to_string()))?
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    Ok(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_body_includes_logprobs_flag_only_when_requested() {
        let params = GenerateParams {
            n: 3,
            logprobs: true,
            ..GenerateParams::default()
        };
        let body = completion_body("default", "プロンプト", &params);
        assert_eq!(body["n"], json!(3));
        assert_eq!(body["logprobs"], json!(1));
        assert!(body.get("stop").is_none());

        let plain = completion_body("default", "p", &GenerateParams::default());
        assert!(plain.get("logprobs").is_none());
    }

    #[test]
    fn completion_body_includes_stop_sequences() {
        let params = GenerateParams {
            stop: Some(vec!["\n\n".to_string()]),
            ..GenerateParams::default()
        };
        let body = completion_body("m", "p", &params);
        assert_eq!(body["stop"], json!(["\n\n"]));
    }

    #[test]
    fn parses_choices_and_filters_null_logprobs() {
        let response = json!({
            "choices": [
                {
                    "text": "回答です。",
                    "logprobs": {"token_logprobs": [null, -0.5, -0.3]},
                    "finish_reason": "stop"
                },
                {
                    "text": "別の回答",
                    "logprobs": {"token_logprobs": [-0.2]},
                    "finish_reason": null
                }
            ]
        });

        let results = parse_completion_choices(&response, true).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].text, "回答です。");
        assert_eq!(results[0].logprobs, vec![-0.5, -0.3]);
        assert_eq!(results[0].finish_reason.as_deref(), Some("stop"));
        assert_eq!(results[1].logprobs, vec![-0.2]);
        assert!(results[1].finish_reason.is_none());
    }

    #[test]
    fn ignores_logprobs_when_not_requested() {
        let response = json!({
            "choices": [{
                "text": "t",
                "logprobs": {"token_logprobs": [-0.5]},
            }]
        });
        let results = parse_completion_choices(&response, false).unwrap();
        assert!(results[0].logprobs.is_empty());
    }

    #[test]
    fn missing_choices_is_a_protocol_error() {
        let err = parse_completion_choices(&json!({}), true).unwrap_err();
        assert!(matches!(err, BackendError::Protocol(_)));
    }

    #[test]
    fn chat_content_extraction() {
        let response = json!({
            "choices": [{"message": {"role": "assistant", "content": "8"}}]
        });
        assert_eq!(parse_chat_content(&response).unwrap(), "8");

        // A null content collapses to an empty answer, not an error.
        let null_content = json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        });
        assert_eq!(parse_chat_content(&null_content).unwrap(), "");
    }
}
