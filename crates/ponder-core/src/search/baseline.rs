//! Single-shot baseline.

use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use super::algorithm::{mean_logprob, Algorithm, AlgorithmResult};
use crate::backend::{GenerateParams, GenerationBackend};
use crate::error::{BackendError, Result};

/// Configuration for the baseline.
#[derive(Debug, Clone)]
pub struct BaselineConfig {
    /// Sampling temperature.
    pub temperature: f64,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 512,
        }
    }
}

/// One temperature-sampled generation, no search.
///
/// The reference point every other strategy is compared against:
/// deterministic given a deterministic backend, one round trip, no
/// extra compute spent.
pub struct Baseline {
    backend: Arc<dyn GenerationBackend>,
    config: BaselineConfig,
}

impl Baseline {
    /// Create a baseline over `backend`.
    pub fn new(backend: Arc<dyn GenerationBackend>, config: BaselineConfig) -> Self {
        Self { backend, config }
    }
}

impl Algorithm for Baseline {
    fn name(&self) -> &str {
        "Baseline"
    }

    fn run(&self, prompt: &str) -> Result<AlgorithmResult> {
        let params = GenerateParams {
            n: 1,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            logprobs: true,
            ..GenerateParams::default()
        };
        let gen = self
            .backend
            .generate(prompt, &params)?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Protocol("empty generation batch".to_string()))?;

        // Whitespace token count stands in when no logprobs came back.
        let total_tokens = if gen.logprobs.is_empty() {
            gen.text.split_whitespace().count()
        } else {
            gen.logprobs.len()
        };
        debug!(tokens = total_tokens, "baseline generation complete");

        let mut result = AlgorithmResult::new(self.name(), gen.text);
        result.total_tokens = total_tokens;
        result
            .metadata
            .insert("avg_logprob".to_string(), json!(mean_logprob(&gen.logprobs)));
        result.record_logprobs(&gen.logprobs);
        Ok(result)
    }
}
