//! The shared algorithm contract and its result record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Result;

/// Outcome of one algorithm invocation.
///
/// Created once per `run`, then mutated exactly twice by the evaluation
/// runner: the latency is stamped, and the combined score replaces
/// whatever raw score the algorithm itself recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmResult {
    /// Name of the algorithm that produced this result.
    pub algorithm_name: String,
    /// Final answer text.
    pub answer: String,
    /// Combined score in [0, 1], stamped by the runner.
    pub score: f64,
    /// Tokens generated across every backend call, pruned branches included.
    pub total_tokens: usize,
    /// Wall-clock duration of `run`, stamped by the runner.
    pub latency_seconds: f64,
    /// Algorithm-specific details (average log-probability, tree size,
    /// extracted choice letter, correctness flag, ...).
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl AlgorithmResult {
    /// Create a result with zeroed score, tokens, and latency.
    pub fn new(algorithm_name: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            algorithm_name: algorithm_name.into(),
            answer: answer.into(),
            score: 0.0,
            total_tokens: 0,
            latency_seconds: 0.0,
            metadata: BTreeMap::new(),
        }
    }

    /// Record the answer's token log-probabilities so the runner can
    /// score confidence.
    pub(crate) fn record_logprobs(&mut self, logprobs: &[f64]) {
        self.metadata.insert("logprobs".to_string(), json!(logprobs));
    }

    /// Token log-probabilities recorded by the algorithm, empty when absent.
    pub fn recorded_logprobs(&self) -> Vec<f64> {
        self.metadata
            .get("logprobs")
            .and_then(|v| v.as_array())
            .map(|values| values.iter().filter_map(|v| v.as_f64()).collect())
            .unwrap_or_default()
    }
}

/// A test-time compute strategy.
///
/// Implementations consume a prompt and a backend handle (held by the
/// implementation) and produce an [`AlgorithmResult`]. `run` performs no
/// timing of its own; the runner wraps the call.
pub trait Algorithm: Send + Sync {
    /// Display name, used as the key in evaluation mappings.
    fn name(&self) -> &str;

    /// Execute the strategy against `prompt`.
    fn run(&self, prompt: &str) -> Result<AlgorithmResult>;
}

/// Arithmetic mean of token log-probabilities, 0.0 when empty.
pub(crate) fn mean_logprob(logprobs: &[f64]) -> f64 {
    if logprobs.is_empty() {
        return 0.0;
    }
    logprobs.iter().sum::<f64>() / logprobs.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_logprobs_round_trip() {
        let mut result = AlgorithmResult::new("Baseline", "answer");
        result.record_logprobs(&[-0.5, -0.25]);
        assert_eq!(result.recorded_logprobs(), vec![-0.5, -0.25]);
    }

    #[test]
    fn recorded_logprobs_absent_is_empty() {
        let result = AlgorithmResult::new("Baseline", "answer");
        assert!(result.recorded_logprobs().is_empty());
    }

    #[test]
    fn mean_logprob_empty_is_zero() {
        assert_eq!(mean_logprob(&[]), 0.0);
        assert_eq!(mean_logprob(&[-0.5, -0.3, -0.2, -0.1, -0.4]), -0.3);
    }
}
