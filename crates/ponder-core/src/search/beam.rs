//! Beam search over step-wise text continuations.
//!
//! # Algorithm
//!
//! 1. Sample `beam_width` initial continuations of the prompt
//! 2. For each further step:
//!    a. Expand every candidate with `beam_width` continuations
//!    b. Score every expansion by `exp(mean(cumulative logprobs))`
//!    c. Keep the top `beam_width` (stable sort, ties by encounter order)
//! 3. Return the highest-scoring survivor

use std::cmp::Ordering;
use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use super::algorithm::{mean_logprob, Algorithm, AlgorithmResult};
use crate::backend::{GenerateParams, GenerationBackend};
use crate::error::{BackendError, Result};
use crate::scoring::logprob_score;

/// Configuration for beam search.
#[derive(Debug, Clone)]
pub struct BeamConfig {
    /// Number of candidates kept at each step.
    pub beam_width: usize,
    /// Maximum number of expansion steps.
    pub max_steps: usize,
    /// Tokens generated per step and candidate.
    pub step_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

impl Default for BeamConfig {
    fn default() -> Self {
        Self {
            beam_width: 3,
            max_steps: 3,
            step_tokens: 50,
            temperature: 0.7,
        }
    }
}

/// A candidate in the beam. Superseded each step.
#[derive(Debug, Clone)]
struct Beam {
    /// Cumulative generated text.
    text: String,
    /// Cumulative token log-probabilities.
    logprobs: Vec<f64>,
    /// `exp(mean(logprobs))`, 0.0 with no log-probabilities.
    score: f64,
}

/// Beam search implementation.
pub struct BeamSearch {
    backend: Arc<dyn GenerationBackend>,
    config: BeamConfig,
}

impl BeamSearch {
    /// Create a beam search over `backend`.
    pub fn new(backend: Arc<dyn GenerationBackend>, config: BeamConfig) -> Self {
        Self { backend, config }
    }

    fn step_params(&self) -> GenerateParams {
        GenerateParams {
            n: self.config.beam_width,
            temperature: self.config.temperature,
            max_tokens: self.config.step_tokens,
            logprobs: true,
            ..GenerateParams::default()
        }
    }
}

/// Whether a candidate reads as a finished sentence.
///
/// Only the current survivors are inspected, right before the next
/// expansion step; candidates that finished early but fell out of the
/// beam are indistinguishable from truncated ones.
fn ends_sentence(text: &str) -> bool {
    let trimmed = text.trim_end();
    trimmed.ends_with('.') || trimmed.ends_with('。') || trimmed.ends_with('\n')
}

impl Algorithm for BeamSearch {
    fn name(&self) -> &str {
        "Beam Search"
    }

    fn run(&self, prompt: &str) -> Result<AlgorithmResult> {
        let params = self.step_params();

        let initial = self.backend.generate(prompt, &params)?;
        let mut beams: Vec<Beam> = initial
            .into_iter()
            .map(|gen| Beam {
                score: logprob_score(&gen.logprobs),
                text: gen.text,
                logprobs: gen.logprobs,
            })
            .collect();
        let mut total_tokens: usize = beams.iter().map(|b| b.logprobs.len()).sum();

        for step in 1..self.config.max_steps {
            if beams.iter().all(|b| ends_sentence(&b.text)) {
                debug!(step, "all survivors finished, stopping early");
                break;
            }

            let mut candidates: Vec<Beam> = Vec::with_capacity(beams.len() * self.config.beam_width);
            for beam in &beams {
                let continuations = self
                    .backend
                    .generate(&format!("{prompt}{}", beam.text), &params)?;
                for gen in continuations {
                    total_tokens += gen.logprobs.len();
                    let mut logprobs = beam.logprobs.clone();
                    logprobs.extend_from_slice(&gen.logprobs);
                    candidates.push(Beam {
                        text: format!("{}{}", beam.text, gen.text),
                        score: logprob_score(&logprobs),
                        logprobs,
                    });
                }
            }

            // Stable sort keeps encounter order among equal scores.
            candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
            candidates.truncate(self.config.beam_width);
            beams = candidates;
            debug!(step, survivors = beams.len(), total_tokens, "beam step complete");
        }

        // First-encountered maximum wins ties among the final survivors.
        let mut best: Option<&Beam> = None;
        for beam in &beams {
            if best.map_or(true, |b| beam.score > b.score) {
                best = Some(beam);
            }
        }
        let best =
            best.ok_or_else(|| BackendError::Protocol("beam search produced no candidates".to_string()))?;

        let mut result = AlgorithmResult::new(self.name(), best.text.clone());
        result.score = best.score;
        result.total_tokens = total_tokens;
        result
            .metadata
            .insert("avg_logprob".to_string(), json!(mean_logprob(&best.logprobs)));
        result
            .metadata
            .insert("num_beams_explored".to_string(), json!(beams.len()));
        result.record_logprobs(&best.logprobs);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{GenerationResult, ScriptedBackend};

    fn two_samples() -> Vec<GenerationResult> {
        vec![
            GenerationResult::new("候補A", vec![-0.2, -0.1]),
            GenerationResult::new("候補B", vec![-0.5, -0.3]),
        ]
    }

    #[test]
    fn single_step_picks_best_initial_sample() {
        let backend = Arc::new(ScriptedBackend::new(two_samples()));
        let algo = BeamSearch::new(
            backend.clone(),
            BeamConfig {
                beam_width: 2,
                max_steps: 1,
                ..BeamConfig::default()
            },
        );

        let result = algo.run("テスト").unwrap();

        // exp(mean([-0.2, -0.1])) > exp(mean([-0.5, -0.3]))
        assert_eq!(result.answer, "候補A");
        assert_eq!(result.total_tokens, 4);
        assert_eq!(result.metadata["num_beams_explored"], json!(2));
        assert_eq!(backend.generate_calls(), 1);
    }

    #[test]
    fn expands_every_survivor_and_counts_pruned_tokens() {
        // Step 0: one call. Step 1: one call per survivor, two samples each.
        let backend = Arc::new(ScriptedBackend::new(two_samples()));
        let algo = BeamSearch::new(
            backend.clone(),
            BeamConfig {
                beam_width: 2,
                max_steps: 2,
                ..BeamConfig::default()
            },
        );

        let result = algo.run("テスト").unwrap();

        assert_eq!(backend.generate_calls(), 3);
        // 4 initial tokens + 2 survivors * 2 continuations * 2 tokens,
        // pruned candidates included.
        assert_eq!(result.total_tokens, 12);
        // The winner extends the better initial candidate with the better
        // continuation.
        assert_eq!(result.answer, "候補A候補A");
        assert_eq!(result.recorded_logprobs(), vec![-0.2, -0.1, -0.2, -0.1]);
    }

    #[test]
    fn stops_early_when_all_survivors_end_sentences() {
        let finished = vec![
            GenerationResult::new("回答です。", vec![-0.2, -0.1]),
            GenerationResult::new("別の回答です。", vec![-0.4, -0.3]),
        ];
        let backend = Arc::new(ScriptedBackend::new(finished));
        let algo = BeamSearch::new(
            backend.clone(),
            BeamConfig {
                beam_width: 2,
                max_steps: 5,
                ..BeamConfig::default()
            },
        );

        let result = algo.run("テスト").unwrap();

        // Every initial sample ends with 。 so no expansion step runs.
        assert_eq!(backend.generate_calls(), 1);
        assert_eq!(result.answer, "回答です。");
    }

    #[test]
    fn winner_is_a_final_survivor() {
        let backend = Arc::new(ScriptedBackend::new(two_samples()));
        let algo = BeamSearch::new(
            backend,
            BeamConfig {
                beam_width: 2,
                max_steps: 3,
                ..BeamConfig::default()
            },
        );

        let result = algo.run("テスト").unwrap();
        // Answers are concatenations of scripted fragments; three steps of
        // the better continuation dominate.
        assert_eq!(result.answer, "候補A候補A候補A");
    }

    #[test]
    fn trailing_newline_counts_as_finished() {
        assert!(ends_sentence("answer.\n"));
        assert!(ends_sentence("回答です。"));
        assert!(ends_sentence("line one."));
        assert!(!ends_sentence("unfinished answer"));
    }
}
