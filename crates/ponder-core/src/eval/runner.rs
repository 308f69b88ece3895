//! Evaluation runner.
//!
//! Drives every configured algorithm over a prompt or a benchmark set,
//! timing each run, scoring it through the scoring engine, and
//! aggregating the outcomes.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::problem::BenchmarkProblem;
use crate::backend::GenerationBackend;
use crate::error::Result;
use crate::scoring::{combined_score, extract_choice, ScoreWeights};
use crate::search::{Algorithm, AlgorithmResult};

/// All algorithm results for one benchmark problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalResult {
    /// The problem that was evaluated.
    pub problem: BenchmarkProblem,
    /// Results keyed by algorithm name.
    pub results: BTreeMap<String, AlgorithmResult>,
}

/// Aggregated outcome of a whole benchmark run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvalSummary {
    /// Per-problem results, in input problem order.
    pub eval_results: Vec<EvalResult>,
    /// Wall-clock duration of the whole batch.
    pub total_latency_seconds: f64,
}

/// Per-algorithm averages over a benchmark run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlgorithmAverages {
    /// Mean combined score.
    pub mean_score: f64,
    /// Mean per-run latency.
    pub mean_latency_seconds: f64,
    /// Mean token spend.
    pub mean_tokens: f64,
    /// Fraction of ground-truth problems answered correctly; absent when
    /// no problem carried ground truth.
    pub accuracy: Option<f64>,
}

impl EvalSummary {
    /// Average score, latency, and token spend per algorithm, plus
    /// multiple-choice accuracy over the problems that have ground truth.
    pub fn algorithm_averages(&self) -> BTreeMap<String, AlgorithmAverages> {
        #[derive(Default)]
        struct Tally {
            runs: usize,
            score: f64,
            latency: f64,
            tokens: f64,
            scored: usize,
            correct: usize,
        }

        let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();
        for eval in &self.eval_results {
            let has_truth = eval.problem.correct_answer.is_some();
            for (name, result) in &eval.results {
                let tally = tallies.entry(name.clone()).or_default();
                tally.runs += 1;
                tally.score += result.score;
                tally.latency += result.latency_seconds;
                tally.tokens += result.total_tokens as f64;
                if has_truth {
                    tally.scored += 1;
                    if result.metadata.get("is_correct").and_then(|v| v.as_bool()) == Some(true) {
                        tally.correct += 1;
                    }
                }
            }
        }

        tallies
            .into_iter()
            .map(|(name, tally)| {
                let runs = tally.runs.max(1) as f64;
                let averages = AlgorithmAverages {
                    mean_score: tally.score / runs,
                    mean_latency_seconds: tally.latency / runs,
                    mean_tokens: tally.tokens / runs,
                    accuracy: (tally.scored > 0)
                        .then(|| tally.correct as f64 / tally.scored as f64),
                };
                (name, averages)
            })
            .collect()
    }
}

/// Runs every configured algorithm per prompt and scores the outcomes.
///
/// The backend handle is shared read-only with the algorithms; the
/// runner uses it only for self-evaluation scoring. Execution is fully
/// synchronous, one algorithm and one problem at a time.
pub struct EvalRunner {
    backend: Arc<dyn GenerationBackend>,
    algorithms: Vec<Box<dyn Algorithm>>,
    weights: ScoreWeights,
}

impl EvalRunner {
    /// Create a runner over `backend` and the algorithms to compare.
    pub fn new(backend: Arc<dyn GenerationBackend>, algorithms: Vec<Box<dyn Algorithm>>) -> Self {
        Self {
            backend,
            algorithms,
            weights: ScoreWeights::default(),
        }
    }

    /// Override the free-form scoring weights.
    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Run every algorithm against one prompt.
    ///
    /// Each result gets its latency stamped (timer scoped around the
    /// call) and its combined score computed; with `correct_answer`
    /// given, `extracted_choice` and `is_correct` metadata are stamped
    /// as well.
    pub fn run_single(
        &self,
        prompt: &str,
        correct_answer: Option<&str>,
    ) -> Result<BTreeMap<String, AlgorithmResult>> {
        let mut results = BTreeMap::new();
        for algorithm in &self.algorithms {
            let start = Instant::now();
            let outcome = algorithm.run(prompt);
            let latency = start.elapsed().as_secs_f64();
            let mut result = outcome?;
            result.latency_seconds = latency;

            let logprobs = result.recorded_logprobs();
            result.score = combined_score(
                self.backend.as_ref(),
                prompt,
                &result.answer,
                &logprobs,
                correct_answer,
                &self.weights,
            )?;

            if let Some(correct) = correct_answer {
                let extracted = extract_choice(&result.answer);
                result.metadata.insert(
                    "extracted_choice".to_string(),
                    extracted.map_or(json!(null), |c| json!(c.to_string())),
                );
                let is_correct = extracted.is_some_and(|c| {
                    correct
                        .trim()
                        .chars()
                        .next()
                        .is_some_and(|expected| expected.to_ascii_uppercase() == c)
                });
                result
                    .metadata
                    .insert("is_correct".to_string(), json!(is_correct));
            }

            info!(
                algorithm = algorithm.name(),
                score = result.score,
                latency_seconds = result.latency_seconds,
                tokens = result.total_tokens,
                "algorithm run complete"
            );
            results.insert(algorithm.name().to_string(), result);
        }
        Ok(results)
    }

    /// Run every algorithm over an ordered benchmark set.
    ///
    /// Problems are processed strictly in input order and the summary
    /// preserves that order. A backend failure aborts the whole batch.
    pub fn run_benchmark(&self, problems: &[BenchmarkProblem]) -> Result<EvalSummary> {
        let batch_start = Instant::now();
        let mut eval_results = Vec::with_capacity(problems.len());
        for problem in problems {
            info!(problem = %problem.id, category = %problem.category, "evaluating problem");
            let results = self.run_single(&problem.prompt, problem.correct_answer.as_deref())?;
            eval_results.push(EvalResult {
                problem: problem.clone(),
                results,
            });
        }
        Ok(EvalSummary {
            eval_results,
            total_latency_seconds: batch_start.elapsed().as_secs_f64(),
        })
    }
}
