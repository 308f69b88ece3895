//! Benchmark problem record.

use serde::{Deserialize, Serialize};

/// One benchmark problem, supplied by an external corpus and consumed
/// read-only by the runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkProblem {
    /// Stable problem identifier.
    pub id: String,
    /// Problem category (論理推論, 数学, ...).
    pub category: String,
    /// Prompt presented to every algorithm.
    pub prompt: String,
    /// Single correct letter for multiple-choice problems.
    #[serde(default)]
    pub correct_answer: Option<String>,
    /// Answer options for multiple-choice problems.
    #[serde(default)]
    pub choices: Option<Vec<String>>,
}

impl BenchmarkProblem {
    /// Create a free-form problem without ground truth.
    pub fn new(
        id: impl Into<String>,
        category: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            prompt: prompt.into(),
            correct_answer: None,
            choices: None,
        }
    }

    /// Attach the correct multiple-choice letter.
    pub fn with_correct_answer(mut self, letter: impl Into<String>) -> Self {
        self.correct_answer = Some(letter.into());
        self
    }

    /// Attach the multiple-choice options.
    pub fn with_choices(mut self, choices: Vec<String>) -> Self {
        self.choices = Some(choices);
        self
    }
}
