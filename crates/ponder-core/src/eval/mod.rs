//! Evaluation orchestration.
//!
//! [`EvalRunner`] composes a backend, a list of algorithms, and (for
//! benchmark mode) a list of [`BenchmarkProblem`]s; it drives each
//! algorithm per prompt, times it, scores it, and aggregates the
//! outcomes into [`EvalResult`] / [`EvalSummary`] records for external
//! consumers.

mod problem;
mod runner;

pub use problem::BenchmarkProblem;
pub use runner::{AlgorithmAverages, EvalResult, EvalRunner, EvalSummary};
