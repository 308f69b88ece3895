//! Test-time compute search algorithms.
//!
//! Three strategies for spending extra inference compute at answer time,
//! all sharing the [`Algorithm`] contract:
//!
//! | Algorithm | Strategy |
//! |-----------|----------|
//! | [`Baseline`] | one temperature-sampled generation |
//! | [`BeamSearch`] | fixed-width set of candidates, expanded step-wise |
//! | [`Mcts`] | UCB1-guided tree over partial answers, robust-child pick |
//!
//! Each algorithm owns a shared backend handle and produces an
//! [`AlgorithmResult`]; the evaluation runner stamps latency and the
//! combined score afterwards.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use ponder_core::backend::{GenerationResult, ScriptedBackend};
//! use ponder_core::search::{Algorithm, Baseline, BaselineConfig};
//!
//! let backend = Arc::new(ScriptedBackend::new(vec![GenerationResult::new(
//!     "回答です。",
//!     vec![-0.2, -0.1],
//! )]));
//! let baseline = Baseline::new(backend, BaselineConfig::default());
//! let result = baseline.run("質問:").unwrap();
//! assert_eq!(result.total_tokens, 2);
//! ```

mod algorithm;
mod baseline;
mod beam;
mod mcts;

pub use algorithm::{Algorithm, AlgorithmResult};
pub use baseline::{Baseline, BaselineConfig};
pub use beam::{BeamConfig, BeamSearch};
pub use mcts::{Mcts, MctsConfig};
