//! # Ponder
//!
//! Test-time compute comparison for LLMs: spend extra inference compute
//! at answer time — multiple samples, beam search, tree search — and
//! measure what it buys over a single greedy decode.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ponder::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let backend = Arc::new(HttpBackend::new("http://localhost:8000/v1", "default"));
//!
//!     let runner = EvalRunner::new(
//!         backend.clone(),
//!         vec![
//!             Box::new(Baseline::new(backend.clone(), BaselineConfig::default())),
//!             Box::new(BeamSearch::new(backend.clone(), BeamConfig::default())),
//!             Box::new(Mcts::new(backend, MctsConfig::default())),
//!         ],
//!     );
//!
//!     let results = runner.run_single("1から100までの整数の合計は？", None)?;
//!     for (name, result) in &results {
//!         println!("{name}: {:.3} ({:.1}s)", result.score, result.latency_seconds);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// Re-export core crate
pub use ponder_core::*;

mod client;

pub use client::HttpBackend;

/// Commonly used types.
pub mod prelude {
    pub use crate::client::HttpBackend;
    pub use ponder_core::prelude::*;
}
