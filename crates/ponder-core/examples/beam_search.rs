//! Beam search example.
//!
//! Runs beam search offline against a scripted backend so the mechanics
//! are visible without a model server: the better-scored continuation
//! chain wins even though both branches survive every step.

use std::sync::Arc;

use ponder_core::backend::{GenerationResult, ScriptedBackend};
use ponder_core::search::{Algorithm, BeamConfig, BeamSearch};

fn main() -> ponder_core::Result<()> {
    // Every call returns a confident and a hesitant continuation.
    let backend = Arc::new(ScriptedBackend::new(vec![
        GenerationResult::new("まず両辺を整理します。", vec![-0.2, -0.1, -0.15]),
        GenerationResult::new("ええと、たぶん", vec![-1.2, -0.9, -1.5]),
    ]));

    let beam = BeamSearch::new(
        backend,
        BeamConfig {
            beam_width: 2,
            max_steps: 3,
            step_tokens: 30,
            temperature: 0.7,
        },
    );

    let result = beam.run("次の方程式を解いてください: 2x + 3 = 11\n")?;

    println!("answer: {}", result.answer);
    println!("score: {:.4}", result.score);
    println!("total tokens: {}", result.total_tokens);
    println!("metadata: {:#?}", result.metadata);
    Ok(())
}
