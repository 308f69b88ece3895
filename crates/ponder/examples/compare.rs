//! Compare all three algorithms on one prompt against a live server.
//!
//! Point it at any OpenAI-compatible endpoint:
//!
//! ```sh
//! PONDER_BASE_URL=http://localhost:8000/v1 PONDER_MODEL=default \
//!     cargo run --example compare
//! ```

use std::sync::Arc;

use ponder::prelude::*;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ponder=info,ponder_core=info".into()),
        )
        .init();

    let base_url =
        std::env::var("PONDER_BASE_URL").unwrap_or_else(|_| "http://localhost:8000/v1".to_string());
    let model = std::env::var("PONDER_MODEL").unwrap_or_else(|_| "default".to_string());
    let backend = Arc::new(HttpBackend::new(base_url, model));

    let runner = EvalRunner::new(
        backend.clone(),
        vec![
            Box::new(Baseline::new(backend.clone(), BaselineConfig::default())),
            Box::new(BeamSearch::new(
                backend.clone(),
                BeamConfig {
                    beam_width: 2,
                    max_steps: 2,
                    ..BeamConfig::default()
                },
            )),
            Box::new(Mcts::new(
                backend.clone(),
                MctsConfig {
                    num_iterations: 5,
                    expansion_width: 2,
                    max_depth: 3,
                    ..MctsConfig::default()
                },
            )),
        ],
    );

    let prompt = "1から100までの整数の合計はいくつですか？計算過程も示してください。\n";
    let results = runner.run_single(prompt, None)?;

    println!("\n{:<12} {:>8} {:>10} {:>8}", "algorithm", "score", "latency", "tokens");
    for (name, result) in &results {
        println!(
            "{:<12} {:>8.3} {:>9.2}s {:>8}",
            name, result.score, result.latency_seconds, result.total_tokens
        );
    }
    if let Some((name, best)) = results
        .iter()
        .max_by(|a, b| a.1.score.total_cmp(&b.1.score))
    {
        println!("\nbest ({name}):\n{}", best.answer);
    }
    Ok(())
}
