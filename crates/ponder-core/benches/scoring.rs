//! Benchmarks for the pure scoring functions.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ponder_core::scoring::{extract_choice, length_penalty_score, logprob_score};

fn bench_logprob_score(c: &mut Criterion) {
    let logprobs: Vec<f64> = (0..512).map(|i| -(i as f64) / 512.0).collect();
    c.bench_function("logprob_score_512", |b| {
        b.iter(|| logprob_score(black_box(&logprobs)))
    });
}

fn bench_length_penalty(c: &mut Criterion) {
    let text = vec!["word"; 180].join(" ");
    c.bench_function("length_penalty_180_words", |b| {
        b.iter(|| length_penalty_score(black_box(&text), 200, 0.5))
    });
}

fn bench_extract_choice(c: &mut Criterion) {
    let inputs = [
        "B. 正解は5050です",
        "答えはCだと思います。理由を説明すると、まず最初に...",
        "ABCコーポレーションの決算について述べた長い文章で、選択肢の文字がなかなか現れないケース",
    ];
    c.bench_function("extract_choice_mixed", |b| {
        b.iter(|| {
            for input in &inputs {
                black_box(extract_choice(black_box(input)));
            }
        })
    });
}

criterion_group!(
    benches,
    bench_logprob_score,
    bench_length_penalty,
    bench_extract_choice
);
criterion_main!(benches);
