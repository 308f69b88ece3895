//! Scoring engine.
//!
//! Turns heterogeneous signals (model confidence, self-critique, answer
//! length, ground-truth match) into a single comparable number in [0, 1]:
//!
//! | Function | Signal |
//! |----------|--------|
//! | [`logprob_score`] | model confidence from token log-probabilities |
//! | [`length_penalty_score`] | closeness of word count to a target |
//! | [`self_evaluation_score`] | the model rating its own answer 1–10 |
//! | [`accuracy_score`] | multiple-choice match against ground truth |
//! | [`combined_score`] | weighted blend of the above |

use once_cell::sync::Lazy;
use regex::Regex;

use crate::backend::{ChatMessage, GenerationBackend};
use crate::error::Result;

/// Weights and shape parameters for [`combined_score`] without ground truth.
///
/// When a correct answer is supplied the fixed accuracy-heavy regime
/// {0.7 accuracy, 0.2 logprob, 0.1 self-eval} applies instead and these
/// weights are ignored.
#[derive(Debug, Clone)]
pub struct ScoreWeights {
    /// Weight of the self-evaluation signal.
    pub self_eval: f64,
    /// Weight of the log-probability confidence signal.
    pub logprob: f64,
    /// Weight of the length penalty signal.
    pub length: f64,
    /// Word count at which the length penalty peaks.
    pub target_length: usize,
    /// Width of the length penalty curve.
    pub tolerance: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            self_eval: 0.5,
            logprob: 0.3,
            length: 0.2,
            target_length: 200,
            tolerance: 0.5,
        }
    }
}

const SELF_EVAL_PROMPT: &str = "以下の回答を1〜10のスコアで評価してください。
スコアのみを整数で回答してください。他のテキストは不要です。

質問: {question}
回答: {answer}

スコア:";

/// Convert token log-probabilities into a (0, 1] confidence proxy.
///
/// `exp(mean(logprobs))`: log-probabilities are negative, and the closer
/// the mean is to 0 the more confident the model was. Empty input scores
/// 0.0.
pub fn logprob_score(logprobs: &[f64]) -> f64 {
    if logprobs.is_empty() {
        return 0.0;
    }
    let avg = logprobs.iter().sum::<f64>() / logprobs.len() as f64;
    avg.exp()
}

/// Score how close the answer's word count is to `target_length`.
///
/// Gaussian-shaped: peaks at 1.0 exactly when the word count equals the
/// target and decays as the ratio diverges in either direction. Empty
/// text scores 0.0.
pub fn length_penalty_score(text: &str, target_length: usize, tolerance: f64) -> f64 {
    let words = text.split_whitespace().count();
    if words == 0 {
        return 0.0;
    }
    let ratio = words as f64 / target_length as f64;
    (-(ratio - 1.0).powi(2) / (2.0 * tolerance * tolerance)).exp()
}

/// Ask the backend to rate `answer` on a 1–10 scale, normalized to [0, 1].
///
/// The first run of digits in the reply is taken as the rating. A reply
/// with no digits recovers locally to 0.5; only a failed chat round trip
/// is an error.
pub fn self_evaluation_score(
    backend: &dyn GenerationBackend,
    question: &str,
    answer: &str,
) -> Result<f64> {
    static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("digit pattern"));

    let prompt = SELF_EVAL_PROMPT
        .replace("{question}", question)
        .replace("{answer}", answer);
    let response = backend.chat(&[ChatMessage::user(prompt)], 0.0, 16)?;

    let score = match DIGITS.find(&response) {
        Some(m) => {
            let rating: f64 = m.as_str().parse().unwrap_or(0.0);
            (rating / 10.0).clamp(0.0, 1.0)
        }
        None => 0.5,
    };
    Ok(score)
}

/// Extract a multiple-choice letter (A–D, uppercase) from an answer.
///
/// Patterns are tried in priority order:
/// 1. text begins with a letter, optionally followed by punctuation and
///    whitespace (`"B. 正解は..."`)
/// 2. the whole trimmed text is exactly one letter
/// 3. a keyword-prefixed pattern (`"答えはB"`, `"正解: C"`)
/// 4. the first letter not adjacent to another ASCII letter on either
///    side (so `"ABC"` inside a token never matches)
pub fn extract_choice(text: &str) -> Option<char> {
    static LEADING: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^([A-Da-d])\s*[.。)）:：]?\s").expect("leading pattern"));
    static KEYWORD: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?:答え|回答|正解|選択)[はがをの：:]\s*([A-Da-d])").expect("keyword pattern")
    });

    let normalized = text.trim();
    if normalized.is_empty() {
        return None;
    }

    if let Some(caps) = LEADING.captures(normalized) {
        return caps[1].chars().next().map(|c| c.to_ascii_uppercase());
    }

    let mut chars = normalized.chars();
    if let (Some(only), None) = (chars.next(), chars.next()) {
        if matches!(only, 'A'..='D' | 'a'..='d') {
            return Some(only.to_ascii_uppercase());
        }
    }

    if let Some(caps) = KEYWORD.captures(normalized) {
        return caps[1].chars().next().map(|c| c.to_ascii_uppercase());
    }

    // Standalone letter: neither neighbor may be an ASCII letter. The
    // regex crate has no lookaround, so scan by hand.
    let chars: Vec<char> = normalized.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if !matches!(c, 'A'..='D' | 'a'..='d') {
            continue;
        }
        let prev_ok = i == 0 || !chars[i - 1].is_ascii_alphabetic();
        let next_ok = i + 1 == chars.len() || !chars[i + 1].is_ascii_alphabetic();
        if prev_ok && next_ok {
            return Some(c.to_ascii_uppercase());
        }
    }

    None
}

/// Multiple-choice correctness: 1.0 on a match, 0.0 otherwise.
///
/// An answer with no extractable letter is incorrect, not an error.
pub fn accuracy_score(answer: &str, correct_answer: &str) -> f64 {
    match extract_choice(answer) {
        Some(extracted) => {
            let matches = correct_answer
                .trim()
                .chars()
                .next()
                .is_some_and(|c| c.to_ascii_uppercase() == extracted);
            if matches {
                1.0
            } else {
                0.0
            }
        }
        None => 0.0,
    }
}

/// Blend the individual signals into one score.
///
/// With `correct_answer`: `0.7·accuracy + 0.2·logprob + 0.1·self_eval`.
/// Without: `weights.self_eval·self_eval + weights.logprob·logprob +
/// weights.length·length_penalty`.
pub fn combined_score(
    backend: &dyn GenerationBackend,
    question: &str,
    answer: &str,
    logprobs: &[f64],
    correct_answer: Option<&str>,
    weights: &ScoreWeights,
) -> Result<f64> {
    if let Some(correct) = correct_answer {
        let s_accuracy = accuracy_score(answer, correct);
        let s_logprob = logprob_score(logprobs);
        let s_eval = self_evaluation_score(backend, question, answer)?;
        return Ok(0.7 * s_accuracy + 0.2 * s_logprob + 0.1 * s_eval);
    }

    let s_eval = self_evaluation_score(backend, question, answer)?;
    let s_logprob = logprob_score(logprobs);
    let s_length = length_penalty_score(answer, weights.target_length, weights.tolerance);
    Ok(weights.self_eval * s_eval + weights.logprob * s_logprob + weights.length * s_length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ScriptedBackend;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn logprob_score_empty_is_zero() {
        assert_eq!(logprob_score(&[]), 0.0);
    }

    #[test]
    fn logprob_score_perfect_confidence_is_one() {
        assert!(approx(logprob_score(&[0.0, 0.0, 0.0]), 1.0));
    }

    #[test]
    fn logprob_score_negative_values_in_open_interval() {
        let score = logprob_score(&[-0.1, -0.2, -0.3]);
        assert!(score > 0.0 && score < 1.0);
    }

    #[test]
    fn length_penalty_peaks_at_target() {
        let text = vec!["word"; 200].join(" ");
        assert!(approx(length_penalty_score(&text, 200, 0.5), 1.0));
    }

    #[test]
    fn length_penalty_empty_is_zero() {
        assert_eq!(length_penalty_score("", 200, 0.5), 0.0);
        assert_eq!(length_penalty_score("   ", 200, 0.5), 0.0);
    }

    #[test]
    fn length_penalty_decreases_away_from_target() {
        let short = vec!["word"; 10].join(" ");
        let near = vec!["word"; 150].join(" ");
        let long = vec!["word"; 500].join(" ");
        let at_target = vec!["word"; 200].join(" ");

        let s_short = length_penalty_score(&short, 200, 0.5);
        let s_near = length_penalty_score(&near, 200, 0.5);
        let s_long = length_penalty_score(&long, 200, 0.5);
        let s_target = length_penalty_score(&at_target, 200, 0.5);

        assert!(s_short < s_near);
        assert!(s_near < s_target);
        assert!(s_long < s_target);
        assert!(s_short < 0.5);
    }

    #[test]
    fn self_evaluation_parses_rating() {
        let backend = ScriptedBackend::new(vec![]).with_chat_reply("7");
        let score = self_evaluation_score(&backend, "質問", "回答").unwrap();
        assert!(approx(score, 0.7));
    }

    #[test]
    fn self_evaluation_clamps_out_of_range() {
        let backend = ScriptedBackend::new(vec![]).with_chat_reply("スコア: 15点");
        let score = self_evaluation_score(&backend, "q", "a").unwrap();
        assert_eq!(score, 1.0);
    }

    #[test]
    fn self_evaluation_recovers_without_digits() {
        let backend = ScriptedBackend::new(vec![]).with_chat_reply("評価できません");
        let score = self_evaluation_score(&backend, "q", "a").unwrap();
        assert_eq!(score, 0.5);
    }

    #[test]
    fn extract_choice_single_letters() {
        for (input, expected) in [("A", 'A'), ("B", 'B'), ("C", 'C'), ("D", 'D'), ("b", 'B')] {
            assert_eq!(extract_choice(input), Some(expected));
        }
    }

    #[test]
    fn extract_choice_leading_letter_with_period() {
        assert_eq!(extract_choice("B. 正解は5050です"), Some('B'));
        assert_eq!(extract_choice("C です。二酸化炭素を吸収します。"), Some('C'));
    }

    #[test]
    fn extract_choice_keyword_patterns() {
        assert_eq!(extract_choice("答えはBです"), Some('B'));
        assert_eq!(extract_choice("正解はC"), Some('C'));
        assert_eq!(extract_choice("回答はA"), Some('A'));
    }

    #[test]
    fn extract_choice_embedded_standalone_letter() {
        assert_eq!(extract_choice("私の回答はDだと思います"), Some('D'));
    }

    #[test]
    fn extract_choice_adjacency_guard() {
        assert_eq!(extract_choice("ABCコーポレーション"), None);
    }

    #[test]
    fn extract_choice_empty_and_out_of_range() {
        assert_eq!(extract_choice(""), None);
        assert_eq!(extract_choice("   "), None);
        assert_eq!(extract_choice("Eが正解"), None);
    }

    #[test]
    fn accuracy_score_matches() {
        assert_eq!(accuracy_score("答えはBです。理由は...", "B"), 1.0);
        assert_eq!(accuracy_score("B", "B"), 1.0);
        assert_eq!(accuracy_score("b", "B"), 1.0);
        assert_eq!(accuracy_score("B", "b"), 1.0);
    }

    #[test]
    fn accuracy_score_mismatch_or_missing() {
        assert_eq!(accuracy_score("A", "B"), 0.0);
        assert_eq!(accuracy_score("わかりません", "B"), 0.0);
    }

    #[test]
    fn combined_score_with_ground_truth_weights() {
        // accuracy 1.0, logprob exp(-0.5), self-eval 0.8
        let backend = ScriptedBackend::new(vec![]).with_chat_reply("8");
        let logprobs = [-0.5, -0.5];
        let score = combined_score(
            &backend,
            "質問",
            "答えはBです",
            &logprobs,
            Some("B"),
            &ScoreWeights::default(),
        )
        .unwrap();
        let expected = 0.7 * 1.0 + 0.2 * (-0.5f64).exp() + 0.1 * 0.8;
        assert!(approx(score, expected));
    }

    #[test]
    fn combined_score_without_ground_truth_weights() {
        let backend = ScriptedBackend::new(vec![]).with_chat_reply("6");
        let answer = vec!["word"; 200].join(" ");
        let logprobs = [0.0, 0.0];
        let score = combined_score(
            &backend,
            "質問",
            &answer,
            &logprobs,
            None,
            &ScoreWeights::default(),
        )
        .unwrap();
        // self-eval 0.6, logprob 1.0, length penalty 1.0 at target
        let expected = 0.5 * 0.6 + 0.3 * 1.0 + 0.2 * 1.0;
        assert!(approx(score, expected));
    }

    #[test]
    fn combined_score_custom_weights() {
        let backend = ScriptedBackend::new(vec![]).with_chat_reply("10");
        let weights = ScoreWeights {
            self_eval: 1.0,
            logprob: 0.0,
            length: 0.0,
            ..ScoreWeights::default()
        };
        let score = combined_score(&backend, "q", "a", &[], None, &weights).unwrap();
        assert!(approx(score, 1.0));
    }
}
