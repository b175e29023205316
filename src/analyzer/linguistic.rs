//! Text forensics
//!
//! Three checks over raw text:
//!
//! - **Sentence Burstiness**: people mix short and long sentences, generated
//!   prose drifts towards uniform lengths. Needs more than three sentences.
//! - **Shannon Entropy**: character-level; very low is repetitive, very high
//!   is scrambled.
//! - **Punctuation Analysis**: long text with almost no punctuation.
//!
//! Empty input skips the checks entirely and returns the fixed
//! "No text provided." result.

use super::sentiment;
use super::signal;
use super::{Check, ModalityDetails, ModalityResult, TextDetails};
use crate::config::TextThresholds;
use crate::error::{ForensicError, Result};
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

pub const BURSTINESS_CHECK: &str = "Sentence Burstiness";
pub const ENTROPY_CHECK: &str = "Shannon Entropy";
pub const PUNCTUATION_CHECK: &str = "Punctuation Analysis";

const BURSTINESS_DESC: &str = "Measures variance in sentence structure.";
const ENTROPY_DESC: &str = "Measures information density.";
const PUNCTUATION_DESC: &str = "Checks for natural punctuation patterns.";

static SENTENCE_END: OnceLock<Regex> = OnceLock::new();
static WORD: OnceLock<Regex> = OnceLock::new();

fn cached(cell: &'static OnceLock<Regex>, pattern: &str) -> Result<&'static Regex> {
    if let Some(re) = cell.get() {
        return Ok(re);
    }
    let re = Regex::new(pattern)
        .map_err(|e| ForensicError::computation(format!("bad pattern {}: {}", pattern, e)))?;
    Ok(cell.get_or_init(|| re))
}

/// Split after runs of `.`, `!` or `?` that are followed by whitespace.
/// Terminal punctuation stays with its sentence.
pub fn split_sentences(text: &str) -> Result<Vec<&str>> {
    let re = cached(&SENTENCE_END, r"[.!?]+\s+")?;
    let mut sentences = Vec::new();
    let mut start = 0;
    for m in re.find_iter(text) {
        let end = m.start() + m.as_str().trim_end().len();
        sentences.push(text[start..end].trim());
        start = m.end();
    }
    sentences.push(text[start..].trim());
    sentences.retain(|s| !s.is_empty());
    Ok(sentences)
}

/// Word tokens only; punctuation does not count
pub fn count_words(sentence: &str) -> Result<usize> {
    let re = cached(&WORD, r"[\p{L}\p{N}]+(?:['’][\p{L}\p{N}]+)*")?;
    Ok(re.find_iter(sentence).count())
}

pub fn check_burstiness(word_counts: &[usize], t: &TextThresholds) -> Check {
    if word_counts.len() > t.burstiness_min_sentences {
        let lengths: Vec<f64> = word_counts.iter().map(|&n| n as f64).collect();
        let sd = signal::std_dev(&lengths);
        debug!(sd, sentences = word_counts.len(), "sentence length deviation");
        if sd < t.burstiness_std_min {
            return Check::fail(
                BURSTINESS_CHECK,
                BURSTINESS_DESC,
                "Robotic/Uniform sentence lengths (SD < 2.0).",
            );
        }
    }
    Check::pass(
        BURSTINESS_CHECK,
        BURSTINESS_DESC,
        "Natural sentence length variation.",
    )
}

pub fn check_entropy(text: &str, t: &TextThresholds) -> Check {
    let h = signal::entropy(text.chars());
    debug!(entropy = h, "character entropy");

    if h < t.entropy_min {
        Check::fail(
            ENTROPY_CHECK,
            ENTROPY_DESC,
            format!("Low entropy. Repetitive or simplistic structure. (Entropy: {:.2} bits)", h),
        )
    } else if h > t.entropy_max {
        Check::fail(
            ENTROPY_CHECK,
            ENTROPY_DESC,
            format!("High entropy. Possible scrambled/obfuscated text. (Entropy: {:.2} bits)", h),
        )
    } else {
        Check::pass(ENTROPY_CHECK, ENTROPY_DESC, format!("Entropy: {:.2} bits", h))
    }
}

pub fn check_punctuation(text: &str, t: &TextThresholds) -> Check {
    let total = text.chars().count();
    if total > t.punctuation_min_chars {
        let marks = text
            .chars()
            .filter(|c| t.punctuation_chars.contains(*c))
            .count();
        let ratio = marks as f64 / total as f64;
        debug!(ratio, "punctuation ratio");
        if ratio < t.punctuation_ratio_min {
            return Check::fail(
                PUNCTUATION_CHECK,
                PUNCTUATION_DESC,
                "Abnormally low punctuation usage.",
            );
        }
    }
    Check::pass(PUNCTUATION_CHECK, PUNCTUATION_DESC, "Natural punctuation usage.")
}

pub fn analyze(text: &str, t: &TextThresholds) -> Result<ModalityResult> {
    if text.is_empty() {
        return Ok(ModalityResult::no_text());
    }

    let sentences = split_sentences(text)?;
    let word_counts = sentences
        .iter()
        .map(|s| count_words(s))
        .collect::<Result<Vec<_>>>()?;

    let checks = vec![
        check_burstiness(&word_counts, t),
        check_entropy(text, t),
        check_punctuation(text, t),
    ];

    let mood = sentiment::estimate(text, t);
    let details = TextDetails {
        word_count: text.split_whitespace().count(),
        sentence_count: sentences.len(),
        character_count: text.chars().count(),
    };

    Ok(ModalityResult::from_checks(
        checks,
        ModalityDetails::Text(details),
        mood.label,
        mood.score,
    ))
}
