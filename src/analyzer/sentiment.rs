//! Lexicon-based sentiment polarity
//!
//! Each known opinion word carries a polarity in [-1, 1]. A preceding
//! intensifier scales it, a preceding negation flips and halves it
//! ("not good" is mildly negative, not the opposite of good). The text's
//! polarity is the mean over every scored word; text with none is 0.

use super::SentimentLabel;
use crate::config::TextThresholds;

/// How many tokens a modifier reaches forward ("not very good")
const MODIFIER_REACH: usize = 3;
const NEGATION_FACTOR: f64 = -0.5;

const LEXICON: &[(&str, f64)] = &[
    // positive
    ("amazing", 0.6),
    ("awesome", 1.0),
    ("beautiful", 0.85),
    ("best", 1.0),
    ("better", 0.5),
    ("brilliant", 0.9),
    ("calm", 0.3),
    ("cheerful", 0.8),
    ("clean", 0.37),
    ("delighted", 0.7),
    ("delightful", 1.0),
    ("enjoy", 0.4),
    ("enjoyed", 0.4),
    ("excellent", 1.0),
    ("excited", 0.4),
    ("fantastic", 0.4),
    ("favorite", 0.5),
    ("fine", 0.42),
    ("fun", 0.3),
    ("glad", 0.5),
    ("good", 0.7),
    ("great", 0.8),
    ("happy", 0.8),
    ("helpful", 0.5),
    ("hope", 0.3),
    ("impressive", 1.0),
    ("kind", 0.6),
    ("like", 0.2),
    ("love", 0.5),
    ("loved", 0.7),
    ("lovely", 0.5),
    ("lucky", 0.33),
    ("nice", 0.6),
    ("peaceful", 0.5),
    ("perfect", 1.0),
    ("pleasant", 0.73),
    ("pleased", 0.5),
    ("proud", 0.8),
    ("success", 0.3),
    ("successful", 0.75),
    ("superb", 1.0),
    ("thank", 0.2),
    ("thanks", 0.2),
    ("useful", 0.3),
    ("warm", 0.6),
    ("win", 0.8),
    ("wonderful", 1.0),
    // negative
    ("angry", -0.5),
    ("annoying", -0.8),
    ("awful", -1.0),
    ("bad", -0.7),
    ("boring", -1.0),
    ("broken", -0.4),
    ("cruel", -1.0),
    ("dangerous", -0.6),
    ("difficult", -0.5),
    ("dirty", -0.6),
    ("disappointed", -0.75),
    ("disappointing", -0.6),
    ("disgusting", -1.0),
    ("dull", -0.3),
    ("fail", -0.5),
    ("failed", -0.5),
    ("fear", -0.6),
    ("hate", -0.8),
    ("hated", -0.9),
    ("horrible", -1.0),
    ("hurt", -0.5),
    ("lonely", -0.5),
    ("lose", -0.4),
    ("lost", -0.3),
    ("mediocre", -0.5),
    ("miserable", -1.0),
    ("nasty", -1.0),
    ("pain", -0.6),
    ("poor", -0.4),
    ("sad", -0.5),
    ("scared", -0.6),
    ("sick", -0.7),
    ("stupid", -0.8),
    ("terrible", -1.0),
    ("tired", -0.4),
    ("ugly", -0.7),
    ("unhappy", -0.6),
    ("upset", -0.6),
    ("useless", -0.5),
    ("worse", -0.4),
    ("worst", -1.0),
    ("wrong", -0.5),
];

const INTENSIFIERS: &[(&str, f64)] = &[
    ("absolutely", 1.5),
    ("extremely", 1.5),
    ("highly", 1.3),
    ("incredibly", 1.5),
    ("quite", 1.1),
    ("really", 1.2),
    ("so", 1.2),
    ("totally", 1.3),
    ("very", 1.3),
    ("rather", 0.8),
    ("slightly", 0.6),
    ("somewhat", 0.7),
];

const NEGATIONS: &[&str] = &["not", "no", "never", "nothing", "neither", "nor", "cannot"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sentiment {
    /// Mean polarity in [-1, 1]
    pub polarity: f64,
    /// Polarity mapped onto 0..=100
    pub score: u32,
    pub label: SentimentLabel,
}

fn lookup(table: &[(&str, f64)], word: &str) -> Option<f64> {
    table.iter().find(|(w, _)| *w == word).map(|&(_, v)| v)
}

fn is_negation(word: &str) -> bool {
    NEGATIONS.contains(&word) || word.ends_with("n't")
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '\u{2019}'))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase().replace('\u{2019}', "'"))
}

pub fn polarity(text: &str) -> f64 {
    let mut scored = Vec::new();
    let mut negated_at: Option<usize> = None;
    let mut intensity: Option<(usize, f64)> = None;

    for (i, token) in tokens(text).enumerate() {
        if is_negation(&token) {
            negated_at = Some(i);
            continue;
        }
        if let Some(factor) = lookup(INTENSIFIERS, &token) {
            intensity = Some((i, factor));
            continue;
        }
        let Some(mut value) = lookup(LEXICON, &token) else {
            continue;
        };

        if let Some((at, factor)) = intensity {
            if i - at <= MODIFIER_REACH {
                value *= factor;
            }
        }
        if let Some(at) = negated_at {
            if i - at <= MODIFIER_REACH {
                value *= NEGATION_FACTOR;
            }
        }
        scored.push(value.clamp(-1.0, 1.0));
        negated_at = None;
        intensity = None;
    }

    if scored.is_empty() {
        return 0.0;
    }
    (scored.iter().sum::<f64>() / scored.len() as f64).clamp(-1.0, 1.0)
}

/// Polarity, its 0-100 score (truncated) and the bucketed label
pub fn estimate(text: &str, t: &TextThresholds) -> Sentiment {
    let polarity = polarity(text);
    let score = (((polarity + 1.0) * 50.0) as u32).min(100);
    let label = if score > t.sentiment_positive_above {
        SentimentLabel::Positive
    } else if score < t.sentiment_negative_below {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    };
    Sentiment {
        polarity,
        score,
        label,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn est(text: &str) -> Sentiment {
        estimate(text, &TextThresholds::default())
    }

    #[test]
    fn test_neutral_text() {
        let s = est("The table is made of oak and stands in the hallway.");
        assert_eq!(s.polarity, 0.0);
        assert_eq!(s.score, 50);
        assert_eq!(s.label, SentimentLabel::Neutral);
    }

    #[test]
    fn test_positive_and_negative() {
        assert_eq!(est("What a wonderful, happy afternoon.").label, SentimentLabel::Positive);
        assert_eq!(est("The service was terrible and the food awful.").label, SentimentLabel::Negative);
    }

    #[test]
    fn test_negation_flips_and_halves() {
        let s = est("This is not good.");
        assert!((s.polarity + 0.35).abs() < 1e-9);
        assert_eq!(s.score, 32);
        assert_eq!(s.label, SentimentLabel::Negative);

        // Contractions negate too
        assert!(polarity("It isn't bad") > 0.0);
    }

    #[test]
    fn test_intensifier_scales() {
        assert!((polarity("very good") - 0.91).abs() < 1e-9);
        assert!(polarity("slightly good") < polarity("good"));
        // Clamped at 1
        assert_eq!(polarity("absolutely perfect"), 1.0);
    }

    #[test]
    fn test_modifier_reach_is_bounded() {
        // Negation five tokens back no longer applies
        assert!(polarity("not that it was ever a good") > 0.0);
    }

    #[test]
    fn test_score_bounds() {
        assert_eq!(est("perfect excellent superb").score, 100);
        assert_eq!(est("awful horrible terrible").score, 0);
    }
}
