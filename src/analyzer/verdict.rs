//! Three-way verdict from a list of independent checks
//!
//! The same rule serves every modality. Only the number of failed checks
//! matters, never their order or which modality produced them:
//!
//! | Failed | Label            | Score |
//! |--------|------------------|-------|
//! | 0      | Likely Organic   | 100   |
//! | 1      | Likely Organic   | 85    |
//! | 2      | Inconclusive     | 45    |
//! | 3+     | Likely Synthetic | 15    |

use super::{AuthenticityLabel, Check};

const SYNTHETIC_FAILURES: usize = 3;
const INCONCLUSIVE_FAILURES: usize = 2;

const SYNTHETIC_SCORE: u32 = 15;
const INCONCLUSIVE_SCORE: u32 = 45;
const ORGANIC_SCORE: u32 = 85;
const CLEAN_BONUS: u32 = 15;

pub const ALL_PASSED_REASONING: &str =
    "All deterministic forensic checks passed. Signal integrity is consistent with organic media.";
const SYNTHETIC_SUFFIX: &str = "Multiple independent forensic failures suggest synthetic origin.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub label: AuthenticityLabel,
    pub score: u32,
    pub reasoning: String,
}

pub fn aggregate(checks: &[Check]) -> Verdict {
    let failed: Vec<&str> = checks
        .iter()
        .filter(|c| c.is_fail())
        .map(|c| c.name.as_str())
        .collect();
    let failed_count = failed.len();

    let (label, score) = if failed_count >= SYNTHETIC_FAILURES {
        (AuthenticityLabel::LikelySynthetic, SYNTHETIC_SCORE)
    } else if failed_count == INCONCLUSIVE_FAILURES {
        (AuthenticityLabel::Inconclusive, INCONCLUSIVE_SCORE)
    } else if failed_count == 0 {
        (AuthenticityLabel::LikelyOrganic, ORGANIC_SCORE + CLEAN_BONUS)
    } else {
        (AuthenticityLabel::LikelyOrganic, ORGANIC_SCORE)
    };

    let reasoning = if failed_count == 0 {
        ALL_PASSED_REASONING.to_string()
    } else {
        let mut r = format!(
            "Flagged {} anomaly(ies): {}. ",
            failed_count,
            failed.join(", ")
        );
        if label == AuthenticityLabel::LikelySynthetic {
            r.push_str(SYNTHETIC_SUFFIX);
        }
        r
    };

    Verdict {
        label,
        score,
        reasoning,
    }
}
