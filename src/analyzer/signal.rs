//! Shared signal statistics
//!
//! All deviations here are population statistics (divide by N, not N-1) so
//! thresholds stay comparable between the image, audio and text checks.

use std::collections::BTreeMap;

/// Smoothing term inside the logarithm so zero-probability bins never hit log(0)
const LOG_EPSILON: f64 = 1e-10;

/// Shannon entropy in bits over the empirical distribution of `samples`.
///
/// Returns 0.0 for empty input. Counting goes through a `BTreeMap` so the
/// summation order, and therefore the exact float result, is deterministic.
pub fn entropy<T, I>(samples: I) -> f64
where
    T: Ord,
    I: IntoIterator<Item = T>,
{
    let mut counts: BTreeMap<T, usize> = BTreeMap::new();
    let mut total = 0usize;
    for s in samples {
        *counts.entry(s).or_insert(0) += 1;
        total += 1;
    }

    if total == 0 {
        return 0.0;
    }

    let n = total as f64;
    -counts
        .values()
        .map(|&c| {
            let p = c as f64 / n;
            p * (p + LOG_EPSILON).log2()
        })
        .sum::<f64>()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|&v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Pearson correlation coefficient between two equally long series.
///
/// A zero-variance series has no defined correlation; it is reported as 1.0
/// (identical/flat signals) so callers treat it as maximally correlated.
/// Mismatched or empty inputs give 0.0.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.is_empty() {
        return 0.0;
    }

    let mean_x = mean(x);
    let mean_y = mean(y);

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (&a, &b) in x.iter().zip(y.iter()) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = (var_x * var_y).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return 1.0;
    }

    (cov / denominator).clamp(-1.0, 1.0)
}

/// Periodic Hann window (the DFT-even form used for STFT frames)
pub fn hann_window(size: usize) -> Vec<f64> {
    if size < 2 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / size as f64).cos()))
        .collect()
}

/// Power to decibels, floored at `amin` before the log
pub fn power_to_db(power: f64, amin: f64) -> f64 {
    10.0 * power.max(amin).log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // ENTROPY TESTS
    // ==========================================================================
    //
    // H = -sum(p * log2(p)). A single repeated symbol carries no information
    // (H = 0); N equally frequent symbols give log2(N) bits.
    // ==========================================================================

    #[test]
    fn test_entropy_empty() {
        let empty: Vec<u8> = vec![];
        assert_eq!(entropy(empty), 0.0);
    }

    #[test]
    fn test_entropy_single_symbol() {
        let h = entropy("aaaaaaaa".chars());
        assert!(h.abs() < 1e-9, "uniform-value sequence should be 0 bits, got {}", h);
    }

    #[test]
    fn test_entropy_two_symbols() {
        let h = entropy([0u8, 1, 0, 1, 0, 1]);
        assert!((h - 1.0).abs() < 1e-6, "expected 1 bit, got {}", h);
    }

    #[test]
    fn test_entropy_full_byte_alphabet() {
        // Every byte value exactly once: log2(256) = 8 bits
        let h = entropy(0u8..=255);
        assert!((h - 8.0).abs() < 1e-6, "expected 8 bits, got {}", h);
    }

    #[test]
    fn test_entropy_approaches_log2_alphabet() {
        let alphabet: Vec<char> = ('a'..='z').collect();
        let text: String = alphabet.iter().cycle().take(26 * 40).collect();
        let h = entropy(text.chars());
        assert!((h - 26f64.log2()).abs() < 1e-6);
    }

    // ==========================================================================
    // MOMENT TESTS
    // ==========================================================================

    #[test]
    fn test_mean_and_empty() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[1.0, 2.0, 3.0, 4.0]), 2.5);
    }

    #[test]
    fn test_std_dev_is_population() {
        // Population SD of [2,4,4,4,5,5,7,9] is exactly 2 (sample SD would be ~2.14)
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((std_dev(&v) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_std_dev_constant() {
        assert_eq!(std_dev(&[7.0; 10]), 0.0);
        assert_eq!(std_dev(&[]), 0.0);
    }

    // ==========================================================================
    // CORRELATION TESTS
    // ==========================================================================

    #[test]
    fn test_pearson_identical() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((pearson_correlation(&x, &x) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pearson_inverted() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![-1.0, -2.0, -3.0, -4.0, -5.0];
        assert!((pearson_correlation(&x, &y) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pearson_uncorrelated() {
        let x = vec![1.0, -1.0, 1.0, -1.0];
        let y = vec![1.0, 1.0, -1.0, -1.0];
        assert!(pearson_correlation(&x, &y).abs() < 1e-9);
    }

    #[test]
    fn test_pearson_zero_variance_is_one() {
        let flat = vec![128.0; 1000];
        let varying: Vec<f64> = (0..1000).map(|i| (i % 7) as f64).collect();
        assert_eq!(pearson_correlation(&flat, &flat), 1.0);
        assert_eq!(pearson_correlation(&flat, &varying), 1.0);
    }

    #[test]
    fn test_pearson_mismatched_lengths() {
        assert_eq!(pearson_correlation(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(pearson_correlation(&[], &[]), 0.0);
    }

    // ==========================================================================
    // WINDOW / DB TESTS
    // ==========================================================================

    #[test]
    fn test_hann_window_shape() {
        let w = hann_window(8);
        assert!(w[0].abs() < 1e-12);
        assert!((w[4] - 1.0).abs() < 1e-12);
        assert!((w[2] - 0.5).abs() < 1e-12);
        // Periodic: symmetric around N/2, last sample is not zero
        assert!((w[1] - w[7]).abs() < 1e-12);
        assert!(w[7] > 0.0);
    }

    #[test]
    fn test_hann_window_tiny() {
        assert!(hann_window(0).is_empty());
        assert_eq!(hann_window(1), vec![1.0]);
    }

    #[test]
    fn test_power_to_db() {
        assert!((power_to_db(1.0, 1e-10) - 0.0).abs() < 1e-12);
        assert!((power_to_db(0.001, 1e-10) + 30.0).abs() < 1e-9);
        assert!((power_to_db(0.0, 1e-10) + 100.0).abs() < 1e-9);
    }
}
