//! Detection thresholds
//!
//! Every fixed constant the checks compare against lives here, one table per
//! modality. Defaults are the tuned values; a JSON file may override any
//! subset of fields:
//!
//! ```json
//! { "image": { "luminance_std_min": 15.0 }, "text": { "entropy_max": 6.0 } }
//! ```

use crate::error::{ForensicError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageThresholds {
    /// Substrings of the EXIF Software tag that identify a generator
    pub generator_signatures: Vec<String>,
    /// JPEG quality used for the ELA re-encode
    pub ela_quality: u8,
    /// ELA deviation below this is too uniform
    pub ela_std_min: f64,
    /// ELA deviation above this suggests splicing (logged, not scored)
    pub ela_std_splice: f64,
    pub luminance_std_min: f64,
    /// Acceptable average channel correlation band is (min, max]
    pub channel_corr_min: f64,
    pub channel_corr_max: f64,
}

impl Default for ImageThresholds {
    fn default() -> Self {
        Self {
            generator_signatures: ["Midjourney", "DALL-E", "Stable Diffusion", "Adobe Firefly"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ela_quality: 90,
            ela_std_min: 1.5,
            ela_std_splice: 15.0,
            luminance_std_min: 20.0,
            channel_corr_min: 0.3,
            channel_corr_max: 0.985,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioThresholds {
    pub frame_size: usize,
    pub hop_size: usize,
    pub flatness_min: f64,
    /// Cutoff search ignores everything at or below this frequency
    pub cutoff_search_floor_hz: f64,
    /// Fraction of peak bin power that counts as "gone"
    pub cutoff_power_ratio: f64,
    pub suspicious_cutoffs_hz: Vec<f64>,
    pub cutoff_tolerance_hz: f64,
    /// Native rate must be at least this multiple of the suspicious cutoff
    pub cutoff_rate_factor: f64,
    /// Frames quieter than peak minus this many dB are silence
    pub silence_top_db: f64,
    /// Breath gaps are only judged on clips longer than this
    pub breath_min_duration_secs: f64,
    pub breath_mean_gap_min_secs: f64,
}

impl Default for AudioThresholds {
    fn default() -> Self {
        Self {
            frame_size: 2048,
            hop_size: 512,
            flatness_min: 0.0005,
            cutoff_search_floor_hz: 4000.0,
            cutoff_power_ratio: 0.001,
            suspicious_cutoffs_hz: vec![16000.0, 22050.0, 24000.0],
            cutoff_tolerance_hz: 500.0,
            cutoff_rate_factor: 1.5,
            silence_top_db: 30.0,
            breath_min_duration_secs: 10.0,
            breath_mean_gap_min_secs: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextThresholds {
    /// Burstiness needs strictly more sentences than this
    pub burstiness_min_sentences: usize,
    pub burstiness_std_min: f64,
    pub entropy_min: f64,
    pub entropy_max: f64,
    /// Punctuation density needs strictly more characters than this
    pub punctuation_min_chars: usize,
    pub punctuation_ratio_min: f64,
    pub punctuation_chars: String,
    /// Sentiment score cut points on the 0-100 scale
    pub sentiment_negative_below: u32,
    pub sentiment_positive_above: u32,
}

impl Default for TextThresholds {
    fn default() -> Self {
        Self {
            burstiness_min_sentences: 3,
            burstiness_std_min: 2.0,
            entropy_min: 3.5,
            entropy_max: 5.5,
            punctuation_min_chars: 100,
            punctuation_ratio_min: 0.01,
            punctuation_chars: "!?,.;:".to_string(),
            sentiment_negative_below: 40,
            sentiment_positive_above: 60,
        }
    }
}

/// Texture cut points used to pick region descriptions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionThresholds {
    pub hair_natural_entropy: f64,
    pub hair_natural_sharpness: f64,
    pub hair_synthetic_entropy: f64,
    pub hair_synthetic_sharpness: f64,
    pub face_natural_sharpness: f64,
    pub face_natural_entropy: f64,
    pub face_synthetic_sharpness: f64,
    pub clothing_natural_contrast: f64,
    pub clothing_natural_sharpness: f64,
    pub clothing_synthetic_contrast: f64,
    pub clothing_synthetic_sharpness: f64,
    pub background_natural_sharpness: f64,
    pub background_synthetic_entropy: f64,
    pub background_synthetic_sharpness: f64,
    /// Side of the top-left background sample
    pub background_patch: u32,
    /// Fallback sample side when the face touches the top or left edge
    pub background_fallback_patch: u32,
    pub hair_height_ratio: f64,
    pub clothing_height_ratio: f64,
}

impl Default for RegionThresholds {
    fn default() -> Self {
        Self {
            hair_natural_entropy: 4.5,
            hair_natural_sharpness: 200.0,
            hair_synthetic_entropy: 3.5,
            hair_synthetic_sharpness: 50.0,
            face_natural_sharpness: 150.0,
            face_natural_entropy: 4.0,
            face_synthetic_sharpness: 60.0,
            clothing_natural_contrast: 30.0,
            clothing_natural_sharpness: 100.0,
            clothing_synthetic_contrast: 10.0,
            clothing_synthetic_sharpness: 20.0,
            background_natural_sharpness: 100.0,
            background_synthetic_entropy: 2.0,
            background_synthetic_sharpness: 10.0,
            background_patch: 100,
            background_fallback_patch: 50,
            hair_height_ratio: 0.6,
            clothing_height_ratio: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub image: ImageThresholds,
    pub audio: AudioThresholds,
    pub text: TextThresholds,
    pub regions: RegionThresholds,
}

impl EngineConfig {
    /// Load overrides from a JSON file. Missing fields keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(raw).map_err(|e| ForensicError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.audio.frame_size == 0 || self.audio.hop_size == 0 {
            return Err(ForensicError::Config(
                "audio frame_size and hop_size must be non-zero".to_string(),
            ));
        }
        if !(1..=100).contains(&self.image.ela_quality) {
            return Err(ForensicError::Config(format!(
                "ela_quality must be in 1..=100, got {}",
                self.image.ela_quality
            )));
        }
        if self.image.channel_corr_min >= self.image.channel_corr_max {
            return Err(ForensicError::Config(
                "channel_corr_min must be below channel_corr_max".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_fixed_constants() {
        let c = EngineConfig::default();
        assert_eq!(c.image.ela_quality, 90);
        assert_eq!(c.image.ela_std_min, 1.5);
        assert_eq!(c.image.luminance_std_min, 20.0);
        assert_eq!(c.image.channel_corr_max, 0.985);
        assert_eq!(c.image.channel_corr_min, 0.3);
        assert_eq!(c.image.generator_signatures.len(), 4);
        assert_eq!(c.audio.flatness_min, 0.0005);
        assert_eq!(c.audio.suspicious_cutoffs_hz, vec![16000.0, 22050.0, 24000.0]);
        assert_eq!(c.text.entropy_min, 3.5);
        assert_eq!(c.text.entropy_max, 5.5);
        assert_eq!(c.text.punctuation_chars, "!?,.;:");
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        let c = EngineConfig::from_json(r#"{"image": {"luminance_std_min": 12.5}}"#).unwrap();
        assert_eq!(c.image.luminance_std_min, 12.5);
        assert_eq!(c.image.ela_std_min, 1.5);
        assert_eq!(c.audio, AudioThresholds::default());
    }

    #[test]
    fn test_empty_object_is_default() {
        let c = EngineConfig::from_json("{}").unwrap();
        assert_eq!(c, EngineConfig::default());
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = EngineConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, ForensicError::Config(_)));
    }

    #[test]
    fn test_rejects_zero_hop() {
        let err = EngineConfig::from_json(r#"{"audio": {"hop_size": 0}}"#).unwrap_err();
        assert!(err.to_string().contains("hop_size"));
    }

    #[test]
    fn test_rejects_inverted_correlation_band() {
        let err = EngineConfig::from_json(
            r#"{"image": {"channel_corr_min": 0.99, "channel_corr_max": 0.5}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ForensicError::Config(_)));
    }
}
