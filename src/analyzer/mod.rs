//! Forensic verdict engine
//!
//! Each modality analyzer runs a fixed, ordered set of independent checks.
//! Every check yields a binary PASS/FAIL with a human-readable rationale, and
//! [`verdict::aggregate`] turns the list into a label and trust score.
//!
//! ```text
//! bytes/text -> visual | acoustic | linguistic -> Vec<Check> -> verdict -> ModalityResult
//! ```
//!
//! Analyses are synchronous and share no mutable state, so one [`Analyzer`]
//! can be used from many threads at once (the CLI drives it through rayon).

pub mod acoustic;
#[cfg(feature = "faces")]
pub mod faces;
pub mod linguistic;
pub mod regions;
pub mod sentiment;
pub mod signal;
pub mod verdict;
pub mod visual;

use crate::config::EngineConfig;
use crate::error::ForensicError;
use regions::{FaceDetection, RegionReport};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

// ============================================================================
// Checks
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckStatus {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "FAIL")]
    Fail,
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckStatus::Pass => write!(f, "PASS"),
            CheckStatus::Fail => write!(f, "FAIL"),
        }
    }
}

/// Outcome of one heuristic on one input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Check {
    pub name: String,
    pub description: String,
    pub status: CheckStatus,
    pub details: String,
}

impl Check {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        status: CheckStatus,
        details: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            status,
            details: details.into(),
        }
    }

    pub fn pass(name: &str, description: &str, details: impl Into<String>) -> Self {
        Self::new(name, description, CheckStatus::Pass, details)
    }

    pub fn fail(name: &str, description: &str, details: impl Into<String>) -> Self {
        Self::new(name, description, CheckStatus::Fail, details)
    }

    /// Build from a failure flag: `failed == true` gives FAIL
    pub fn from_outcome(
        name: &str,
        description: &str,
        failed: bool,
        details: impl Into<String>,
    ) -> Self {
        let status = if failed { CheckStatus::Fail } else { CheckStatus::Pass };
        Self::new(name, description, status, details)
    }

    pub fn is_fail(&self) -> bool {
        self.status == CheckStatus::Fail
    }
}

// ============================================================================
// Labels
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthenticityLabel {
    #[serde(rename = "Likely Organic")]
    LikelyOrganic,
    #[serde(rename = "Inconclusive")]
    Inconclusive,
    #[serde(rename = "Likely Synthetic")]
    LikelySynthetic,
    #[serde(rename = "Error")]
    Error,
}

impl AuthenticityLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthenticityLabel::LikelyOrganic => "Likely Organic",
            AuthenticityLabel::Inconclusive => "Inconclusive",
            AuthenticityLabel::LikelySynthetic => "Likely Synthetic",
            AuthenticityLabel::Error => "Error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Likely Organic" => Some(AuthenticityLabel::LikelyOrganic),
            "Inconclusive" => Some(AuthenticityLabel::Inconclusive),
            "Likely Synthetic" => Some(AuthenticityLabel::LikelySynthetic),
            "Error" => Some(AuthenticityLabel::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for AuthenticityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "Positive",
            SentimentLabel::Neutral => "Neutral",
            SentimentLabel::Negative => "Negative",
            SentimentLabel::NotApplicable => "N/A",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Positive" => Some(SentimentLabel::Positive),
            "Neutral" => Some(SentimentLabel::Neutral),
            "Negative" => Some(SentimentLabel::Negative),
            "N/A" => Some(SentimentLabel::NotApplicable),
            _ => None,
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Modality
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Image,
    Audio,
    Text,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "tif", "tiff", "gif"];
const AUDIO_EXTENSIONS: &[&str] = &["wav", "wave", "flac", "mp3", "ogg", "oga"];
const TEXT_EXTENSIONS: &[&str] = &["txt", "text", "md"];

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Image => "image",
            Modality::Audio => "audio",
            Modality::Text => "text",
        }
    }

    /// Parse the modality tag used by the upload API
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "image" => Some(Modality::Image),
            "audio" => Some(Modality::Audio),
            "text" => Some(Modality::Text),
            _ => None,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(Modality::Image)
        } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            Some(Modality::Audio)
        } else if TEXT_EXTENSIONS.contains(&ext.as_str()) {
            Some(Modality::Text)
        } else {
            None
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn supported_extensions() -> impl Iterator<Item = &'static str> {
        IMAGE_EXTENSIONS
            .iter()
            .chain(AUDIO_EXTENSIONS)
            .chain(TEXT_EXTENSIONS)
            .copied()
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDetails {
    /// Container format, uppercase (e.g. "JPEG")
    pub format: Option<String>,
    /// "WxH"
    pub dimensions: String,
    pub width: u32,
    pub height: u32,
    /// Region texture descriptions; presentation only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regions: Option<RegionReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioDetails {
    /// Rounded to two decimals
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: usize,
    pub gap_count: usize,
    pub mean_gap_secs: Option<f64>,
    pub cutoff_hz: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextDetails {
    pub word_count: usize,
    pub sentence_count: usize,
    pub character_count: usize,
}

/// Modality-specific fields carried next to the shared verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "modality", rename_all = "lowercase")]
pub enum ModalityDetails {
    Image(ImageDetails),
    Audio(AudioDetails),
    Text(TextDetails),
    None,
}

impl ModalityDetails {
    pub fn region_report(&self) -> Option<&RegionReport> {
        match self {
            ModalityDetails::Image(d) => d.regions.as_ref(),
            _ => None,
        }
    }
}

/// The one structure handed to report rendering and persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModalityResult {
    pub sentiment_label: SentimentLabel,
    pub sentiment_score: u32,
    pub authenticity_label: AuthenticityLabel,
    pub authenticity_score: u32,
    pub reasoning: String,
    pub checks: Vec<Check>,
    pub details: ModalityDetails,
}

impl ModalityResult {
    /// Run the shared verdict over `checks`
    pub fn from_checks(
        checks: Vec<Check>,
        details: ModalityDetails,
        sentiment_label: SentimentLabel,
        sentiment_score: u32,
    ) -> Self {
        let v = verdict::aggregate(&checks);
        Self {
            sentiment_label,
            sentiment_score,
            authenticity_label: v.label,
            authenticity_score: v.score,
            reasoning: v.reasoning,
            checks,
            details,
        }
    }

    /// Error result: label Error, score 0, no checks
    pub fn failure(modality: Option<Modality>, err: &ForensicError) -> Self {
        let reasoning = match modality {
            Some(Modality::Audio) => format!("Audio Analysis Failed: {}", err),
            _ => format!("Analysis failed: {}", err),
        };
        Self {
            sentiment_label: SentimentLabel::NotApplicable,
            sentiment_score: 0,
            authenticity_label: AuthenticityLabel::Error,
            authenticity_score: 0,
            reasoning,
            checks: vec![],
            details: ModalityDetails::None,
        }
    }

    /// Empty text short-circuits the aggregator
    pub fn no_text() -> Self {
        Self {
            sentiment_label: SentimentLabel::NotApplicable,
            sentiment_score: 0,
            authenticity_label: AuthenticityLabel::Inconclusive,
            authenticity_score: 0,
            reasoning: "No text provided.".to_string(),
            checks: vec![],
            details: ModalityDetails::None,
        }
    }

    pub fn failed_checks(&self) -> impl Iterator<Item = &Check> {
        self.checks.iter().filter(|c| c.is_fail())
    }
}

/// One analyzed file in a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub file_path: String,
    pub file_name: String,
    pub modality: Option<Modality>,
    pub result: ModalityResult,
}

// ============================================================================
// Analyzer
// ============================================================================

/// Entry point for all three modalities.
///
/// Thresholds and the face-detection capability are fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    pub config: EngineConfig,
    pub faces: FaceDetection,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_face_detection(mut self, faces: FaceDetection) -> Self {
        self.faces = faces;
        self
    }

    /// Dispatch on the modality tag. Never fails: errors become an Error result.
    pub fn analyze(&self, modality: Modality, data: &[u8]) -> ModalityResult {
        match modality {
            Modality::Image => self.analyze_image(data),
            Modality::Audio => self.analyze_audio(data),
            Modality::Text => self.analyze_text(&decode_text(data)),
        }
    }

    pub fn analyze_image(&self, data: &[u8]) -> ModalityResult {
        visual::analyze(data, &self.config.image, &self.config.regions, &self.faces)
            .unwrap_or_else(|e| {
                warn!(error = %e, "image analysis failed");
                ModalityResult::failure(Some(Modality::Image), &e)
            })
    }

    pub fn analyze_audio(&self, data: &[u8]) -> ModalityResult {
        acoustic::analyze(data, &self.config.audio).unwrap_or_else(|e| {
            warn!(error = %e, "audio analysis failed");
            ModalityResult::failure(Some(Modality::Audio), &e)
        })
    }

    pub fn analyze_text(&self, text: &str) -> ModalityResult {
        linguistic::analyze(text, &self.config.text).unwrap_or_else(|e| {
            warn!(error = %e, "text analysis failed");
            ModalityResult::failure(Some(Modality::Text), &e)
        })
    }

    /// Read and analyze one file; modality comes from the extension
    pub fn analyze_path<P: AsRef<Path>>(&self, path: P) -> FileAnalysis {
        let path = path.as_ref();
        let file_path = path.display().to_string();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file_path.clone());
        let modality = Modality::from_path(path);

        let result = match (modality, std::fs::read(path)) {
            (Some(m), Ok(data)) => self.analyze(m, &data),
            (Some(m), Err(e)) => ModalityResult::failure(Some(m), &ForensicError::Io(e)),
            (None, _) => ModalityResult::failure(
                None,
                &ForensicError::decode(format!("unsupported file type: {}", file_name)),
            ),
        };

        FileAnalysis {
            file_path,
            file_name,
            modality,
            result,
        }
    }
}

/// Files under `path` with a supported extension, sorted. A plain file is
/// returned as-is so unsupported inputs still surface as error results.
pub fn collect_files<P: AsRef<Path>>(path: P) -> Vec<PathBuf> {
    let path = path.as_ref();
    if path.is_dir() {
        let mut files: Vec<PathBuf> = WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && Modality::from_path(e.path()).is_some())
            .map(|e| e.path().to_path_buf())
            .collect();
        files.sort();
        files
    } else if path.exists() {
        vec![path.to_path_buf()]
    } else {
        vec![]
    }
}

/// UTF-8 decode that drops undecodable bytes
fn decode_text(data: &[u8]) -> String {
    data.utf8_chunks().map(|chunk| chunk.valid()).collect()
}
