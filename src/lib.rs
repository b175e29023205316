//! Verisight - Rule-based authenticity checks for images, audio and text
//!
//! Verisight decides whether a piece of media looks organic (captured or
//! written by a person) or synthetic (produced by a generator). It does this
//! without any learned model: each modality runs a short, fixed list of
//! deterministic signal checks and the number of failures decides the verdict.
//!
//! # Detection Methods
//!
//! 1. **Images**: EXIF camera tags vs generator signatures, error level
//!    analysis after a JPEG re-encode, luminance noise, and RGB channel
//!    correlation. When a face detector is plugged in, hair/face/clothing/
//!    background texture is described as well.
//!
//! 2. **Audio**: spectral flatness, a hard high-frequency cutoff typical of
//!    upsampled synthesis, and the presence of breath gaps in long speech.
//!
//! 3. **Text**: sentence length burstiness, character entropy, and
//!    punctuation density, plus a lexicon sentiment estimate.
//!
//! # Quick Start
//!
//! ```no_run
//! use verisight::{Analyzer, AuthenticityLabel};
//!
//! let analyzer = Analyzer::new();
//! let file = analyzer.analyze_path("portrait.jpg");
//!
//! match file.result.authenticity_label {
//!     AuthenticityLabel::LikelyOrganic => println!("Looks genuine"),
//!     AuthenticityLabel::Inconclusive => println!("Mixed signals - investigate"),
//!     AuthenticityLabel::LikelySynthetic => println!("Probably generated"),
//!     AuthenticityLabel::Error => println!("Couldn't analyze: {}", file.result.reasoning),
//! }
//!
//! for check in &file.result.checks {
//!     println!("{:<28} {}  {}", check.name, check.status, check.details);
//! }
//! ```
//!
//! # Scoring System
//!
//! | Failed checks | Verdict | Trust score |
//! |---------------|---------|-------------|
//! | 0 | Likely Organic | 100 |
//! | 1 | Likely Organic | 85 |
//! | 2 | Inconclusive | 45 |
//! | 3+ | Likely Synthetic | 15 |
//!
//! # Modules
//!
//! - [`analyzer`]: Per-modality checks and the shared verdict
//! - [`exif`]: Container scanning and TIFF IFD0 tag reading
//! - [`config`]: Detection thresholds, overridable from JSON
//! - [`report`]: Output formatters (HTML, JSON, CSV) and certificates
//! - [`db`]: SQLite history of verdicts
//! - [`serve`]: Local HTTP upload surface

pub mod analyzer;
pub mod config;
pub mod db;
pub mod error;
pub mod exif;
pub mod logging;
pub mod report;
pub mod schema;
pub mod serve;

pub use analyzer::{
    AuthenticityLabel, Analyzer, Check, CheckStatus, FileAnalysis, Modality, ModalityDetails,
    ModalityResult, SentimentLabel,
};
pub use config::EngineConfig;
pub use db::{Database, DbSummary, StoredAnalysis, CURRENT_SCHEMA};
pub use error::ForensicError;
