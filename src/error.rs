//! Error taxonomy for the forensic engine
//!
//! Analyzer internals return [`ForensicError`] and propagate with `?`. The
//! public `Analyzer::analyze_*` entry points never surface these to callers:
//! they are folded into an `Error`-labelled result instead.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ForensicError>;

#[derive(Debug, Error)]
pub enum ForensicError {
    /// Malformed or unsupported media
    #[error("decode error: {0}")]
    Decode(String),

    /// Numeric failure on degenerate input (empty arrays, zero-length frames)
    #[error("computation error: {0}")]
    Computation(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid engine configuration file
    #[error("config error: {0}")]
    Config(String),
}

impl ForensicError {
    pub fn decode(msg: impl Into<String>) -> Self {
        ForensicError::Decode(msg.into())
    }

    pub fn computation(msg: impl Into<String>) -> Self {
        ForensicError::Computation(msg.into())
    }
}
