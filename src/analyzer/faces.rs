//! Frontal face detection with the SeetaFace cascade
//!
//! Backed by `rustface`. The model file (`seeta_fd_frontal_v1.0.bin`) is read
//! once and validated up front; each detection call builds its own detector
//! from the cached bytes, so one [`SeetaFaceDetector`] can serve many rayon
//! workers without locking.

use super::regions::{FaceBox, FaceDetector};
use crate::error::{ForensicError, Result};
use image::GrayImage;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, warn};

/// Smallest face side the cascade looks for (rustface minimum)
const MIN_FACE_SIZE: u32 = 20;
const SCORE_THRESHOLD: f64 = 2.0;
const PYRAMID_SCALE: f32 = 0.8;
const WINDOW_STEP: u32 = 4;

pub struct SeetaFaceDetector {
    model: Vec<u8>,
}

impl SeetaFaceDetector {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let model = std::fs::read(path.as_ref())?;
        Self::from_bytes(model)
    }

    pub fn from_bytes(model: Vec<u8>) -> Result<Self> {
        rustface::read_model(Cursor::new(&model))
            .map_err(|e| ForensicError::Config(format!("invalid face model: {}", e)))?;
        Ok(Self { model })
    }
}

impl FaceDetector for SeetaFaceDetector {
    fn detect(&self, gray: &GrayImage) -> Vec<FaceBox> {
        let model = match rustface::read_model(Cursor::new(&self.model)) {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "face model failed to load");
                return vec![];
            }
        };

        let mut detector = rustface::create_detector_with_model(model);
        detector.set_min_face_size(MIN_FACE_SIZE);
        detector.set_score_thresh(SCORE_THRESHOLD);
        detector.set_pyramid_scale_factor(PYRAMID_SCALE);
        detector.set_slide_window_step(WINDOW_STEP, WINDOW_STEP);

        let (width, height) = gray.dimensions();
        let mut image = rustface::ImageData::new(gray.as_raw(), width, height);
        let faces: Vec<FaceBox> = detector
            .detect(&mut image)
            .iter()
            .filter_map(|face| {
                let b = face.bbox();
                clip_box(b.x(), b.y(), b.width(), b.height(), width, height)
            })
            .collect();

        debug!(faces = faces.len(), "face detection");
        faces
    }
}

/// Clip a detector rectangle (which may start off-image) to the frame.
/// Nothing left inside the frame means no face.
pub fn clip_box(x: i32, y: i32, w: u32, h: u32, width: u32, height: u32) -> Option<FaceBox> {
    let x0 = (x.max(0) as i64).min(width as i64);
    let y0 = (y.max(0) as i64).min(height as i64);
    let x1 = (x as i64 + w as i64).clamp(0, width as i64);
    let y1 = (y as i64 + h as i64).clamp(0, height as i64);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some(FaceBox::new(
        x0 as u32,
        y0 as u32,
        (x1 - x0) as u32,
        (y1 - y0) as u32,
    ))
}
