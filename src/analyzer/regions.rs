//! Region texture descriptions
//!
//! With a face detector plugged in, the image is cut into four regions
//! around the largest face:
//!
//! ```text
//! +----------+--------------------------+
//! | backgr.  |                          |
//! +----------+   +------------+         |
//! |              |    hair    |  0.6 h  |
//! |              +------------+         |
//! |              |    face    |  h      |
//! |              +------------+         |
//! |              |  clothing  |  1.0 h  |
//! |              +------------+         |
//! +-------------------------------------+
//! ```
//!
//! Each region gets entropy, Laplacian-variance sharpness and contrast, which
//! pick one of three canned sentences. Nothing here feeds the verdict.

use super::signal;
use crate::config::RegionThresholds;
use crate::error::Result;
#[cfg(not(feature = "faces"))]
use crate::error::ForensicError;
use image::{GrayImage, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

pub const NO_FACE_TEXT: &str = "Analysis unavailable (No face detected).";

const HAIR_NATURAL: &str = "The hair shows natural texture and volume with individual curls and slight irregularities that occur in real hair. It does not have the overly smooth sheen typical of AI.";
const HAIR_SYNTHETIC: &str = "The hair appears unnaturally smooth with a uniform sheen. The lack of individual strand definition suggests synthetic rendering or heavy filtering.";
const HAIR_AMBIGUOUS: &str = "Hair texture is consistent with standard digital photography, showing moderate detail and typical lighting interaction.";

const FACE_NATURAL: &str = "The face has realistic skin texture and natural facial features. The subtle asymmetry, formatting pores, and slight shadows lend authenticity to the image.";
const FACE_SYNTHETIC: &str = "The face shows an overly smooth or flawless finish that AI often produces. There is a lack of high-frequency skin texture details like pores or fine lines.";
const FACE_AMBIGUOUS: &str = "Facial features appear structurally sound. Skin texture falls within the expected range for this resolution.";

const CLOTHING_NATURAL: &str = "The clothing fabric appears natural, with soft folds and shading consistent with real materials. The lighting reflects off the wrinkles in a realistic manner.";
const CLOTHING_SYNTHETIC: &str = "The clothing surface is almost uniform, with no visible weave or fold structure. Fabric rendered this flat is common in generated imagery.";
const CLOTHING_AMBIGUOUS: &str = "Clothing texture appears somewhat flat or generic. While not definitively synthetic, it lacks the complex folding patterns usually seen in natural fabric.";

const BACKGROUND_NATURAL: &str = "The background elements appear consistent with natural outdoor/indoor lighting. Shadows and highlights fall naturally, indicating authenticity.";
const BACKGROUND_SYNTHETIC: &str = "The background is nearly featureless, with almost no tonal variation or detail. Fills this uniform are typical of generated or composited backdrops.";
const BACKGROUND_AMBIGUOUS: &str = "Background details are soft or out-of-focus (bokeh), which is consistent with portrait photography but reduces forensic certainty for the environment.";

// ============================================================================
// Face detection capability
// ============================================================================

/// Axis-aligned face bounding box in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Anything that can find frontal faces in a grayscale image
pub trait FaceDetector: Send + Sync {
    fn detect(&self, gray: &GrayImage) -> Vec<FaceBox>;
}

/// Whether region analysis has a detector to work with.
///
/// Chosen once when the [`super::Analyzer`] is built. `Unavailable` is a
/// normal mode, not an error: only the background is described.
#[derive(Clone, Default)]
pub enum FaceDetection {
    #[default]
    Unavailable,
    Available(Arc<dyn FaceDetector>),
}

impl FaceDetection {
    pub fn available<D: FaceDetector + 'static>(detector: D) -> Self {
        FaceDetection::Available(Arc::new(detector))
    }

    pub fn is_available(&self) -> bool {
        matches!(self, FaceDetection::Available(_))
    }

    /// SeetaFace detector loaded from a model file. Needs the `faces` feature.
    pub fn from_model_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        #[cfg(feature = "faces")]
        {
            Ok(Self::available(super::faces::SeetaFaceDetector::from_file(path)?))
        }
        #[cfg(not(feature = "faces"))]
        {
            Err(ForensicError::Config(format!(
                "{}: face detection requires the `faces` feature",
                path.as_ref().display()
            )))
        }
    }
}

impl fmt::Debug for FaceDetection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaceDetection::Unavailable => write!(f, "FaceDetection::Unavailable"),
            FaceDetection::Available(_) => write!(f, "FaceDetection::Available(..)"),
        }
    }
}

// ============================================================================
// Texture statistics
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextureStats {
    /// Shannon entropy of the gray levels, bits
    pub entropy: f64,
    /// Variance of the Laplacian
    pub sharpness: f64,
    /// Standard deviation of the gray levels
    pub contrast: f64,
}

/// Half-open pixel rectangle, already clipped to the image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl Rect {
    fn clipped(x0: u32, y0: u32, x1: u32, y1: u32, width: u32, height: u32) -> Self {
        let x1 = x1.min(width);
        let y1 = y1.min(height);
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1,
            y1,
        }
    }

    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// Unrounded luma with the BT.601 weights
pub fn luma(p: &Rgb<u8>) -> f64 {
    0.299 * p[0] as f64 + 0.587 * p[1] as f64 + 0.114 * p[2] as f64
}

/// [`luma`] rounded to the nearest gray level
pub fn to_grayscale(rgb: &RgbImage) -> GrayImage {
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let l = luma(rgb.get_pixel(x, y));
        image::Luma([l.round().clamp(0.0, 255.0) as u8])
    })
}

/// Texture statistics over one rectangle. An empty rectangle is all zeros.
pub fn texture_stats(gray: &GrayImage, rect: Rect) -> TextureStats {
    if rect.is_empty() {
        return TextureStats::default();
    }

    let mut levels = Vec::with_capacity((rect.width() * rect.height()) as usize);
    for y in rect.y0..rect.y1 {
        for x in rect.x0..rect.x1 {
            levels.push(gray.get_pixel(x, y)[0]);
        }
    }
    let values: Vec<f64> = levels.iter().map(|&v| v as f64).collect();

    TextureStats {
        entropy: signal::entropy(levels.iter().copied()),
        sharpness: laplacian_variance(gray, rect),
        contrast: signal::std_dev(&values),
    }
}

/// Reflect-101 border: -1 -> 1, n -> n-2
fn reflect_101(i: i64, n: i64) -> i64 {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n - 1);
    let m = i.rem_euclid(period);
    if m < n {
        m
    } else {
        period - m
    }
}

/// Variance of the 4-neighbour Laplacian over the rectangle, treating the
/// rectangle as its own image (borders mirror inside it)
pub fn laplacian_variance(gray: &GrayImage, rect: Rect) -> f64 {
    if rect.is_empty() {
        return 0.0;
    }
    let w = rect.width() as i64;
    let h = rect.height() as i64;
    let at = |x: i64, y: i64| -> f64 {
        let px = rect.x0 + reflect_101(x, w) as u32;
        let py = rect.y0 + reflect_101(y, h) as u32;
        gray.get_pixel(px, py)[0] as f64
    };

    let mut response = Vec::with_capacity((w * h) as usize);
    for y in 0..h {
        for x in 0..w {
            let lap = at(x, y - 1) + at(x - 1, y) + at(x + 1, y) + at(x, y + 1) - 4.0 * at(x, y);
            response.push(lap);
        }
    }
    signal::variance(&response)
}

// ============================================================================
// Descriptions
// ============================================================================

pub fn describe_hair(s: &TextureStats, t: &RegionThresholds) -> &'static str {
    if s.entropy > t.hair_natural_entropy && s.sharpness > t.hair_natural_sharpness {
        HAIR_NATURAL
    } else if s.entropy < t.hair_synthetic_entropy || s.sharpness < t.hair_synthetic_sharpness {
        HAIR_SYNTHETIC
    } else {
        HAIR_AMBIGUOUS
    }
}

pub fn describe_face(s: &TextureStats, t: &RegionThresholds) -> &'static str {
    if s.sharpness > t.face_natural_sharpness && s.entropy > t.face_natural_entropy {
        FACE_NATURAL
    } else if s.sharpness < t.face_synthetic_sharpness {
        FACE_SYNTHETIC
    } else {
        FACE_AMBIGUOUS
    }
}

pub fn describe_clothing(s: &TextureStats, t: &RegionThresholds) -> &'static str {
    if s.contrast > t.clothing_natural_contrast && s.sharpness > t.clothing_natural_sharpness {
        CLOTHING_NATURAL
    } else if s.contrast < t.clothing_synthetic_contrast
        || s.sharpness < t.clothing_synthetic_sharpness
    {
        CLOTHING_SYNTHETIC
    } else {
        CLOTHING_AMBIGUOUS
    }
}

pub fn describe_background(s: &TextureStats, t: &RegionThresholds) -> &'static str {
    if s.sharpness > t.background_natural_sharpness {
        BACKGROUND_NATURAL
    } else if s.entropy < t.background_synthetic_entropy
        && s.sharpness < t.background_synthetic_sharpness
    {
        BACKGROUND_SYNTHETIC
    } else {
        BACKGROUND_AMBIGUOUS
    }
}

// ============================================================================
// Report
// ============================================================================

/// Per-region sentences shown in the extended certificate section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionReport {
    pub hair_detail: String,
    pub face_expression: String,
    pub clothing_texture: String,
    pub background_env: String,
    pub regions_found: bool,
}

/// Region geometry around one face
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Regions {
    pub hair: Rect,
    pub face: Rect,
    pub clothing: Rect,
    pub background: Rect,
}

impl Regions {
    pub fn around(face: FaceBox, width: u32, height: u32, t: &RegionThresholds) -> Self {
        let FaceBox { x, y, width: w, height: h } = face;
        let right = x.saturating_add(w);
        let bottom = y.saturating_add(h);

        let hair_h = (t.hair_height_ratio * h as f64) as u32;
        let clothing_h = (t.clothing_height_ratio * h as f64) as u32;

        let background = if x > 0 && y > 0 {
            Rect::clipped(0, 0, x.min(t.background_patch), y.min(t.background_patch), width, height)
        } else {
            let side = t.background_fallback_patch;
            Rect::clipped(0, 0, side, side, width, height)
        };

        Self {
            hair: Rect::clipped(x, y.saturating_sub(hair_h), right, y, width, height),
            face: Rect::clipped(x, y, right, bottom, width, height),
            clothing: Rect::clipped(x, bottom, right, bottom.saturating_add(clothing_h), width, height),
            background,
        }
    }
}

/// Largest box by area; the first one wins ties
pub fn largest_face(faces: &[FaceBox]) -> Option<FaceBox> {
    faces.iter().copied().fold(None, |best, f| match best {
        Some(b) if b.area() >= f.area() => Some(b),
        _ => Some(f),
    })
}

/// Describe the regions of `rgb`. Without a detector, or without a face,
/// only the background is described (from the whole image).
pub fn analyze(rgb: &RgbImage, faces: &FaceDetection, t: &RegionThresholds) -> RegionReport {
    let gray = to_grayscale(rgb);
    let (w, h) = gray.dimensions();

    let face = match faces {
        FaceDetection::Available(detector) => largest_face(&detector.detect(&gray)),
        FaceDetection::Unavailable => None,
    };

    let Some(face) = face else {
        let whole = texture_stats(&gray, Rect::clipped(0, 0, w, h, w, h));
        tracing::debug!(
            detector = faces.is_available(),
            entropy = whole.entropy,
            sharpness = whole.sharpness,
            "no face region, describing whole image"
        );
        return RegionReport {
            hair_detail: NO_FACE_TEXT.to_string(),
            face_expression: NO_FACE_TEXT.to_string(),
            clothing_texture: NO_FACE_TEXT.to_string(),
            background_env: describe_background(&whole, t).to_string(),
            regions_found: false,
        };
    };

    let regions = Regions::around(face, w, h, t);
    let hair = texture_stats(&gray, regions.hair);
    let face_stats = texture_stats(&gray, regions.face);
    let clothing = texture_stats(&gray, regions.clothing);
    let background = texture_stats(&gray, regions.background);

    tracing::debug!(
        face_box = ?face,
        ?hair,
        face = ?face_stats,
        ?clothing,
        ?background,
        "region textures"
    );

    RegionReport {
        hair_detail: describe_hair(&hair, t).to_string(),
        face_expression: describe_face(&face_stats, t).to_string(),
        clothing_texture: describe_clothing(&clothing, t).to_string(),
        background_env: describe_background(&background, t).to_string(),
        regions_found: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedFaces(Vec<FaceBox>);

    #[cfg(not(feature = "faces"))]
    #[test]
    fn test_model_file_needs_faces_feature() {
        let err = FaceDetection::from_model_file("seeta_fd_frontal_v1.0.bin").unwrap_err();
        assert!(matches!(err, ForensicError::Config(_)));
        assert!(err.to_string().contains("`faces` feature"));
    }

    impl FaceDetector for FixedFaces {
        fn detect(&self, _gray: &GrayImage) -> Vec<FaceBox> {
            self.0.clone()
        }
    }

    fn noisy(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let v = (x.wrapping_mul(2_654_435_761) ^ y.wrapping_mul(40_503)).wrapping_mul(97) >> 7;
            let g = (v & 0xff) as u8;
            image::Rgb([g, g.wrapping_add(31), g.wrapping_add(77)])
        })
    }

    fn flat(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, image::Rgb([120, 120, 120]))
    }

    // ==========================================================================
    // PRIMITIVE TESTS
    // ==========================================================================

    #[test]
    fn test_grayscale_weights() {
        let img = RgbImage::from_pixel(1, 1, image::Rgb([255, 0, 0]));
        // 0.299 * 255 = 76.245
        assert_eq!(to_grayscale(&img).get_pixel(0, 0)[0], 76);
        let img = RgbImage::from_pixel(1, 1, image::Rgb([200, 200, 200]));
        assert_eq!(to_grayscale(&img).get_pixel(0, 0)[0], 200);
    }

    #[test]
    fn test_reflect_101() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(2, 5), 2);
        assert_eq!(reflect_101(-1, 1), 0);
    }

    #[test]
    fn test_flat_region_has_no_texture() {
        let gray = to_grayscale(&flat(20, 20));
        let s = texture_stats(&gray, Rect::clipped(0, 0, 20, 20, 20, 20));
        assert!(s.entropy.abs() < 1e-9);
        assert_eq!(s.sharpness, 0.0);
        assert_eq!(s.contrast, 0.0);
    }

    #[test]
    fn test_empty_region_is_zero() {
        let gray = to_grayscale(&noisy(10, 10));
        let s = texture_stats(&gray, Rect::clipped(5, 5, 5, 9, 10, 10));
        assert_eq!(s, TextureStats::default());
    }

    #[test]
    fn test_checkerboard_is_sharp() {
        let img = GrayImage::from_fn(16, 16, |x, y| {
            image::Luma([if (x + y) % 2 == 0 { 0 } else { 255 }])
        });
        let s = texture_stats(&img, Rect::clipped(0, 0, 16, 16, 16, 16));
        // Every Laplacian response is +-1020
        assert!((s.sharpness - 1020.0 * 1020.0).abs() < 1e-6);
        assert!((s.entropy - 1.0).abs() < 1e-6);
        assert!((s.contrast - 127.5).abs() < 1e-9);
    }

    // ==========================================================================
    // GEOMETRY TESTS
    // ==========================================================================

    #[test]
    fn test_largest_face_first_wins_ties() {
        let a = FaceBox::new(0, 0, 10, 10);
        let b = FaceBox::new(50, 50, 20, 5);
        let c = FaceBox::new(5, 5, 5, 20);
        assert_eq!(largest_face(&[a, b, c]), Some(a));
        assert_eq!(largest_face(&[b, FaceBox::new(1, 1, 30, 30)]).map(|f| f.width), Some(30));
        assert_eq!(largest_face(&[]), None);
    }

    #[test]
    fn test_region_geometry() {
        let t = RegionThresholds::default();
        let r = Regions::around(FaceBox::new(150, 200, 100, 120), 400, 600, &t);
        assert_eq!(r.hair, Rect { x0: 150, y0: 128, x1: 250, y1: 200 });
        assert_eq!(r.face, Rect { x0: 150, y0: 200, x1: 250, y1: 320 });
        assert_eq!(r.clothing, Rect { x0: 150, y0: 320, x1: 250, y1: 440 });
        assert_eq!(r.background, Rect { x0: 0, y0: 0, x1: 100, y1: 100 });
    }

    #[test]
    fn test_region_geometry_clipped_at_edges() {
        let t = RegionThresholds::default();
        // Face touching the top edge, clothing running off the bottom
        let r = Regions::around(FaceBox::new(0, 0, 40, 60), 30, 90, &t);
        assert!(r.hair.is_empty());
        assert_eq!(r.face, Rect { x0: 0, y0: 0, x1: 30, y1: 60 });
        assert_eq!(r.clothing, Rect { x0: 0, y0: 60, x1: 30, y1: 90 });
        assert_eq!(r.background, Rect { x0: 0, y0: 0, x1: 30, y1: 50 });
    }

    #[test]
    fn test_small_offset_background() {
        let t = RegionThresholds::default();
        let r = Regions::around(FaceBox::new(20, 30, 10, 10), 100, 100, &t);
        assert_eq!(r.background, Rect { x0: 0, y0: 0, x1: 20, y1: 30 });
    }

    // ==========================================================================
    // DESCRIPTION TESTS
    // ==========================================================================

    #[test]
    fn test_description_tiers() {
        let t = RegionThresholds::default();
        let sharp = TextureStats { entropy: 6.0, sharpness: 500.0, contrast: 50.0 };
        let soft = TextureStats { entropy: 4.2, sharpness: 80.0, contrast: 20.0 };
        let dead = TextureStats::default();

        assert_eq!(describe_hair(&sharp, &t), HAIR_NATURAL);
        assert_eq!(describe_hair(&soft, &t), HAIR_AMBIGUOUS);
        assert_eq!(describe_hair(&dead, &t), HAIR_SYNTHETIC);

        assert_eq!(describe_face(&sharp, &t), FACE_NATURAL);
        assert_eq!(describe_face(&soft, &t), FACE_AMBIGUOUS);
        assert_eq!(describe_face(&dead, &t), FACE_SYNTHETIC);

        assert_eq!(describe_clothing(&sharp, &t), CLOTHING_NATURAL);
        assert_eq!(describe_clothing(&soft, &t), CLOTHING_AMBIGUOUS);
        assert_eq!(describe_clothing(&dead, &t), CLOTHING_SYNTHETIC);

        assert_eq!(describe_background(&sharp, &t), BACKGROUND_NATURAL);
        assert_eq!(describe_background(&soft, &t), BACKGROUND_AMBIGUOUS);
        assert_eq!(describe_background(&dead, &t), BACKGROUND_SYNTHETIC);
    }

    // ==========================================================================
    // CAPABILITY TESTS
    // ==========================================================================

    #[test]
    fn test_unavailable_describes_background_only() {
        let report = analyze(&flat(64, 64), &FaceDetection::Unavailable, &RegionThresholds::default());
        assert!(!report.regions_found);
        assert_eq!(report.hair_detail, NO_FACE_TEXT);
        assert_eq!(report.face_expression, NO_FACE_TEXT);
        assert_eq!(report.clothing_texture, NO_FACE_TEXT);
        assert_eq!(report.background_env, BACKGROUND_SYNTHETIC);
    }

    #[test]
    fn test_detector_without_faces_falls_back() {
        let faces = FaceDetection::available(FixedFaces(vec![]));
        let report = analyze(&noisy(64, 64), &faces, &RegionThresholds::default());
        assert!(!report.regions_found);
        assert_eq!(report.face_expression, NO_FACE_TEXT);
    }

    #[test]
    fn test_detected_face_fills_every_region() {
        let faces = FaceDetection::available(FixedFaces(vec![
            FaceBox::new(2, 2, 4, 4),
            FaceBox::new(40, 60, 40, 40),
        ]));
        let report = analyze(&noisy(160, 200), &faces, &RegionThresholds::default());
        assert!(report.regions_found);
        for text in [
            &report.hair_detail,
            &report.face_expression,
            &report.clothing_texture,
            &report.background_env,
        ] {
            assert_ne!(text, NO_FACE_TEXT);
            assert!(!text.is_empty());
        }
    }

    #[test]
    fn test_flat_image_with_face_reads_synthetic() {
        let faces = FaceDetection::available(FixedFaces(vec![FaceBox::new(20, 30, 20, 20)]));
        let report = analyze(&flat(80, 100), &faces, &RegionThresholds::default());
        assert_eq!(report.hair_detail, HAIR_SYNTHETIC);
        assert_eq!(report.face_expression, FACE_SYNTHETIC);
        assert_eq!(report.clothing_texture, CLOTHING_SYNTHETIC);
        assert_eq!(report.background_env, BACKGROUND_SYNTHETIC);
    }

    #[test]
    fn test_debug_does_not_expose_detector() {
        let faces = FaceDetection::available(FixedFaces(vec![]));
        assert_eq!(format!("{:?}", faces), "FaceDetection::Available(..)");
        assert!(!FaceDetection::default().is_available());
    }
}
