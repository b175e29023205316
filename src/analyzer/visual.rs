//! Image forensics
//!
//! Four independent checks over the decoded bitmap, in report order:
//!
//! 1. **Metadata Consistency** - EXIF present, camera Model present, no
//!    generator name in Software
//! 2. **ELA Uniformity** - re-encode as JPEG and measure how uneven the
//!    recompression error is. Generated images tend to recompress uniformly.
//! 3. **Sensor Noise Analysis** - luminance spread across the frame
//! 4. **Color Channel Correlation** - real light couples R/G/B loosely;
//!    near-identical or unrelated channels are both suspicious

use super::{
    regions, Check, ImageDetails, ModalityDetails, ModalityResult, SentimentLabel,
};
use super::regions::FaceDetection;
use super::signal;
use crate::config::{ImageThresholds, RegionThresholds};
use crate::error::{ForensicError, Result};
use crate::exif;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};
use tracing::debug;

pub const METADATA_CHECK: &str = "Metadata Consistency";
pub const ELA_CHECK: &str = "ELA Uniformity";
pub const NOISE_CHECK: &str = "Sensor Noise Analysis";
pub const CORRELATION_CHECK: &str = "Color Channel Correlation";

const METADATA_DESC: &str = "Checks for camera sensor tags vs AI signatures.";
const ELA_DESC: &str = "Analyzes compression artifact variance.";
const NOISE_DESC: &str = "Checks for natural high-frequency sensor noise.";
const CORRELATION_DESC: &str = "Verifies natural light interaction across RGB channels.";

/// Decode `data` and run every image check
pub fn analyze(
    data: &[u8],
    t: &ImageThresholds,
    region_thresholds: &RegionThresholds,
    faces: &FaceDetection,
) -> Result<ModalityResult> {
    let format = image::guess_format(data).ok();
    let rgb = image::load_from_memory(data)?.to_rgb8();
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return Err(ForensicError::computation("image has no pixels"));
    }

    let checks = vec![
        check_metadata(data, t),
        check_ela(&rgb, t)?,
        check_luminance(&rgb, t),
        check_channel_correlation(&rgb, t),
    ];

    let report = regions::analyze(&rgb, faces, region_thresholds);

    let details = ImageDetails {
        format: format.map(format_name),
        dimensions: format!("{}x{}", width, height),
        width,
        height,
        regions: Some(report),
    };

    Ok(ModalityResult::from_checks(
        checks,
        ModalityDetails::Image(details),
        SentimentLabel::NotApplicable,
        0,
    ))
}

fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "JPEG".to_string(),
        ImageFormat::Png => "PNG".to_string(),
        ImageFormat::WebP => "WEBP".to_string(),
        ImageFormat::Gif => "GIF".to_string(),
        ImageFormat::Bmp => "BMP".to_string(),
        ImageFormat::Tiff => "TIFF".to_string(),
        other => format!("{:?}", other).to_uppercase(),
    }
}

// ============================================================================
// Metadata
// ============================================================================

pub fn check_metadata(data: &[u8], t: &ImageThresholds) -> Check {
    let Some(tags) = exif::extract(data) else {
        return Check::fail(METADATA_CHECK, METADATA_DESC, "Complete absence of EXIF data.");
    };

    if let Some(software) = tags.software.as_deref() {
        if t
            .generator_signatures
            .iter()
            .any(|sig| software.contains(sig.as_str()))
        {
            return Check::fail(
                METADATA_CHECK,
                METADATA_DESC,
                format!("AI Signature found in metadata: {}", software),
            );
        }
    }

    if !tags.has_model() {
        return Check::fail(METADATA_CHECK, METADATA_DESC, "Camera Model tag missing.");
    }

    Check::pass(METADATA_CHECK, METADATA_DESC, "Valid")
}

// ============================================================================
// Error level analysis
// ============================================================================

/// Population std of |original - recompressed| over every channel value
pub fn ela_deviation(rgb: &RgbImage, quality: u8) -> Result<f64> {
    let mut buf = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))?;
    let recompressed = image::load_from_memory_with_format(&buf, ImageFormat::Jpeg)?.to_rgb8();

    if recompressed.dimensions() != rgb.dimensions() {
        return Err(ForensicError::computation(
            "recompressed image dimensions differ from original",
        ));
    }

    let diff: Vec<f64> = rgb
        .as_raw()
        .iter()
        .zip(recompressed.as_raw())
        .map(|(&a, &b)| (a as f64 - b as f64).abs())
        .collect();
    Ok(signal::std_dev(&diff))
}

pub fn check_ela(rgb: &RgbImage, t: &ImageThresholds) -> Result<Check> {
    let deviation = ela_deviation(rgb, t.ela_quality)?;
    debug!(deviation, "ELA deviation");

    if deviation > t.ela_std_splice {
        // High variance points at splicing, which is a different question
        debug!(deviation, "ELA deviation above splice threshold (not scored)");
    }

    let check = if deviation < t.ela_std_min {
        Check::fail(
            ELA_CHECK,
            ELA_DESC,
            format!(
                "ELA Variance exceptionally low. Suggests synthetic generation (Calculated: {:.2}).",
                deviation
            ),
        )
    } else {
        Check::pass(ELA_CHECK, ELA_DESC, "Normal compression variance.")
    };
    Ok(check)
}

// ============================================================================
// Luminance
// ============================================================================

/// Population std of float luma over every pixel
pub fn luminance_std(rgb: &RgbImage) -> f64 {
    let values: Vec<f64> = rgb.pixels().map(regions::luma).collect();
    signal::std_dev(&values)
}

pub fn check_luminance(rgb: &RgbImage, t: &ImageThresholds) -> Check {
    let spread = luminance_std(rgb);
    debug!(spread, "luminance std");

    if spread < t.luminance_std_min {
        Check::fail(
            NOISE_CHECK,
            NOISE_DESC,
            format!(
                "Luminance variance below organic threshold (Calculated: {:.2}).",
                spread
            ),
        )
    } else {
        Check::pass(NOISE_CHECK, NOISE_DESC, "Natural luminance distribution.")
    }
}

// ============================================================================
// Channel correlation
// ============================================================================

/// Mean of the R-G, R-B and G-B Pearson correlations
pub fn channel_correlation(rgb: &RgbImage) -> f64 {
    let n = (rgb.width() * rgb.height()) as usize;
    let mut r = Vec::with_capacity(n);
    let mut g = Vec::with_capacity(n);
    let mut b = Vec::with_capacity(n);
    for p in rgb.pixels() {
        r.push(p[0] as f64);
        g.push(p[1] as f64);
        b.push(p[2] as f64);
    }

    let rg = signal::pearson_correlation(&r, &g);
    let rb = signal::pearson_correlation(&r, &b);
    let gb = signal::pearson_correlation(&g, &b);
    (rg + rb + gb) / 3.0
}

pub fn check_channel_correlation(rgb: &RgbImage, t: &ImageThresholds) -> Check {
    let avg = channel_correlation(rgb);
    debug!(avg, "channel correlation");

    let failed = avg > t.channel_corr_max || avg < t.channel_corr_min;
    Check::from_outcome(
        CORRELATION_CHECK,
        CORRELATION_DESC,
        failed,
        format!("Avg Correlation: {:.4}", avg),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{AuthenticityLabel, CheckStatus};
    use crate::exif::container::jpeg_with_exif;
    use crate::exif::tiff::build_ascii_ifd;
    use crate::exif::{TAG_MODEL, TAG_SOFTWARE};
    use std::io::Cursor;

    fn hash(mut v: u32) -> u32 {
        v ^= v >> 16;
        v = v.wrapping_mul(0x7feb_352d);
        v ^= v >> 15;
        v = v.wrapping_mul(0x846c_a68b);
        v ^= v >> 16;
        v
    }

    fn noise(x: u32, y: u32, seed: u32) -> u32 {
        hash(y.wrapping_mul(10_007).wrapping_add(x).wrapping_add(seed.wrapping_mul(0x9e37_79b9))) & 0xff
    }

    /// Noise with partially shared channels, like light hitting a real sensor
    fn natural_like(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let a = noise(x, y, 1);
            let b = noise(x, y, 2);
            image::Rgb([a as u8, ((3 * a + b) / 4) as u8, ((a + b) / 2) as u8])
        })
    }

    fn flat_gray(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, image::Rgb([128, 128, 128]))
    }

    fn encode(img: &RgbImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    fn find<'a>(result: &'a ModalityResult, name: &str) -> &'a Check {
        result.checks.iter().find(|c| c.name == name).unwrap()
    }

    // ==========================================================================
    // WHOLE-ANALYZER TESTS
    // ==========================================================================

    #[test]
    fn test_flat_gray_is_synthetic() {
        let png = encode(&flat_gray(64, 64), ImageFormat::Png);
        let r = analyze(
            &png,
            &ImageThresholds::default(),
            &RegionThresholds::default(),
            &FaceDetection::Unavailable,
        )
        .unwrap();

        let names: Vec<&str> = r.checks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec![METADATA_CHECK, ELA_CHECK, NOISE_CHECK, CORRELATION_CHECK]);

        let corr = find(&r, CORRELATION_CHECK);
        assert_eq!(corr.status, CheckStatus::Fail);
        assert_eq!(corr.details, "Avg Correlation: 1.0000");

        assert_eq!(find(&r, METADATA_CHECK).details, "Complete absence of EXIF data.");
        assert_eq!(find(&r, NOISE_CHECK).status, CheckStatus::Fail);
        assert_eq!(r.authenticity_label, AuthenticityLabel::LikelySynthetic);
        assert_eq!(r.authenticity_score, 15);
        assert_eq!(r.sentiment_label, SentimentLabel::NotApplicable);
    }

    #[test]
    fn test_details_carry_format_and_regions() {
        let png = encode(&flat_gray(40, 30), ImageFormat::Png);
        let r = analyze(
            &png,
            &ImageThresholds::default(),
            &RegionThresholds::default(),
            &FaceDetection::Unavailable,
        )
        .unwrap();

        match &r.details {
            ModalityDetails::Image(d) => {
                assert_eq!(d.format.as_deref(), Some("PNG"));
                assert_eq!(d.dimensions, "40x30");
                let regions = d.regions.as_ref().unwrap();
                assert!(!regions.regions_found);
            }
            other => panic!("expected image details, got {:?}", other),
        }
    }

    #[test]
    fn test_corrupt_image_is_error() {
        let mut png = encode(&flat_gray(16, 16), ImageFormat::Png);
        png.truncate(30);
        let err = analyze(
            &png,
            &ImageThresholds::default(),
            &RegionThresholds::default(),
            &FaceDetection::Unavailable,
        );
        assert!(err.is_err());
    }

    // ==========================================================================
    // METADATA TESTS
    // ==========================================================================

    #[test]
    fn test_metadata_camera_model_passes() {
        let jpeg = encode(&flat_gray(8, 8), ImageFormat::Jpeg);
        let tagged = jpeg_with_exif(&build_ascii_ifd(&[(TAG_MODEL, "ILCE-7M3")]), &jpeg);
        let c = check_metadata(&tagged, &ImageThresholds::default());
        assert_eq!(c.status, CheckStatus::Pass);
        assert_eq!(c.details, "Valid");
    }

    #[test]
    fn test_metadata_generator_signature_wins_over_model() {
        let jpeg = encode(&flat_gray(8, 8), ImageFormat::Jpeg);
        let tiff = build_ascii_ifd(&[(TAG_MODEL, "ILCE-7M3"), (TAG_SOFTWARE, "Stable Diffusion 1.5")]);
        let c = check_metadata(&jpeg_with_exif(&tiff, &jpeg), &ImageThresholds::default());
        assert_eq!(c.status, CheckStatus::Fail);
        assert_eq!(c.details, "AI Signature found in metadata: Stable Diffusion 1.5");
    }

    #[test]
    fn test_metadata_missing_model() {
        let jpeg = encode(&flat_gray(8, 8), ImageFormat::Jpeg);
        let tiff = build_ascii_ifd(&[(TAG_SOFTWARE, "GIMP 2.10")]);
        let c = check_metadata(&jpeg_with_exif(&tiff, &jpeg), &ImageThresholds::default());
        assert_eq!(c.status, CheckStatus::Fail);
        assert_eq!(c.details, "Camera Model tag missing.");
    }

    #[test]
    fn test_metadata_absent() {
        let jpeg = encode(&flat_gray(8, 8), ImageFormat::Jpeg);
        let c = check_metadata(&jpeg, &ImageThresholds::default());
        assert_eq!(c.status, CheckStatus::Fail);
        assert_eq!(c.details, "Complete absence of EXIF data.");
    }

    // ==========================================================================
    // PIXEL STATISTIC TESTS
    // ==========================================================================

    #[test]
    fn test_ela_flat_image_is_uniform() {
        let t = ImageThresholds::default();
        let deviation = ela_deviation(&flat_gray(32, 32), t.ela_quality).unwrap();
        assert!(deviation < t.ela_std_min, "got {}", deviation);
        let c = check_ela(&flat_gray(32, 32), &t).unwrap();
        assert_eq!(c.status, CheckStatus::Fail);
        assert!(c.details.starts_with("ELA Variance exceptionally low."));
    }

    #[test]
    fn test_luminance_noise_passes() {
        let c = check_luminance(&natural_like(64, 64), &ImageThresholds::default());
        assert_eq!(c.status, CheckStatus::Pass);
        assert_eq!(c.details, "Natural luminance distribution.");
    }

    #[test]
    fn test_luminance_flat_fails() {
        let c = check_luminance(&flat_gray(16, 16), &ImageThresholds::default());
        assert_eq!(c.status, CheckStatus::Fail);
        assert_eq!(c.details, "Luminance variance below organic threshold (Calculated: 0.00).");
    }

    #[test]
    fn test_luminance_uses_unrounded_luma() {
        // Both pixels round to gray level 0, but their luma differs by 0.299
        let img = RgbImage::from_fn(2, 1, |x, _| image::Rgb([x as u8, 0, 0]));
        assert!((luminance_std(&img) - 0.1495).abs() < 1e-9);
        let gray = regions::to_grayscale(&img);
        assert_eq!(gray.as_raw(), &vec![0u8, 0u8]);
    }

    #[test]
    fn test_luminance_threshold_sees_fractional_spread() {
        // Alternating (0,0,0) and (133,0,0): float luma spread is 19.88 and
        // fails, while rounded levels 0/40 would give exactly 20.0
        let img = RgbImage::from_fn(4, 4, |x, y| {
            image::Rgb([if (x + y) % 2 == 0 { 0 } else { 133 }, 0, 0])
        });
        let c = check_luminance(&img, &ImageThresholds::default());
        assert_eq!(c.status, CheckStatus::Fail);
        assert_eq!(c.details, "Luminance variance below organic threshold (Calculated: 19.88).");
    }

    #[test]
    fn test_correlation_band() {
        let t = ImageThresholds::default();

        let natural = channel_correlation(&natural_like(64, 64));
        assert!(natural > t.channel_corr_min && natural <= t.channel_corr_max, "got {}", natural);
        assert_eq!(check_channel_correlation(&natural_like(64, 64), &t).status, CheckStatus::Pass);

        // Independent channels: lighting that does not add up
        let scrambled = RgbImage::from_fn(64, 64, |x, y| {
            image::Rgb([noise(x, y, 7) as u8, noise(x, y, 8) as u8, noise(x, y, 9) as u8])
        });
        let avg = channel_correlation(&scrambled);
        assert!(avg < t.channel_corr_min, "got {}", avg);
        assert_eq!(check_channel_correlation(&scrambled, &t).status, CheckStatus::Fail);
    }

    #[test]
    fn test_format_names() {
        assert_eq!(format_name(ImageFormat::Jpeg), "JPEG");
        assert_eq!(format_name(ImageFormat::WebP), "WEBP");
    }
}
