//! Audio forensics
//!
//! Three checks over the decoded mono waveform:
//!
//! 1. **Spectral Flatness** - synthetic speech often has no noise floor at
//!    all, which drives the geometric/arithmetic power ratio towards zero
//! 2. **High-Frequency Cutoff** - a brick-wall rolloff at 16k/22.05k/24k in
//!    a file sampled well above that points at upsampled model output
//! 3. **Physiological Breaths** - long speech with no pauses, or with only
//!    tiny ones, is not how people talk
//!
//! # STFT framing
//!
//! Frames are `frame_size` samples wide (2048), `hop_size` apart (512),
//! centered: the signal is zero-padded by half a frame on each side, so
//! there are `1 + len / hop` frames. Each frame is Hann-windowed before the
//! FFT. Frames are folded into running sums as they are produced; the full
//! spectrogram is never held in memory.
//!
//! ```text
//!   bins     = frame_size / 2 + 1
//!   freq(k)  = k * sample_rate / frame_size
//! ```
//!
//! Decoding is done from an in-memory cursor, nothing touches the disk.

use super::{AudioDetails, Check, ModalityDetails, ModalityResult, SentimentLabel};
use super::signal;
use crate::config::AudioThresholds;
use crate::error::{ForensicError, Result};
use rustfft::{num_complex::Complex, FftPlanner};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

pub const FLATNESS_CHECK: &str = "Spectral Flatness";
pub const CUTOFF_CHECK: &str = "High-Frequency Cutoff";
pub const BREATH_CHECK: &str = "Physiological Breaths";

const FLATNESS_DESC: &str = "Detects synthetic silence/lack of noise floor.";
const CUTOFF_DESC: &str = "Identifies upsampling artifacts.";
const BREATH_DESC: &str = "Checks for natural breathing gaps in speech.";

/// Floor applied to bin power before taking logs
const POWER_AMIN: f64 = 1e-10;

/// Audio sentiment is not estimated; the neutral midpoint is reported
const AUDIO_SENTIMENT_SCORE: u32 = 50;

/// Mono waveform plus what the container said about it
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f64>,
    pub sample_rate: u32,
    pub channels: usize,
}

impl DecodedAudio {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decode any container/codec symphonia knows, averaging channels to mono
pub fn decode(data: &[u8]) -> Result<DecodedAudio> {
    let cursor = std::io::Cursor::new(data.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    // No hint - let symphonia detect the container from the bytes
    let hint = Hint::new();

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| ForensicError::decode(format!("unrecognized audio format: {}", e)))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| ForensicError::decode("no audio track"))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| ForensicError::decode("missing sample rate"))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| ForensicError::decode(format!("unsupported codec: {}", e)))?;

    let mut samples = Vec::new();
    let mut channels = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(_) => break,
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(_) => continue,
        };

        let spec = *decoded.spec();
        let channel_count = spec.channels.count().max(1);
        channels = channel_count;

        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);

        for chunk in buf.samples().chunks(channel_count) {
            let mono: f64 = chunk.iter().map(|&s| s as f64).sum::<f64>() / channel_count as f64;
            samples.push(mono);
        }
    }

    if samples.is_empty() {
        return Err(ForensicError::decode("no audio samples decoded"));
    }

    debug!(sample_rate, channels, samples = samples.len(), "decoded audio");

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}

// ============================================================================
// STFT
// ============================================================================

/// Everything the checks need from one pass over the frames
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralSummary {
    /// Mean over frames of per-frame spectral flatness
    pub mean_flatness: f64,
    /// Mean magnitude per frequency bin
    pub mean_magnitude: Vec<f64>,
    /// RMS of each (unwindowed) frame
    pub frame_rms: Vec<f64>,
}

/// Geometric mean over arithmetic mean of the floored power spectrum
pub fn spectral_flatness(power: &[f64]) -> f64 {
    if power.is_empty() {
        return 0.0;
    }
    let n = power.len() as f64;
    let (log_sum, sum) = power.iter().fold((0.0, 0.0), |(l, s), &p| {
        let p = p.max(POWER_AMIN);
        (l + p.ln(), s + p)
    });
    (log_sum / n).exp() / (sum / n)
}

pub fn spectral_summary(samples: &[f64], frame_size: usize, hop_size: usize) -> SpectralSummary {
    let bins = frame_size / 2 + 1;
    let pad = (frame_size / 2) as i64;
    let frame_count = 1 + samples.len() / hop_size;

    let window = signal::hann_window(frame_size);
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(frame_size);

    let mut buffer = vec![Complex::new(0.0, 0.0); frame_size];
    let mut power = vec![0.0; bins];
    let mut magnitude_sums = vec![0.0; bins];
    let mut flatness_sum = 0.0;
    let mut frame_rms = Vec::with_capacity(frame_count);

    for frame in 0..frame_count {
        let start = (frame * hop_size) as i64 - pad;
        let mut energy = 0.0;

        for (i, slot) in buffer.iter_mut().enumerate() {
            let idx = start + i as i64;
            let x = if idx >= 0 && (idx as usize) < samples.len() {
                samples[idx as usize]
            } else {
                0.0
            };
            energy += x * x;
            *slot = Complex::new(x * window[i], 0.0);
        }
        frame_rms.push((energy / frame_size as f64).sqrt());

        fft.process(&mut buffer);

        for k in 0..bins {
            let mag = buffer[k].norm();
            magnitude_sums[k] += mag;
            power[k] = mag * mag;
        }
        flatness_sum += spectral_flatness(&power);
    }

    let frames = frame_count as f64;
    SpectralSummary {
        mean_flatness: flatness_sum / frames,
        mean_magnitude: magnitude_sums.into_iter().map(|s| s / frames).collect(),
        frame_rms,
    }
}

// ============================================================================
// Cutoff
// ============================================================================

/// Lowest frequency above the search floor where the mean magnitude drops to
/// `ratio` of the peak and stays there up to Nyquist. A spectrum with no such
/// tail (including a silent one) reports Nyquist itself.
pub fn find_cutoff(
    mean_magnitude: &[f64],
    sample_rate: u32,
    frame_size: usize,
    t: &AudioThresholds,
) -> f64 {
    let nyquist = sample_rate as f64 / 2.0;
    let peak = mean_magnitude.iter().copied().fold(0.0, f64::max);
    if peak <= 0.0 {
        return nyquist;
    }
    let limit = peak * t.cutoff_power_ratio;
    let freq = |k: usize| k as f64 * sample_rate as f64 / frame_size as f64;

    // Scan from the top down to find where the quiet tail begins
    let mut tail_start = mean_magnitude.len();
    while tail_start > 0 && mean_magnitude[tail_start - 1] <= limit {
        tail_start -= 1;
    }

    (tail_start..mean_magnitude.len())
        .find(|&k| freq(k) > t.cutoff_search_floor_hz)
        .map(freq)
        .unwrap_or(nyquist)
}

/// The suspicious cutoff `cutoff_hz` sits near, when the native rate has
/// room for more bandwidth than that
pub fn suspicious_cutoff(cutoff_hz: f64, sample_rate: u32, t: &AudioThresholds) -> Option<f64> {
    t.suspicious_cutoffs_hz.iter().copied().find(|&sc| {
        (cutoff_hz - sc).abs() < t.cutoff_tolerance_hz
            && sample_rate as f64 >= sc * t.cutoff_rate_factor
    })
}

pub fn check_cutoff(cutoff_hz: f64, sample_rate: u32, t: &AudioThresholds) -> Check {
    if suspicious_cutoff(cutoff_hz, sample_rate, t).is_some() {
        Check::fail(
            CUTOFF_CHECK,
            CUTOFF_DESC,
            format!(
                "Hard frequency cutoff detected at {}Hz. Suggests upsampling from lower-res model.",
                cutoff_hz as i64
            ),
        )
    } else {
        Check::pass(
            CUTOFF_CHECK,
            CUTOFF_DESC,
            format!("Natural frequency rolloff detected (Cutoff ~{}Hz).", cutoff_hz as i64),
        )
    }
}

// ============================================================================
// Silence split
// ============================================================================

/// Non-silent `[start, end)` sample intervals.
///
/// A frame is non-silent when its RMS is within `top_db` of the loudest
/// frame. Runs of non-silent frames become intervals at hop resolution,
/// clipped to the signal length. An all-zero signal has none.
pub fn non_silent_intervals(
    frame_rms: &[f64],
    hop_size: usize,
    len: usize,
    top_db: f64,
) -> Vec<(usize, usize)> {
    let peak = frame_rms.iter().copied().fold(0.0, f64::max);
    if peak <= 0.0 {
        return vec![];
    }
    let ref_db = signal::power_to_db(peak * peak, POWER_AMIN);

    let mut intervals = Vec::new();
    let mut open: Option<usize> = None;
    for (i, &rms) in frame_rms.iter().enumerate() {
        let loud = signal::power_to_db(rms * rms, POWER_AMIN) - ref_db > -top_db;
        match (loud, open) {
            (true, None) => open = Some(i),
            (false, Some(start)) => {
                intervals.push((start, i));
                open = None;
            }
            _ => {}
        }
    }
    if let Some(start) = open {
        intervals.push((start, frame_rms.len()));
    }

    intervals
        .into_iter()
        .map(|(s, e)| ((s * hop_size).min(len), (e * hop_size).min(len)))
        .collect()
}

/// Seconds between consecutive intervals
pub fn gap_durations(intervals: &[(usize, usize)], sample_rate: u32) -> Vec<f64> {
    intervals
        .windows(2)
        .map(|w| w[1].0.saturating_sub(w[0].1) as f64 / sample_rate as f64)
        .collect()
}

pub fn check_breaths(gaps: &[f64], duration_secs: f64, t: &AudioThresholds) -> Check {
    if duration_secs > t.breath_min_duration_secs {
        if gaps.is_empty() {
            return Check::fail(
                BREATH_CHECK,
                BREATH_DESC,
                "No breath gaps detected in >10s speech segment.",
            );
        }
        if signal::mean(gaps) < t.breath_mean_gap_min_secs {
            return Check::fail(
                BREATH_CHECK,
                BREATH_DESC,
                "Unnaturally short pauses between segments.",
            );
        }
    }
    Check::pass(BREATH_CHECK, BREATH_DESC, "Natural speech pausing detected.")
}

pub fn check_flatness(mean_flatness: f64, t: &AudioThresholds) -> Check {
    if mean_flatness < t.flatness_min {
        Check::fail(
            FLATNESS_CHECK,
            FLATNESS_DESC,
            format!(
                "Spectral flatness near zero ({:.6}). Lacks natural acoustic noise floor.",
                mean_flatness
            ),
        )
    } else {
        Check::pass(
            FLATNESS_CHECK,
            FLATNESS_DESC,
            "Spectral richness consistent with acoustic recording.",
        )
    }
}

// ============================================================================
// Entry point
// ============================================================================

pub fn analyze(data: &[u8], t: &AudioThresholds) -> Result<ModalityResult> {
    let audio = decode(data)?;
    Ok(analyze_decoded(&audio, t))
}

pub fn analyze_decoded(audio: &DecodedAudio, t: &AudioThresholds) -> ModalityResult {
    let summary = spectral_summary(&audio.samples, t.frame_size, t.hop_size);
    let cutoff = find_cutoff(&summary.mean_magnitude, audio.sample_rate, t.frame_size, t);
    let intervals = non_silent_intervals(
        &summary.frame_rms,
        t.hop_size,
        audio.samples.len(),
        t.silence_top_db,
    );
    let gaps = gap_durations(&intervals, audio.sample_rate);
    let duration = audio.duration_secs();

    debug!(
        flatness = summary.mean_flatness,
        cutoff,
        intervals = intervals.len(),
        duration,
        "audio measurements"
    );

    let checks = vec![
        check_flatness(summary.mean_flatness, t),
        check_cutoff(cutoff, audio.sample_rate, t),
        check_breaths(&gaps, duration, t),
    ];

    let details = AudioDetails {
        duration_secs: (duration * 100.0).round() / 100.0,
        sample_rate: audio.sample_rate,
        channels: audio.channels,
        gap_count: gaps.len(),
        mean_gap_secs: if gaps.is_empty() {
            None
        } else {
            Some(signal::mean(&gaps))
        },
        cutoff_hz: cutoff,
    };

    ModalityResult::from_checks(
        checks,
        ModalityDetails::Audio(details),
        SentimentLabel::NotApplicable,
        AUDIO_SENTIMENT_SCORE,
    )
}
