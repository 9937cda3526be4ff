//! Audio feature extraction
//!
//! Framed spectral analysis over the decoded waveform: per-frame RMS,
//! spectral centroid and rolloff, zero-crossing rate, a 12-bin chroma
//! accumulator for the dominant pitch class, and a spectral-flux onset
//! envelope feeding the tempo estimator.

use crate::analysis::{classify, tempo};
use crate::audio;
use crate::error::{Result, TunesmithError};
use crate::types::{AnalysisRecord, AudioBuffer, Energy, PitchClass, SpectralSummary};
use chrono::Utc;
use rustfft::{num_complex::Complex, FftPlanner};
use std::path::Path;
use tracing::{debug, warn};

/// Analysis window length in samples
pub const FRAME_SIZE: usize = 2048;
/// Hop between successive analysis windows in samples
pub const HOP_SIZE: usize = 512;

/// Fraction of spectral energy below the rolloff frequency
const ROLLOFF_FRACTION: f64 = 0.85;

/// Reference frequency for chroma mapping (A4)
const A4_HZ: f64 = 440.0;
/// MIDI note number of A4
const A4_MIDI: i32 = 69;

/// Analyze an audio file into an [`AnalysisRecord`].
///
/// Never raises past this boundary: decode or analysis failures produce a
/// degraded record carrying the failure cause, because callers branch on the
/// presence of numeric fields rather than on errors.
pub fn analyze(path: &Path) -> AnalysisRecord {
    match analyze_inner(path) {
        Ok(record) => record,
        Err(e) => {
            warn!("Analysis of {} degraded: {}", path.display(), e);
            AnalysisRecord::failed(e.short_cause())
        }
    }
}

fn analyze_inner(path: &Path) -> Result<AnalysisRecord> {
    let buffer = audio::decode(path)?;
    if buffer.is_empty() {
        return Err(TunesmithError::analysis_error(path, "no audio samples decoded"));
    }

    let features = extract_features(&buffer);
    let bpm = tempo::estimate_bpm(&features.onset_envelope, buffer.sample_rate);
    let key = features.dominant_pitch_class().map(|pc| pc.name().to_string());
    let energy = Energy::from_rms(features.rms_mean);
    let genre_hints = classify::classify(
        bpm,
        features.centroid_mean,
        features.zcr_mean,
        features.rms_mean,
    );

    debug!(
        "Analyzed {}: bpm={:?}, key={:?}, energy={}, {:.1}s",
        path.display(),
        bpm,
        key,
        energy,
        buffer.duration
    );

    Ok(AnalysisRecord {
        bpm,
        key,
        energy,
        duration_seconds: Some(buffer.duration),
        genre_hints,
        spectral: Some(SpectralSummary {
            centroid_hz: features.centroid_mean,
            rolloff_hz: features.rolloff_mean,
            zero_crossing_rate: features.zcr_mean,
        }),
        error: None,
        analyzed_at: Utc::now(),
    })
}

/// Per-signal feature means plus the raw onset envelope
pub(crate) struct FrameFeatures {
    pub rms_mean: f64,
    pub centroid_mean: f64,
    pub rolloff_mean: f64,
    pub zcr_mean: f64,
    pub chroma: [f64; 12],
    pub onset_envelope: Vec<f32>,
}

impl FrameFeatures {
    /// Pitch class with the most accumulated chroma energy, None when the
    /// signal carried none at all
    pub fn dominant_pitch_class(&self) -> Option<PitchClass> {
        let (index, &energy) = self
            .chroma
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))?;
        if energy > 0.0 {
            Some(PitchClass::from_index(index))
        } else {
            None
        }
    }
}

/// Run the framed analysis over a whole buffer.
///
/// Buffers shorter than one frame are zero-padded to a single frame so
/// short clips still produce a (rough) record.
pub(crate) fn extract_features(buffer: &AudioBuffer) -> FrameFeatures {
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(FRAME_SIZE);
    let window = hann_window(FRAME_SIZE);

    let padded;
    let samples: &[f32] = if buffer.samples.len() < FRAME_SIZE {
        padded = {
            let mut p = buffer.samples.clone();
            p.resize(FRAME_SIZE, 0.0);
            p
        };
        &padded
    } else {
        &buffer.samples
    };

    let bin_hz = buffer.sample_rate as f64 / FRAME_SIZE as f64;

    let mut rms_sum = 0.0;
    let mut centroid_sum = 0.0;
    let mut rolloff_sum = 0.0;
    let mut zcr_sum = 0.0;
    let mut chroma = [0.0f64; 12];
    let mut onset_envelope = Vec::new();
    let mut previous_spectrum: Vec<f32> = Vec::new();
    let mut frames = 0usize;

    let mut start = 0;
    while start + FRAME_SIZE <= samples.len() {
        let frame = &samples[start..start + FRAME_SIZE];

        rms_sum += root_mean_square(frame);
        zcr_sum += zero_crossing_rate(frame);

        let spectrum = magnitude_spectrum(frame, &window, fft.as_ref());
        centroid_sum += spectral_centroid(&spectrum, bin_hz);
        rolloff_sum += spectral_rolloff(&spectrum, bin_hz);
        accumulate_chroma(&mut chroma, &spectrum, bin_hz);
        onset_envelope.push(spectral_flux(&spectrum, &previous_spectrum));

        previous_spectrum = spectrum;
        frames += 1;
        start += HOP_SIZE;
    }

    let n = frames.max(1) as f64;
    FrameFeatures {
        rms_mean: rms_sum / n,
        centroid_mean: centroid_sum / n,
        rolloff_mean: rolloff_sum / n,
        zcr_mean: zcr_sum / n,
        chroma,
        onset_envelope,
    }
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32;
            0.5 * (1.0 - phase.cos())
        })
        .collect()
}

fn root_mean_square(frame: &[f32]) -> f64 {
    let sum_sq: f64 = frame.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / frame.len() as f64).sqrt()
}

fn zero_crossing_rate(frame: &[f32]) -> f64 {
    if frame.len() < 2 {
        return 0.0;
    }
    let crossings = frame.windows(2).filter(|w| w[0] * w[1] < 0.0).count();
    crossings as f64 / (frame.len() - 1) as f64
}

/// Windowed FFT magnitudes for the positive-frequency bins
fn magnitude_spectrum(frame: &[f32], window: &[f32], fft: &dyn rustfft::Fft<f32>) -> Vec<f32> {
    let mut buffer: Vec<Complex<f32>> = frame
        .iter()
        .zip(window)
        .map(|(&s, &w)| Complex::new(s * w, 0.0))
        .collect();

    fft.process(&mut buffer);

    buffer[..FRAME_SIZE / 2]
        .iter()
        .map(|c| c.norm() * 2.0 / FRAME_SIZE as f32)
        .collect()
}

/// Magnitude-weighted mean frequency in Hz
fn spectral_centroid(spectrum: &[f32], bin_hz: f64) -> f64 {
    let total: f64 = spectrum.iter().map(|&m| m as f64).sum();
    if total == 0.0 {
        return 0.0;
    }
    let weighted: f64 = spectrum
        .iter()
        .enumerate()
        .map(|(i, &m)| i as f64 * bin_hz * m as f64)
        .sum();
    weighted / total
}

/// Frequency below which [`ROLLOFF_FRACTION`] of the energy sits, in Hz
fn spectral_rolloff(spectrum: &[f32], bin_hz: f64) -> f64 {
    let total: f64 = spectrum.iter().map(|&m| m as f64).sum();
    if total == 0.0 {
        return 0.0;
    }
    let threshold = total * ROLLOFF_FRACTION;
    let mut cumulative = 0.0;
    for (i, &m) in spectrum.iter().enumerate() {
        cumulative += m as f64;
        if cumulative >= threshold {
            return i as f64 * bin_hz;
        }
    }
    (spectrum.len() - 1) as f64 * bin_hz
}

/// Fold each bin's magnitude into its pitch-class bucket
fn accumulate_chroma(chroma: &mut [f64; 12], spectrum: &[f32], bin_hz: f64) {
    // Skip DC and near-DC bins; below ~25 Hz pitch mapping is meaningless
    for (i, &m) in spectrum.iter().enumerate().skip(1) {
        let freq = i as f64 * bin_hz;
        if freq < 25.0 {
            continue;
        }
        let midi = A4_MIDI as f64 + 12.0 * (freq / A4_HZ).log2();
        let class = (midi.round() as i32).rem_euclid(12) as usize;
        chroma[class] += m as f64;
    }
}

/// Positive spectral difference against the previous frame (onset strength)
fn spectral_flux(spectrum: &[f32], previous: &[f32]) -> f32 {
    if previous.len() != spectrum.len() {
        return 0.0;
    }
    spectrum
        .iter()
        .zip(previous)
        .map(|(&cur, &prev)| (cur - prev).max(0.0))
        .sum::<f32>()
        / spectrum.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine_buffer(freq: f32, seconds: f32, sample_rate: u32, amplitude: f32) -> AudioBuffer {
        let samples: Vec<f32> = (0..(seconds * sample_rate as f32) as usize)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin() * amplitude)
            .collect();
        AudioBuffer::new(samples, sample_rate)
    }

    #[test]
    fn sine_wave_dominant_pitch_class_is_correct() {
        // 440 Hz is A4
        let buffer = sine_buffer(440.0, 2.0, 22050, 0.5);
        let features = extract_features(&buffer);
        assert_eq!(features.dominant_pitch_class(), Some(PitchClass::A));

        // 261.63 Hz is C4
        let buffer = sine_buffer(261.63, 2.0, 22050, 0.5);
        let features = extract_features(&buffer);
        assert_eq!(features.dominant_pitch_class(), Some(PitchClass::C));
    }

    #[test]
    fn sine_wave_centroid_sits_near_its_frequency() {
        let buffer = sine_buffer(1000.0, 2.0, 22050, 0.5);
        let features = extract_features(&buffer);
        assert!(
            (features.centroid_mean - 1000.0).abs() < 150.0,
            "centroid {} should be near 1000 Hz",
            features.centroid_mean
        );
    }

    #[test]
    fn rms_tracks_amplitude() {
        // A sine of amplitude a has RMS a/sqrt(2)
        let buffer = sine_buffer(440.0, 1.0, 22050, 0.2);
        let features = extract_features(&buffer);
        assert!((features.rms_mean - 0.2 / 2.0f64.sqrt()).abs() < 0.01);
    }

    #[test]
    fn silence_has_no_pitch_class() {
        let buffer = AudioBuffer::new(vec![0.0; 22050], 22050);
        let features = extract_features(&buffer);
        assert_eq!(features.dominant_pitch_class(), None);
        assert_eq!(features.rms_mean, 0.0);
    }

    #[test]
    fn short_buffers_still_produce_features() {
        let buffer = AudioBuffer::new(vec![0.1; 100], 22050);
        let features = extract_features(&buffer);
        assert!(features.rms_mean > 0.0);
    }

    #[test]
    fn zcr_is_higher_for_higher_frequencies() {
        let slow = extract_features(&sine_buffer(100.0, 1.0, 22050, 0.5));
        let fast = extract_features(&sine_buffer(4000.0, 1.0, 22050, 0.5));
        assert!(fast.zcr_mean > slow.zcr_mean);
    }

    #[test]
    fn analyze_degrades_on_missing_file() {
        let record = analyze(Path::new("/nonexistent/never.mp3"));
        assert!(!record.is_valid());
        assert!(record.bpm.is_none());
        assert!(record.key.is_none());
        assert_eq!(record.energy, Energy::Medium);
        assert!(record.genre_hints.is_empty());
    }
}
