//! Tempo estimation from the onset-strength envelope
//!
//! Beat tracking in two steps: the feature extractor produces a spectral-flux
//! onset envelope (one value per analysis hop), and this module finds the
//! dominant periodicity in it by autocorrelation over the musically plausible
//! lag range.

use crate::analysis::features::HOP_SIZE;

/// Slowest tempo the estimator will report
pub const MIN_BPM: f64 = 60.0;
/// Fastest tempo the estimator will report
pub const MAX_BPM: f64 = 180.0;

/// Onset envelopes whose total strength falls below this carry no usable
/// rhythmic information (silence, pure tones)
const MIN_ENVELOPE_STRENGTH: f32 = 1e-4;

/// A lag whose score reaches this fraction of the maximum counts as
/// harmonically equivalent to it
const NEAR_MAX_RATIO: f64 = 0.9;

/// Estimate tempo in BPM from an onset-strength envelope.
///
/// `sample_rate` is the audio rate; the envelope is sampled once per
/// [`HOP_SIZE`] samples. Returns None when the envelope is too short or
/// carries no rhythmic energy - callers degrade to a null bpm rather than
/// inventing one.
pub fn estimate_bpm(onset_envelope: &[f32], sample_rate: u32) -> Option<f64> {
    if sample_rate == 0 {
        return None;
    }
    let frame_rate = sample_rate as f64 / HOP_SIZE as f64;

    let total_strength: f32 = onset_envelope.iter().sum();
    if total_strength < MIN_ENVELOPE_STRENGTH {
        return None;
    }

    // Mean-subtract so sustained loudness doesn't masquerade as periodicity
    let mean = total_strength as f64 / onset_envelope.len() as f64;
    let env: Vec<f64> = onset_envelope.iter().map(|&v| v as f64 - mean).collect();

    let lag_min = ((frame_rate * 60.0 / MAX_BPM).floor() as usize).max(1);
    let lag_max = ((frame_rate * 60.0 / MIN_BPM).ceil() as usize).min(env.len() / 2);
    if lag_min >= lag_max {
        // Envelope too short to resolve even the fastest tempo
        return None;
    }

    let scores: Vec<(usize, f64)> = (lag_min..=lag_max)
        .map(|lag| {
            let pairs = env.len() - lag;
            let score: f64 =
                (0..pairs).map(|i| env[i] * env[i + lag]).sum::<f64>() / pairs as f64;
            (lag, score)
        })
        .collect();

    let best_score = scores.iter().map(|&(_, s)| s).fold(f64::MIN, f64::max);
    if best_score <= 0.0 {
        return None;
    }

    // A beat period and its multiples score alike on an autocorrelation, so
    // the raw argmax flips between a tempo and its half-time twin. Take the
    // shortest lag that is harmonically equivalent to the maximum: the
    // fastest in-range reading of the detected periodicity.
    let best_lag = scores
        .iter()
        .find(|&&(_, s)| s >= best_score * NEAR_MAX_RATIO)
        .map(|&(lag, _)| lag)?;

    let bpm = 60.0 * frame_rate / best_lag as f64;
    Some((bpm * 10.0).round() / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build an onset envelope with impulses at a fixed BPM
    fn click_envelope(bpm: f64, sample_rate: u32, seconds: f64) -> Vec<f32> {
        let frame_rate = sample_rate as f64 / HOP_SIZE as f64;
        let frames = (frame_rate * seconds) as usize;
        let period = frame_rate * 60.0 / bpm;
        (0..frames)
            .map(|i| {
                if (i as f64 % period) < 1.0 {
                    1.0
                } else {
                    0.0
                }
            })
            .collect()
    }

    #[test]
    fn detects_a_120_bpm_click_envelope() {
        let env = click_envelope(120.0, 22050, 30.0);
        let bpm = estimate_bpm(&env, 22050).expect("should detect a tempo");
        assert!((bpm - 120.0).abs() < 4.0, "detected {bpm}, expected ~120");
    }

    #[test]
    fn detects_a_90_bpm_click_envelope() {
        let env = click_envelope(90.0, 22050, 30.0);
        let bpm = estimate_bpm(&env, 22050).expect("should detect a tempo");
        assert!((bpm - 90.0).abs() < 4.0, "detected {bpm}, expected ~90");
    }

    #[test]
    fn silence_has_no_tempo() {
        let env = vec![0.0f32; 2000];
        assert_eq!(estimate_bpm(&env, 22050), None);
    }

    #[test]
    fn short_envelopes_have_no_tempo() {
        let env = vec![0.5f32; 10];
        assert_eq!(estimate_bpm(&env, 22050), None);
    }

    #[test]
    fn estimate_stays_within_the_reported_range() {
        let env = click_envelope(150.0, 22050, 30.0);
        if let Some(bpm) = estimate_bpm(&env, 22050) {
            assert!((MIN_BPM..=MAX_BPM + 5.0).contains(&bpm));
        }
    }

    #[test]
    fn estimate_is_deterministic() {
        let env = click_envelope(128.0, 22050, 20.0);
        assert_eq!(estimate_bpm(&env, 22050), estimate_bpm(&env, 22050));
    }
}
