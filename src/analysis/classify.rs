//! Heuristic genre classification from extracted audio features
//!
//! An acknowledged heuristic, not a model: fixed threshold rules map tempo,
//! brightness, noisiness and loudness to a short ranked list of genre hints.
//! The rule table lives here in one place so the thresholds can be tuned
//! without touching the extraction code.

use crate::types::{RMS_LOW_CEILING, RMS_MEDIUM_CEILING};

/// Maximum number of genre hints attached to a record
pub const MAX_HINTS: usize = 3;

/// Spectral centroid above which a track reads as bright/poppy (Hz)
const BRIGHT_CENTROID_HZ: f64 = 2000.0;
/// Zero-crossing rate above which a track reads as noisy/distorted
const NOISY_ZCR: f64 = 0.1;

/// One tempo band and the hints it contributes.
///
/// Bands are disjoint by construction: only the lowest band includes its
/// lower edge, every band includes its upper edge.
struct TempoBand {
    lo: f64,
    hi: f64,
    lo_inclusive: bool,
    hints: &'static [&'static str],
}

impl TempoBand {
    fn matches(&self, bpm: f64) -> bool {
        let above_lo = if self.lo_inclusive {
            bpm >= self.lo
        } else {
            bpm > self.lo
        };
        above_lo && bpm <= self.hi
    }
}

const TEMPO_BANDS: &[TempoBand] = &[
    TempoBand {
        lo: 60.0,
        hi: 80.0,
        lo_inclusive: true,
        hints: &["Blues", "Ballad", "Soul"],
    },
    TempoBand {
        lo: 80.0,
        hi: 110.0,
        lo_inclusive: false,
        hints: &["Rock", "Alternative", "Folk"],
    },
    TempoBand {
        lo: 110.0,
        hi: 140.0,
        lo_inclusive: false,
        hints: &["Rock", "Pop", "Indie"],
    },
    TempoBand {
        lo: 140.0,
        hi: 180.0,
        lo_inclusive: false,
        hints: &["Punk", "Metal", "Hard Rock"],
    },
];

/// Map extracted features to an ordered, deduplicated list of at most
/// [`MAX_HINTS`] genre hints.
///
/// Rules are applied in a fixed order; a bpm outside every band contributes
/// no tempo hint, and deduplication keeps the first occurrence.
pub fn classify(
    bpm: Option<f64>,
    centroid_hz: f64,
    zero_crossing_rate: f64,
    rms: f64,
) -> Vec<String> {
    let mut hints: Vec<&str> = Vec::new();

    if let Some(bpm) = bpm {
        if let Some(band) = TEMPO_BANDS.iter().find(|band| band.matches(bpm)) {
            hints.extend_from_slice(band.hints);
        }
    }

    if centroid_hz > BRIGHT_CENTROID_HZ {
        hints.push("Pop");
    }
    if zero_crossing_rate > NOISY_ZCR {
        hints.push("Rock");
    }
    if rms > RMS_MEDIUM_CEILING {
        hints.push("Energetic");
    }
    if rms < RMS_LOW_CEILING {
        hints.push("Acoustic");
    }

    let mut deduped: Vec<String> = Vec::with_capacity(MAX_HINTS);
    for hint in hints {
        if deduped.len() == MAX_HINTS {
            break;
        }
        if !deduped.iter().any(|h| h == hint) {
            deduped.push(hint.to_string());
        }
    }
    deduped
}
