//! Core data types for tunesmith
//!
//! These types form the shared contract between the feature extractor, the
//! analysis cache, the recommendation engine and the curator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Musical primitives
// =============================================================================

/// The 12 pitch classes in Western music
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PitchClass {
    C,
    Cs, // C#/Db
    D,
    Ds, // D#/Eb
    E,
    F,
    Fs, // F#/Gb
    G,
    Gs, // G#/Ab
    A,
    As, // A#/Bb
    B,
}

impl PitchClass {
    const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::Cs,
        PitchClass::D,
        PitchClass::Ds,
        PitchClass::E,
        PitchClass::F,
        PitchClass::Fs,
        PitchClass::G,
        PitchClass::Gs,
        PitchClass::A,
        PitchClass::As,
        PitchClass::B,
    ];

    /// Convert from a semitone index (0 = C, 1 = C#, ..., 11 = B).
    /// Indices wrap, so chroma bins and interval arithmetic can pass
    /// values straight through.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 12]
    }

    /// Semitone index (0 = C, 1 = C#, ..., 11 = B)
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|&p| p == self).unwrap_or(0)
    }

    /// Sharp-based note name (e.g., "C", "F#", "A#")
    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::Cs => "C#",
            PitchClass::D => "D",
            PitchClass::Ds => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::Fs => "F#",
            PitchClass::G => "G",
            PitchClass::Gs => "G#",
            PitchClass::A => "A",
            PitchClass::As => "A#",
            PitchClass::B => "B",
        }
    }

    /// Parse a note name. Accepts sharps and their flat equivalents,
    /// case-insensitively ("c#", "Db" and "C#" all resolve to Cs).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "C" => Some(PitchClass::C),
            "C#" | "DB" => Some(PitchClass::Cs),
            "D" => Some(PitchClass::D),
            "D#" | "EB" => Some(PitchClass::Ds),
            "E" => Some(PitchClass::E),
            "F" => Some(PitchClass::F),
            "F#" | "GB" => Some(PitchClass::Fs),
            "G" => Some(PitchClass::G),
            "G#" | "AB" => Some(PitchClass::Gs),
            "A" => Some(PitchClass::A),
            "A#" | "BB" => Some(PitchClass::As),
            "B" => Some(PitchClass::B),
            _ => None,
        }
    }
}

/// Major or Minor scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Major,
    Minor,
}

impl Mode {
    pub fn name(self) -> &'static str {
        match self {
            Mode::Major => "Major",
            Mode::Minor => "Minor",
        }
    }
}

// =============================================================================
// Energy and audio quality domains
// =============================================================================

/// RMS level below which a track is bucketed as low energy
pub const RMS_LOW_CEILING: f64 = 0.02;
/// RMS level below which a track is bucketed as medium energy
pub const RMS_MEDIUM_CEILING: f64 = 0.05;

/// Three-value energy domain shared by song metadata and analysis records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Energy {
    Low,
    Medium,
    High,
}

impl Energy {
    /// Bucket a mean RMS level into the three-value domain
    pub fn from_rms(rms: f64) -> Self {
        if rms < RMS_LOW_CEILING {
            Energy::Low
        } else if rms < RMS_MEDIUM_CEILING {
            Energy::Medium
        } else {
            Energy::High
        }
    }

    fn ordinal(self) -> i8 {
        match self {
            Energy::Low => 0,
            Energy::Medium => 1,
            Energy::High => 2,
        }
    }

    /// Ordinal distance between two energy levels (0, 1 or 2)
    pub fn distance(self, other: Energy) -> u8 {
        (self.ordinal() - other.ordinal()).unsigned_abs()
    }

    pub fn label(self) -> &'static str {
        match self {
            Energy::Low => "low",
            Energy::Medium => "medium",
            Energy::High => "high",
        }
    }
}

impl std::str::FromStr for Energy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Energy::Low),
            "medium" => Ok(Energy::Medium),
            "high" => Ok(Energy::High),
            other => Err(format!("unknown energy level '{other}'")),
        }
    }
}

impl std::fmt::Display for Energy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Subjective recording quality attached to song metadata by the storage layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioQuality {
    Excellent,
    Good,
    Fair,
}

impl AudioQuality {
    /// Rank for selection ordering; unrated songs rank 0, below Fair
    pub fn rank(self) -> u8 {
        match self {
            AudioQuality::Excellent => 3,
            AudioQuality::Good => 2,
            AudioQuality::Fair => 1,
        }
    }
}

// =============================================================================
// Song record (consumed from the storage layer)
// =============================================================================

/// Assumed track length when the storage layer has no duration on record
pub const DEFAULT_DURATION_SECONDS: f64 = 210.0;

/// One song record as supplied by the storage layer.
///
/// The engine treats this as an immutable input per call; only `id`, `title`,
/// `genre`, `mood` and `energy` are guaranteed present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub title: String,
    pub genre: String,
    pub mood: String,
    pub energy: Energy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tempo_bpm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_quality: Option<AudioQuality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl Song {
    /// Track duration, falling back to the default when storage has none
    pub fn duration(&self) -> f64 {
        self.duration_seconds.unwrap_or(DEFAULT_DURATION_SECONDS)
    }

    /// Audio-quality rank for selection ordering (unrated = 0)
    pub fn quality_rank(&self) -> u8 {
        self.audio_quality.map_or(0, AudioQuality::rank)
    }
}

// =============================================================================
// Analysis results
// =============================================================================

/// Frequency-domain descriptors averaged over the whole signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralSummary {
    /// Brightness: magnitude-weighted mean frequency in Hz
    pub centroid_hz: f64,
    /// Frequency below which 85% of the spectral energy sits, in Hz
    pub rolloff_hz: f64,
    /// Mean rate of waveform sign changes (noisiness proxy)
    pub zero_crossing_rate: f64,
}

/// Complete analysis of one audio source.
///
/// Immutable once produced; a fresh record supersedes it when the source file
/// changes. A record with `error` set carries null numeric fields and must
/// never be treated as a valid analysis by scoring code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    /// Estimated tempo; None when the signal has no rhythmic content
    /// or analysis failed
    pub bpm: Option<f64>,
    /// Dominant pitch-class name (e.g., "F#"); None on failure
    pub key: Option<String>,
    /// Bucketed mean RMS level
    pub energy: Energy,
    pub duration_seconds: Option<f64>,
    /// Ordered, deduplicated genre hints, at most three
    pub genre_hints: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spectral: Option<SpectralSummary>,
    /// Short failure cause; set on degraded records only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisRecord {
    /// Degraded record returned when decoding or analysis fails.
    ///
    /// All numeric fields are null and energy defaults to medium so callers
    /// always receive a structurally complete record.
    pub fn failed(cause: impl Into<String>) -> Self {
        Self {
            bpm: None,
            key: None,
            energy: Energy::Medium,
            duration_seconds: None,
            genre_hints: Vec::new(),
            spectral: None,
            error: Some(cause.into()),
            analyzed_at: Utc::now(),
        }
    }

    /// True when the record represents a successful analysis
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

// =============================================================================
// Audio buffer
// =============================================================================

/// Decoded mono audio samples ready for analysis
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Mono samples normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Duration in seconds
    pub duration: f64,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        // Guard against division by zero for invalid sample rates
        let duration = if sample_rate > 0 {
            samples.len() as f64 / sample_rate as f64
        } else {
            0.0
        };
        Self {
            samples,
            sample_rate,
            duration,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

// =============================================================================
// Supported formats
// =============================================================================

/// Audio formats tunesmith will attempt to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
    Flac,
    Aiff,
    M4a,
}

impl AudioFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "wav" => Some(AudioFormat::Wav),
            "flac" => Some(AudioFormat::Flac),
            "aiff" | "aif" => Some(AudioFormat::Aiff),
            "m4a" | "mp4" => Some(AudioFormat::M4a),
            _ => None,
        }
    }

    /// Check if a path has a supported extension
    pub fn is_supported_path(path: &std::path::Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_class_index_round_trip() {
        for i in 0..12 {
            assert_eq!(PitchClass::from_index(i).index(), i);
        }
        assert_eq!(PitchClass::from_index(12), PitchClass::C);
        assert_eq!(PitchClass::from_index(19), PitchClass::G);
    }

    #[test]
    fn pitch_class_parses_flats_as_sharps() {
        assert_eq!(PitchClass::from_name("Db"), Some(PitchClass::Cs));
        assert_eq!(PitchClass::from_name("bb"), Some(PitchClass::As));
        assert_eq!(PitchClass::from_name("H"), None);
    }

    #[test]
    fn energy_buckets_match_thresholds() {
        assert_eq!(Energy::from_rms(0.0), Energy::Low);
        assert_eq!(Energy::from_rms(0.019), Energy::Low);
        assert_eq!(Energy::from_rms(0.02), Energy::Medium);
        assert_eq!(Energy::from_rms(0.049), Energy::Medium);
        assert_eq!(Energy::from_rms(0.05), Energy::High);
        assert_eq!(Energy::from_rms(0.3), Energy::High);
    }

    #[test]
    fn energy_distance_is_symmetric() {
        assert_eq!(Energy::Low.distance(Energy::High), 2);
        assert_eq!(Energy::High.distance(Energy::Low), 2);
        assert_eq!(Energy::Medium.distance(Energy::Medium), 0);
        assert_eq!(Energy::Medium.distance(Energy::High), 1);
    }

    #[test]
    fn song_duration_defaults_when_absent() {
        let song = Song {
            id: "s1".into(),
            title: "Untitled".into(),
            genre: "Rock".into(),
            mood: "Upbeat".into(),
            energy: Energy::Medium,
            tempo_bpm: None,
            key: None,
            duration_seconds: None,
            audio_quality: None,
            tags: None,
        };
        assert_eq!(song.duration(), DEFAULT_DURATION_SECONDS);
        assert_eq!(song.quality_rank(), 0);
    }

    #[test]
    fn song_deserializes_with_optional_fields_missing() {
        let json = r#"{
            "id": "s1",
            "title": "Night Drive",
            "genre": "Synthwave",
            "mood": "Moody",
            "energy": "medium"
        }"#;
        let song: Song = serde_json::from_str(json).expect("minimal song should parse");
        assert_eq!(song.energy, Energy::Medium);
        assert!(song.tempo_bpm.is_none());
        assert!(song.tags.is_none());
    }

    #[test]
    fn failed_record_has_null_numeric_fields() {
        let record = AnalysisRecord::failed("decode failed: no audio tracks");
        assert!(!record.is_valid());
        assert!(record.bpm.is_none());
        assert!(record.key.is_none());
        assert!(record.duration_seconds.is_none());
        assert!(record.genre_hints.is_empty());
        assert_eq!(record.energy, Energy::Medium);
    }
}
