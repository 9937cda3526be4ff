//! Musical key parsing and the harmonic-compatibility graph
//!
//! Keys arrive from the storage layer as display names ("C Major",
//! "F# Minor"). Compatibility follows the circle of fifths:
//!
//! - a major key accepts its dominant, its subdominant, its relative minor
//!   and its parallel minor;
//! - a minor key accepts its relative major and the minor keys a fifth up
//!   and down.
//!
//! The adjacency is *directed*: the parallel-minor edge only exists from the
//! major side, so `is_compatible(a, b)` does not imply `is_compatible(b, a)`.
//! Lookups preserve that direction rather than symmetrizing it.

use crate::types::{Mode, PitchClass};

/// Semitone interval to the dominant (a perfect fifth up)
const FIFTH_UP: usize = 7;
/// Semitone interval to the subdominant (a perfect fifth down)
const FIFTH_DOWN: usize = 5;
/// Semitone offset from a major tonic to its relative minor (C -> A)
const RELATIVE_MINOR: usize = 9;
/// Semitone offset from a minor tonic to its relative major (A -> C)
const RELATIVE_MAJOR: usize = 3;

/// A parsed musical key: pitch class plus mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MusicalKey {
    pub pitch: PitchClass,
    pub mode: Mode,
}

impl MusicalKey {
    pub fn new(pitch: PitchClass, mode: Mode) -> Self {
        Self { pitch, mode }
    }

    /// Parse a key display name, case-insensitively.
    ///
    /// Accepts "C Major", "f# minor", "Bb major"; a bare pitch name
    /// ("G") parses as major.
    pub fn parse(name: &str) -> Option<Self> {
        let mut parts = name.split_whitespace();
        let pitch = PitchClass::from_name(parts.next()?)?;
        let mode = match parts.next() {
            None => Mode::Major,
            Some(word) => match word.to_ascii_lowercase().as_str() {
                "major" | "maj" => Mode::Major,
                "minor" | "min" => Mode::Minor,
                _ => return None,
            },
        };
        // Trailing junk after the mode word is not a key name
        if parts.next().is_some() {
            return None;
        }
        Some(Self { pitch, mode })
    }

    /// Display name in the storage-layer convention (e.g., "F# Minor")
    pub fn name(&self) -> String {
        format!("{} {}", self.pitch.name(), self.mode.name())
    }
}

/// Keys harmonically compatible with `key`, the same key included.
///
/// This is the outgoing adjacency of the directed graph; order matches the
/// music-theory derivation (same key, dominant, subdominant, relative, then
/// parallel for major keys).
pub fn compatible_keys(key: MusicalKey) -> Vec<MusicalKey> {
    let tonic = key.pitch.index();
    let at = |offset: usize, mode: Mode| MusicalKey::new(PitchClass::from_index(tonic + offset), mode);

    match key.mode {
        Mode::Major => vec![
            key,
            at(FIFTH_UP, Mode::Major),
            at(FIFTH_DOWN, Mode::Major),
            at(RELATIVE_MINOR, Mode::Minor),
            at(0, Mode::Minor), // parallel minor: major side only
        ],
        Mode::Minor => vec![
            key,
            at(RELATIVE_MAJOR, Mode::Major),
            at(FIFTH_UP, Mode::Minor),
            at(FIFTH_DOWN, Mode::Minor),
        ],
    }
}

/// Directional compatibility lookup on key display names.
///
/// Returns false when either name fails to parse; the scoring code treats
/// unparseable keys as simply not compatible.
pub fn is_compatible(from: &str, to: &str) -> bool {
    match (MusicalKey::parse(from), MusicalKey::parse(to)) {
        (Some(a), Some(b)) => compatible_keys(a).contains(&b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_display_names() {
        let key = MusicalKey::parse("F# Minor").expect("should parse");
        assert_eq!(key.pitch, PitchClass::Fs);
        assert_eq!(key.mode, Mode::Minor);
        assert_eq!(key.name(), "F# Minor");

        // Case-insensitive, flats normalized, bare pitch defaults to major
        assert_eq!(
            MusicalKey::parse("bb major"),
            Some(MusicalKey::new(PitchClass::As, Mode::Major))
        );
        assert_eq!(
            MusicalKey::parse("G"),
            Some(MusicalKey::new(PitchClass::G, Mode::Major))
        );
        assert_eq!(MusicalKey::parse("C Mixolydian"), None);
        assert_eq!(MusicalKey::parse(""), None);
    }

    #[test]
    fn major_key_accepts_circle_neighbors_and_relatives() {
        assert!(is_compatible("C Major", "G Major")); // dominant
        assert!(is_compatible("C Major", "F Major")); // subdominant
        assert!(is_compatible("C Major", "A Minor")); // relative minor
        assert!(is_compatible("C Major", "C Minor")); // parallel minor
        assert!(is_compatible("C Major", "C Major")); // same key mixes cleanly
        assert!(!is_compatible("C Major", "D Major"));
    }

    #[test]
    fn minor_key_accepts_relative_major_and_minor_neighbors() {
        assert!(is_compatible("A Minor", "C Major"));
        assert!(is_compatible("A Minor", "E Minor"));
        assert!(is_compatible("A Minor", "D Minor"));
        assert!(!is_compatible("A Minor", "G Major"));
    }

    #[test]
    fn parallel_minor_edge_is_one_way() {
        // The documented asymmetry: lookups are directional and the parallel
        // edge exists only from the major side.
        assert!(is_compatible("C Major", "C Minor"));
        assert!(!is_compatible("C Minor", "C Major"));
    }

    #[test]
    fn adjacency_wraps_around_the_pitch_circle() {
        // B major's dominant is F#, its subdominant E
        assert!(is_compatible("B Major", "F# Major"));
        assert!(is_compatible("B Major", "E Major"));
        // G# minor's relative major wraps to B
        assert!(is_compatible("G# Minor", "B Major"));
    }

    #[test]
    fn unparseable_keys_are_never_compatible() {
        assert!(!is_compatible("", "C Major"));
        assert!(!is_compatible("C Major", "8B"));
        assert!(!is_compatible("H Dur", "C Major"));
    }
}
