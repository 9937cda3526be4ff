//! Pairwise song scoring: next-track recommendation and similarity ranking
//!
//! Both scorers are stateless over song metadata; they never touch raw
//! audio. Scoring weights are fixed configuration kept in one place so they
//! can be tuned without touching the algorithm.

use crate::error::{Result, TunesmithError};
use crate::harmony;
use crate::types::{AudioQuality, Energy, Song};
use serde::Serialize;
use tracing::debug;

// =============================================================================
// Scoring weights
// =============================================================================

/// Every candidate starts here; bonuses accumulate on top
const BASE_SCORE: f64 = 50.0;

/// Tempo within this many BPM of the current song
const TEMPO_CLOSE_BPM: f64 = 20.0;
const TEMPO_CLOSE_BONUS: f64 = 20.0;
/// Tempo within this many BPM, when not close
const TEMPO_NEAR_BPM: f64 = 40.0;
const TEMPO_NEAR_BONUS: f64 = 10.0;

const KEY_BONUS: f64 = 25.0;
const GENRE_BONUS: f64 = 15.0;
const MOOD_BONUS: f64 = 30.0;
const ENERGY_BONUS: f64 = 30.0;

const QUALITY_EXCELLENT_BONUS: f64 = 10.0;
const QUALITY_GOOD_BONUS: f64 = 5.0;

/// How many runners-up a recommendation carries
const MAX_ALTERNATIVES: usize = 3;

// Similarity weights (0-100 scale, no current-song context)
const SIM_GENRE: f64 = 30.0;
const SIM_MOOD: f64 = 25.0;
const SIM_ENERGY: f64 = 20.0;
const SIM_TEMPO_MAX: f64 = 15.0;
const SIM_TEMPO_FALLOFF_BPM: f64 = 10.0;
const SIM_KEY: f64 = 10.0;

// =============================================================================
// Output contracts
// =============================================================================

/// Best-next-song result for the agent layer
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub suggested_song: Song,
    pub confidence_score: f64,
    pub reasoning: String,
    pub alternatives: Vec<Alternative>,
}

/// A runner-up candidate
#[derive(Debug, Clone, Serialize)]
pub struct Alternative {
    pub id: String,
    pub title: String,
    pub score: f64,
}

/// Similarity ranking result
#[derive(Debug, Clone, Serialize)]
pub struct SimilarityResult {
    pub reference_song: String,
    pub similar_songs: Vec<SimilarSong>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimilarSong {
    pub id: String,
    pub title: String,
    pub similarity: f64,
}

// =============================================================================
// Next-track recommendation
// =============================================================================

/// Pick the best next song from `library`.
///
/// `current` is excluded from the candidates by id. Bonuses only apply when
/// the relevant fields are present on both sides; absent optional fields
/// silently skip their bonus. Ties keep library order (the sort is stable).
pub fn recommend_next(
    library: &[Song],
    current: Option<&Song>,
    preferred_mood: Option<&str>,
    preferred_energy: Option<Energy>,
) -> Result<Recommendation> {
    if library.is_empty() {
        return Err(TunesmithError::EmptyLibrary);
    }

    let candidates: Vec<&Song> = library
        .iter()
        .filter(|song| current.map_or(true, |c| song.id != c.id))
        .collect();
    if candidates.is_empty() {
        return Err(TunesmithError::NoCandidates);
    }

    let mut scored: Vec<(f64, Vec<&'static str>, &Song)> = candidates
        .into_iter()
        .map(|song| {
            let (score, reasons) = score_candidate(song, current, preferred_mood, preferred_energy);
            (score, reasons, song)
        })
        .collect();

    // Stable sort: equal scores keep original library order
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let (best_score, best_reasons, best_song) = &scored[0];
    debug!("Recommending '{}' with score {}", best_song.title, best_score);

    let reasoning = if best_reasons.is_empty() {
        format!("'{}' is a fresh pick from the library", best_song.title)
    } else {
        format!("'{}' scores well: {}", best_song.title, best_reasons.join(", "))
    };

    let alternatives = scored
        .iter()
        .skip(1)
        .take(MAX_ALTERNATIVES)
        .map(|(score, _, song)| Alternative {
            id: song.id.clone(),
            title: song.title.clone(),
            score: *score,
        })
        .collect();

    Ok(Recommendation {
        suggested_song: (*best_song).clone(),
        confidence_score: *best_score,
        reasoning,
        alternatives,
    })
}

/// Score one candidate; returns the total and the contributing bonus labels
/// in evaluation order
fn score_candidate(
    song: &Song,
    current: Option<&Song>,
    preferred_mood: Option<&str>,
    preferred_energy: Option<Energy>,
) -> (f64, Vec<&'static str>) {
    let mut score = BASE_SCORE;
    let mut reasons: Vec<&'static str> = Vec::new();

    if let Some(current) = current {
        if let (Some(a), Some(b)) = (song.tempo_bpm, current.tempo_bpm) {
            let diff = (a - b).abs();
            if diff <= TEMPO_CLOSE_BPM {
                score += TEMPO_CLOSE_BONUS;
                reasons.push("similar tempo");
            } else if diff <= TEMPO_NEAR_BPM {
                score += TEMPO_NEAR_BONUS;
                reasons.push("compatible tempo");
            }
        }

        if let (Some(from), Some(to)) = (current.key.as_deref(), song.key.as_deref()) {
            if harmony::is_compatible(from, to) {
                score += KEY_BONUS;
                reasons.push("harmonically compatible key");
            }
        }

        if song.genre == current.genre {
            score += GENRE_BONUS;
            reasons.push("same genre");
        }
    }

    if let Some(mood) = preferred_mood {
        if song.mood == mood {
            score += MOOD_BONUS;
            reasons.push("matches the requested mood");
        }
    }

    if let Some(energy) = preferred_energy {
        if song.energy == energy {
            score += ENERGY_BONUS;
            reasons.push("matches the requested energy");
        }
    }

    match song.audio_quality {
        Some(AudioQuality::Excellent) => {
            score += QUALITY_EXCELLENT_BONUS;
            reasons.push("excellent audio quality");
        }
        Some(AudioQuality::Good) => {
            score += QUALITY_GOOD_BONUS;
            reasons.push("good audio quality");
        }
        Some(AudioQuality::Fair) | None => {}
    }

    (score, reasons)
}

// =============================================================================
// Similarity ranking
// =============================================================================

/// Rank library songs by pairwise similarity (0-100) to `reference`.
///
/// Unlike recommendation, similarity requires genre, mood, energy, tempo and
/// key on both songs: a missing field is a precondition violation the caller
/// must fix upstream, not a silently skipped bonus.
pub fn find_similar(reference: &Song, library: &[Song], limit: usize) -> Result<SimilarityResult> {
    let (ref_tempo, ref_key) = required_tempo_and_key(reference)?;

    let mut ranked: Vec<SimilarSong> = Vec::new();
    for song in library {
        if song.id == reference.id {
            continue;
        }
        let (tempo, key) = required_tempo_and_key(song)?;

        let mut similarity = 0.0;
        if song.genre == reference.genre {
            similarity += SIM_GENRE;
        }
        if song.mood == reference.mood {
            similarity += SIM_MOOD;
        }
        if song.energy == reference.energy {
            similarity += SIM_ENERGY;
        }
        similarity += (SIM_TEMPO_MAX - (tempo - ref_tempo).abs() / SIM_TEMPO_FALLOFF_BPM).max(0.0);
        if harmony::is_compatible(ref_key, key) {
            similarity += SIM_KEY;
        }

        ranked.push(SimilarSong {
            id: song.id.clone(),
            title: song.title.clone(),
            similarity,
        });
    }

    ranked.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(limit);

    Ok(SimilarityResult {
        reference_song: reference.id.clone(),
        similar_songs: ranked,
    })
}

fn required_tempo_and_key(song: &Song) -> Result<(f64, &str)> {
    let tempo = song.tempo_bpm.ok_or_else(|| TunesmithError::MissingField {
        song_id: song.id.clone(),
        field: "tempo_bpm",
    })?;
    let key = song.key.as_deref().ok_or_else(|| TunesmithError::MissingField {
        song_id: song.id.clone(),
        field: "key",
    })?;
    Ok((tempo, key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: &str, title: &str) -> Song {
        Song {
            id: id.into(),
            title: title.into(),
            genre: "Rock".into(),
            mood: "Upbeat".into(),
            energy: Energy::Medium,
            tempo_bpm: None,
            key: None,
            duration_seconds: None,
            audio_quality: None,
            tags: None,
        }
    }

    #[test]
    fn empty_library_is_an_explicit_error() {
        let err = recommend_next(&[], None, None, None).unwrap_err();
        assert!(matches!(err, TunesmithError::EmptyLibrary));
    }

    #[test]
    fn current_song_is_excluded_by_id() {
        let only = song("s1", "Only Track");
        let err = recommend_next(&[only.clone()], Some(&only), None, None).unwrap_err();
        assert!(matches!(err, TunesmithError::NoCandidates));
    }

    #[test]
    fn concrete_scoring_scenario_totals_140() {
        // base 50 + tempo<=20 (20) + key C->G (25) + genre (15) + mood (30)
        let current = Song {
            tempo_bpm: Some(120.0),
            key: Some("C Major".into()),
            ..song("cur", "Current")
        };
        let candidate = Song {
            tempo_bpm: Some(125.0),
            key: Some("G Major".into()),
            audio_quality: Some(AudioQuality::Fair),
            ..song("cand", "Candidate")
        };

        let rec =
            recommend_next(&[candidate], Some(&current), Some("Upbeat"), None).unwrap();
        assert_eq!(rec.confidence_score, 140.0);
        assert_eq!(rec.suggested_song.id, "cand");
        assert!(rec.reasoning.contains("similar tempo"));
        assert!(rec.reasoning.contains("harmonically compatible key"));
    }

    #[test]
    fn scoring_never_decreases_as_tempo_difference_shrinks() {
        let current = Song {
            tempo_bpm: Some(120.0),
            ..song("cur", "Current")
        };
        let mut previous = f64::MIN;
        // Walk the diff down from 60 to 0; score must be non-decreasing
        for diff in (0..=60).rev() {
            let candidate = Song {
                tempo_bpm: Some(120.0 + diff as f64),
                ..song("cand", "Candidate")
            };
            let (score, _) = score_candidate(&candidate, Some(&current), None, None);
            assert!(
                score >= previous,
                "score {score} at diff {diff} dropped below {previous}"
            );
            previous = score;
        }
    }

    #[test]
    fn absent_optional_fields_skip_their_bonus() {
        let current = song("cur", "Current"); // no tempo, no key
        let candidate = Song {
            tempo_bpm: Some(120.0),
            key: Some("C Major".into()),
            ..song("cand", "Candidate")
        };
        let (score, reasons) = score_candidate(&candidate, Some(&current), None, None);
        // Only the genre bonus applies (both sides carry "Rock")
        assert_eq!(score, BASE_SCORE + GENRE_BONUS);
        assert_eq!(reasons, vec!["same genre"]);
    }

    #[test]
    fn ties_keep_library_order() {
        let a = song("a", "First");
        let b = song("b", "Second");
        let rec = recommend_next(&[a, b], None, None, None).unwrap();
        assert_eq!(rec.suggested_song.id, "a");
        assert_eq!(rec.alternatives.len(), 1);
        assert_eq!(rec.alternatives[0].id, "b");
    }

    #[test]
    fn alternatives_are_capped_at_three() {
        let library: Vec<Song> = (0..6)
            .map(|i| song(&format!("s{i}"), &format!("Track {i}")))
            .collect();
        let rec = recommend_next(&library, None, None, None).unwrap();
        assert_eq!(rec.alternatives.len(), 3);
    }

    #[test]
    fn quality_bonus_orders_otherwise_equal_candidates() {
        let fair = Song {
            audio_quality: Some(AudioQuality::Fair),
            ..song("fair", "Fair Track")
        };
        let excellent = Song {
            audio_quality: Some(AudioQuality::Excellent),
            ..song("exc", "Excellent Track")
        };
        let rec = recommend_next(&[fair, excellent], None, None, None).unwrap();
        assert_eq!(rec.suggested_song.id, "exc");
        assert_eq!(rec.confidence_score, BASE_SCORE + QUALITY_EXCELLENT_BONUS);
    }

    fn full_song(id: &str, genre: &str, mood: &str, energy: Energy, bpm: f64, key: &str) -> Song {
        Song {
            genre: genre.into(),
            mood: mood.into(),
            energy,
            tempo_bpm: Some(bpm),
            key: Some(key.into()),
            ..song(id, id)
        }
    }

    #[test]
    fn identical_songs_score_full_similarity() {
        let reference = full_song("ref", "Rock", "Upbeat", Energy::High, 120.0, "C Major");
        let twin = full_song("twin", "Rock", "Upbeat", Energy::High, 120.0, "C Major");
        let result = find_similar(&reference, &[twin], 5).unwrap();
        assert_eq!(result.similar_songs[0].similarity, 100.0);
    }

    #[test]
    fn tempo_similarity_falls_off_linearly() {
        let reference = full_song("ref", "Rock", "Upbeat", Energy::High, 120.0, "C Major");
        // 60 BPM away: tempo term is max(0, 15 - 60/10) = 9
        let distant = full_song("far", "Jazz", "Mellow", Energy::Low, 180.0, "D Major");
        let result = find_similar(&reference, &[distant], 5).unwrap();
        assert_eq!(result.similar_songs[0].similarity, 9.0);

        // 200 BPM away the term floors at zero
        let very_distant = full_song("vf", "Jazz", "Mellow", Energy::Low, 320.0, "D Major");
        let result = find_similar(&reference, &[very_distant], 5).unwrap();
        assert_eq!(result.similar_songs[0].similarity, 0.0);
    }

    #[test]
    fn similarity_is_directional_when_keys_are() {
        // C Major accepts its parallel minor, C Minor does not accept back
        let c_major = full_song("cm", "Rock", "Upbeat", Energy::High, 120.0, "C Major");
        let c_minor = full_song("cn", "Jazz", "Mellow", Energy::Low, 120.0, "C Minor");

        let forward = find_similar(&c_major, &[c_minor.clone()], 5).unwrap();
        let backward = find_similar(&c_minor, &[c_major], 5).unwrap();

        // Forward: tempo 15 + key 10; backward: tempo 15 only
        assert_eq!(forward.similar_songs[0].similarity, 25.0);
        assert_eq!(backward.similar_songs[0].similarity, 15.0);
    }

    #[test]
    fn missing_required_field_is_a_hard_failure() {
        let reference = full_song("ref", "Rock", "Upbeat", Energy::High, 120.0, "C Major");
        let incomplete = Song {
            tempo_bpm: None,
            ..full_song("inc", "Rock", "Upbeat", Energy::High, 120.0, "C Major")
        };
        let err = find_similar(&reference, &[incomplete], 5).unwrap_err();
        assert!(matches!(
            err,
            TunesmithError::MissingField { field: "tempo_bpm", .. }
        ));
    }

    #[test]
    fn limit_truncates_the_ranking() {
        let reference = full_song("ref", "Rock", "Upbeat", Energy::High, 120.0, "C Major");
        let library: Vec<Song> = (0..10)
            .map(|i| full_song(&format!("s{i}"), "Rock", "Upbeat", Energy::High, 120.0, "C Major"))
            .collect();
        let result = find_similar(&reference, &library, 4).unwrap();
        assert_eq!(result.similar_songs.len(), 4);
    }
}
