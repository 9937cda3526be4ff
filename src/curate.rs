//! Album assembly and setlist sequencing
//!
//! Stateless selectors over song metadata: theme filtering, duration-target
//! fitting, energy-aware ordering, transition-quality analysis and
//! energy-flow setlists. Scoring weights and fit tolerances are fixed
//! configuration kept at the top of the module.

use crate::error::{Result, TunesmithError};
use crate::types::{Energy, Song};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

// =============================================================================
// Fit tolerances and transition weights
// =============================================================================

pub const DEFAULT_ALBUM_MINUTES: u32 = 45;
pub const DEFAULT_SETLIST_MINUTES: u32 = 60;

/// Selection may run up to this fraction of the duration target
const FIT_CEILING: f64 = 1.10;
/// Selection stops once this fraction of the target is reached
const FIT_FLOOR: f64 = 0.90;

/// Every transition starts here; deltas accumulate on top
const TRANSITION_BASE: f64 = 50.0;

const TEMPO_TIGHT_BPM: f64 = 15.0;
const TEMPO_TIGHT_DELTA: f64 = 25.0;
const TEMPO_SMOOTH_BPM: f64 = 30.0;
const TEMPO_SMOOTH_DELTA: f64 = 15.0;
const TEMPO_JUMP_BPM: f64 = 50.0;
const TEMPO_JUMP_DELTA: f64 = -20.0;

const ENERGY_SAME_DELTA: f64 = 15.0;
const ENERGY_STEP_DELTA: f64 = 20.0;
const ENERGY_LEAP_DELTA: f64 = -15.0;

const GENRE_CONTINUITY_DELTA: f64 = 10.0;

// =============================================================================
// Output contracts
// =============================================================================

/// Categorical transition rating, derived purely from score thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl TransitionQuality {
    /// >= 80 excellent, >= 60 good, >= 40 fair, else poor
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            TransitionQuality::Excellent
        } else if score >= 60.0 {
            TransitionQuality::Good
        } else if score >= 40.0 {
            TransitionQuality::Fair
        } else {
            TransitionQuality::Poor
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TransitionQuality::Excellent => "excellent",
            TransitionQuality::Good => "good",
            TransitionQuality::Fair => "fair",
            TransitionQuality::Poor => "poor",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Album {
    pub album_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    pub total_duration_minutes: f64,
    pub track_count: usize,
    pub tracks: Vec<TrackListing>,
    pub curation_notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackListing {
    pub position: usize,
    pub id: String,
    pub title: String,
    pub duration_seconds: f64,
    pub energy: Energy,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowAnalysis {
    pub overall_flow_score: f64,
    pub flow_rating: TransitionQuality,
    pub transitions: Vec<Transition>,
    pub issues: Vec<String>,
    pub improvement_suggestions: Vec<String>,
    pub track_order: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Transition {
    pub from: String,
    pub to: String,
    pub score: f64,
    pub quality: TransitionQuality,
}

/// Named strategy governing how track energy is sequenced in a setlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyFlow {
    /// Low openers, building to a high-energy finish
    Building,
    /// Medium-energy core with the extremes at the edges
    Consistent,
    /// Round-robin interleave across the energy buckets
    Varied,
}

impl EnergyFlow {
    pub fn label(self) -> &'static str {
        match self {
            EnergyFlow::Building => "building",
            EnergyFlow::Consistent => "consistent",
            EnergyFlow::Varied => "varied",
        }
    }
}

impl std::str::FromStr for EnergyFlow {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "building" => Ok(EnergyFlow::Building),
            "consistent" => Ok(EnergyFlow::Consistent),
            "varied" => Ok(EnergyFlow::Varied),
            other => Err(format!("unknown energy flow '{other}'")),
        }
    }
}

impl std::fmt::Display for EnergyFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Setlist {
    pub setlist_name: String,
    pub duration_minutes: f64,
    pub energy_flow: EnergyFlow,
    pub songs: Vec<SetlistEntry>,
    pub setlist_notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetlistEntry {
    pub position: usize,
    pub id: String,
    pub title: String,
    pub energy: Energy,
    pub duration_seconds: f64,
}

// =============================================================================
// Album creation
// =============================================================================

/// Assemble an album: theme filter, duration fit, energy-aware ordering.
pub fn create_album(library: &[Song], theme: Option<&str>, target_minutes: u32) -> Result<Album> {
    if library.is_empty() {
        return Err(TunesmithError::EmptyLibrary);
    }

    let pool: Vec<Song> = match theme {
        Some(theme) => {
            let matches = filter_by_theme(library, theme);
            if matches.is_empty() {
                return Err(TunesmithError::NoThemeMatches(theme.to_string()));
            }
            matches
        }
        None => library.to_vec(),
    };

    let target_seconds = f64::from(target_minutes) * 60.0;
    let selected = select_for_duration(pool, target_seconds);
    let ordered = order_for_flow(selected);

    let total_seconds: f64 = ordered.iter().map(Song::duration).sum();
    debug!(
        "Assembled album: {} tracks, {:.1} minutes (target {})",
        ordered.len(),
        total_seconds / 60.0,
        target_minutes
    );

    let album_name = match theme {
        Some(theme) => format!("{} Collection", title_case(theme)),
        None => format!("{} Essentials", dominant_genre(&ordered)),
    };

    let curation_notes = build_curation_notes(&ordered, theme, total_seconds, target_minutes);

    let tracks = ordered
        .iter()
        .enumerate()
        .map(|(i, song)| TrackListing {
            position: i + 1,
            id: song.id.clone(),
            title: song.title.clone(),
            duration_seconds: song.duration(),
            energy: song.energy,
        })
        .collect();

    Ok(Album {
        album_name,
        theme: theme.map(str::to_string),
        total_duration_minutes: round1(total_seconds / 60.0),
        track_count: ordered.len(),
        tracks,
        curation_notes,
    })
}

/// Songs whose genre, mood or any tag contains the theme string or any of
/// its words, case-insensitively
fn filter_by_theme(library: &[Song], theme: &str) -> Vec<Song> {
    let needle = theme.to_lowercase();
    let words: Vec<&str> = needle.split_whitespace().collect();

    library
        .iter()
        .filter(|song| {
            let mut haystacks: Vec<String> =
                vec![song.genre.to_lowercase(), song.mood.to_lowercase()];
            if let Some(tags) = &song.tags {
                haystacks.extend(tags.iter().map(|t| t.to_lowercase()));
            }
            haystacks.iter().any(|hay| {
                hay.contains(&needle) || words.iter().any(|word| hay.contains(word))
            })
        })
        .cloned()
        .collect()
}

/// Greedy best-fit duration selection.
///
/// Repeatedly takes the candidate with the highest audio-quality rank,
/// breaking ties by how close the new cumulative duration would land to the
/// target. Accepts only while the running total stays within the ceiling and
/// stops once the floor is reached.
fn select_for_duration(mut pool: Vec<Song>, target_seconds: f64) -> Vec<Song> {
    let ceiling = target_seconds * FIT_CEILING;
    let floor = target_seconds * FIT_FLOOR;

    let mut selected = Vec::new();
    let mut total = 0.0;

    while total < floor && !pool.is_empty() {
        let mut best: Option<(usize, u8, f64)> = None;
        for (i, song) in pool.iter().enumerate() {
            let duration = song.duration();
            if total + duration > ceiling {
                continue;
            }
            let rank = song.quality_rank();
            let closeness = (total + duration - target_seconds).abs();
            let better = match best {
                None => true,
                Some((_, best_rank, best_closeness)) => {
                    rank > best_rank || (rank == best_rank && closeness < best_closeness)
                }
            };
            if better {
                best = Some((i, rank, closeness));
            }
        }

        match best {
            Some((index, _, _)) => {
                let song = pool.remove(index);
                total += song.duration();
                selected.push(song);
            }
            None => break, // nothing left fits under the ceiling
        }
    }

    selected
}

/// Order tracks so energy levels alternate where possible.
///
/// Seeds with a medium-energy track (high if none), then repeatedly takes
/// the first track from a bucket differing from the previous energy, trying
/// low, then medium, then high. When every remaining track matches the
/// previous energy, the next remaining track is taken regardless, so a
/// same-energy run only happens when no alternative exists.
///
/// The pool is an indexable list with removal by position: two structurally
/// identical songs stay distinct.
fn order_for_flow(mut remaining: Vec<Song>) -> Vec<Song> {
    if remaining.is_empty() {
        return remaining;
    }

    const SCAN_ORDER: [Energy; 3] = [Energy::Low, Energy::Medium, Energy::High];

    let seed = remaining
        .iter()
        .position(|s| s.energy == Energy::Medium)
        .or_else(|| remaining.iter().position(|s| s.energy == Energy::High))
        .unwrap_or(0);

    let mut ordered = Vec::with_capacity(remaining.len());
    ordered.push(remaining.remove(seed));

    while !remaining.is_empty() {
        let previous = ordered.last().map(|s: &Song| s.energy);
        let position = SCAN_ORDER
            .iter()
            .filter(|&&level| Some(level) != previous)
            .find_map(|&level| remaining.iter().position(|s| s.energy == level))
            .unwrap_or(0);
        ordered.push(remaining.remove(position));
    }

    ordered
}

/// Most frequent genre among the tracks; earliest first-seen wins ties
fn dominant_genre(songs: &[Song]) -> String {
    if songs.is_empty() {
        return "Mixed".to_string();
    }
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for song in songs {
        *counts.entry(song.genre.as_str()).or_default() += 1;
    }
    let mut best: (&str, usize) = ("", 0);
    for song in songs {
        let count = counts[song.genre.as_str()];
        if count > best.1 {
            best = (song.genre.as_str(), count);
        }
    }
    best.0.to_string()
}

fn build_curation_notes(
    songs: &[Song],
    theme: Option<&str>,
    total_seconds: f64,
    target_minutes: u32,
) -> Vec<String> {
    let mut notes = Vec::with_capacity(4);

    match theme {
        Some(theme) => notes.push(format!("Themed around '{theme}'")),
        None => notes.push(format!(
            "Built around the library's strongest genre: {}",
            dominant_genre(songs)
        )),
    }

    notes.push(format!(
        "Runs {:.1} minutes across {} tracks (target {} minutes)",
        total_seconds / 60.0,
        songs.len(),
        target_minutes
    ));

    let progression: Vec<&str> = songs.iter().map(|s| s.energy.label()).collect();
    notes.push(format!("Energy progression: {}", progression.join(" -> ")));

    let mut genres: Vec<&str> = Vec::new();
    for song in songs {
        if !genres.contains(&song.genre.as_str()) {
            genres.push(song.genre.as_str());
        }
    }
    notes.push(match genres.len() {
        0 => "No tracks selected".to_string(),
        1 => format!("A pure {} record", genres[0]),
        _ => format!("Blends {}", genres.join(", ")),
    });

    notes
}

// =============================================================================
// Flow analysis
// =============================================================================

/// Score every adjacent transition in a running order.
///
/// Needs at least two songs. Each transition starts at the base score and
/// accumulates tempo, energy and genre deltas; the quality label and the
/// overall rating come purely from the score thresholds.
pub fn analyze_flow(songs: &[Song]) -> Result<FlowAnalysis> {
    if songs.len() < 2 {
        return Err(TunesmithError::NotEnoughSongs {
            operation: "Flow analysis",
            required: 2,
            actual: songs.len(),
        });
    }

    let mut transitions = Vec::with_capacity(songs.len() - 1);
    let mut issues = Vec::new();
    let mut suggestions = Vec::new();

    for pair in songs.windows(2) {
        let (from, to) = (&pair[0], &pair[1]);
        let mut score = TRANSITION_BASE;
        let mut pair_has_issue = false;

        if let (Some(a), Some(b)) = (from.tempo_bpm, to.tempo_bpm) {
            let diff = (a - b).abs();
            if diff <= TEMPO_TIGHT_BPM {
                score += TEMPO_TIGHT_DELTA;
            } else if diff <= TEMPO_SMOOTH_BPM {
                score += TEMPO_SMOOTH_DELTA;
            } else if diff > TEMPO_JUMP_BPM {
                score += TEMPO_JUMP_DELTA;
                issues.push(format!(
                    "Large tempo jump between '{}' and '{}' ({:.0} -> {:.0} BPM)",
                    from.title, to.title, a, b
                ));
                push_unique(
                    &mut suggestions,
                    "Reorder the tracks or insert a bridge track to smooth large tempo jumps"
                        .to_string(),
                );
                pair_has_issue = true;
            }
        }

        match from.energy.distance(to.energy) {
            0 => score += ENERGY_SAME_DELTA,
            1 => score += ENERGY_STEP_DELTA,
            _ => {
                score += ENERGY_LEAP_DELTA;
                if !pair_has_issue {
                    issues.push(format!(
                        "Abrupt energy change between '{}' and '{}' ({} -> {})",
                        from.title,
                        to.title,
                        from.energy,
                        to.energy
                    ));
                    push_unique(
                        &mut suggestions,
                        "Insert a medium-energy track between abrupt energy changes".to_string(),
                    );
                }
            }
        }

        if from.genre == to.genre {
            score += GENRE_CONTINUITY_DELTA;
        }

        transitions.push(Transition {
            from: from.title.clone(),
            to: to.title.clone(),
            score,
            quality: TransitionQuality::from_score(score),
        });
    }

    let overall =
        transitions.iter().map(|t| t.score).sum::<f64>() / transitions.len() as f64;

    Ok(FlowAnalysis {
        overall_flow_score: round1(overall),
        flow_rating: TransitionQuality::from_score(overall),
        transitions,
        issues,
        improvement_suggestions: suggestions,
        track_order: songs.iter().map(|s| s.title.clone()).collect(),
    })
}

fn push_unique(list: &mut Vec<String>, item: String) {
    if !list.contains(&item) {
        list.push(item);
    }
}

// =============================================================================
// Setlist creation
// =============================================================================

/// Build a live setlist under a named energy-flow strategy.
///
/// The strategy orders the candidate pool; selection then walks the pool in
/// order under the same duration-fit rule as album creation. This ordering
/// is distinct from the album flow ordering and makes no promise about
/// same-energy repeats.
pub fn create_setlist(
    library: &[Song],
    target_minutes: u32,
    energy_flow: EnergyFlow,
) -> Result<Setlist> {
    if library.is_empty() {
        return Err(TunesmithError::EmptyLibrary);
    }

    let pool = build_pool(library, energy_flow);

    let target_seconds = f64::from(target_minutes) * 60.0;
    let ceiling = target_seconds * FIT_CEILING;
    let floor = target_seconds * FIT_FLOOR;

    let mut chosen: Vec<Song> = Vec::new();
    let mut total = 0.0;
    for song in pool {
        if total >= floor {
            break;
        }
        let duration = song.duration();
        if total + duration <= ceiling {
            total += duration;
            chosen.push(song);
        }
    }

    debug!(
        "Built {} setlist: {} songs, {:.1} minutes",
        energy_flow,
        chosen.len(),
        total / 60.0
    );

    let setlist_notes = build_setlist_notes(&chosen);

    let songs = chosen
        .iter()
        .enumerate()
        .map(|(i, song)| SetlistEntry {
            position: i + 1,
            id: song.id.clone(),
            title: song.title.clone(),
            energy: song.energy,
            duration_seconds: song.duration(),
        })
        .collect();

    Ok(Setlist {
        setlist_name: format!("{} {}-minute set", title_case(energy_flow.label()), target_minutes),
        duration_minutes: round1(total / 60.0),
        energy_flow,
        songs,
        setlist_notes,
    })
}

/// Order the candidate pool for an energy-flow strategy.
///
/// building: low, then medium, then high. consistent: medium, high, low.
/// varied: round-robin interleave of medium, high, low, skipping exhausted
/// buckets.
fn build_pool(library: &[Song], energy_flow: EnergyFlow) -> Vec<Song> {
    let bucket = |level: Energy| -> Vec<Song> {
        library
            .iter()
            .filter(|s| s.energy == level)
            .cloned()
            .collect()
    };
    let (low, medium, high) = (bucket(Energy::Low), bucket(Energy::Medium), bucket(Energy::High));

    match energy_flow {
        EnergyFlow::Building => [low, medium, high].concat(),
        EnergyFlow::Consistent => [medium, high, low].concat(),
        EnergyFlow::Varied => {
            let buckets = [medium, high, low];
            let longest = buckets.iter().map(Vec::len).max().unwrap_or(0);
            let mut pool = Vec::with_capacity(library.len());
            for round in 0..longest {
                for bucket in &buckets {
                    if let Some(song) = bucket.get(round) {
                        pool.push(song.clone());
                    }
                }
            }
            pool
        }
    }
}

fn build_setlist_notes(songs: &[Song]) -> Vec<String> {
    let midpoint = songs.len() / 2;
    songs
        .iter()
        .enumerate()
        .map(|(i, song)| {
            let note = if i == 0 {
                "opener: set the tone"
            } else if i == songs.len() - 1 {
                "closer: leave them wanting more"
            } else if i == midpoint {
                "mid-set anchor"
            } else {
                match song.energy {
                    Energy::High => "get the crowd moving",
                    Energy::Low => "breather",
                    Energy::Medium => "keep momentum",
                }
            };
            format!("{}. {} - {}", i + 1, song.title, note)
        })
        .collect()
}

// =============================================================================
// Shared helpers
// =============================================================================

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
