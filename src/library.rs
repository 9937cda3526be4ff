//! Song library I/O
//!
//! Reads the storage-layer contract (a JSON array of song records) for the
//! CLI commands. The engine itself never talks to storage directly; this is
//! the file-based stand-in used by the command-line surface and tests.

use crate::error::{Result, TunesmithError};
use crate::types::Song;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Load a song library from a JSON file
pub fn load_library(path: &Path) -> Result<Vec<Song>> {
    let file = std::fs::File::open(path).map_err(|e| {
        TunesmithError::ConfigError(format!("cannot open library '{}': {e}", path.display()))
    })?;

    let songs: Vec<Song> = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        TunesmithError::ConfigError(format!("cannot parse library '{}': {e}", path.display()))
    })?;

    debug!("Loaded {} songs from {}", songs.len(), path.display());
    Ok(songs)
}

/// Find a song by id, for resolving CLI arguments against a loaded library
pub fn find_song<'a>(library: &'a [Song], id: &str) -> Result<&'a Song> {
    library
        .iter()
        .find(|song| song.id == id)
        .ok_or_else(|| TunesmithError::ConfigError(format!("song '{id}' not found in library")))
}
