//! Persistent analysis cache with file-change invalidation
//!
//! A content-keyed store mapping an audio identifier (URL or local path) to
//! its analysis record. The whole store lives in one JSON file rewritten on
//! every save; the design assumes a single writer at a time, and concurrent
//! writers from separate processes race with last-writer-wins.
//!
//! I/O failures never escape: an unreadable store loads as empty, a failed
//! save keeps the in-memory state so the next successful save carries the
//! writes forward.

use crate::types::AnalysisRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, info, warn};

/// One stored analysis plus the provenance needed to invalidate it.
///
/// The serialized shape is a compatibility contract with pre-existing cache
/// files; field names must not change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub analysis: AnalysisRecord,
    /// When this entry was saved
    pub timestamp: DateTime<Utc>,
    /// The identifier the entry was saved under
    pub audio_url: String,
    /// Fingerprint of the source file at save time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

/// Cache statistics for the status surface
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Deterministic cache key for an audio identifier (SHA-256 hex)
pub fn cache_key(identifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identifier.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Cheap identity fingerprint for a file: hash of size and mtime.
///
/// Detects changes without reading content. None when the file or its
/// metadata is unreadable.
pub fn fingerprint(path: &Path) -> Option<String> {
    let metadata = std::fs::metadata(path).ok()?;
    let mtime = metadata
        .modified()
        .ok()?
        .duration_since(UNIX_EPOCH)
        .ok()?
        .as_secs();

    let mut hasher = Sha256::new();
    hasher.update(format!("{}:{}", metadata.len(), mtime).as_bytes());
    Some(format!("{:x}", hasher.finalize()))
}

/// The persistent analysis store
#[derive(Debug)]
pub struct AnalysisCache {
    path: PathBuf,
    entries: HashMap<String, CacheEntry>,
}

impl AnalysisCache {
    /// Open (or create) a cache backed by the given file.
    ///
    /// A missing or unreadable backing file yields an empty cache; load
    /// problems are logged, never raised.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_entries(&path);
        debug!("Opened analysis cache at {} ({} entries)", path.display(), entries.len());
        Self { path, entries }
    }

    /// Look up the analysis for an identifier.
    ///
    /// When `source_path` is supplied the stored fingerprint is re-checked
    /// against the live file and a mismatch reads as absent (the stale entry
    /// is ignored, not deleted). Without a path, a hit by identifier alone
    /// is valid. Entries saved without a fingerprint skip the check.
    pub fn get(&self, identifier: &str, source_path: Option<&Path>) -> Option<&AnalysisRecord> {
        let entry = self.entries.get(&cache_key(identifier))?;

        if let (Some(path), Some(stored)) = (source_path, entry.file_hash.as_deref()) {
            if fingerprint(path).as_deref() != Some(stored) {
                debug!("Cache entry for '{identifier}' is stale (file changed)");
                return None;
            }
        }

        Some(&entry.analysis)
    }

    /// Store an analysis, unconditionally overwriting any previous entry,
    /// and persist the whole store synchronously.
    pub fn save(&mut self, identifier: &str, record: AnalysisRecord, source_path: Option<&Path>) {
        let entry = CacheEntry {
            analysis: record,
            timestamp: Utc::now(),
            audio_url: identifier.to_string(),
            file_hash: source_path.and_then(fingerprint),
            file_path: source_path.map(|p| p.to_string_lossy().into_owned()),
        };
        self.entries.insert(cache_key(identifier), entry);
        self.persist();
    }

    /// Reset to an empty store and persist
    pub fn clear(&mut self) {
        self.entries.clear();
        self.persist();
        info!("Cleared analysis cache at {}", self.path.display());
    }

    /// Entry count, backing file location and on-disk size
    pub fn stats(&self) -> CacheStats {
        let size_bytes = std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        CacheStats {
            entries: self.entries.len(),
            path: self.path.clone(),
            size_bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the whole store to disk via a temp file and atomic rename.
    ///
    /// On failure the error is logged and the in-memory state is retained;
    /// the next successful save carries any lost writes forward.
    fn persist(&self) {
        if let Err(e) = self.persist_inner() {
            warn!("Failed to persist analysis cache to {}: {}", self.path.display(), e);
        }
    }

    fn persist_inner(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.path.with_extension("json.tmp");
        let file = std::fs::File::create(&temp_path)?;
        let writer = std::io::BufWriter::new(file);

        serde_json::to_writer_pretty(writer, &self.entries).map_err(|e| {
            let _ = std::fs::remove_file(&temp_path);
            std::io::Error::other(e)
        })?;

        std::fs::rename(&temp_path, &self.path).inspect_err(|_| {
            let _ = std::fs::remove_file(&temp_path);
        })
    }
}

fn load_entries(path: &Path) -> HashMap<String, CacheEntry> {
    if !path.exists() {
        debug!("No cache file at {}, starting empty", path.display());
        return HashMap::new();
    }

    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Could not open cache file {}: {}, treating as empty", path.display(), e);
            return HashMap::new();
        }
    };

    match serde_json::from_reader(std::io::BufReader::new(file)) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Could not parse cache file {}: {}, treating as empty", path.display(), e);
            HashMap::new()
        }
    }
}
