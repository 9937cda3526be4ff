//! Unified error types for tunesmith
//!
//! Error strategy:
//! - Per-file errors (decode, analysis): recoverable, skip and continue; the
//!   feature extractor converts them into degraded analysis records.
//! - Empty-result conditions (no songs, no theme matches): structured values
//!   the agent layer renders directly, never panics.
//! - Precondition violations (missing required song fields): hard failures
//!   the caller must fix upstream.
//! - System errors (output, config): fatal, abort the operation.

use std::path::PathBuf;
use thiserror::Error;

/// Supported audio formats for helpful error messages
pub const SUPPORTED_FORMATS: &str = "MP3, WAV, FLAC, AIFF, M4A";

/// Top-level error type for tunesmith operations
#[derive(Debug, Error)]
pub enum TunesmithError {
    // =========================================================================
    // Recoverable errors - skip file, continue batch
    // =========================================================================
    #[error("Failed to decode audio file '{path}': {reason}\n  Supported formats: {SUPPORTED_FORMATS}")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Unsupported audio format for '{path}': {format}\n  Supported formats: {SUPPORTED_FORMATS}")]
    UnsupportedFormat { path: PathBuf, format: String },

    #[error("Analysis failed for '{path}': {reason}")]
    AnalysisError { path: PathBuf, reason: String },

    #[error("File not found: '{0}'\n  Tip: Check the path exists and is accessible")]
    FileNotFound(PathBuf),

    // =========================================================================
    // Empty-result conditions - structured values, rendered by the caller
    // =========================================================================
    #[error("No songs available in the library")]
    EmptyLibrary,

    #[error("No suitable candidates to recommend")]
    NoCandidates,

    #[error("No songs match the theme '{0}'")]
    NoThemeMatches(String),

    #[error("{operation} needs at least {required} songs, got {actual}")]
    NotEnoughSongs {
        operation: &'static str,
        required: usize,
        actual: usize,
    },

    // =========================================================================
    // Precondition violations - caller must validate input shape upstream
    // =========================================================================
    #[error("Song '{song_id}' is missing required field '{field}'")]
    MissingField {
        song_id: String,
        field: &'static str,
    },

    // =========================================================================
    // Fatal errors - abort the operation
    // =========================================================================
    #[error("Cannot write output to '{path}': {reason}\n  Tip: Check write permissions for the output directory")]
    OutputError { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for tunesmith operations
pub type Result<T> = std::result::Result<T, TunesmithError>;

impl TunesmithError {
    /// True if this error is recoverable (skip file, continue batch)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TunesmithError::DecodeError { .. }
                | TunesmithError::UnsupportedFormat { .. }
                | TunesmithError::AnalysisError { .. }
                | TunesmithError::FileNotFound(_)
        )
    }

    /// True if this error is an empty-result condition rather than a fault
    pub fn is_empty_result(&self) -> bool {
        matches!(
            self,
            TunesmithError::EmptyLibrary
                | TunesmithError::NoCandidates
                | TunesmithError::NoThemeMatches(_)
                | TunesmithError::NotEnoughSongs { .. }
        )
    }

    /// Create a decode error with context about the issue
    pub fn decode_error(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        TunesmithError::DecodeError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an analysis error with context about the issue
    pub fn analysis_error(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        TunesmithError::AnalysisError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Short cause string for degraded analysis records.
    ///
    /// Strips the multi-line tips from the Display output so cache entries
    /// stay compact.
    pub fn short_cause(&self) -> String {
        match self {
            TunesmithError::DecodeError { reason, .. } => format!("decode failed: {reason}"),
            TunesmithError::AnalysisError { reason, .. } => reason.clone(),
            TunesmithError::UnsupportedFormat { format, .. } => {
                format!("unsupported format: {format}")
            }
            TunesmithError::FileNotFound(_) => "file not found".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_errors_are_recoverable() {
        let err = TunesmithError::decode_error("/music/bad.mp3", "corrupt header");
        assert!(err.is_recoverable());
        assert!(!err.is_empty_result());
    }

    #[test]
    fn empty_result_conditions_are_classified() {
        assert!(TunesmithError::EmptyLibrary.is_empty_result());
        assert!(TunesmithError::NoThemeMatches("jazz".into()).is_empty_result());
        let few = TunesmithError::NotEnoughSongs {
            operation: "Flow analysis",
            required: 2,
            actual: 1,
        };
        assert!(few.is_empty_result());
        assert!(!few.is_recoverable());
    }

    #[test]
    fn missing_field_is_a_hard_failure() {
        let err = TunesmithError::MissingField {
            song_id: "s9".into(),
            field: "tempo_bpm",
        };
        assert!(!err.is_recoverable());
        assert!(!err.is_empty_result());
        assert!(err.to_string().contains("tempo_bpm"));
    }

    #[test]
    fn short_cause_strips_tips() {
        let err = TunesmithError::decode_error("/music/bad.mp3", "no audio tracks found");
        let cause = err.short_cause();
        assert!(cause.contains("no audio tracks found"));
        assert!(!cause.contains("Supported formats"));
    }
}
