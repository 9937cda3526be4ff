//! File discovery and scanning

use crate::error::{Result, TunesmithError};
use crate::types::AudioFormat;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Discovered audio file with basic metadata
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub format: AudioFormat,
    pub size_bytes: u64,
}

impl DiscoveredFile {
    /// The cache identifier for this file: its full path as a string
    pub fn identifier(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

/// Scan a path (file or directory) for supported audio files.
///
/// Results are sorted by path so repeated runs process files in a stable
/// order.
pub fn scan(input: &Path, recursive: bool) -> Result<Vec<DiscoveredFile>> {
    if !input.exists() {
        return Err(TunesmithError::FileNotFound(input.to_path_buf()));
    }

    let mut files = Vec::new();

    if input.is_file() {
        // Single file mode
        if let Some(file) = try_discover_file(input) {
            files.push(file);
        } else {
            return Err(TunesmithError::UnsupportedFormat {
                path: input.to_path_buf(),
                format: input
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("unknown")
                    .to_string(),
            });
        }
    } else if input.is_dir() {
        let walker = if recursive {
            WalkDir::new(input)
        } else {
            WalkDir::new(input).max_depth(1)
        };

        for entry in walker.into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_file() {
                if let Some(file) = try_discover_file(path) {
                    debug!("Discovered: {}", file.path.display());
                    files.push(file);
                }
            }
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));

    info!("Discovered {} audio files", files.len());

    if files.is_empty() {
        warn!("No supported audio files found in {}", input.display());
    }

    Ok(files)
}

/// Try to create a DiscoveredFile if the path is a supported audio format
fn try_discover_file(path: &Path) -> Option<DiscoveredFile> {
    let ext = path.extension()?.to_str()?;
    let format = AudioFormat::from_extension(ext)?;

    let metadata = std::fs::metadata(path).ok()?;

    Some(DiscoveredFile {
        path: path.to_path_buf(),
        format,
        size_bytes: metadata.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn scan_finds_supported_files_in_stable_order() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.wav"), b"wav").unwrap();
        std::fs::write(dir.path().join("a.mp3"), b"mp3").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"text").unwrap();

        let files = scan(dir.path(), true).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].path.ends_with("a.mp3"));
        assert!(files[1].path.ends_with("b.wav"));
        assert_eq!(files[0].format, AudioFormat::Mp3);
    }

    #[test]
    fn scan_respects_recursion_flag() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("deeper");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("nested.flac"), b"flac").unwrap();

        assert_eq!(scan(dir.path(), false).unwrap().len(), 0);
        assert_eq!(scan(dir.path(), true).unwrap().len(), 1);
    }

    #[test]
    fn scan_rejects_missing_paths() {
        let err = scan(Path::new("/nonexistent/music"), true).unwrap_err();
        assert!(matches!(err, TunesmithError::FileNotFound(_)));
    }

    #[test]
    fn single_unsupported_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cover.png");
        std::fs::write(&path, b"png").unwrap();

        let err = scan(&path, false).unwrap_err();
        assert!(matches!(err, TunesmithError::UnsupportedFormat { .. }));
    }
}
