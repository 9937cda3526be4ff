//! Runtime configuration settings

use std::path::PathBuf;

/// Default cache location in the platform data directory
/// (e.g. `~/.local/share/tunesmith/analysis-cache.json` on Linux)
pub fn default_cache_file() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("tunesmith").join("analysis-cache.json"))
        .unwrap_or_else(|| PathBuf::from("analysis-cache.json"))
}

/// Runtime settings for the analysis pipeline
#[derive(Debug, Clone)]
pub struct Settings {
    /// Input path (file or directory)
    pub input: PathBuf,
    /// Analysis cache backing file
    pub cache_file: PathBuf,
    /// Number of extraction worker threads
    pub analysis_threads: usize,
    /// Scan recursively
    pub recursive: bool,
    /// Re-analyze files with valid cache entries
    pub force: bool,
    /// Show progress bars
    pub show_progress: bool,
}

impl Settings {
    /// Build pipeline settings from the analyze subcommand's arguments
    pub fn from_cli(
        input: PathBuf,
        cache_file: Option<PathBuf>,
        threads: Option<usize>,
        recursive: bool,
        force: bool,
        quiet: bool,
    ) -> Self {
        let default_threads = num_cpus::get().saturating_sub(1).max(1);

        Self {
            input,
            cache_file: cache_file.unwrap_or_else(default_cache_file),
            analysis_threads: threads.unwrap_or(default_threads),
            recursive,
            force,
            show_progress: !quiet,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input: PathBuf::from("."),
            cache_file: default_cache_file(),
            analysis_threads: num_cpus::get().saturating_sub(1).max(1),
            recursive: true,
            force: false,
            show_progress: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cache_file_has_a_stable_name() {
        let path = default_cache_file();
        assert!(path.to_string_lossy().ends_with("analysis-cache.json"));
    }

    #[test]
    fn explicit_cache_file_wins() {
        let settings = Settings::from_cli(
            PathBuf::from("/music"),
            Some(PathBuf::from("/tmp/cache.json")),
            Some(4),
            true,
            false,
            true,
        );
        assert_eq!(settings.cache_file, PathBuf::from("/tmp/cache.json"));
        assert_eq!(settings.analysis_threads, 4);
        assert!(!settings.show_progress);
    }

    #[test]
    fn thread_default_leaves_headroom() {
        let settings = Settings::from_cli(PathBuf::from("."), None, None, true, false, false);
        assert!(settings.analysis_threads >= 1);
        assert!(settings.analysis_threads <= num_cpus::get());
    }
}
