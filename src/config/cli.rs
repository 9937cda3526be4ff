//! CLI argument parsing and configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// tunesmith - music catalog analysis and curation
///
/// Analyzes audio files into a persistent cache (tempo, key, energy,
/// spectral profile, genre hints) and turns song libraries into
/// recommendations, albums and setlists.
#[derive(Parser, Debug)]
#[command(name = "tunesmith")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Analysis cache file (defaults to the platform data directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub cache_file: Option<PathBuf>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress progress bars)
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze audio files and populate the analysis cache
    Analyze {
        /// Input path (file or directory)
        #[arg(short, long, value_name = "PATH")]
        input: PathBuf,

        /// Scan subdirectories recursively
        #[arg(short, long, default_value = "true")]
        recursive: bool,

        /// Re-analyze files even when a valid cache entry exists
        #[arg(long, default_value = "false")]
        force: bool,

        /// Number of worker threads (defaults to CPU count - 1)
        #[arg(short = 'j', long, value_name = "N")]
        threads: Option<usize>,
    },

    /// Show analysis cache statistics
    CacheStats,

    /// Clear the analysis cache
    CacheClear,

    /// Recommend the next song from a library file
    Recommend {
        /// Song library (JSON array of song records)
        #[arg(short, long, value_name = "FILE")]
        library: PathBuf,

        /// Id of the currently playing song
        #[arg(long, value_name = "ID")]
        current: Option<String>,

        /// Preferred mood
        #[arg(long, value_name = "MOOD")]
        mood: Option<String>,

        /// Preferred energy level
        #[arg(long, value_name = "LEVEL", value_parser = ["low", "medium", "high"])]
        energy: Option<String>,
    },

    /// Rank library songs by similarity to a reference song
    Similar {
        /// Song library (JSON array of song records)
        #[arg(short, long, value_name = "FILE")]
        library: PathBuf,

        /// Id of the reference song
        #[arg(long, value_name = "ID")]
        reference: String,

        /// Maximum number of results
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },

    /// Assemble an album from a library file
    Album {
        /// Song library (JSON array of song records)
        #[arg(short, long, value_name = "FILE")]
        library: PathBuf,

        /// Theme to filter by (matches genre, mood and tags)
        #[arg(long, value_name = "THEME")]
        theme: Option<String>,

        /// Target album length in minutes
        #[arg(long, default_value_t = crate::curate::DEFAULT_ALBUM_MINUTES)]
        minutes: u32,
    },

    /// Build a live setlist from a library file
    Setlist {
        /// Song library (JSON array of song records)
        #[arg(short, long, value_name = "FILE")]
        library: PathBuf,

        /// Target set length in minutes
        #[arg(long, default_value_t = crate::curate::DEFAULT_SETLIST_MINUTES)]
        minutes: u32,

        /// Energy-flow strategy
        #[arg(long, default_value = "varied", value_parser = ["building", "consistent", "varied"])]
        flow: String,
    },
}
