//! Pipeline orchestration
//!
//! Coordinates file discovery, parallel feature extraction and cache writes.
//! Extraction fans out across a rayon pool; the cache stays a single writer,
//! so records funnel back and are saved sequentially.

use crate::analysis;
use crate::cache::AnalysisCache;
use crate::config::Settings;
use crate::discovery::{self, DiscoveredFile};
use crate::error::{Result, TunesmithError};
use crate::types::AnalysisRecord;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Pipeline result summary
#[derive(Debug)]
pub struct PipelineResult {
    pub total_files: usize,
    pub analyzed: usize,
    pub cached: usize,
    pub failed: usize,
}

/// Run the full analysis pipeline: scan, extract, cache.
pub fn run(settings: &Settings) -> Result<PipelineResult> {
    use std::time::Instant;

    let pipeline_start = Instant::now();

    configure_thread_pool(settings.analysis_threads)?;

    info!("Scanning for audio files...");
    let files = discovery::scan(&settings.input, settings.recursive)?;

    if files.is_empty() {
        return Ok(PipelineResult {
            total_files: 0,
            analyzed: 0,
            cached: 0,
            failed: 0,
        });
    }

    let mut cache = AnalysisCache::open(&settings.cache_file);

    // Split off files whose cached analysis is still valid for the live file
    let (fresh, to_analyze): (Vec<DiscoveredFile>, Vec<DiscoveredFile>) =
        files.into_iter().partition(|file| {
            !settings.force
                && cache
                    .get(&file.identifier(), Some(&file.path))
                    .is_some()
        });

    let cached = fresh.len();
    if cached > 0 {
        info!("Skipping {cached} files with a valid cache entry (use --force to re-analyze)");
    }

    let total_files = cached + to_analyze.len();

    if to_analyze.is_empty() {
        info!("All files already analyzed, nothing to do");
        return Ok(PipelineResult {
            total_files,
            analyzed: 0,
            cached,
            failed: 0,
        });
    }

    info!("Analyzing {} files", to_analyze.len());

    let progress_bar = if settings.show_progress {
        let pb = ProgressBar::new(to_analyze.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    // Extraction is CPU-bound and per-file independent; the cache is not
    // touched from worker threads
    let analysis_start = Instant::now();
    let records: Vec<(DiscoveredFile, AnalysisRecord)> = to_analyze
        .into_par_iter()
        .map(|file| {
            let record = analysis::analyze(&file.path);
            if let Some(ref pb) = progress_bar {
                pb.inc(1);
                pb.set_message(
                    file.path
                        .file_name()
                        .unwrap_or_default()
                        .to_string_lossy()
                        .into_owned(),
                );
            }
            (file, record)
        })
        .collect();

    if let Some(pb) = progress_bar {
        pb.finish_with_message("Analysis complete");
    }

    let analysis_elapsed = analysis_start.elapsed();
    info!(
        "Analysis completed in {:.2}s ({:.1} tracks/sec)",
        analysis_elapsed.as_secs_f64(),
        records.len() as f64 / analysis_elapsed.as_secs_f64().max(0.001)
    );

    // Single-writer cache phase. Degraded records are cached too, so
    // known-bad files are not re-decoded until they change on disk.
    let mut analyzed = 0;
    let mut failed = 0;
    for (file, record) in records {
        match &record.error {
            None => {
                debug!(
                    "Analyzed {}: bpm={:?}, key={:?}",
                    file.path.display(),
                    record.bpm,
                    record.key
                );
                analyzed += 1;
            }
            Some(cause) => {
                warn!("Analysis of {} failed: {}", file.path.display(), cause);
                failed += 1;
            }
        }
        cache.save(&file.identifier(), record, Some(&file.path));
    }

    info!(
        "Total pipeline time: {:.2}s",
        pipeline_start.elapsed().as_secs_f64()
    );

    Ok(PipelineResult {
        total_files,
        analyzed,
        cached,
        failed,
    })
}

/// Configure the rayon thread pool
fn configure_thread_pool(num_threads: usize) -> Result<()> {
    match rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
    {
        Ok(()) => {
            debug!("Configured thread pool with {} threads", num_threads);
        }
        Err(e) => {
            // The pool may already be initialized (e.g., in tests); that's OK
            if e.to_string().contains("already been initialized") {
                debug!("Thread pool already initialized, using existing pool");
            } else {
                return Err(TunesmithError::ConfigError(format!(
                    "Failed to configure thread pool: {e}"
                )));
            }
        }
    }
    Ok(())
}
