//! Pipeline orchestration
//!
//! Coordinates file discovery, decoding, analysis on the worker pool, and export.
//! Decoding runs on a feeder thread that blocks on the bounded request queue,
//! so at most a few decoded tracks are held in memory at once.

use super::engine::Engine;
use super::worker::{AnalysisRequest, AnalysisResponse, WorkerPool};
use crate::audio;
use crate::config::Settings;
use crate::discovery::{self, DiscoveredFile};
use crate::error::{AnalyzeError, Result};
use crate::export;
use crate::types::AnalyzedTrack;
use crossbeam_channel::{unbounded, Receiver, Sender};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Pipeline result summary
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PipelineResult {
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Run the full analysis pipeline
pub fn run(settings: &Settings) -> Result<PipelineResult> {
    let pipeline_start = Instant::now();

    // Phase 1: Discovery
    let discovery_start = Instant::now();
    info!("Scanning for audio files...");
    let files = discovery::scan(&settings.input, settings.recursive)?;

    if files.is_empty() {
        return Ok(PipelineResult::default());
    }

    info!(
        "Found {} audio files in {:.2}s",
        files.len(),
        discovery_start.elapsed().as_secs_f64()
    );

    // Dry run mode - show files and exit
    if settings.dry_run {
        return Ok(run_dry_run(&files, settings));
    }

    // Engine construction validates the analysis config before any decoding
    let engine = Arc::new(Engine::new(settings.analysis.clone())?);

    let json_path = settings.output_file();
    let existing_tracks = export::read_existing_tracks(&json_path);
    let already_analyzed: HashSet<String> = if settings.force {
        debug!("Force mode enabled, will re-analyze all files");
        HashSet::new()
    } else {
        existing_tracks.iter().map(|t| t.path.clone()).collect()
    };

    let (files_to_analyze, skipped_existing): (Vec<_>, Vec<_>) = files.into_iter().partition(|f| {
        let path_str = f.path.to_string_lossy().to_string();
        if already_analyzed.contains(&path_str) {
            debug!("Skipping {} (already analyzed)", f.path.display());
            false
        } else {
            true
        }
    });

    let skipped_existing_count = skipped_existing.len();
    if skipped_existing_count > 0 {
        info!(
            "Skipping {} already-analyzed files (use --force to re-analyze)",
            skipped_existing_count
        );
    }

    let total_files = files_to_analyze.len() + skipped_existing_count;

    if files_to_analyze.is_empty() {
        info!("All files already analyzed, nothing to do");
        return Ok(PipelineResult {
            total_files,
            skipped: skipped_existing_count,
            ..PipelineResult::default()
        });
    }

    info!("Analyzing {} files", files_to_analyze.len());

    // Phase 2: Analysis
    let analysis_start = Instant::now();
    let analyzed_count = files_to_analyze.len();
    let (tracks, stats) = analyze_files(files_to_analyze, engine, settings)?;
    let analysis_elapsed = analysis_start.elapsed().as_secs_f64();
    let tracks_per_sec = if analysis_elapsed > 0.0 {
        analyzed_count as f64 / analysis_elapsed
    } else {
        0.0
    };
    info!(
        "Analysis completed in {:.2}s ({:.1} tracks/sec)",
        analysis_elapsed, tracks_per_sec
    );

    // Phase 3: Export
    if !tracks.is_empty() {
        let export_start = Instant::now();
        export_results(existing_tracks, &tracks, settings)?;
        info!("Export completed in {:.2}s", export_start.elapsed().as_secs_f64());
    }

    info!(
        "Total pipeline time: {:.2}s",
        pipeline_start.elapsed().as_secs_f64()
    );

    Ok(PipelineResult {
        total_files,
        successful: stats.successful,
        failed: stats.failed,
        skipped: stats.skipped + skipped_existing_count,
    })
}

/// Dry run mode - show files that would be analyzed without processing
fn run_dry_run(files: &[DiscoveredFile], settings: &Settings) -> PipelineResult {
    println!();
    println!("=== DRY RUN MODE ===");
    println!();

    let already_analyzed = if settings.force {
        HashSet::new()
    } else {
        export::read_existing_analysis(&settings.output_file())
    };

    // Group files by directory
    let mut by_directory: HashMap<PathBuf, Vec<&DiscoveredFile>> = HashMap::new();
    for file in files {
        let dir = file.path.parent().unwrap_or(&file.path).to_path_buf();
        by_directory.entry(dir).or_default().push(file);
    }

    let mut directories: Vec<_> = by_directory.keys().cloned().collect();
    directories.sort();

    for dir in &directories {
        let dir_files = &by_directory[dir];
        println!("{}/ ({} files)", dir.display(), dir_files.len());
        for file in dir_files {
            let filename = file.path.file_name().and_then(|n| n.to_str()).unwrap_or("?");
            if already_analyzed.contains(&*file.path.to_string_lossy()) {
                println!("  {} (already analyzed)", filename);
            } else {
                println!("  {}", filename);
            }
        }
        println!();
    }

    // Format breakdown
    let mut by_format: HashMap<String, usize> = HashMap::new();
    for file in files {
        *by_format.entry(format!("{:?}", file.format).to_uppercase()).or_default() += 1;
    }
    let total_bytes: u64 = files.iter().map(|f| f.size_bytes).sum();

    println!("─────────────────────────────────────────");
    println!();
    println!(
        "Would analyze {} files ({:.1} MB):",
        files.len(),
        total_bytes as f64 / (1024.0 * 1024.0)
    );

    let mut formats: Vec<_> = by_format.iter().collect();
    formats.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (format, count) in formats {
        println!("  {} {} files", count, format);
    }
    println!();
    println!("Would create:");
    println!("  {}", settings.output_file().display());
    println!();

    PipelineResult {
        total_files: files.len(),
        skipped: files.len(), // All "skipped" in dry run mode
        ..PipelineResult::default()
    }
}

/// Analysis statistics
struct AnalysisStats {
    successful: usize,
    failed: usize,
    skipped: usize,
}

impl AnalysisStats {
    fn record_error(&mut self, path: &std::path::Path, e: &AnalyzeError) {
        if e.is_recoverable() {
            warn!("Skipping {}: {}", path.display(), e);
            self.skipped += 1;
        } else {
            error!("Failed {}: {}", path.display(), e);
            self.failed += 1;
        }
    }
}

/// What the decoder thread reports besides the requests it submits
enum FeedEvent {
    /// Sent before the matching request is submitted
    Decoded { id: u64, duration: f64, sample_rate: u32 },
    /// Decoding or queueing failed; no response will arrive for this id
    Rejected { id: u64, error: AnalyzeError },
}

/// Decode files on a feeder thread and analyze them on the worker pool
fn analyze_files(
    files: Vec<DiscoveredFile>,
    engine: Arc<Engine>,
    settings: &Settings,
) -> Result<(Vec<AnalyzedTrack>, AnalysisStats)> {
    let pool = WorkerPool::spawn(settings.analysis_threads, engine)?;
    let responses = pool.responses().clone();
    let (event_tx, event_rx) = unbounded::<FeedEvent>();

    let progress_bar = if settings.show_progress {
        let pb = ProgressBar::new(files.len() as u64);
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

    let paths: Vec<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
    let feeder_progress = progress_bar.clone();
    let feeder = thread::Builder::new()
        .name("djcue-decoder".to_string())
        .spawn(move || feed(files, pool, event_tx, feeder_progress))?;

    let mut stats = AnalysisStats {
        successful: 0,
        failed: 0,
        skipped: 0,
    };
    let mut decoded: HashMap<u64, (f64, u32)> = HashMap::new();
    let mut tracks = Vec::new();

    // Ends once the feeder has shut the pool down and every worker has exited
    for response in responses.iter() {
        drain_events(&event_rx, &mut decoded, &mut stats, &paths);

        let id = response.id();
        let Some(path) = paths.get(id as usize) else {
            warn!("Response for unknown request {}", id);
            continue;
        };

        match response {
            AnalysisResponse::Completed { result, .. } => {
                let (duration_seconds, sample_rate) = decoded.remove(&id).unwrap_or_default();
                debug!(
                    "Analyzed {}: BPM={}, Key={}, Energy={}",
                    path.file_name().unwrap_or_default().to_string_lossy(),
                    result.bpm,
                    result.key,
                    result.energy
                );
                tracks.push(AnalyzedTrack {
                    path: path.clone(),
                    duration_seconds,
                    sample_rate,
                    result,
                });
                stats.successful += 1;
                if let Some(ref pb) = progress_bar {
                    pb.set_message(path.file_name().unwrap_or_default().to_string_lossy().to_string());
                }
            }
            AnalysisResponse::Failed { error, .. } => stats.record_error(path, &error),
        }
        if let Some(ref pb) = progress_bar {
            pb.inc(1);
        }
    }

    if let Err(panic_info) = feeder.join() {
        let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        error!("Decoder thread panicked: {}. Some tracks were not analyzed.", panic_msg);
    }
    drain_events(&event_rx, &mut decoded, &mut stats, &paths);

    if let Some(pb) = progress_bar {
        pb.finish_with_message("Analysis complete");
    }

    tracks.sort_by(|a, b| a.path.cmp(&b.path));
    Ok((tracks, stats))
}

fn drain_events(
    events: &Receiver<FeedEvent>,
    decoded: &mut HashMap<u64, (f64, u32)>,
    stats: &mut AnalysisStats,
    paths: &[PathBuf],
) {
    for event in events.try_iter() {
        match event {
            FeedEvent::Decoded { id, duration, sample_rate } => {
                decoded.insert(id, (duration, sample_rate));
            }
            FeedEvent::Rejected { id, error } => {
                if let Some(path) = paths.get(id as usize) {
                    stats.record_error(path, &error);
                }
            }
        }
    }
}

/// Feeder thread: decode each file and submit it, then shut the pool down
fn feed(
    files: Vec<DiscoveredFile>,
    pool: WorkerPool,
    events: Sender<FeedEvent>,
    progress: Option<ProgressBar>,
) {
    feed_requests(files, |request| pool.submit(request), &events, progress.as_ref());

    // Closing the queue lets the workers finish and the response stream end
    let _ = pool.shutdown();
}

/// Decode and submit every file in order
///
/// Every file yields either a submitted request or a `Rejected` event. Once a
/// submit fails the queue is gone, so the remaining files are rejected
/// without decoding.
fn feed_requests<F>(
    files: Vec<DiscoveredFile>,
    mut submit: F,
    events: &Sender<FeedEvent>,
    progress: Option<&ProgressBar>,
) where
    F: FnMut(AnalysisRequest) -> Result<()>,
{
    let reject = |id: u64, error: AnalyzeError| {
        if let Some(pb) = progress {
            pb.inc(1);
        }
        let _ = events.send(FeedEvent::Rejected { id, error });
    };

    let mut queue_open = true;
    for (index, file) in files.into_iter().enumerate() {
        let id = index as u64;
        if !queue_open {
            reject(id, AnalyzeError::WorkerDisconnected);
            continue;
        }
        debug!("Decoding: {}", file.path.display());

        match audio::decode(&file.path) {
            Ok(buffer) => {
                let _ = events.send(FeedEvent::Decoded {
                    id,
                    duration: buffer.duration,
                    sample_rate: buffer.sample_rate,
                });
                let request = AnalysisRequest {
                    id,
                    sample_data: buffer.samples,
                    sample_rate: buffer.sample_rate,
                    duration: buffer.duration,
                };
                if let Err(e) = submit(request) {
                    error!("Cannot queue {}: {}", file.path.display(), e);
                    reject(id, e);
                    queue_open = false;
                }
            }
            Err(error) => reject(id, error),
        }
    }
}

/// Merge with the existing export and write `djcue.json`
fn export_results(
    existing: Vec<export::TrackJson>,
    tracks: &[AnalyzedTrack],
    settings: &Settings,
) -> Result<()> {
    std::fs::create_dir_all(&settings.output)
        .map_err(|e| AnalyzeError::output_error(&settings.output, e))?;

    let merged = export::merge_tracks(existing, tracks);
    let json_path = settings.output_file();
    export::write_json(&merged, &json_path)?;

    if settings.show_progress {
        println!();
        println!("✓ Wrote {} tracks to {}", merged.len(), json_path.display());
    }

    Ok(())
}
