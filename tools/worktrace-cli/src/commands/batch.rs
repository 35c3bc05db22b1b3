//! Analyze a directory of videos concurrently and roll the results up.
//!
//! Each video runs on a blocking worker; at most `jobs` run at once. Ctrl-C
//! stops new videos from starting while the running ones finish.

use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use worktrace_common::{AnalysisConfig, WorktraceError, WorktraceResult};
use worktrace_frame_model::frame::parse_detections;
use worktrace_frame_model::metrics::{AnnotatedMetrics, SiteRollup};
use worktrace_processing_core::{analyze_video, SiteRollupBuilder, VideoAnalysis};

use super::{resample, video_id_for};

#[derive(Debug, Serialize)]
struct BatchReport {
    generated_at: String,
    videos: Vec<AnnotatedMetrics>,
    failures: Vec<BatchFailure>,
    rollup: SiteRollup,
}

#[derive(Debug, Serialize)]
struct BatchFailure {
    video_id: String,
    error: String,
}

/// Video id and result of one worker.
type WorkerOutcome = (String, WorktraceResult<VideoAnalysis>);

/// Run one video's analysis, turning a panic into a failed result.
fn supervise<F>(video_id: String, analyze: F) -> WorkerOutcome
where
    F: FnOnce() -> WorktraceResult<VideoAnalysis>,
{
    let result = std::panic::catch_unwind(AssertUnwindSafe(analyze)).unwrap_or_else(|panic| {
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(WorktraceError::processing(format!("worker panicked: {message}")))
    });
    (video_id, result)
}

/// Gathers worker outcomes into the batch report.
///
/// Every outcome is recorded; a failed or lost worker never prevents the
/// rollup of the videos that finished.
#[derive(Debug, Default)]
struct BatchCollector {
    rollup: SiteRollupBuilder,
    videos: Vec<AnnotatedMetrics>,
    failures: Vec<BatchFailure>,
}

impl BatchCollector {
    fn record(&mut self, joined: Result<WorkerOutcome, JoinError>) {
        match joined {
            Ok((video_id, Ok(analysis))) => {
                tracing::info!(
                    video_id = %video_id,
                    productivity_pct = analysis.metrics.productivity_pct,
                    dropped = analysis.dropped_frames(),
                    "Video analyzed"
                );
                self.videos.push(annotate(&analysis));
                self.rollup.insert(analysis.metrics);
            }
            Ok((video_id, Err(e))) => self.fail(video_id, e),
            Err(e) => self.fail(
                UNKNOWN_VIDEO.to_string(),
                WorktraceError::processing(format!("worker did not complete: {e}")),
            ),
        }
    }

    fn fail(&mut self, video_id: String, error: WorktraceError) {
        tracing::warn!(video_id = %video_id, %error, "Video failed");
        self.failures.push(BatchFailure {
            video_id,
            error: error.to_string(),
        });
    }

    fn into_report(mut self) -> BatchReport {
        // Completion order varies between runs.
        self.videos
            .sort_by(|a, b| a.metrics.video_id.cmp(&b.metrics.video_id));
        self.failures.sort_by(|a, b| a.video_id.cmp(&b.video_id));

        BatchReport {
            generated_at: chrono::Utc::now().to_rfc3339(),
            rollup: self.rollup.build(),
            videos: self.videos,
            failures: self.failures,
        }
    }
}

/// Failure label for a worker whose video id was lost with it.
const UNKNOWN_VIDEO: &str = "(unknown)";

pub async fn run(
    dir: PathBuf,
    jobs: usize,
    config: AnalysisConfig,
    source_fps: Option<u32>,
    output: Option<PathBuf>,
    metrics_out: Option<PathBuf>,
) -> anyhow::Result<()> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    let paths = video_files(&dir)?;
    if paths.is_empty() {
        anyhow::bail!("No *.jsonl videos found in {}", dir.display());
    }
    println!(
        "Analyzing {} video(s) from {} ({} at a time)",
        paths.len(),
        dir.display(),
        jobs.max(1)
    );

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted; finishing videos already in progress");
                stop.store(true, Ordering::SeqCst);
            }
        });
    }

    let permits = Arc::new(Semaphore::new(jobs.max(1)));
    let config = Arc::new(config);
    let mut tasks: JoinSet<WorkerOutcome> = JoinSet::new();
    let mut collector = BatchCollector::default();

    for path in paths {
        let video_id = video_id_for(&path);
        let permit = Arc::clone(&permits).acquire_owned().await?;
        if stop.load(Ordering::SeqCst) {
            collector.fail(video_id, WorktraceError::cancelled("video not started"));
            continue;
        }

        let config = Arc::clone(&config);
        tasks.spawn_blocking(move || {
            let _permit = permit;
            supervise(video_id.clone(), || {
                analyze_file(&path, &video_id, &config, source_fps)
            })
        });
    }

    while let Some(joined) = tasks.join_next().await {
        collector.record(joined);
    }

    let report = collector.into_report();

    print_summary(&report);

    if let Some(metrics_out) = &metrics_out {
        let jsonl = worktrace_frame_model::frame::serialize_jsonl(&report.videos)?;
        std::fs::write(metrics_out, jsonl)
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", metrics_out.display()))?;
        println!("Metrics written to: {}", metrics_out.display());
    }

    if let Some(output) = &output {
        std::fs::write(output, serde_json::to_string_pretty(&report)?)
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", output.display()))?;
        println!("Report written to: {}", output.display());
    }

    Ok(())
}

fn video_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", dir.display()))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "jsonl"))
        .collect();
    paths.sort();
    Ok(paths)
}

fn analyze_file(
    path: &Path,
    video_id: &str,
    config: &AnalysisConfig,
    source_fps: Option<u32>,
) -> WorktraceResult<VideoAnalysis> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => WorktraceError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => WorktraceError::Io(e),
    })?;
    let detections = resample(parse_detections(&content)?, source_fps, config.analysis_fps);
    tracing::debug!(video_id, records = detections.len(), "Loaded detections");
    analyze_video(video_id, detections, config)
}

/// Per-video metrics with the run's quality notes attached.
fn annotate(analysis: &VideoAnalysis) -> AnnotatedMetrics {
    let mut annotated = AnnotatedMetrics::from(analysis.metrics.clone());
    if analysis.is_degraded() {
        annotated.annotations.insert(
            "dropped_frames".to_string(),
            analysis.dropped_frames().into(),
        );
        match serde_json::to_value(&analysis.conditions) {
            Ok(conditions) => {
                annotated
                    .annotations
                    .insert("conditions".to_string(), conditions);
            }
            Err(e) => {
                tracing::warn!(video_id = %analysis.video_id, error = %e, "Conditions not annotated");
            }
        }
    }
    annotated
}

fn print_summary(report: &BatchReport) {
    let rollup = &report.rollup;
    println!("\nSite rollup ({} video(s)):", rollup.video_count);
    println!("  Mean productivity: {:.1}%", rollup.mean_productivity_pct);
    if let Some(peak) = &rollup.peak {
        println!(
            "  Peak exertion: {:.2} ({})",
            peak.peak_exertion, peak.video_id
        );
    }
    println!("  Distinct tasks: {}", rollup.distinct_tasks);

    println!("\nLeaderboard:");
    for (rank, entry) in rollup.leaderboard.iter().enumerate() {
        println!(
            "  {:>2}. {:<24} {:>5.1}%  {}",
            rank + 1,
            entry.video_id,
            entry.productivity_pct,
            entry.dominant_task
        );
    }

    if !report.failures.is_empty() {
        println!("\n{} video(s) not analyzed:", report.failures.len());
        for failure in &report.failures {
            println!("  - {}: {}", failure.video_id, failure.error);
        }
    }
    println!();
}
