//! Analyze one video's detector output.

use std::path::PathBuf;

use serde::Serialize;
use worktrace_common::AnalysisConfig;
use worktrace_frame_model::frame::serialize_jsonl;
use worktrace_frame_model::metrics::{ActivityInterval, VideoMetrics};
use worktrace_processing_core::{analyze_video, PipelineCondition};

use super::{load_detections, resample, video_id_for};

#[derive(Serialize)]
struct AnalyzeOutput<'a> {
    metrics: &'a VideoMetrics,
    intervals: &'a [ActivityInterval],
    conditions: &'a [PipelineCondition],
}

pub fn run(
    path: PathBuf,
    video_id: Option<String>,
    config: AnalysisConfig,
    source_fps: Option<u32>,
    frames_out: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let video_id = video_id.unwrap_or_else(|| video_id_for(&path));

    let detections = resample(load_detections(&path)?, source_fps, config.analysis_fps);
    tracing::info!(video_id = %video_id, records = detections.len(), "Loaded detections");

    let analysis = analyze_video(video_id, detections, &config)
        .map_err(|e| anyhow::anyhow!("Analysis failed: {e}"))?;

    if let Some(frames_out) = &frames_out {
        let jsonl = serialize_jsonl(&analysis.frames)?;
        std::fs::write(frames_out, jsonl)
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", frames_out.display()))?;
    }

    if json {
        let output = AnalyzeOutput {
            metrics: &analysis.metrics,
            intervals: &analysis.intervals,
            conditions: &analysis.conditions,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let metrics = &analysis.metrics;
    println!("Video: {}", metrics.video_id);
    println!("  Frames: {}", metrics.total_frames);
    println!("  Working frames: {}", metrics.working_frames);
    println!("  Productivity: {:.1}%", metrics.productivity_pct);
    println!("  Peak exertion: {:.2}", metrics.peak_exertion);
    if metrics.has_task() {
        println!("  Dominant task: {}", metrics.dominant_task);
    } else {
        println!("  Dominant task: none detected while working");
    }

    if analysis.intervals.is_empty() {
        println!("  No working intervals.");
    } else {
        println!("  Working intervals:");
        for interval in &analysis.intervals {
            println!(
                "    frames {}..{} ({} frames)",
                interval.start_frame,
                interval.end_frame,
                interval.len()
            );
        }
    }

    if analysis.is_degraded() {
        println!("\n{} condition(s) recorded:", analysis.conditions.len());
        for condition in &analysis.conditions {
            println!("  - {}", serde_json::to_string(condition)?);
        }
    }

    if let Some(frames_out) = frames_out {
        println!("\nFrames written to: {}", frames_out.display());
    }

    Ok(())
}
