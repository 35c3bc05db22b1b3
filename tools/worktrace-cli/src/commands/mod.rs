//! Subcommand implementations and the helpers they share.

pub mod analyze;
pub mod batch;
pub mod config;
pub mod rollup;
pub mod validate;

use std::path::Path;

use clap::Args;
use worktrace_common::{AnalysisConfig, ExertionSource, FrameSampler, MalformedFramePolicy};
use worktrace_frame_model::frame::{parse_detections, RawDetection};

/// Per-run overrides of the configured analysis settings.
#[derive(Args, Debug, Clone)]
pub struct AnalysisArgs {
    /// Frame rate the detector ran at; frames are subsampled to the analysis rate
    #[arg(long)]
    pub source_fps: Option<u32>,

    /// Movement threshold (pixels per analyzed frame)
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Smoothing window (analyzed frames)
    #[arg(long)]
    pub window: Option<usize>,

    /// Object grace window (analyzed frames)
    #[arg(long)]
    pub grace: Option<usize>,

    /// Score exertion from the detector's camera motion instead of hand keypoints
    #[arg(long)]
    pub camera_motion: bool,

    /// Camera motion threshold (mean pixel difference)
    #[arg(long)]
    pub motion_threshold: Option<f64>,

    /// Abort a video on its first malformed record instead of dropping it
    #[arg(long)]
    pub fail_on_malformed: bool,
}

impl AnalysisArgs {
    /// Layer the flags over a configured base.
    pub fn apply(&self, mut base: AnalysisConfig) -> AnalysisConfig {
        if let Some(threshold) = self.threshold {
            base.movement_threshold = threshold;
        }
        if let Some(window) = self.window {
            base.smoothing_window_frames = Some(window);
        }
        if let Some(grace) = self.grace {
            base.grace_window_frames = Some(grace);
        }
        if self.camera_motion {
            base.exertion_source = ExertionSource::CameraMotion;
        }
        if let Some(threshold) = self.motion_threshold {
            base.motion_threshold = threshold;
        }
        if self.fail_on_malformed {
            base.malformed_policy = MalformedFramePolicy::FailVideo;
        }
        base
    }
}

/// Read and parse a detector output file.
pub fn load_detections(path: &Path) -> anyhow::Result<Vec<RawDetection>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
    parse_detections(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {e}", path.display()))
}

/// Keep the frames analyzed at `analysis_fps` and renumber them.
///
/// Records with frame index 0 pass through untouched so the pipeline still
/// reports them as malformed.
pub fn resample(
    detections: Vec<RawDetection>,
    source_fps: Option<u32>,
    analysis_fps: u32,
) -> Vec<RawDetection> {
    let Some(source_fps) = source_fps else {
        return detections;
    };
    let mut sampler = FrameSampler::new(source_fps, analysis_fps);
    let offered = detections.len();

    let kept: Vec<RawDetection> = detections
        .into_iter()
        .filter_map(|mut detection| {
            if detection.frame_index == 0 {
                return Some(detection);
            }
            let index = sampler.sample(detection.frame_index)?;
            detection.frame_index = index;
            Some(detection)
        })
        .collect();

    tracing::debug!(
        source_fps,
        analysis_fps,
        frame_skip = sampler.frame_skip(),
        offered,
        analyzed = sampler.analyzed(),
        "Subsampled detector output"
    );
    kept
}

/// Video id derived from a file name.
pub fn video_id_for(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
