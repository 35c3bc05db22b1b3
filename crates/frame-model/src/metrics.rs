//! Per-video and site-level results of the exertion pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::frame::FrameIndex;

/// Dominant task reported when no label was seen on a working frame.
pub const UNKNOWN_TASK: &str = "unknown";

/// A maximal run of working frames: `start_frame` inclusive, `end_frame` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityInterval {
    pub start_frame: FrameIndex,
    pub end_frame: FrameIndex,
}

impl ActivityInterval {
    /// Number of frame indices covered.
    pub fn len(&self) -> u64 {
        self.end_frame - self.start_frame
    }

    pub fn is_empty(&self) -> bool {
        self.end_frame <= self.start_frame
    }
}

/// Summary metrics of one analyzed video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetrics {
    pub video_id: String,
    pub total_frames: usize,
    pub working_frames: usize,
    /// Share of working frames in [0, 100], one decimal.
    pub productivity_pct: f64,
    /// Highest smoothed exertion, two decimals.
    pub peak_exertion: f64,
    pub dominant_task: String,
}

impl VideoMetrics {
    /// Metrics of a video with no analyzed frames.
    pub fn empty(video_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            total_frames: 0,
            working_frames: 0,
            productivity_pct: 0.0,
            peak_exertion: 0.0,
            dominant_task: UNKNOWN_TASK.to_string(),
        }
    }

    /// Whether a dominant task was identified.
    pub fn has_task(&self) -> bool {
        self.dominant_task != UNKNOWN_TASK
    }
}

/// Metrics merged with qualitative fields supplied by an outside annotator
/// (trade, narrative summary, ...). The extra fields are passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedMetrics {
    #[serde(flatten)]
    pub metrics: VideoMetrics,

    #[serde(flatten)]
    pub annotations: BTreeMap<String, serde_json::Value>,
}

impl From<VideoMetrics> for AnnotatedMetrics {
    fn from(metrics: VideoMetrics) -> Self {
        Self {
            metrics,
            annotations: BTreeMap::new(),
        }
    }
}

/// Highest peak exertion across a site and the video it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakExertion {
    pub video_id: String,
    pub peak_exertion: f64,
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub video_id: String,
    pub productivity_pct: f64,
    pub dominant_task: String,
}

/// Site-level reduction of per-video metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRollup {
    pub video_count: usize,
    /// Mean of per-video productivity, one decimal.
    pub mean_productivity_pct: f64,
    pub peak: Option<PeakExertion>,
    pub distinct_tasks: usize,
    /// Number of videos per dominant task.
    pub task_distribution: BTreeMap<String, usize>,
    /// Videos ordered by productivity (highest first).
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Round to `decimals` places as a decimal reading of the value would.
///
/// The exact binary value is rounded, so `4.35` (stored just below) goes
/// down; exact ties such as `2.125` go to the even digit.
pub fn round_to(value: f64, decimals: usize) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{value:.decimals$}").parse().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_length() {
        let interval = ActivityInterval {
            start_frame: 2,
            end_frame: 5,
        };
        assert_eq!(interval.len(), 3);
        assert!(!interval.is_empty());
        assert!(ActivityInterval {
            start_frame: 5,
            end_frame: 5
        }
        .is_empty());
    }

    #[test]
    fn test_empty_metrics_use_unknown_task() {
        let metrics = VideoMetrics::empty("cam-01");
        assert_eq!(metrics.dominant_task, UNKNOWN_TASK);
        assert!(!metrics.has_task());
        assert_eq!(metrics.productivity_pct, 0.0);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(37.04, 1), 37.0);
        assert_eq!(round_to(12.345_6, 2), 12.35);
        assert_eq!(round_to(0.0, 2), 0.0);
    }

    #[test]
    fn test_round_to_rounds_exact_value_half_to_even() {
        assert_eq!(round_to(12.25, 1), 12.2);
        assert_eq!(round_to(12.35, 1), 12.3);
        assert_eq!(round_to(2.125, 2), 2.12);
        assert_eq!(round_to(2.375, 2), 2.38);
        assert_eq!(round_to(4.35, 1), 4.3);
        assert_eq!(round_to(0.5, 0), 0.0);
        assert_eq!(round_to(1.5, 0), 2.0);
    }

    #[test]
    fn test_annotations_pass_through() {
        let line = r#"{"video_id":"cam-02","total_frames":10,"working_frames":4,"productivity_pct":40.0,"peak_exertion":3.21,"dominant_task":"drill","trade":"electrician","summary":"steady work"}"#;
        let parsed: AnnotatedMetrics = serde_json::from_str(line).unwrap();
        assert_eq!(parsed.metrics.working_frames, 4);
        assert_eq!(parsed.annotations["trade"], "electrician");

        let reparsed: AnnotatedMetrics =
            serde_json::from_str(&serde_json::to_string(&parsed).unwrap()).unwrap();
        assert_eq!(reparsed, parsed);
    }
}
