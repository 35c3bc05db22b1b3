//! Per-frame records flowing through the exertion pipeline.
//!
//! Detector output arrives as JSONL, one [`RawDetection`] per analyzed frame.
//! [`FrameRecord::from_detection`] normalizes it; later stages wrap the
//! record into [`ScoredFrame`] and [`ClassifiedFrame`] without mutating it.

use serde::{Deserialize, Serialize};
use worktrace_common::{DetectionFault, WorktraceError, WorktraceResult};

/// Analyzed-frame index (1-based, strictly increasing within a video).
pub type FrameIndex = u64;

/// A point in source pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point2D) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Which tracked point a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedPoint {
    Left,
    Right,
}

impl std::fmt::Display for TrackedPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
        }
    }
}

/// A keypoint as reported by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawKeypoint {
    pub x: f64,
    pub y: f64,
    /// Detector validity flag. Detectors without one omit it.
    #[serde(default = "default_valid")]
    pub valid: bool,
}

fn default_valid() -> bool {
    true
}

/// One frame of raw detector output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub frame_index: FrameIndex,

    #[serde(default)]
    pub left: Option<RawKeypoint>,

    #[serde(default)]
    pub right: Option<RawKeypoint>,

    #[serde(default)]
    pub object_count: usize,

    #[serde(default)]
    pub object_labels: Vec<String>,

    /// Global camera motion since the previous analyzed frame, for
    /// detectors that measure it.
    #[serde(default)]
    pub motion_score: Option<f64>,
}

/// Canonical, validated frame record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame_index: FrameIndex,
    pub left_point: Option<Point2D>,
    pub right_point: Option<Point2D>,
    pub object_count: usize,
    pub object_labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion_score: Option<f64>,
}

impl RawKeypoint {
    /// Resolve to a present point, or `None` when the detector did not see it.
    fn resolve(&self, absent_sentinel: Option<[f64; 2]>) -> Option<Point2D> {
        if !self.valid || !self.x.is_finite() || !self.y.is_finite() {
            return None;
        }
        if absent_sentinel == Some([self.x, self.y]) {
            return None;
        }
        Some(Point2D::new(self.x, self.y))
    }
}

impl FrameRecord {
    /// Build a record whose object count is taken from the labels.
    pub fn new(
        frame_index: FrameIndex,
        left_point: Option<Point2D>,
        right_point: Option<Point2D>,
        object_labels: Vec<String>,
    ) -> Self {
        Self {
            frame_index,
            left_point,
            right_point,
            object_count: object_labels.len(),
            object_labels,
            motion_score: None,
        }
    }

    /// Normalize one detector record.
    ///
    /// Keypoints that are flagged invalid, non-finite, or equal to
    /// `absent_sentinel` become absent.
    pub fn from_detection(
        raw: RawDetection,
        absent_sentinel: Option<[f64; 2]>,
    ) -> WorktraceResult<Self> {
        let record = Self {
            frame_index: raw.frame_index,
            left_point: raw.left.and_then(|kp| kp.resolve(absent_sentinel)),
            right_point: raw.right.and_then(|kp| kp.resolve(absent_sentinel)),
            object_count: raw.object_count,
            object_labels: raw.object_labels,
            motion_score: raw.motion_score,
        };
        record.validate()?;
        Ok(record)
    }

    /// Check the record-level invariants.
    pub fn validate(&self) -> WorktraceResult<()> {
        if self.frame_index == 0 {
            return Err(WorktraceError::malformed(0, DetectionFault::ZeroFrameIndex));
        }
        if self.object_count != self.object_labels.len() {
            return Err(WorktraceError::malformed(
                self.frame_index,
                DetectionFault::LabelCountMismatch {
                    object_count: self.object_count,
                    label_count: self.object_labels.len(),
                },
            ));
        }
        if let Some(score) = self.motion_score {
            if !score.is_finite() || score < 0.0 {
                return Err(WorktraceError::malformed(
                    self.frame_index,
                    DetectionFault::InvalidMotionScore,
                ));
            }
        }
        Ok(())
    }

    /// Position of one tracked point.
    pub fn point(&self, which: TrackedPoint) -> Option<Point2D> {
        match which {
            TrackedPoint::Left => self.left_point,
            TrackedPoint::Right => self.right_point,
        }
    }

    /// Whether any object of interest was detected this frame.
    pub fn has_objects(&self) -> bool {
        self.object_count > 0
    }
}

/// A frame with its displacement and smoothed exertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredFrame {
    #[serde(flatten)]
    pub record: FrameRecord,

    /// Raw per-frame exertion: pixel distance moved by both tracked points
    /// since the previous frame, or the camera motion score.
    pub raw_displacement: f64,

    /// Trailing-window mean of `raw_displacement`.
    pub smoothed_exertion: f64,
}

/// A scored frame with its activity decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedFrame {
    #[serde(flatten)]
    pub scored: ScoredFrame,

    /// Smoothed exertion exceeded the movement threshold.
    pub is_moving: bool,

    /// An object was seen within the grace window.
    pub object_nearby: bool,

    /// Final activity decision.
    pub is_working: bool,
}

impl ClassifiedFrame {
    pub fn frame_index(&self) -> FrameIndex {
        self.scored.record.frame_index
    }

    pub fn smoothed_exertion(&self) -> f64 {
        self.scored.smoothed_exertion
    }

    pub fn object_labels(&self) -> &[String] {
        &self.scored.record.object_labels
    }
}

/// Parse detector records from JSONL content (one JSON object per line).
///
/// Blank lines and `#` comment lines are skipped.
pub fn parse_detections(jsonl: &str) -> Result<Vec<RawDetection>, serde_json::Error> {
    parse_jsonl(jsonl)
}

/// Parse any JSONL content, skipping blank and `#` comment lines.
pub fn parse_jsonl<T: serde::de::DeserializeOwned>(
    jsonl: &str,
) -> Result<Vec<T>, serde_json::Error> {
    jsonl
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(serde_json::from_str)
        .collect()
}

/// Serialize records to JSONL format.
pub fn serialize_jsonl<T: Serialize>(records: &[T]) -> Result<String, serde_json::Error> {
    let mut output = String::new();
    for record in records {
        output.push_str(&serde_json::to_string(record)?);
        output.push('\n');
    }
    Ok(output)
}
