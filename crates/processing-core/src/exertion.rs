//! Exertion scoring.
//!
//! Each frame's raw displacement is the Euclidean distance moved by the left
//! point plus the distance moved by the right point since the previous frame.
//! In camera-motion mode the detector's per-frame motion score takes the
//! place of displacement. Either way the exertion score is a trailing moving
//! average with a shrinking window at the start of the video, so frame `i`
//! never depends on frames after `i`.

use std::collections::VecDeque;

use worktrace_frame_model::frame::{FrameRecord, Point2D, ScoredFrame};

/// Trailing mean over the last `capacity` samples.
///
/// Before the buffer is full the mean covers whatever samples exist
/// (`min_periods = 1`). Push is O(1); the running sum is recomputed from the
/// buffer once per `capacity` evictions to keep rounding error bounded.
#[derive(Debug, Clone)]
pub struct RollingMean {
    samples: VecDeque<f64>,
    capacity: usize,
    sum: f64,
    evictions: usize,
}

impl RollingMean {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            sum: 0.0,
            evictions: 0,
        }
    }

    /// Add a sample and return the mean of the current window.
    pub fn push(&mut self, value: f64) -> f64 {
        if self.is_full() {
            if let Some(oldest) = self.samples.pop_back() {
                self.sum -= oldest;
                self.evictions += 1;
            }
        }
        self.samples.push_front(value);
        self.sum += value;

        if self.evictions >= self.capacity {
            self.sum = self.samples.iter().sum();
            self.evictions = 0;
        }

        self.sum / self.samples.len() as f64
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.sum = 0.0;
        self.evictions = 0;
    }
}

/// Converts gap-filled frames into scored frames.
#[derive(Debug, Clone, Copy)]
pub struct ExertionScorer {
    window: usize,
}

impl ExertionScorer {
    /// Create a scorer smoothing over `window` frames (at least 1).
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }

    /// Score a gap-filled sequence by keypoint displacement.
    pub fn score(&self, frames: Vec<FrameRecord>) -> Vec<ScoredFrame> {
        let raw: Vec<f64> = frames
            .iter()
            .enumerate()
            .map(|(i, record)| match i {
                0 => 0.0,
                _ => displacement(&frames[i - 1], record),
            })
            .collect();
        self.smooth(frames, raw)
    }

    /// Score a sequence by its camera motion scores.
    ///
    /// Frames without a score count as no motion; fill them first.
    pub fn score_motion(&self, frames: Vec<FrameRecord>) -> Vec<ScoredFrame> {
        let raw: Vec<f64> = frames
            .iter()
            .map(|record| record.motion_score.unwrap_or(0.0))
            .collect();
        self.smooth(frames, raw)
    }

    fn smooth(&self, frames: Vec<FrameRecord>, raw: Vec<f64>) -> Vec<ScoredFrame> {
        let mut rolling = RollingMean::with_capacity(self.window);

        frames
            .into_iter()
            .zip(raw)
            .map(|(record, raw_displacement)| {
                // Cancellation in the running sum can leave a tiny negative mean.
                let smoothed_exertion = rolling.push(raw_displacement).max(0.0);
                ScoredFrame {
                    record,
                    raw_displacement,
                    smoothed_exertion,
                }
            })
            .collect()
    }
}

/// Combined distance moved by both tracked points between two frames.
///
/// A point absent in either frame contributes nothing.
pub fn displacement(prev: &FrameRecord, curr: &FrameRecord) -> f64 {
    step(prev.left_point, curr.left_point) + step(prev.right_point, curr.right_point)
}

fn step(from: Option<Point2D>, to: Option<Point2D>) -> f64 {
    match (from, to) {
        (Some(from), Some(to)) => from.distance(&to),
        _ => 0.0,
    }
}
