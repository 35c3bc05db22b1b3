//! Keypoint gap filling.
//!
//! Hands regularly leave a first-person frame for a moment. Treating that as
//! zero movement undercounts effort, so each coordinate channel is repaired
//! independently:
//!
//! 1. **Interior gaps** are linearly interpolated between the nearest present
//!    values, weighted by frame index.
//! 2. **Edge gaps** (before the first or after the last observation) hold the
//!    nearest observed value.
//! 3. **Never observed** channels take a fixed neutral value and are reported
//!    back to the caller as degraded.

use worktrace_frame_model::frame::{FrameRecord, Point2D, TrackedPoint};

/// Result of filling one video's frame sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct GapFillOutcome {
    /// Frames with every tracked point present (empty input stays empty).
    pub frames: Vec<FrameRecord>,
    /// Tracked points with at least one channel never observed.
    pub all_absent: Vec<TrackedPoint>,
}

/// Whole-sequence keypoint gap filler.
#[derive(Debug, Clone, Copy)]
pub struct GapFiller {
    neutral_fill: f64,
}

impl Default for GapFiller {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl GapFiller {
    /// Create a filler that uses `neutral_fill` for never-observed channels.
    pub fn new(neutral_fill: f64) -> Self {
        Self { neutral_fill }
    }

    /// Fill every absent point in the sequence.
    ///
    /// A sequence without absent points is returned unchanged.
    pub fn fill(&self, mut frames: Vec<FrameRecord>) -> GapFillOutcome {
        if frames.is_empty() {
            return GapFillOutcome {
                frames,
                all_absent: vec![],
            };
        }

        let positions: Vec<f64> = frames.iter().map(|f| f.frame_index as f64).collect();
        let mut all_absent = vec![];

        for which in [TrackedPoint::Left, TrackedPoint::Right] {
            let xs: Vec<Option<f64>> = frames.iter().map(|f| f.point(which).map(|p| p.x)).collect();
            let ys: Vec<Option<f64>> = frames.iter().map(|f| f.point(which).map(|p| p.y)).collect();

            let filled_x = fill_channel(&positions, &xs);
            let filled_y = fill_channel(&positions, &ys);
            if filled_x.is_none() || filled_y.is_none() {
                all_absent.push(which);
            }

            let neutral = vec![self.neutral_fill; frames.len()];
            let filled_x = filled_x.unwrap_or_else(|| neutral.clone());
            let filled_y = filled_y.unwrap_or(neutral);

            for ((frame, x), y) in frames.iter_mut().zip(filled_x).zip(filled_y) {
                let point = Some(Point2D::new(x, y));
                match which {
                    TrackedPoint::Left => frame.left_point = point,
                    TrackedPoint::Right => frame.right_point = point,
                }
            }
        }

        GapFillOutcome { frames, all_absent }
    }

    /// Fill missing camera motion scores the same way.
    ///
    /// Returns the frames and whether any score was observed; a sequence
    /// without a single score gets the neutral value throughout.
    pub fn fill_motion(&self, mut frames: Vec<FrameRecord>) -> (Vec<FrameRecord>, bool) {
        let positions: Vec<f64> = frames.iter().map(|f| f.frame_index as f64).collect();
        let scores: Vec<Option<f64>> = frames.iter().map(|f| f.motion_score).collect();

        let filled = fill_channel(&positions, &scores);
        let observed = filled.is_some();
        let filled = filled.unwrap_or_else(|| vec![self.neutral_fill; frames.len()]);

        for (frame, score) in frames.iter_mut().zip(filled) {
            frame.motion_score = Some(score);
        }
        (frames, observed)
    }
}

/// Fill one coordinate channel.
///
/// `positions` are the frame positions used as interpolation weights and must
/// be strictly increasing. Returns `None` when no value is present at all.
pub fn fill_channel(positions: &[f64], values: &[Option<f64>]) -> Option<Vec<f64>> {
    debug_assert_eq!(positions.len(), values.len());

    let mut present = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)));

    let (first_i, first_v) = present.next()?;

    // Leading gap holds the first observation.
    let mut out = vec![first_v; values.len()];
    let mut prev = (first_i, first_v);

    for (i, v) in present {
        let (pi, pv) = prev;
        let span = positions[i] - positions[pi];
        for k in pi + 1..i {
            let t = if span > 0.0 {
                (positions[k] - positions[pi]) / span
            } else {
                0.0
            };
            out[k] = pv + (v - pv) * t;
        }
        out[i] = v;
        prev = (i, v);
    }

    // Trailing gap holds the last observation.
    let (last_i, last_v) = prev;
    for slot in &mut out[last_i + 1..] {
        *slot = last_v;
    }

    Some(out)
}
