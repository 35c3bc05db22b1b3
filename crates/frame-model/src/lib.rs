//! Worktrace Frame Model
//!
//! Defines the data contracts of the exertion pipeline:
//! - **Detections:** Raw per-frame detector output (keypoints + object labels)
//! - **Frames:** Canonical frame records and their scored / classified forms
//! - **Metrics:** Activity intervals, per-video metrics, and the site rollup
//!
//! Coordinates are in source pixel space. An undetected keypoint is
//! represented as `None`, never as a zero coordinate.

pub mod frame;
pub mod metrics;

pub use frame::*;
pub use metrics::*;
