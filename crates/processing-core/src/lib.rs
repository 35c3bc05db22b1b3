//! Worktrace Processing Core: the exertion pipeline
//!
//! Turns per-frame detector records into activity decisions and metrics:
//! - **Gap filling:** Interpolate keypoints lost to occlusion
//! - **Exertion scoring:** Displacement per frame and a causal moving average
//! - **Classification:** Movement threshold fused with debounced object presence
//! - **Segmentation:** Contiguous working intervals
//! - **Aggregation:** Per-video metrics and the site rollup
//!
//! This crate is pure computation with no I/O. Inputs and outputs are data.

pub mod aggregate;
pub mod classify;
pub mod exertion;
pub mod gap_fill;
pub mod pipeline;
pub mod segment;

pub use aggregate::{most_common, site_rollup, video_metrics, SiteRollupBuilder};
pub use classify::ActivityClassifier;
pub use exertion::{ExertionScorer, RollingMean};
pub use gap_fill::GapFiller;
pub use pipeline::{analyze_video, PipelineCondition, PipelineRun, VideoAnalysis};
pub use segment::{segment, Intervals};
