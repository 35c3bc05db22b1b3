//! One video's pipeline run.
//!
//! A [`PipelineRun`] is built from an explicit [`AnalysisConfig`], collects the
//! video's frames, and on [`PipelineRun::finish`] runs the sequential stages:
//!
//! 1. **Gap fill** the tracked points (or, in camera-motion mode, the motion
//!    scores) over the whole sequence.
//! 2. **Score** raw and smoothed exertion.
//! 3. **Classify** moving / working frames.
//! 4. **Segment** working intervals.
//! 5. **Aggregate** the video's metrics.
//!
//! Degenerate sequences (empty, never-observed points) produce well-defined
//! output plus a [`PipelineCondition`]; only malformed frames under the
//! `fail_video` policy produce an error.

use serde::{Deserialize, Serialize};
use worktrace_common::{
    AnalysisConfig, DetectionFault, ExertionSource, MalformedFramePolicy, WorktraceError,
    WorktraceResult,
};
use worktrace_frame_model::frame::{ClassifiedFrame, FrameRecord, RawDetection, TrackedPoint};
use worktrace_frame_model::metrics::{ActivityInterval, VideoMetrics};

use crate::aggregate::video_metrics;
use crate::classify::ActivityClassifier;
use crate::exertion::ExertionScorer;
use crate::gap_fill::GapFiller;
use crate::segment::segment;

/// A structured, non-fatal condition observed during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "condition", rename_all = "snake_case")]
pub enum PipelineCondition {
    /// A detector record was rejected and dropped.
    MalformedDetection {
        frame_index: u64,
        fault: DetectionFault,
    },
    /// The video had no frames; metrics are all zero.
    EmptySequence,
    /// A tracked point was never observed and was filled with the neutral value.
    AllAbsentChannel { point: TrackedPoint },
    /// Camera-motion mode, but no frame carried a motion score.
    MotionScoreUnavailable,
}

/// Everything a run produces for one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoAnalysis {
    pub video_id: String,
    pub frames: Vec<ClassifiedFrame>,
    pub intervals: Vec<ActivityInterval>,
    pub metrics: VideoMetrics,
    pub conditions: Vec<PipelineCondition>,
}

impl VideoAnalysis {
    /// Number of frames dropped as malformed.
    pub fn dropped_frames(&self) -> usize {
        self.conditions
            .iter()
            .filter(|c| matches!(c, PipelineCondition::MalformedDetection { .. }))
            .count()
    }

    /// Whether the result is degraded (dropped frames or never-observed points).
    pub fn is_degraded(&self) -> bool {
        !self.conditions.is_empty()
    }
}

/// Collects and analyzes the frames of a single video.
#[derive(Debug)]
pub struct PipelineRun {
    video_id: String,
    config: AnalysisConfig,
    frames: Vec<FrameRecord>,
    conditions: Vec<PipelineCondition>,
}

impl PipelineRun {
    /// Start a run. Fails if the configuration is out of range.
    pub fn new(video_id: impl Into<String>, config: &AnalysisConfig) -> WorktraceResult<Self> {
        config.validate()?;
        let video_id = video_id.into();
        tracing::debug!(
            video_id = %video_id,
            source = ?config.exertion_source,
            threshold = config.active_threshold(),
            window = config.smoothing_window(),
            grace = config.grace_window(),
            "Starting pipeline run"
        );
        Ok(Self {
            video_id,
            config: config.clone(),
            frames: vec![],
            conditions: vec![],
        })
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    /// Frames accepted so far.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Conditions recorded while ingesting.
    pub fn conditions(&self) -> &[PipelineCondition] {
        &self.conditions
    }

    /// Normalize and add one detector record.
    ///
    /// Malformed records are dropped or returned as an error according to
    /// the configured policy.
    pub fn ingest(&mut self, raw: RawDetection) -> WorktraceResult<()> {
        let record = FrameRecord::from_detection(raw, self.config.absent_sentinel);
        self.accept(record)
    }

    /// Add an already-built record.
    pub fn push_record(&mut self, record: FrameRecord) -> WorktraceResult<()> {
        let checked = record.validate().map(|()| record);
        self.accept(checked)
    }

    /// Ingest every record of an iterator, stopping at the first fatal error.
    pub fn ingest_all<I>(&mut self, detections: I) -> WorktraceResult<()>
    where
        I: IntoIterator<Item = RawDetection>,
    {
        detections.into_iter().try_for_each(|raw| self.ingest(raw))
    }

    fn accept(&mut self, record: WorktraceResult<FrameRecord>) -> WorktraceResult<()> {
        match record.and_then(|r| self.check_order(r)) {
            Ok(record) => {
                self.frames.push(record);
                Ok(())
            }
            Err(WorktraceError::MalformedDetection { frame_index, fault })
                if self.config.malformed_policy == MalformedFramePolicy::DropFrame =>
            {
                tracing::warn!(
                    video_id = %self.video_id,
                    frame_index,
                    %fault,
                    "Dropping malformed frame"
                );
                self.conditions
                    .push(PipelineCondition::MalformedDetection { frame_index, fault });
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn check_order(&self, record: FrameRecord) -> WorktraceResult<FrameRecord> {
        match self.frames.last() {
            Some(prev) if record.frame_index <= prev.frame_index => Err(WorktraceError::malformed(
                record.frame_index,
                DetectionFault::NonMonotonicIndex {
                    previous: prev.frame_index,
                },
            )),
            _ => Ok(record),
        }
    }

    /// Run every stage over the collected frames.
    pub fn finish(self) -> VideoAnalysis {
        let Self {
            video_id,
            config,
            frames,
            mut conditions,
        } = self;

        if frames.is_empty() {
            tracing::warn!(video_id = %video_id, "No frames to analyze");
            conditions.push(PipelineCondition::EmptySequence);
            return VideoAnalysis {
                metrics: VideoMetrics::empty(video_id.clone()),
                video_id,
                frames: vec![],
                intervals: vec![],
                conditions,
            };
        }

        let filler = GapFiller::new(config.neutral_fill);
        let scorer = ExertionScorer::new(config.smoothing_window());

        let scored = match config.exertion_source {
            ExertionSource::Keypoints => {
                let filled = filler.fill(frames);
                for point in filled.all_absent {
                    tracing::warn!(
                        video_id = %video_id,
                        %point,
                        "Tracked point never observed; using neutral fill"
                    );
                    conditions.push(PipelineCondition::AllAbsentChannel { point });
                }
                scorer.score(filled.frames)
            }
            ExertionSource::CameraMotion => {
                let (frames, observed) = filler.fill_motion(frames);
                if !observed {
                    tracing::warn!(
                        video_id = %video_id,
                        "No motion scores in camera-motion mode; using neutral fill"
                    );
                    conditions.push(PipelineCondition::MotionScoreUnavailable);
                }
                scorer.score_motion(frames)
            }
        };

        let classified = ActivityClassifier::from_config(&config).classify(scored);
        let intervals: Vec<ActivityInterval> = segment(&classified).collect();
        let metrics = video_metrics(video_id.clone(), &classified);

        tracing::debug!(
            video_id = %video_id,
            frames = metrics.total_frames,
            working = metrics.working_frames,
            intervals = intervals.len(),
            "Pipeline run finished"
        );

        VideoAnalysis {
            video_id,
            frames: classified,
            intervals,
            metrics,
            conditions,
        }
    }
}

/// Run the whole pipeline over one video's detector output.
pub fn analyze_video<I>(
    video_id: impl Into<String>,
    detections: I,
    config: &AnalysisConfig,
) -> WorktraceResult<VideoAnalysis>
where
    I: IntoIterator<Item = RawDetection>,
{
    let mut run = PipelineRun::new(video_id, config)?;
    run.ingest_all(detections)?;
    Ok(run.finish())
}
