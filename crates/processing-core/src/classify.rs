//! Activity classification.
//!
//! A frame is *moving* when its smoothed exertion exceeds the movement
//! threshold. It is *working* when it is moving and an object of interest was
//! detected in any frame of the trailing grace window. Tools leave a
//! head-mounted camera's view constantly while the worker bends or
//! repositions, so presence is debounced rather than required per frame.

use std::collections::VecDeque;

use worktrace_common::AnalysisConfig;
use worktrace_frame_model::frame::{ClassifiedFrame, ScoredFrame};

/// Trailing window answering "was anything seen in the last N frames?".
#[derive(Debug, Clone)]
struct PresenceWindow {
    seen: VecDeque<bool>,
    capacity: usize,
    hits: usize,
}

impl PresenceWindow {
    fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            seen: VecDeque::with_capacity(capacity),
            capacity,
            hits: 0,
        }
    }

    fn push(&mut self, present: bool) -> bool {
        if self.seen.len() == self.capacity && self.seen.pop_back() == Some(true) {
            self.hits -= 1;
        }
        self.seen.push_front(present);
        if present {
            self.hits += 1;
        }
        self.hits > 0
    }
}

/// Thresholds a scored sequence into moving / working decisions.
#[derive(Debug, Clone, Copy)]
pub struct ActivityClassifier {
    movement_threshold: f64,
    grace_window: usize,
    require_objects: bool,
}

impl ActivityClassifier {
    /// Create a classifier.
    ///
    /// With `require_objects` false, object context is ignored and every
    /// moving frame counts as working.
    pub fn new(movement_threshold: f64, grace_window: usize, require_objects: bool) -> Self {
        Self {
            movement_threshold,
            grace_window: grace_window.max(1),
            require_objects,
        }
    }

    /// Create a classifier from analysis configuration.
    ///
    /// Uses the threshold of the configured exertion source; camera motion
    /// never waits on object context.
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(
            config.active_threshold(),
            config.grace_window(),
            config.objects_required(),
        )
    }

    pub fn movement_threshold(&self) -> f64 {
        self.movement_threshold
    }

    pub fn grace_window(&self) -> usize {
        self.grace_window
    }

    /// Classify a scored sequence in frame order.
    pub fn classify(&self, frames: Vec<ScoredFrame>) -> Vec<ClassifiedFrame> {
        let mut presence = PresenceWindow::with_capacity(self.grace_window);

        frames
            .into_iter()
            .map(|scored| {
                let is_moving = scored.smoothed_exertion > self.movement_threshold;
                let object_nearby = presence.push(scored.record.has_objects());
                let is_working = is_moving && (object_nearby || !self.require_objects);

                ClassifiedFrame {
                    scored,
                    is_moving,
                    object_nearby,
                    is_working,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use worktrace_common::ExertionSource;
    use worktrace_frame_model::frame::FrameRecord;

    fn scored(idx: u64, exertion: f64, labels: &[&str]) -> ScoredFrame {
        ScoredFrame {
            record: FrameRecord::new(
                idx,
                None,
                None,
                labels.iter().map(|s| s.to_string()).collect(),
            ),
            raw_displacement: exertion,
            smoothed_exertion: exertion,
        }
    }

    #[test]
    fn test_threshold_is_strict() {
        let classifier = ActivityClassifier::new(2.0, 5, true);
        let out = classifier.classify(vec![scored(1, 2.0, &["saw"]), scored(2, 2.01, &["saw"])]);
        assert!(!out[0].is_moving);
        assert!(out[1].is_moving);
        assert!(out[1].is_working);
    }

    #[test]
    fn test_grace_window_bridges_missing_objects() {
        let classifier = ActivityClassifier::new(1.0, 3, true);
        let frames = vec![
            scored(1, 5.0, &["hammer"]),
            scored(2, 5.0, &[]),
            scored(3, 5.0, &[]),
            scored(4, 5.0, &[]),
        ];
        let out = classifier.classify(frames);
        let working: Vec<bool> = out.iter().map(|f| f.is_working).collect();
        // Window of 3 ending at frame 4 covers frames 2..=4, none with objects.
        assert_eq!(working, vec![true, true, true, false]);
    }

    #[test]
    fn test_no_objects_means_never_working() {
        let classifier = ActivityClassifier::new(0.5, 25, true);
        let frames: Vec<ScoredFrame> = (1..=20).map(|i| scored(i, 50.0, &[])).collect();
        let out = classifier.classify(frames);
        assert!(out.iter().all(|f| f.is_moving));
        assert!(out.iter().all(|f| !f.object_nearby && !f.is_working));
    }

    #[test]
    fn test_object_context_can_be_disabled() {
        let classifier = ActivityClassifier::new(0.5, 25, false);
        let out = classifier.classify(vec![scored(1, 1.0, &[]), scored(2, 0.1, &[])]);
        assert!(out[0].is_working);
        assert!(!out[1].is_working);
    }

    #[test]
    fn test_from_config_uses_effective_windows() {
        let config = AnalysisConfig {
            analysis_fps: 4,
            movement_threshold: 3.0,
            ..Default::default()
        };
        let classifier = ActivityClassifier::from_config(&config);
        assert_eq!(classifier.grace_window(), 20);
        assert_eq!(classifier.movement_threshold(), 3.0);

        let camera = AnalysisConfig {
            exertion_source: ExertionSource::CameraMotion,
            ..config
        };
        let classifier = ActivityClassifier::from_config(&camera);
        assert_eq!(classifier.movement_threshold(), 2.0);
        let out = classifier.classify(vec![scored(1, 2.5, &[])]);
        assert!(out[0].is_working);
    }

    proptest! {
        #[test]
        fn working_implies_moving(
            samples in proptest::collection::vec((0.0f64..10.0, 0usize..3), 0..100),
            threshold in 0.0f64..10.0,
            grace in 1usize..30,
            require_objects in any::<bool>(),
        ) {
            let frames: Vec<ScoredFrame> = samples
                .iter()
                .enumerate()
                .map(|(i, &(e, n))| scored(i as u64 + 1, e, &vec!["tool"; n]))
                .collect();
            let classifier = ActivityClassifier::new(threshold, grace, require_objects);
            for frame in classifier.classify(frames) {
                prop_assert!(!frame.is_working || frame.is_moving);
                if require_objects {
                    prop_assert!(!frame.is_working || frame.object_nearby);
                }
            }
        }
    }
}
