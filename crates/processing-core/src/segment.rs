//! Working-interval extraction.

use worktrace_frame_model::frame::{ClassifiedFrame, FrameIndex};
use worktrace_frame_model::metrics::ActivityInterval;

/// Lazy iterator over maximal working runs.
///
/// Consumes `(frame_index, is_working)` pairs in increasing frame order. A run
/// opens on the first working frame and closes (exclusive) on the next
/// non-working frame; a run still open at the end closes one past the last
/// frame. Clone the iterator, or build a new one, to restart.
#[derive(Debug, Clone)]
pub struct Intervals<I> {
    flags: I,
    open: Option<FrameIndex>,
    last: Option<FrameIndex>,
}

impl<I> Intervals<I>
where
    I: Iterator<Item = (FrameIndex, bool)>,
{
    pub fn new(flags: I) -> Self {
        Self {
            flags,
            open: None,
            last: None,
        }
    }
}

impl<I> Iterator for Intervals<I>
where
    I: Iterator<Item = (FrameIndex, bool)>,
{
    type Item = ActivityInterval;

    fn next(&mut self) -> Option<ActivityInterval> {
        for (frame_index, working) in self.flags.by_ref() {
            self.last = Some(frame_index);
            match (self.open, working) {
                (None, true) => self.open = Some(frame_index),
                (Some(start_frame), false) => {
                    debug_assert!(frame_index > start_frame, "frame indices must increase");
                    self.open = None;
                    return Some(ActivityInterval {
                        start_frame,
                        end_frame: frame_index,
                    });
                }
                _ => {}
            }
        }

        let start_frame = self.open.take()?;
        let last = self.last?;
        Some(ActivityInterval {
            start_frame,
            end_frame: last + 1,
        })
    }
}

/// Segment a classified sequence.
pub fn segment(
    frames: &[ClassifiedFrame],
) -> Intervals<impl Iterator<Item = (FrameIndex, bool)> + Clone + '_> {
    Intervals::new(frames.iter().map(|f| (f.frame_index(), f.is_working)))
}

/// Segment positional flags, treating slice positions as frame indices.
pub fn segment_flags(
    flags: &[bool],
) -> Intervals<impl Iterator<Item = (FrameIndex, bool)> + Clone + '_> {
    Intervals::new(flags.iter().enumerate().map(|(i, &w)| (i as FrameIndex, w)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_two_runs() {
        let flags = [false, false, true, true, true, false, true, false];
        let intervals: Vec<ActivityInterval> = segment_flags(&flags).collect();
        assert_eq!(
            intervals,
            vec![
                ActivityInterval {
                    start_frame: 2,
                    end_frame: 5
                },
                ActivityInterval {
                    start_frame: 6,
                    end_frame: 7
                },
            ]
        );
    }

    #[test]
    fn test_open_run_closes_past_last_frame() {
        let intervals: Vec<_> = segment_flags(&[false, true, true]).collect();
        assert_eq!(
            intervals,
            vec![ActivityInterval {
                start_frame: 1,
                end_frame: 3
            }]
        );
    }

    #[test]
    fn test_empty_and_idle_sequences() {
        assert_eq!(segment_flags(&[]).count(), 0);
        assert_eq!(segment_flags(&[false; 6]).count(), 0);
    }

    #[test]
    fn test_uses_frame_indices_not_positions() {
        let flags = vec![(10, true), (11, true), (15, false), (16, true)];
        let intervals: Vec<_> = Intervals::new(flags.into_iter()).collect();
        assert_eq!(
            intervals,
            vec![
                ActivityInterval {
                    start_frame: 10,
                    end_frame: 15
                },
                ActivityInterval {
                    start_frame: 16,
                    end_frame: 17
                },
            ]
        );
    }

    #[test]
    fn test_restart_by_clone() {
        let flags = [true, false, true];
        let intervals = segment_flags(&flags);
        let first: Vec<_> = intervals.clone().collect();
        let second: Vec<_> = intervals.collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    proptest! {
        #[test]
        fn intervals_cover_exactly_the_working_frames(
            flags in proptest::collection::vec(any::<bool>(), 0..200),
        ) {
            let intervals: Vec<ActivityInterval> = segment_flags(&flags).collect();

            let mut covered = vec![false; flags.len()];
            let mut prev_end = 0;
            for interval in &intervals {
                prop_assert!(interval.end_frame > interval.start_frame);
                prop_assert!(interval.start_frame >= prev_end);
                prev_end = interval.end_frame;
                for f in interval.start_frame..interval.end_frame {
                    let slot = &mut covered[f as usize];
                    prop_assert!(!*slot);
                    *slot = true;
                }
            }
            prop_assert_eq!(covered, flags);
        }
    }
}
