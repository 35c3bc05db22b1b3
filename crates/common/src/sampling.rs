//! Frame subsampling from the source frame rate to the analysis rate.
//!
//! Detectors are expensive, so only every `frame_skip`-th source frame is
//! analyzed. Kept frames are renumbered 1, 2, 3, ... so that windows
//! expressed in analyzed frames keep a fixed meaning in seconds.

/// Decides which source frames are analyzed and assigns analysis indices.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    frame_skip: u64,
    analyzed: u64,
}

impl FrameSampler {
    /// Create a sampler for a `source_fps` video analyzed at `analysis_fps`.
    pub fn new(source_fps: u32, analysis_fps: u32) -> Self {
        let skip = if analysis_fps == 0 {
            1
        } else {
            (source_fps / analysis_fps).max(1)
        };
        Self {
            frame_skip: skip as u64,
            analyzed: 0,
        }
    }

    /// Offer a 1-based source frame number.
    ///
    /// Returns the analysis index for kept frames, `None` for skipped ones.
    pub fn sample(&mut self, source_frame: u64) -> Option<u64> {
        if source_frame == 0 || source_frame % self.frame_skip != 0 {
            return None;
        }
        self.analyzed += 1;
        Some(self.analyzed)
    }

    /// Source frames advanced per analyzed frame.
    pub fn frame_skip(&self) -> u64 {
        self.frame_skip
    }

    /// Number of frames kept so far.
    pub fn analyzed(&self) -> u64 {
        self.analyzed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thirty_fps_at_five_keeps_every_sixth() {
        let mut sampler = FrameSampler::new(30, 5);
        assert_eq!(sampler.frame_skip(), 6);

        let kept: Vec<(u64, u64)> = (1..=18)
            .filter_map(|f| sampler.sample(f).map(|idx| (f, idx)))
            .collect();
        assert_eq!(kept, vec![(6, 1), (12, 2), (18, 3)]);
        assert_eq!(sampler.analyzed(), 3);
    }

    #[test]
    fn test_slow_source_is_never_upsampled() {
        let mut sampler = FrameSampler::new(3, 5);
        assert_eq!(sampler.frame_skip(), 1);
        assert_eq!(sampler.sample(1), Some(1));
        assert_eq!(sampler.sample(2), Some(2));
    }
}
