//! Per-video metrics and the site rollup.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use worktrace_frame_model::frame::ClassifiedFrame;
use worktrace_frame_model::metrics::{
    round_to, LeaderboardEntry, PeakExertion, SiteRollup, VideoMetrics, UNKNOWN_TASK,
};

/// Most frequent token and its count.
///
/// Ties go to the token encountered first. Returns `None` for no tokens.
pub fn most_common<I, S>(tokens: I) -> Option<(String, usize)>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut tally: Vec<(String, usize)> = vec![];

    for token in tokens {
        let token = token.as_ref();
        match slots.get(token) {
            Some(&slot) => tally[slot].1 += 1,
            None => {
                slots.insert(token.to_string(), tally.len());
                tally.push((token.to_string(), 1));
            }
        }
    }

    let mut best: Option<(String, usize)> = None;
    for (token, count) in tally {
        if best.as_ref().map_or(true, |(_, c)| count > *c) {
            best = Some((token, count));
        }
    }
    best
}

/// Split detector labels into trimmed, non-empty tokens.
///
/// Some detectors report several classes in one comma-joined label.
pub fn label_tokens(labels: &[String]) -> impl Iterator<Item = &str> {
    labels
        .iter()
        .flat_map(|label| label.split(','))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// `100 * working / total` rounded to one decimal; 0 for an empty video.
pub fn productivity_pct(working_frames: usize, total_frames: usize) -> f64 {
    if total_frames == 0 {
        return 0.0;
    }
    round_to(100.0 * working_frames as f64 / total_frames as f64, 1)
}

/// Reduce a classified sequence to its metrics.
pub fn video_metrics(video_id: impl Into<String>, frames: &[ClassifiedFrame]) -> VideoMetrics {
    let total_frames = frames.len();
    let working_frames = frames.iter().filter(|f| f.is_working).count();

    let peak_exertion = frames
        .iter()
        .map(ClassifiedFrame::smoothed_exertion)
        .fold(0.0_f64, f64::max);

    let dominant_task = most_common(
        frames
            .iter()
            .filter(|f| f.is_working)
            .flat_map(|f| label_tokens(f.object_labels())),
    )
    .map(|(label, _)| label)
    .unwrap_or_else(|| UNKNOWN_TASK.to_string());

    VideoMetrics {
        video_id: video_id.into(),
        total_frames,
        working_frames,
        productivity_pct: productivity_pct(working_frames, total_frames),
        peak_exertion: round_to(peak_exertion, 2),
        dominant_task,
    }
}

/// Accumulates finished videos for the site rollup.
///
/// Keyed by video id: re-adding a video replaces its earlier metrics, and the
/// reduction always walks videos in id order, so neither duplicates nor
/// completion order change the result.
#[derive(Debug, Clone, Default)]
pub struct SiteRollupBuilder {
    videos: BTreeMap<String, VideoMetrics>,
}

impl SiteRollupBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one video's metrics, returning any metrics it replaced.
    pub fn insert(&mut self, metrics: VideoMetrics) -> Option<VideoMetrics> {
        self.videos.insert(metrics.video_id.clone(), metrics)
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    /// Metrics in video id order.
    pub fn videos(&self) -> impl Iterator<Item = &VideoMetrics> {
        self.videos.values()
    }

    /// Reduce the collected metrics.
    pub fn build(&self) -> SiteRollup {
        let video_count = self.videos.len();

        let mean_productivity_pct = if video_count == 0 {
            0.0
        } else {
            let sum: f64 = self.videos.values().map(|m| m.productivity_pct).sum();
            round_to(sum / video_count as f64, 1)
        };

        let mut peak: Option<PeakExertion> = None;
        for m in self.videos.values() {
            if peak
                .as_ref()
                .map_or(true, |p| m.peak_exertion > p.peak_exertion)
            {
                peak = Some(PeakExertion {
                    video_id: m.video_id.clone(),
                    peak_exertion: m.peak_exertion,
                });
            }
        }

        let mut task_distribution: BTreeMap<String, usize> = BTreeMap::new();
        for m in self.videos.values() {
            *task_distribution.entry(m.dominant_task.clone()).or_default() += 1;
        }
        let distinct_tasks = self
            .videos
            .values()
            .map(|m| m.dominant_task.as_str())
            .collect::<BTreeSet<_>>()
            .len();

        let mut leaderboard: Vec<LeaderboardEntry> = self
            .videos
            .values()
            .map(|m| LeaderboardEntry {
                video_id: m.video_id.clone(),
                productivity_pct: m.productivity_pct,
                dominant_task: m.dominant_task.clone(),
            })
            .collect();
        leaderboard.sort_by(|a, b| {
            b.productivity_pct
                .total_cmp(&a.productivity_pct)
                .then_with(|| a.video_id.cmp(&b.video_id))
        });

        SiteRollup {
            video_count,
            mean_productivity_pct,
            peak,
            distinct_tasks,
            task_distribution,
            leaderboard,
        }
    }
}

impl Extend<VideoMetrics> for SiteRollupBuilder {
    fn extend<T: IntoIterator<Item = VideoMetrics>>(&mut self, iter: T) {
        for metrics in iter {
            self.insert(metrics);
        }
    }
}

impl FromIterator<VideoMetrics> for SiteRollupBuilder {
    fn from_iter<T: IntoIterator<Item = VideoMetrics>>(iter: T) -> Self {
        let mut builder = Self::new();
        builder.extend(iter);
        builder
    }
}

/// Roll up a set of finished videos.
pub fn site_rollup<I>(metrics: I) -> SiteRollup
where
    I: IntoIterator<Item = VideoMetrics>,
{
    metrics.into_iter().collect::<SiteRollupBuilder>().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use worktrace_frame_model::frame::{FrameRecord, ScoredFrame};

    fn classified(idx: u64, exertion: f64, working: bool, labels: &[&str]) -> ClassifiedFrame {
        ClassifiedFrame {
            scored: ScoredFrame {
                record: FrameRecord::new(
                    idx,
                    None,
                    None,
                    labels.iter().map(|s| s.to_string()).collect(),
                ),
                raw_displacement: exertion,
                smoothed_exertion: exertion,
            },
            is_moving: working,
            object_nearby: working,
            is_working: working,
        }
    }

    fn metrics(id: &str, pct: f64, peak: f64, task: &str) -> VideoMetrics {
        VideoMetrics {
            video_id: id.to_string(),
            total_frames: 100,
            working_frames: pct as usize,
            productivity_pct: pct,
            peak_exertion: peak,
            dominant_task: task.to_string(),
        }
    }

    #[test]
    fn test_most_common_first_seen_breaks_ties() {
        assert_eq!(
            most_common(["saw", "drill", "drill", "saw"]),
            Some(("saw".to_string(), 2))
        );
        assert_eq!(
            most_common(["saw", "drill", "drill"]),
            Some(("drill".to_string(), 2))
        );
        assert_eq!(most_common(Vec::<String>::new()), None);
    }

    #[test]
    fn test_label_tokens_split_and_trim() {
        let labels = vec![
            "hammer, nail".to_string(),
            " ".to_string(),
            "Hammer".to_string(),
        ];
        let tokens: Vec<&str> = label_tokens(&labels).collect();
        assert_eq!(tokens, vec!["hammer", "nail", "Hammer"]);
    }

    #[test]
    fn test_productivity_rounding() {
        assert_eq!(productivity_pct(37, 100), 37.0);
        assert_eq!(productivity_pct(1, 3), 33.3);
        assert_eq!(productivity_pct(0, 0), 0.0);
        assert_eq!(productivity_pct(5, 5), 100.0);
        // 12.25 exactly; ties go to the even digit.
        assert_eq!(productivity_pct(49, 400), 12.2);
    }

    #[test]
    fn test_video_metrics_counts_only_working_labels() {
        let frames = vec![
            classified(1, 1.234, false, &["ladder", "ladder"]),
            classified(2, 7.896, true, &["drill"]),
            classified(3, 4.0, true, &["drill, ladder"]),
            classified(4, 0.0, false, &[]),
        ];
        let m = video_metrics("cam-03", &frames);
        assert_eq!(m.total_frames, 4);
        assert_eq!(m.working_frames, 2);
        assert_eq!(m.productivity_pct, 50.0);
        assert_eq!(m.peak_exertion, 7.9);
        assert_eq!(m.dominant_task, "drill");
    }

    #[test]
    fn test_video_metrics_without_objects_is_unknown() {
        let frames: Vec<_> = (1..=10).map(|i| classified(i, 9.0, false, &[])).collect();
        let m = video_metrics("cam-04", &frames);
        assert_eq!(m.dominant_task, UNKNOWN_TASK);
        assert_eq!(m.working_frames, 0);
        assert_eq!(m.productivity_pct, 0.0);
    }

    #[test]
    fn test_empty_video_metrics() {
        let m = video_metrics("cam-05", &[]);
        assert_eq!(m, VideoMetrics::empty("cam-05"));
    }

    #[test]
    fn test_rollup_reduces_metrics() {
        let rollup = site_rollup(vec![
            metrics("b", 40.0, 12.5, "drill"),
            metrics("a", 60.0, 30.25, "brick"),
            metrics("c", 20.0, 30.25, "drill"),
        ]);
        assert_eq!(rollup.video_count, 3);
        assert_eq!(rollup.mean_productivity_pct, 40.0);
        assert_eq!(
            rollup.peak,
            Some(PeakExertion {
                video_id: "a".to_string(),
                peak_exertion: 30.25
            })
        );
        assert_eq!(rollup.distinct_tasks, 2);
        assert_eq!(rollup.task_distribution["drill"], 2);
        let order: Vec<&str> = rollup.leaderboard.iter().map(|e| e.video_id.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_rollup_of_nothing() {
        let rollup = SiteRollupBuilder::new().build();
        assert_eq!(rollup.video_count, 0);
        assert_eq!(rollup.mean_productivity_pct, 0.0);
        assert!(rollup.peak.is_none());
        assert_eq!(rollup.distinct_tasks, 0);
    }

    #[test]
    fn test_reinserting_a_video_replaces_it() {
        let mut builder = SiteRollupBuilder::new();
        assert!(builder.insert(metrics("a", 10.0, 1.0, "saw")).is_none());
        assert!(builder.insert(metrics("a", 10.0, 1.0, "saw")).is_some());
        assert_eq!(builder.len(), 1);
        assert_eq!(builder.build().video_count, 1);
    }

    fn metrics_set() -> impl Strategy<Value = Vec<VideoMetrics>> {
        proptest::collection::vec(
            (0u32..1000, 0.0f64..50.0, prop_oneof!["drill", "saw", "brick", "unknown"]),
            0..12,
        )
        .prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (pct, peak, task))| {
                    metrics(&format!("video-{i:02}"), pct as f64 / 10.0, round_to(peak, 2), &task)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn rollup_ignores_order_and_duplicates(videos in metrics_set(), seed in any::<u64>()) {
            let forward = site_rollup(videos.clone());

            let mut shuffled = videos.clone();
            let len = shuffled.len().max(1) as u64;
            shuffled.rotate_left((seed % len) as usize);
            shuffled.reverse();
            shuffled.extend(videos.iter().cloned());

            prop_assert_eq!(site_rollup(shuffled), forward);
        }

        #[test]
        fn productivity_stays_in_range(working in 0usize..10_000, extra in 0usize..10_000) {
            let pct = productivity_pct(working, working + extra);
            prop_assert!((0.0..=100.0).contains(&pct));
        }
    }
}
