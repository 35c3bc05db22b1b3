//! Application configuration.
//!
//! Analysis thresholds were hand-tuned per deployment, so every knob that
//! changes a classification lives here rather than in a constant.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{WorktraceError, WorktraceResult};

/// Accepted range for the movement and motion thresholds.
pub const MOVEMENT_THRESHOLD_RANGE: (f64, f64) = (0.0, 1000.0);

/// Accepted range for the analysis frame rate.
pub const ANALYSIS_FPS_RANGE: (u32, u32) = (1, 240);

/// Upper bound for the smoothing window (analyzed frames).
pub const MAX_SMOOTHING_WINDOW: usize = 10_000;

/// Upper bound for the object grace window (analyzed frames).
pub const MAX_GRACE_WINDOW: usize = 100_000;

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Exertion and activity classification settings.
    pub analysis: AnalysisConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// What to do with a detector record that fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedFramePolicy {
    /// Reject the single frame and keep processing the video.
    #[default]
    DropFrame,
    /// Abort the whole video.
    FailVideo,
}

/// Signal the exertion score is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExertionSource {
    /// Displacement of the tracked hand keypoints.
    #[default]
    Keypoints,
    /// Per-frame global camera motion reported by the detector. A head-mounted
    /// camera shakes with the wearer's body, so motion alone marks work.
    CameraMotion,
}

/// Parameters of the exertion pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Frames per second actually analyzed (after subsampling).
    pub analysis_fps: u32,

    /// Smoothed exertion must exceed this to count as moving.
    ///
    /// Lower values catch subtle tool use but let camera shake alone
    /// register as movement.
    pub movement_threshold: f64,

    /// Which per-frame signal is smoothed into exertion.
    pub exertion_source: ExertionSource,

    /// Smoothed camera motion must exceed this to count as working
    /// (mean absolute pixel difference between analyzed frames).
    pub motion_threshold: f64,

    /// Trailing smoothing window. Defaults to one second of analyzed frames.
    pub smoothing_window_frames: Option<usize>,

    /// Trailing object grace window. Defaults to five seconds of analyzed frames.
    pub grace_window_frames: Option<usize>,

    /// Require object presence for a frame to count as working.
    /// Disable when no object detector is available.
    pub require_objects: bool,

    /// Coordinate the detector reports for an undetected keypoint.
    /// `None` disables sentinel matching.
    pub absent_sentinel: Option<[f64; 2]>,

    /// Value used for a coordinate channel that is never observed.
    pub neutral_fill: f64,

    /// Handling of malformed detector records.
    pub malformed_policy: MalformedFramePolicy,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "worktrace=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            analysis_fps: 5,
            movement_threshold: 1.5,
            exertion_source: ExertionSource::Keypoints,
            motion_threshold: 2.0,
            smoothing_window_frames: None,
            grace_window_frames: None,
            require_objects: true,
            absent_sentinel: Some([0.0, 0.0]),
            neutral_fill: 0.0,
            malformed_policy: MalformedFramePolicy::DropFrame,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AnalysisConfig {
    /// Effective smoothing window in analyzed frames (~1 second).
    pub fn smoothing_window(&self) -> usize {
        self.smoothing_window_frames
            .unwrap_or(self.analysis_fps as usize)
            .max(1)
    }

    /// Effective object grace window in analyzed frames (~5 seconds).
    pub fn grace_window(&self) -> usize {
        self.grace_window_frames
            .unwrap_or(self.analysis_fps as usize * 5)
            .max(1)
    }

    /// Threshold applied to smoothed exertion for the configured source.
    pub fn active_threshold(&self) -> f64 {
        match self.exertion_source {
            ExertionSource::Keypoints => self.movement_threshold,
            ExertionSource::CameraMotion => self.motion_threshold,
        }
    }

    /// Whether a working frame also needs an object in the grace window.
    ///
    /// Camera motion is judged on its own.
    pub fn objects_required(&self) -> bool {
        self.require_objects && self.exertion_source == ExertionSource::Keypoints
    }

    /// Check every knob against its accepted range.
    pub fn validate(&self) -> WorktraceResult<()> {
        let (fps_min, fps_max) = ANALYSIS_FPS_RANGE;
        if !(fps_min..=fps_max).contains(&self.analysis_fps) {
            return Err(WorktraceError::config(format!(
                "analysis_fps {} outside [{fps_min}, {fps_max}]",
                self.analysis_fps
            )));
        }

        check_threshold("movement_threshold", self.movement_threshold)?;
        check_threshold("motion_threshold", self.motion_threshold)?;

        check_window(
            "smoothing_window_frames",
            self.smoothing_window_frames,
            MAX_SMOOTHING_WINDOW,
        )?;
        check_window(
            "grace_window_frames",
            self.grace_window_frames,
            MAX_GRACE_WINDOW,
        )?;

        if !self.neutral_fill.is_finite() {
            return Err(WorktraceError::config("neutral_fill must be finite"));
        }
        if let Some([x, y]) = self.absent_sentinel {
            if !x.is_finite() || !y.is_finite() {
                return Err(WorktraceError::config("absent_sentinel must be finite"));
            }
        }

        Ok(())
    }
}

fn check_threshold(name: &str, value: f64) -> WorktraceResult<()> {
    let (min, max) = MOVEMENT_THRESHOLD_RANGE;
    if !value.is_finite() || value < min || value > max {
        return Err(WorktraceError::config(format!(
            "{name} {value} outside [{min}, {max}]"
        )));
    }
    Ok(())
}

fn check_window(name: &str, value: Option<usize>, max: usize) -> WorktraceResult<()> {
    match value {
        Some(v) if v == 0 || v > max => Err(WorktraceError::config(format!(
            "{name} {v} outside [1, {max}]"
        ))),
        _ => Ok(()),
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<PathBuf, std::io::Error> {
        let config_path = config_file_path();
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Save config to an explicit path, creating parent directories.
    pub fn save_to(&self, config_path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("worktrace").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_windows_follow_analysis_fps() {
        let config = AnalysisConfig::default();
        assert_eq!(config.smoothing_window(), 5);
        assert_eq!(config.grace_window(), 25);

        let config = AnalysisConfig {
            analysis_fps: 30,
            ..Default::default()
        };
        assert_eq!(config.smoothing_window(), 30);
        assert_eq!(config.grace_window(), 150);
    }

    #[test]
    fn test_explicit_windows_override_fps() {
        let config = AnalysisConfig {
            smoothing_window_frames: Some(2),
            grace_window_frames: Some(7),
            ..Default::default()
        };
        assert_eq!(config.smoothing_window(), 2);
        assert_eq!(config.grace_window(), 7);
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let bad_threshold = AnalysisConfig {
            movement_threshold: -1.0,
            ..Default::default()
        };
        assert!(bad_threshold.validate().is_err());

        let nan_threshold = AnalysisConfig {
            movement_threshold: f64::NAN,
            ..Default::default()
        };
        assert!(nan_threshold.validate().is_err());

        let zero_window = AnalysisConfig {
            smoothing_window_frames: Some(0),
            ..Default::default()
        };
        assert!(zero_window.validate().is_err());

        let zero_fps = AnalysisConfig {
            analysis_fps: 0,
            ..Default::default()
        };
        assert!(zero_fps.validate().is_err());

        let bad_motion = AnalysisConfig {
            motion_threshold: f64::INFINITY,
            ..Default::default()
        };
        assert!(bad_motion.validate().is_err());
    }

    #[test]
    fn test_camera_motion_uses_its_own_threshold_without_objects() {
        let keypoints = AnalysisConfig::default();
        assert_eq!(keypoints.active_threshold(), 1.5);
        assert!(keypoints.objects_required());

        let camera: AnalysisConfig =
            serde_json::from_str(r#"{"exertion_source":"camera_motion"}"#).unwrap();
        assert_eq!(camera.exertion_source, ExertionSource::CameraMotion);
        assert_eq!(camera.active_threshold(), 2.0);
        assert!(!camera.objects_required());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"analysis":{"movement_threshold":5.0}}"#).unwrap();
        assert_eq!(config.analysis.movement_threshold, 5.0);
        assert_eq!(config.analysis.analysis_fps, 5);
        assert_eq!(config.analysis.absent_sentinel, Some([0.0, 0.0]));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_policy_serializes_snake_case() {
        let json = serde_json::to_string(&MalformedFramePolicy::FailVideo).unwrap();
        assert_eq!(json, "\"fail_video\"");
    }

    #[test]
    fn test_load_from_missing_path_uses_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/worktrace/config.json"));
        assert_eq!(config.analysis, AnalysisConfig::default());
    }

    #[test]
    fn test_save_to_then_load_from() {
        let dir = std::env::temp_dir().join(format!("worktrace-config-{}", std::process::id()));
        let path = dir.join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.analysis.movement_threshold = 4.25;
        config.analysis.grace_window_frames = Some(12);
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.analysis, config.analysis);

        std::fs::remove_dir_all(&dir).ok();
    }
}
