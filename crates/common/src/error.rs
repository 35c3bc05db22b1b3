//! Error types shared across Worktrace crates.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level error type for Worktrace operations.
#[derive(Debug, thiserror::Error)]
pub enum WorktraceError {
    #[error("Malformed detection at frame {frame_index}: {fault}")]
    MalformedDetection {
        frame_index: u64,
        fault: DetectionFault,
    },

    #[error("Processing error: {message}")]
    Processing { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Cancelled: {message}")]
    Cancelled { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Why a single detector record was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectionFault {
    #[error("object_count {object_count} does not match {label_count} object labels")]
    LabelCountMismatch {
        object_count: usize,
        label_count: usize,
    },

    #[error("frame index must be positive")]
    ZeroFrameIndex,

    #[error("frame index does not follow previous frame {previous}")]
    NonMonotonicIndex { previous: u64 },

    #[error("motion score must be finite and non-negative")]
    InvalidMotionScore,
}

/// Result type alias using WorktraceError.
pub type WorktraceResult<T> = Result<T, WorktraceError>;

impl WorktraceError {
    pub fn malformed(frame_index: u64, fault: DetectionFault) -> Self {
        Self::MalformedDetection { frame_index, fault }
    }

    pub fn processing(msg: impl Into<String>) -> Self {
        Self::Processing {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled {
            message: msg.into(),
        }
    }

    /// The detection fault carried by this error, if it is a per-frame rejection.
    pub fn detection_fault(&self) -> Option<(u64, &DetectionFault)> {
        match self {
            Self::MalformedDetection { frame_index, fault } => Some((*frame_index, fault)),
            _ => None,
        }
    }
}
