// Core types shared by the codec, comparator and comparison engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Width and height of a decoded image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total number of pixels
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Outcome of a single comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonStatus {
    /// No baseline existed; the screenshot was stored as the reference
    New,
    /// Difference within the threshold
    Passed,
    /// See [`FailureReason`]
    Failed,
}

impl ComparisonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonStatus::New => "new",
            ComparisonStatus::Passed => "passed",
            ComparisonStatus::Failed => "failed",
        }
    }
}

/// Why a comparison failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// Baseline and screenshot have different sizes; no diff image is produced
    DimensionMismatch {
        baseline: Dimensions,
        current: Dimensions,
    },

    /// Too many pixels differ
    ThresholdExceeded { diff_percentage: f64, threshold: f64 },

    /// Baseline or screenshot bytes could not be decoded
    DecodeError { message: String },
}

impl FailureReason {
    /// Wire name of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            FailureReason::DimensionMismatch { .. } => "dimension_mismatch",
            FailureReason::ThresholdExceeded { .. } => "threshold_exceeded",
            FailureReason::DecodeError { .. } => "decode_error",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::DimensionMismatch { baseline, current } => write!(
                f,
                "Dimension mismatch (baseline: {}, current: {})",
                baseline, current
            ),
            FailureReason::ThresholdExceeded {
                diff_percentage,
                threshold,
            } => write!(
                f,
                "Difference {:.3}% exceeds threshold {}%",
                diff_percentage, threshold
            ),
            FailureReason::DecodeError { message } => write!(f, "Decode error: {}", message),
        }
    }
}

/// Result record for one comparison request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Screenshot name
    pub name: String,

    /// Outcome classification
    pub status: ComparisonStatus,

    /// Failure details when `status` is `Failed`
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reason: Option<FailureReason>,

    /// Percentage of differing pixels, when it could be computed
    pub diff_percentage: Option<f64>,

    /// Threshold the comparison was judged against
    pub threshold: f64,

    /// Artifacts written by this comparison
    pub artifacts: Vec<PathBuf>,

    /// When the comparison finished
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
}

impl ComparisonResult {
    pub(crate) fn new(name: &str, status: ComparisonStatus, threshold: f64) -> Self {
        Self {
            name: name.to_string(),
            status,
            reason: None,
            diff_percentage: None,
            threshold,
            artifacts: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub(crate) fn failed(name: &str, reason: FailureReason, threshold: f64) -> Self {
        let mut result = Self::new(name, ComparisonStatus::Failed, threshold);
        if let FailureReason::ThresholdExceeded { diff_percentage, .. } = &reason {
            result.diff_percentage = Some(*diff_percentage);
        }
        result.reason = Some(reason);
        result
    }

    pub(crate) fn with_artifact(mut self, path: &Path) -> Self {
        self.artifacts.push(path.to_path_buf());
        self
    }

    /// True for `New` and `Passed`
    pub fn is_ok(&self) -> bool {
        self.status != ComparisonStatus::Failed
    }
}

/// Result type for visual baseline operations
pub type VisualResult<T> = Result<T, VisualError>;

/// Error types for visual baseline operations
///
/// Only infrastructure problems live here. Visual outcomes (new baseline,
/// threshold exceeded, nothing to approve) are returned as values.
#[derive(Debug)]
pub enum VisualError {
    /// Malformed image bytes
    Decode(String),

    /// Image encoding failed
    Encode(String),

    /// Screenshot name cannot be mapped onto artifact files
    InvalidName(String),

    /// Filesystem failure while reading or writing an artifact
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl VisualError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        VisualError::Io {
            path: path.into(),
            source,
        }
    }
}

impl std::fmt::Display for VisualError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VisualError::Decode(msg) => write!(f, "Decode error: {}", msg),
            VisualError::Encode(msg) => write!(f, "Encode error: {}", msg),
            VisualError::InvalidName(name) => write!(f, "Invalid screenshot name: '{}'", name),
            VisualError::Io { path, source } => {
                write!(f, "Artifact I/O error at {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for VisualError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VisualError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_result_serializes_reason_kind() {
        let result = ComparisonResult::failed(
            "home",
            FailureReason::ThresholdExceeded {
                diff_percentage: 2.5,
                threshold: 0.5,
            },
            0.5,
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"]["kind"], "threshold_exceeded");
        assert_eq!(json["diff_percentage"], 2.5);
    }

    #[test]
    fn test_dimension_mismatch_display() {
        let reason = FailureReason::DimensionMismatch {
            baseline: Dimensions::new(100, 100),
            current: Dimensions::new(101, 100),
        };
        assert_eq!(reason.kind(), "dimension_mismatch");
        assert_eq!(
            reason.to_string(),
            "Dimension mismatch (baseline: 100x100, current: 101x100)"
        );
    }

    #[test]
    fn test_io_error_has_source() {
        use std::error::Error;
        let err = VisualError::io("/x/a.png", std::io::Error::other("disk full"));
        assert!(err.source().is_some());
        assert!(err.to_string().contains("/x/a.png"));
    }
}
