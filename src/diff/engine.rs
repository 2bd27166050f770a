//! Comparison engine: one screenshot against its stored baseline.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use super::codec;
use super::pixelmatch;
use super::types::{
    ComparisonResult, ComparisonStatus, Dimensions, FailureReason, VisualResult,
};
use crate::baseline::BaselineStore;
use crate::config;

/// Per-call comparison settings
#[derive(Debug, Clone, PartialEq)]
pub struct CompareOptions {
    /// Allowed percentage of differing pixels (inclusive)
    pub threshold: f64,
    /// Directory holding the artifacts
    pub baseline_dir: PathBuf,
    /// Per-pixel color distance cutoff in `[0, 1]`
    pub color_sensitivity: f64,
    /// Screenshot mode used by the caller; carried through untouched
    pub full_page: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        let cfg = config::get();
        Self {
            threshold: cfg.threshold,
            baseline_dir: cfg.baseline_dir.clone(),
            color_sensitivity: cfg.color_sensitivity,
            full_page: true,
        }
    }
}

impl CompareOptions {
    /// Options rooted at `baseline_dir`, other fields from the global config
    pub fn new(baseline_dir: impl Into<PathBuf>) -> Self {
        Self {
            baseline_dir: baseline_dir.into(),
            ..Default::default()
        }
    }

    /// NaN falls back to the default; negatives become 0
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = config::sanitize_threshold(threshold);
        self
    }

    pub fn color_sensitivity(mut self, sensitivity: f64) -> Self {
        self.color_sensitivity = config::clamp_sensitivity(sensitivity);
        self
    }

    pub fn full_page(mut self, full_page: bool) -> Self {
        self.full_page = full_page;
        self
    }
}

/// Percentage of differing pixels; an empty image has none
pub fn diff_percentage(diff_pixels: u64, dimensions: Dimensions) -> f64 {
    let total = dimensions.area();
    if total == 0 {
        return 0.0;
    }
    (diff_pixels as f64 * 100.0) / total as f64
}

/// Compare `screenshot` against the baseline stored for `name`.
///
/// The first run for a name stores the screenshot as its baseline and returns
/// `New`. Later runs return `Passed` or `Failed`, writing `current` (and `diff`
/// when sizes match) for review. Only filesystem problems are returned as
/// errors; undecodable images produce a failed result.
pub fn run_comparison(
    name: &str,
    screenshot: &[u8],
    options: &CompareOptions,
) -> VisualResult<ComparisonResult> {
    let store = BaselineStore::new(&options.baseline_dir);
    let paths = store.paths(name)?;
    let threshold = options.threshold;

    let _guard = store.lock(name);
    store.ensure_dir()?;

    if !paths.baseline.exists() {
        store.write(&paths.baseline, screenshot)?;
        info!(screenshot = name, path = %paths.baseline.display(), "New baseline created");
        return Ok(ComparisonResult::new(name, ComparisonStatus::New, threshold)
            .with_artifact(&paths.baseline));
    }

    let baseline_bytes = store.read(&paths.baseline)?;
    let baseline = match codec::decode(&baseline_bytes) {
        Ok(grid) => grid,
        Err(e) => {
            warn!(screenshot = name, error = %e, "Baseline could not be decoded");
            return Ok(decode_failure(name, format!("baseline: {}", e), threshold));
        }
    };
    let current = match codec::decode(screenshot) {
        Ok(grid) => grid,
        Err(e) => {
            warn!(screenshot = name, error = %e, "Screenshot could not be decoded");
            return Ok(decode_failure(name, format!("screenshot: {}", e), threshold));
        }
    };

    if baseline.dimensions() != current.dimensions() {
        // A stale diff would claim matching sizes
        store.remove(&paths.diff)?;
        store.write(&paths.current, screenshot)?;
        warn!(
            screenshot = name,
            baseline = %baseline.dimensions(),
            current = %current.dimensions(),
            path = %paths.current.display(),
            "Visual diff failed: dimension mismatch"
        );
        let reason = FailureReason::DimensionMismatch {
            baseline: baseline.dimensions(),
            current: current.dimensions(),
        };
        return Ok(ComparisonResult::failed(name, reason, threshold).with_artifact(&paths.current));
    }

    let diff = pixelmatch::compare(&baseline, &current, options.color_sensitivity)?;
    let percentage = diff_percentage(diff.diff_pixels, baseline.dimensions());
    debug!(screenshot = name, diff_pixels = diff.diff_pixels, percentage, "Pixel comparison finished");

    if percentage <= threshold {
        let mut result = ComparisonResult::new(name, ComparisonStatus::Passed, threshold);
        result.diff_percentage = Some(percentage);
        // diff goes first so an interrupted cleanup never leaves a diff without its current
        for stale in [&paths.diff, &paths.current] {
            if store.remove(stale)? {
                debug!(screenshot = name, path = %stale.display(), "Removed stale review artifact");
                result = result.with_artifact(stale);
            }
        }
        info!(screenshot = name, percentage, threshold, "Visual diff passed");
        return Ok(result);
    }

    let diff_png = codec::encode(&diff.image)?;
    store.write(&paths.current, screenshot)?;
    store.write(&paths.diff, &diff_png)?;
    warn!(
        screenshot = name,
        percentage,
        threshold,
        current = %paths.current.display(),
        diff = %paths.diff.display(),
        "Visual diff failed: threshold exceeded"
    );

    let reason = FailureReason::ThresholdExceeded {
        diff_percentage: percentage,
        threshold,
    };
    Ok(ComparisonResult::failed(name, reason, threshold)
        .with_artifact(&paths.current)
        .with_artifact(&paths.diff))
}

fn decode_failure(name: &str, message: String, threshold: f64) -> ComparisonResult {
    ComparisonResult::failed(name, FailureReason::DecodeError { message }, threshold)
}
