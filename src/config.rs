//! Configuration management with environment variable support.
//!
//! This module provides the process-wide defaults for visual comparisons:
//! - Environment variables for every configurable value
//! - Sensible defaults when nothing is set
//! - A one-shot global that never changes once the process has read it
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `VISUAL_BASELINE_DIR` | Directory holding baseline/current/diff images | `./visual-baselines` |
//! | `VISUAL_DIFF_THRESHOLD` | Allowed percentage of differing pixels | `0.5` |
//! | `VISUAL_COLOR_SENSITIVITY` | Per-pixel color distance cutoff in `[0, 1]` | `0.1` |
//!
//! # Example
//!
//! ```bash
//! # Keep baselines next to the test suite
//! export VISUAL_BASELINE_DIR="./tests/visual-baselines"
//!
//! # Allow up to 1% of pixels to differ
//! export VISUAL_DIFF_THRESHOLD="1.0"
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

// ============================================================================
// Default Values
// ============================================================================

/// Default allowed percentage of differing pixels
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Default baseline directory
pub const DEFAULT_BASELINE_DIR: &str = "./visual-baselines";

/// Default per-pixel color sensitivity (tolerates anti-aliasing noise)
pub const DEFAULT_COLOR_SENSITIVITY: f64 = 0.1;

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Environment variable for the baseline directory
pub const ENV_BASELINE_DIR: &str = "VISUAL_BASELINE_DIR";

/// Environment variable for the percentage threshold
pub const ENV_THRESHOLD: &str = "VISUAL_DIFF_THRESHOLD";

/// Environment variable for the color sensitivity
pub const ENV_COLOR_SENSITIVITY: &str = "VISUAL_COLOR_SENSITIVITY";

// ============================================================================
// Global Configuration
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Install the process-wide configuration.
///
/// Must run before anything calls [`get`]. Returns the rejected config if the
/// global was already set; the first value wins for the lifetime of the process.
pub fn init(config: Config) -> Result<(), Config> {
    CONFIG.set(config)
}

/// Process-wide comparison defaults
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Default directory for baseline artifacts
    pub baseline_dir: PathBuf,
    /// Default allowed percentage of differing pixels
    pub threshold: f64,
    /// Default per-pixel color sensitivity
    pub color_sensitivity: f64,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            baseline_dir: env::var(ENV_BASELINE_DIR)
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BASELINE_DIR)),
            threshold: env::var(ENV_THRESHOLD)
                .ok()
                .and_then(|s| parse_non_negative(&s))
                .unwrap_or(DEFAULT_THRESHOLD),
            color_sensitivity: env::var(ENV_COLOR_SENSITIVITY)
                .ok()
                .and_then(|s| parse_non_negative(&s))
                .map(clamp_sensitivity)
                .unwrap_or(DEFAULT_COLOR_SENSITIVITY),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            baseline_dir: PathBuf::from(DEFAULT_BASELINE_DIR),
            threshold: DEFAULT_THRESHOLD,
            color_sensitivity: DEFAULT_COLOR_SENSITIVITY,
        }
    }

    /// Override the baseline directory
    pub fn baseline_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.baseline_dir = dir.into();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse a finite, non-negative float
fn parse_non_negative(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

/// Clamp a color sensitivity into `[0, 1]`
pub fn clamp_sensitivity(value: f64) -> f64 {
    if value.is_nan() { DEFAULT_COLOR_SENSITIVITY } else { value.clamp(0.0, 1.0) }
}

/// Make a percentage threshold usable: NaN falls back to the default, negatives become 0
pub fn sanitize_threshold(value: f64) -> f64 {
    if value.is_nan() { DEFAULT_THRESHOLD } else { value.max(0.0) }
}

/// Get the default baseline directory (convenience function)
pub fn baseline_dir() -> PathBuf {
    get().baseline_dir.clone()
}
