//! Visual Baselines - screenshot regression checks against stored references.
//!
//! This crate provides:
//! - Perceptual pixel comparison with anti-aliasing tolerance
//! - A comparison engine that seeds, checks and records baselines on disk
//! - A baseline store that derives review status from artifact files
//! - An approve/reject workflow for pending screenshots
//!
//! # Example
//!
//! ```rust,no_run
//! use visual_baselines::{CompareOptions, ComparisonStatus, run_comparison};
//!
//! let screenshot = std::fs::read("home.png").unwrap();
//! let options = CompareOptions::new("./visual-baselines").threshold(0.5);
//! let result = run_comparison("home", &screenshot, &options).unwrap();
//! if result.status == ComparisonStatus::Failed {
//!     eprintln!("{:?}", result.reason);
//! }
//! ```

pub mod baseline;
pub mod batch;
pub mod config;
pub mod diff;
pub mod report;

// Re-export comparison types
pub use diff::{
    CompareOptions, ComparisonResult, ComparisonStatus, Dimensions, FailureReason, PixelGrid,
    VisualError, VisualResult, run_comparison,
};

// Re-export baseline management
pub use baseline::{
    ApprovalOutcome, AssumeYes, BaselineEntry, BaselineListing, BaselineStatus, BaselineStore,
    BulkApproval, BulkReport, Confirm, PromptConfirm, RejectOutcome, approve_all, approve_one,
    reject_one,
};

// Re-export batch comparison
pub use batch::{ScreenshotFile, collect_screenshots, compare_files};
