pub mod codec;
pub mod engine;
pub mod pixelmatch;
pub mod types;

pub use codec::{PixelGrid, decode, encode};
pub use engine::{CompareOptions, diff_percentage, run_comparison};
pub use pixelmatch::{PixelDiff, compare, count_different};
pub use types::{
    ComparisonResult, ComparisonStatus, Dimensions, FailureReason, VisualError, VisualResult,
};
