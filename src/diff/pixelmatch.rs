//! Perceptual per-pixel comparison.
//!
//! A thin adapter over `dify`, which implements the pixelmatch algorithm:
//! colors are compared in YIQ space after blending over white, and a pixel
//! counts as different when its squared YIQ distance exceeds
//! `MAX_YIQ_DELTA * c * c`, where `c` is the color sensitivity in `[0, 1]`.
//! Differences that look like anti-aliased edges in either image are painted
//! yellow and not counted.
//!
//! The functions here are pure: equal inputs always produce equal outputs.

use std::collections::HashSet;

use dify::cli::OutputImageBase;
use image::{Rgba, RgbaImage, imageops};

use super::codec::PixelGrid;
use super::types::VisualResult;

/// Largest possible YIQ delta between two colors
pub const MAX_YIQ_DELTA: f64 = 35215.0;

/// Color of counted pixels in the diff image
pub const DIFF_COLOR: [u8; 4] = [255, 0, 0, 255];

/// Color of anti-aliased pixels in the diff image
pub const AA_COLOR: [u8; 4] = [255, 255, 0, 255];

/// Opacity of the baseline when drawn behind matching pixels
const DIM_ALPHA: f32 = 0.1;

/// Output of [`compare`]
#[derive(Debug, Clone)]
pub struct PixelDiff {
    /// Visualization the same size as the inputs
    pub image: PixelGrid,
    /// Number of pixels classified as different
    pub diff_pixels: u64,
}

/// Compare two equally sized grids, producing a diff image and a count.
///
/// Callers must check dimensions first.
pub fn compare(a: &PixelGrid, b: &PixelGrid, color_sensitivity: f64) -> VisualResult<PixelDiff> {
    debug_assert_eq!(a.dimensions(), b.dimensions());
    let baseline = a.to_image()?;

    if a.as_bytes() == b.as_bytes() {
        return Ok(PixelDiff {
            image: PixelGrid::from_image(dimmed(&baseline)),
            diff_pixels: 0,
        });
    }

    let (diff_pixels, image) = match run(baseline.clone(), b.to_image()?, color_sensitivity) {
        Some((count, image)) => (count, image),
        None => (0, dimmed(&baseline)),
    };
    Ok(PixelDiff {
        image: PixelGrid::from_image(image),
        diff_pixels,
    })
}

/// Count differing pixels, discarding the diff image
pub fn count_different(a: &PixelGrid, b: &PixelGrid, color_sensitivity: f64) -> VisualResult<u64> {
    debug_assert_eq!(a.dimensions(), b.dimensions());
    if a.as_bytes() == b.as_bytes() {
        return Ok(0);
    }
    Ok(run(a.to_image()?, b.to_image()?, color_sensitivity)
        .map(|(count, _)| count)
        .unwrap_or(0))
}

/// `None` means dify found nothing to report
fn run(left: RgbaImage, right: RgbaImage, color_sensitivity: f64) -> Option<(u64, RgbaImage)> {
    let max_delta = (MAX_YIQ_DELTA * color_sensitivity * color_sensitivity) as f32;
    let block_out: Option<HashSet<(u32, u32)>> = None;

    dify::diff::get_results(
        left,
        right,
        max_delta,
        true,
        Some(DIM_ALPHA),
        &Some(OutputImageBase::LeftImage),
        &block_out,
    )
    .map(|(count, image)| (count.max(0) as u64, image))
}

/// Grayscale copy of `img` faded toward white
fn dimmed(img: &RgbaImage) -> RgbaImage {
    let luma = imageops::grayscale(img);
    RgbaImage::from_fn(img.width(), img.height(), |x, y| {
        let alpha = DIM_ALPHA * f32::from(img.get_pixel(x, y)[3]) / 255.0;
        let y = f32::from(luma.get_pixel(x, y)[0]);
        let val = (255.0 + (y - 255.0) * alpha).round().clamp(0.0, 255.0) as u8;
        Rgba([val, val, val, 255])
    })
}
