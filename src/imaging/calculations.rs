//! Pure calculation functions for slice geometry in source pixels.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::Dimensions;
use super::params::PixelRect;
use crate::geometry::{clamp_i64, round_px};
use crate::types::SliceRect;

/// Map a logical rectangle onto the source image.
///
/// Left/top are `round(logical × scale)` clamped into `[0, dim - 1]`.
/// Width/height are `round(logical × scale)`, at least 1, and trimmed so the
/// rectangle stays inside the image from its clamped origin. The source may
/// be a pixel or two off `logical size × scale` because of export rounding.
///
/// # Examples
/// ```
/// # use frame_slicer::imaging::{Dimensions, PixelRect, rescale_rect};
/// # use frame_slicer::types::SliceRect;
/// let rect = SliceRect::band(500, 100, 50);
/// let px = rescale_rect(&rect, 2.0, Dimensions { width: 1000, height: 1799 });
/// assert_eq!(px, PixelRect { left: 0, top: 200, width: 1000, height: 100 });
/// ```
pub fn rescale_rect(rect: &SliceRect, scale: f64, source: Dimensions) -> PixelRect {
    let (max_w, max_h) = (source.width.max(1) as i64, source.height.max(1) as i64);
    let scaled = |v: u32| round_px(v as f64 * scale);

    let left = clamp_i64(scaled(rect.x), 0, max_w - 1);
    let top = clamp_i64(scaled(rect.y), 0, max_h - 1);
    let width = clamp_i64(scaled(rect.width), 1, max_w - left);
    let height = clamp_i64(scaled(rect.height), 1, max_h - top);

    PixelRect {
        left: left as u32,
        top: top as u32,
        width: width as u32,
        height: height as u32,
    }
}

/// Bytes to kilobytes, rounded to two decimals.
pub fn bytes_to_kb(bytes: usize) -> f64 {
    (bytes as f64 / 1024.0 * 100.0).round() / 100.0
}
