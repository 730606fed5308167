//! High-level image operations.
//!
//! These functions combine calculations with backend execution: they take a
//! region and compression settings, decide the encoding, and call the backend.

use super::backend::{BackendError, ImageBackend};
use super::calculations::bytes_to_kb;
use super::params::{CompressionParams, OutputFormat};
use image::DynamicImage;
use tracing::{debug, warn};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// An encoded slice ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedSlice {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    /// JPEG quality used; `None` for lossless output.
    pub quality: Option<u32>,
    /// Size of the region's decoded pixels before any encoding.
    pub original_bytes: usize,
}

impl CompressedSlice {
    pub fn original_kb(&self) -> f64 {
        bytes_to_kb(self.original_bytes)
    }

    pub fn compressed_kb(&self) -> f64 {
        bytes_to_kb(self.bytes.len())
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// True if any pixel is not fully opaque.
///
/// Alpha is checked at the image's own bit depth.
pub fn has_transparency(image: &DynamicImage) -> bool {
    if !image.color().has_alpha() {
        return false;
    }
    match image {
        DynamicImage::ImageRgba8(buf) => buf.pixels().any(|p| p.0[3] < u8::MAX),
        DynamicImage::ImageLumaA8(buf) => buf.pixels().any(|p| p.0[1] < u8::MAX),
        DynamicImage::ImageRgba16(buf) => buf.pixels().any(|p| p.0[3] < u16::MAX),
        DynamicImage::ImageLumaA16(buf) => buf.pixels().any(|p| p.0[1] < u16::MAX),
        DynamicImage::ImageRgba32F(buf) => buf.pixels().any(|p| p.0[3] < 1.0),
        other => other.to_rgba32f().pixels().any(|p| p.0[3] < 1.0),
    }
}

/// Size of the region's decoded pixel buffer.
fn raw_size(region: &DynamicImage) -> usize {
    region.as_bytes().len()
}

/// Encode one region as small as the settings allow.
///
/// Transparent regions are always lossless PNG. Opaque regions are always
/// JPEG: start at `default_quality` and step down by 5 while the result is
/// over `target_bytes` and above `min_quality`. A slice still over budget at
/// the floor is accepted.
///
/// `original_bytes` is the region's decoded pixel buffer.
pub fn compress_region(
    backend: &impl ImageBackend,
    region: &DynamicImage,
    transparent: bool,
    params: &CompressionParams,
) -> Result<CompressedSlice> {
    let original_bytes = raw_size(region);

    if transparent {
        let bytes = backend.encode_lossless(region)?;
        debug!(bytes = bytes.len(), original = original_bytes, "lossless encode");
        return Ok(CompressedSlice {
            bytes,
            format: OutputFormat::Png,
            quality: None,
            original_bytes,
        });
    }

    let floor = params.min_quality.min(params.default_quality);
    let mut quality = params.default_quality;
    let mut jpeg = backend.encode_jpeg(region, quality)?;
    debug!(quality = quality.value(), bytes = jpeg.len(), "jpeg attempt");

    while jpeg.len() > params.target_bytes && quality > floor {
        quality = quality.step_down(floor);
        jpeg = backend.encode_jpeg(region, quality)?;
        debug!(quality = quality.value(), bytes = jpeg.len(), "jpeg attempt");
    }

    if jpeg.len() > params.target_bytes {
        warn!(
            quality = quality.value(),
            bytes = jpeg.len(),
            target = params.target_bytes,
            "slice still over budget at minimum quality"
        );
    }

    Ok(CompressedSlice {
        bytes: jpeg,
        format: OutputFormat::Jpeg,
        quality: Some(quality.value()),
        original_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Quality;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use image::{GrayAlphaImage, ImageBuffer, LumaA, Rgba, RgbaImage};

    type Rgba16Image = ImageBuffer<Rgba<u16>, Vec<u16>>;

    fn params(default: u32, floor: u32, target_bytes: usize) -> CompressionParams {
        CompressionParams {
            default_quality: Quality::new(default),
            min_quality: Quality::new(floor),
            target_bytes,
        }
    }

    fn opaque(width: u32, height: u32) -> DynamicImage {
        DynamicImage::new_rgb8(width, height)
    }

    // =========================================================================
    // has_transparency
    // =========================================================================

    #[test]
    fn rgb_is_never_transparent() {
        assert!(!has_transparency(&opaque(4, 4)));
    }

    #[test]
    fn opaque_rgba_is_not_transparent() {
        let image = RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255]));
        assert!(!has_transparency(&DynamicImage::ImageRgba8(image)));
    }

    #[test]
    fn single_translucent_pixel_counts() {
        let mut image = RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255]));
        image.put_pixel(3, 3, Rgba([1, 2, 3, 254]));
        assert!(has_transparency(&DynamicImage::ImageRgba8(image)));
    }

    #[test]
    fn nearly_opaque_16bit_pixel_counts() {
        let mut image = Rgba16Image::from_pixel(4, 4, Rgba([100, 200, 300, u16::MAX]));
        assert!(!has_transparency(&DynamicImage::ImageRgba16(image.clone())));
        image.put_pixel(0, 0, Rgba([100, 200, 300, u16::MAX - 1]));
        assert!(has_transparency(&DynamicImage::ImageRgba16(image)));
    }

    #[test]
    fn gray_alpha_is_checked() {
        let image = GrayAlphaImage::from_pixel(2, 2, LumaA([9, 0]));
        assert!(has_transparency(&DynamicImage::ImageLumaA8(image)));
    }

    // =========================================================================
    // compress_region
    // =========================================================================

    #[test]
    fn transparent_region_is_lossless_without_search() {
        let backend = MockBackend::new();
        let region = DynamicImage::new_rgba8(2000, 2000);
        assert!(has_transparency(&region));

        let slice = compress_region(&backend, &region, true, &params(85, 45, 1)).unwrap();
        assert_eq!(slice.mime_type(), "image/png");
        assert_eq!(slice.quality, None);
        assert_eq!(slice.original_bytes, 2000 * 2000 * 4);
        assert_eq!(slice.bytes.len(), 1_000_000);
        assert!(backend.jpeg_qualities().is_empty());
    }

    #[test]
    fn under_budget_at_first_try_encodes_once() {
        let backend = MockBackend::with_sizes(1_000_000, |q| q as usize * 1000);
        let slice = compress_region(&backend, &opaque(10, 10), false, &params(85, 45, 400 * 1024))
            .unwrap();
        assert_eq!(slice.quality, Some(85));
        assert_eq!(slice.format, OutputFormat::Jpeg);
        assert_eq!(backend.jpeg_qualities(), vec![85]);
    }

    #[test]
    fn steps_down_by_five_until_under_budget() {
        // 85 → 85_000, 80 → 80_000, ..., 70 → 70_000
        let backend = MockBackend::with_sizes(1_000_000, |q| q as usize * 1000);
        let slice =
            compress_region(&backend, &opaque(10, 10), false, &params(85, 45, 72_000)).unwrap();
        assert_eq!(slice.quality, Some(70));
        assert_eq!(backend.jpeg_qualities(), vec![85, 80, 75, 70]);
    }

    #[test]
    fn floor_reached_is_accepted_within_attempt_bound() {
        let backend = MockBackend::with_sizes(1_000_000, |q| q as usize * 1000);
        let p = params(85, 45, 1);
        let slice = compress_region(&backend, &opaque(10, 10), false, &p).unwrap();

        assert_eq!(slice.quality, Some(45));
        let qualities = backend.jpeg_qualities();
        assert_eq!(qualities.len(), 9);
        assert_eq!(qualities.len() as u32, p.max_attempts());
        assert_eq!(qualities.last(), Some(&45));
    }

    #[test]
    fn floor_off_the_step_grid_is_hit_exactly() {
        let backend = MockBackend::with_sizes(1_000_000, |q| q as usize * 1000);
        compress_region(&backend, &opaque(10, 10), false, &params(82, 45, 1)).unwrap();
        assert_eq!(
            backend.jpeg_qualities(),
            vec![82, 77, 72, 67, 62, 57, 52, 47, 45]
        );
    }

    #[test]
    fn opaque_stays_jpeg_when_lossless_would_be_smaller() {
        let backend = MockBackend::with_sizes(10, |q| q as usize * 1000);
        let slice =
            compress_region(&backend, &opaque(100, 100), false, &params(85, 45, 1)).unwrap();
        assert_eq!(slice.format, OutputFormat::Jpeg);
        assert_eq!(slice.quality, Some(45));
        assert_eq!(slice.bytes.len(), 45_000);
    }

    #[test]
    fn opaque_output_never_exceeds_original() {
        // 100×100 RGB decodes to 30_000 bytes.
        for target in [1, 30_000, 60_000, 1_000_000] {
            let backend = MockBackend::with_sizes(1_000_000, |q| q as usize * 100);
            let slice =
                compress_region(&backend, &opaque(100, 100), false, &params(85, 45, target))
                    .unwrap();
            assert_eq!(slice.original_bytes, 30_000);
            assert!(slice.bytes.len() <= slice.original_bytes);
        }
    }

    #[test]
    fn original_size_is_decoded_buffer() {
        assert_eq!(raw_size(&opaque(10, 4)), 120);
        assert_eq!(raw_size(&DynamicImage::new_rgba8(10, 4)), 160);
        assert_eq!(raw_size(&DynamicImage::new_rgba16(10, 4)), 320);
    }

    #[test]
    fn sizes_are_reported_in_kb() {
        // 32×16 RGBA decodes to 2048 bytes.
        let region = RgbaImage::from_pixel(32, 16, Rgba([5, 5, 5, 255]));
        let backend = MockBackend::with_sizes(2048, |_| 1536);
        let slice = compress_region(
            &backend,
            &DynamicImage::ImageRgba8(region),
            false,
            &params(85, 45, 1_000_000),
        )
        .unwrap();
        assert_eq!(slice.original_kb(), 2.0);
        assert_eq!(slice.compressed_kb(), 1.5);
    }

    #[test]
    fn opaque_region_skips_lossless_encode() {
        let backend = MockBackend::new();
        compress_region(&backend, &opaque(3, 2), false, &params(85, 45, 1)).unwrap();
        assert!(
            !backend
                .get_operations()
                .iter()
                .any(|op| matches!(op, RecordedOp::EncodeLossless { .. }))
        );
    }

    #[test]
    fn transparent_region_is_encoded_losslessly_once() {
        let backend = MockBackend::new();
        compress_region(&backend, &DynamicImage::new_rgba8(3, 2), true, &params(85, 45, 1))
            .unwrap();
        let lossless_ops = backend
            .get_operations()
            .into_iter()
            .filter(|op| matches!(op, RecordedOp::EncodeLossless { width: 3, height: 2 }))
            .count();
        assert_eq!(lossless_ops, 1);
    }
}
