//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (PNG, JPEG, WebP) | `image::load_from_memory` |
//! | Extract | `image::DynamicImage::crop_imm` |
//! | Encode → indexed PNG (≤ 256 colors) | `png::Encoder` with `PLTE` + `tRNS` |
//! | Encode → RGB/RGBA PNG | `image::codecs::png::PngEncoder` (best, adaptive) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |

use super::backend::{BackendError, ImageBackend};
use super::params::{PixelRect, Quality};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage};
use std::collections::HashMap;

/// Palette size limit for indexed PNG output.
const MAX_PALETTE: usize = 256;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// An RGBA image reduced to a palette and one index per pixel.
struct Indexed {
    palette: Vec<u8>,
    alpha: Vec<u8>,
    indices: Vec<u8>,
}

/// Build a palette if the image has at most [`MAX_PALETTE`] distinct colors.
fn quantize_exact(rgba: &RgbaImage) -> Option<Indexed> {
    let mut lookup: HashMap<[u8; 4], u8> = HashMap::new();
    let mut palette = Vec::new();
    let mut alpha = Vec::new();
    let mut indices = Vec::with_capacity(rgba.width() as usize * rgba.height() as usize);

    for pixel in rgba.pixels() {
        let index = match lookup.get(&pixel.0) {
            Some(&index) => index,
            None => {
                if lookup.len() == MAX_PALETTE {
                    return None;
                }
                let index = lookup.len() as u8;
                lookup.insert(pixel.0, index);
                palette.extend_from_slice(&pixel.0[..3]);
                alpha.push(pixel.0[3]);
                index
            }
        };
        indices.push(index);
    }

    Some(Indexed {
        palette,
        alpha,
        indices,
    })
}

fn encode_indexed(width: u32, height: u32, indexed: Indexed) -> Result<Vec<u8>, BackendError> {
    let mut buffer = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buffer, width, height);
        encoder.set_color(png::ColorType::Indexed);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Best);
        encoder.set_palette(indexed.palette);
        if indexed.alpha.iter().any(|&a| a < u8::MAX) {
            encoder.set_trns(indexed.alpha);
        }
        let mut writer = encoder.write_header().map_err(png_error)?;
        writer
            .write_image_data(&indexed.indices)
            .map_err(png_error)?;
        writer.finish().map_err(png_error)?;
    }
    Ok(buffer)
}

fn png_error(e: png::EncodingError) -> BackendError {
    BackendError::ProcessingFailed(format!("PNG encode failed: {e}"))
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
        image::load_from_memory(bytes)
            .map_err(|e| BackendError::ProcessingFailed(format!("Failed to decode image: {e}")))
    }

    fn extract(
        &self,
        source: &DynamicImage,
        rect: &PixelRect,
    ) -> Result<DynamicImage, BackendError> {
        if rect.width == 0
            || rect.height == 0
            || rect.right() > source.width()
            || rect.bottom() > source.height()
        {
            return Err(BackendError::ProcessingFailed(format!(
                "region {}x{}+{}+{} is outside the {}x{} source",
                rect.width,
                rect.height,
                rect.left,
                rect.top,
                source.width(),
                source.height()
            )));
        }
        Ok(source.crop_imm(rect.left, rect.top, rect.width, rect.height))
    }

    fn encode_lossless(&self, image: &DynamicImage) -> Result<Vec<u8>, BackendError> {
        let (width, height) = (image.width(), image.height());
        let rgba = image.to_rgba8();
        if let Some(indexed) = quantize_exact(&rgba) {
            return encode_indexed(width, height, indexed);
        }

        let mut buffer = Vec::new();
        let encoder =
            PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, FilterType::Adaptive);
        let result = if image.color().has_alpha() {
            encoder.write_image(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
        } else {
            let rgb = image.to_rgb8();
            encoder.write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
        };
        result.map_err(|e| BackendError::ProcessingFailed(format!("PNG encode failed: {e}")))?;
        Ok(buffer)
    }

    fn encode_jpeg(
        &self,
        image: &DynamicImage,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError> {
        let rgb = image.to_rgb8();
        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, quality.value() as u8)
            .write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {e}")))?;
        Ok(buffer)
    }
}
