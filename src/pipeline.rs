//! Frame → uploaded slices.
//!
//! Two entry points, one per request type:
//!
//! - [`suggest`]: propose slice rectangles for a frame. Pure, advisory.
//! - [`export`]: cut the frame's exported image into slices, compress each
//!   one, upload them in order, and return the batch.
//!
//! ## Export flow
//!
//! ```text
//! credential → body region → rectangles (manual or suggested)
//!            → decode source → per slice, in order:
//!                rescale → extract → compress → upload → SliceRecord
//! ```
//!
//! Slices are processed strictly one after another: slice N+1 is not
//! extracted until slice N's upload has finished. With
//! `processing.parallel_encode` all slices are extracted and compressed on
//! the rayon pool first, then uploaded one by one in order. Either way the
//! first failing slice aborts the batch and nothing partial is returned.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::DynamicImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SlicerConfig;
use crate::credentials::resolve_credential;
use crate::error::PipelineError;
use crate::geometry::clamp_band;
use crate::imaging::{
    CompressedSlice, CompressionParams, Dimensions, ImageBackend, PixelRect, compress_region,
    has_transparency, rescale_rect,
};
use crate::manual::{ManualSlice, normalize_manual_slices};
use crate::naming::{batch_name, slice_upload_name};
use crate::suggest::{SuggestParams, effective_max_height, suggest_slices};
use crate::types::{ChildBox, SliceBatch, SliceRecord, SliceRect};
use crate::upload::ImageUploader;

/// Frame geometry shared by both request types, in logical pixels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameGeometry {
    pub frame_width: f64,
    pub frame_height: f64,
    #[serde(default)]
    pub header_height: Option<f64>,
    #[serde(default)]
    pub footer_height: Option<f64>,
    /// Falls back to `slicing.max_slice_height`; floored at 200.
    #[serde(default)]
    pub max_slice_height: Option<f64>,
    /// Visible direct children, used only for auto-suggestion.
    #[serde(default)]
    pub children: Vec<ChildBox>,
}

impl FrameGeometry {
    /// Whole-pixel suggester inputs, with the bands clamped into the frame.
    pub fn params(&self, config: &SlicerConfig) -> SuggestParams {
        let frame_width = clamp_band(self.frame_width, u32::MAX);
        let frame_height = clamp_band(self.frame_height, u32::MAX);
        let max_slice_height = self
            .max_slice_height
            .filter(|h| h.is_finite() && *h > 0.0)
            .map(|h| clamp_band(h, u32::MAX))
            .unwrap_or(config.slicing.max_slice_height);

        SuggestParams {
            frame_width,
            frame_height,
            header_height: clamp_band(self.header_height.unwrap_or(0.0), frame_height),
            footer_height: clamp_band(self.footer_height.unwrap_or(0.0), frame_height),
            max_slice_height: Some(max_slice_height),
        }
    }
}

/// Request for [`suggest`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestRequest {
    #[serde(flatten)]
    pub frame: FrameGeometry,
}

/// Suggested rectangles plus the body region they cover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestResponse {
    pub body_top: u32,
    pub body_bottom: u32,
    pub max_slice_height: u32,
    pub slices: Vec<SliceRect>,
}

/// Request for [`export`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    #[serde(flatten)]
    pub frame: FrameGeometry,
    #[serde(default)]
    pub frame_name: String,
    /// Upload name prefix; defaults to the slugified frame name.
    #[serde(default)]
    pub batch_name: Option<String>,
    /// Free-form account name, normalized before lookup.
    #[serde(default)]
    pub account: Option<String>,
    /// Source pixels per logical pixel; falls back to `slicing.pixel_ratio`.
    #[serde(default)]
    pub pixel_ratio: Option<f64>,
    /// Caller-drawn rectangles. When present and non-empty, auto-suggestion
    /// is skipped.
    #[serde(default)]
    pub slices: Option<Vec<ManualSlice>>,
    /// The exported frame, base64, optionally as a `data:` URL.
    pub image_data: String,
}

impl ExportRequest {
    pub fn manual_slices(&self) -> Option<&[ManualSlice]> {
        self.slices.as_deref().filter(|s| !s.is_empty())
    }

    /// The request's pixel ratio if usable, else the configured one.
    pub fn scale(&self, config: &SlicerConfig) -> f64 {
        self.pixel_ratio
            .filter(|r| r.is_finite() && *r > 0.0)
            .unwrap_or(config.slicing.pixel_ratio)
    }
}

/// Suggest slices for a frame. Never fails; an empty body yields no slices.
pub fn suggest(request: &SuggestRequest, config: &SlicerConfig) -> SuggestResponse {
    let params = request.frame.params(config);
    let body = params.body();
    let slices = suggest_slices(&params, &request.frame.children);
    debug!(count = slices.len(), top = body.top, bottom = body.bottom, "suggested slices");

    SuggestResponse {
        body_top: body.top,
        body_bottom: body.bottom,
        max_slice_height: effective_max_height(params.max_slice_height),
        slices,
    }
}

/// Run a full export. See the [module docs](self).
pub async fn export(
    request: &ExportRequest,
    config: &SlicerConfig,
    backend: &impl ImageBackend,
    uploader: &impl ImageUploader,
) -> Result<SliceBatch, PipelineError> {
    let credential = resolve_credential(
        request.account.as_deref(),
        &config.accounts,
        config.upload.default_key.as_deref(),
    )?;

    let params = request.frame.params(config);
    let body = params.body();
    if body.is_empty() || params.frame_width == 0 {
        return Err(PipelineError::InvalidBodyRegion {
            top: body.top,
            bottom: body.bottom,
        });
    }

    let manual = request.manual_slices();
    let rects = match manual {
        Some(slices) => normalize_manual_slices(&body, params.frame_width, slices)?,
        None => suggest_slices(&params, &request.frame.children),
    };

    let source = decode_source(backend, &request.image_data)?;
    let job = SliceJob {
        scale: request.scale(config),
        source_dims: Dimensions::of(&source),
        source: &source,
        compression: CompressionParams::from_config(&config.compression),
        batch: batch_name(request.batch_name.as_deref(), &request.frame_name),
    };
    info!(
        account = %credential.account_id,
        batch = %job.batch,
        slices = rects.len(),
        manual = manual.is_some(),
        scale = job.scale,
        "starting export"
    );

    let slices = if config.processing.parallel_encode {
        job.run_parallel(backend, uploader, &credential.key, &rects)
            .await
    } else {
        job.run_sequential(backend, uploader, &credential.key, &rects)
            .await
    }
    .inspect_err(|e| {
        warn!(batch = %job.batch, slice = e.slice_index(), error = %e, "export aborted")
    })?;

    Ok(SliceBatch {
        account_id: credential.account_id,
        batch_name: job.batch,
        frame_name: request.frame_name.clone(),
        slice_count: slices.len(),
        manual_mode: manual.is_some(),
        target_slice_kb: config.compression.target_slice_kb,
        slices,
    })
}

/// Strip an optional `data:<mime>;base64,` prefix, then decode.
fn decode_source(
    backend: &impl ImageBackend,
    image_data: &str,
) -> Result<DynamicImage, PipelineError> {
    let payload = strip_data_url(image_data);
    let bytes = BASE64
        .decode(payload)
        .map_err(|e| PipelineError::UnreadableSourceImage(format!("invalid base64: {e}")))?;
    backend
        .decode(&bytes)
        .map_err(|e| PipelineError::UnreadableSourceImage(e.to_string()))
}

fn strip_data_url(image_data: &str) -> &str {
    let trimmed = image_data.trim();
    match trimmed.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(";base64,")
            .map(|(_, payload)| payload)
            .unwrap_or(rest),
        None => trimmed,
    }
}

/// Everything per-slice work needs, fixed for the whole batch.
struct SliceJob<'a> {
    scale: f64,
    source: &'a DynamicImage,
    source_dims: Dimensions,
    compression: CompressionParams,
    batch: String,
}

/// A slice that has been cut and encoded but not yet uploaded.
struct Prepared {
    pixels: PixelRect,
    encoded: CompressedSlice,
}

impl SliceJob<'_> {
    /// Rescale, extract, and compress the slice at 1-based `index`.
    fn prepare(
        &self,
        backend: &impl ImageBackend,
        index: usize,
        rect: &SliceRect,
    ) -> Result<Prepared, PipelineError> {
        let pixels = rescale_rect(rect, self.scale, self.source_dims);
        let region = backend
            .extract(self.source, &pixels)
            .map_err(|source| PipelineError::ExtractionFailed { index, source })?;
        let transparent = has_transparency(&region);
        let encoded = compress_region(backend, &region, transparent, &self.compression)
            .map_err(|source| PipelineError::CompressionFailed { index, source })?;
        Ok(Prepared { pixels, encoded })
    }

    async fn finish(
        &self,
        uploader: &impl ImageUploader,
        credential: &str,
        index: usize,
        rect: &SliceRect,
        prepared: Prepared,
    ) -> Result<SliceRecord, PipelineError> {
        let Prepared { pixels, encoded } = prepared;
        let name = slice_upload_name(&self.batch, index);
        let image_url = uploader
            .upload(credential, &name, &encoded.bytes)
            .await
            .map_err(|source| PipelineError::UploadFailed { index, source })?;

        info!(
            index,
            name = %name,
            left = pixels.left,
            top = pixels.top,
            width = pixels.width,
            height = pixels.height,
            mime = encoded.mime_type(),
            quality = ?encoded.quality,
            original_kb = encoded.original_kb(),
            compressed_kb = encoded.compressed_kb(),
            "slice uploaded"
        );

        Ok(SliceRecord {
            index,
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            image_url,
            url: rect.url.clone(),
            label: rect.label.clone(),
            alt: rect.alt.clone(),
            mime_type: encoded.mime_type().to_string(),
            jpeg_quality: encoded.quality,
            original_kb: encoded.original_kb(),
            compressed_kb: encoded.compressed_kb(),
        })
    }

    async fn run_sequential(
        &self,
        backend: &impl ImageBackend,
        uploader: &impl ImageUploader,
        credential: &str,
        rects: &[SliceRect],
    ) -> Result<Vec<SliceRecord>, PipelineError> {
        let mut records = Vec::with_capacity(rects.len());
        for (i, rect) in rects.iter().enumerate() {
            let index = i + 1;
            let prepared = self.prepare(backend, index, rect)?;
            records.push(self.finish(uploader, credential, index, rect, prepared).await?);
        }
        Ok(records)
    }

    async fn run_parallel(
        &self,
        backend: &impl ImageBackend,
        uploader: &impl ImageUploader,
        credential: &str,
        rects: &[SliceRect],
    ) -> Result<Vec<SliceRecord>, PipelineError> {
        let prepared: Vec<Result<Prepared, PipelineError>> = rects
            .par_iter()
            .enumerate()
            .map(|(i, rect)| self.prepare(backend, i + 1, rect))
            .collect();

        let mut records = Vec::with_capacity(rects.len());
        for (i, (rect, prepared)) in rects.iter().zip(prepared).enumerate() {
            records.push(
                self.finish(uploader, credential, i + 1, rect, prepared?)
                    .await?,
            );
        }
        Ok(records)
    }
}
