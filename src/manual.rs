//! Manual slice normalization.
//!
//! Callers may draw their own rectangles. Those arrive in logical frame
//! coordinates but are otherwise untrusted: fractional, negative, overlapping,
//! spilling into the header or past the frame edge. Each one is clamped into
//! the body region on its own; rectangles that collapse below 2px in either
//! direction are dropped. Caller order is preserved and nothing is re-sorted.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use url::Url;

use crate::error::PipelineError;
use crate::geometry::{BodyRegion, clamp_i64, round_px};
use crate::types::SliceRect;

/// Rectangles thinner than this in either direction are discarded.
pub const MIN_MANUAL_EXTENT: u32 = 2;

/// A caller-drawn rectangle as it arrives in a request.
///
/// `label` and `alt` accept any JSON scalar and are coerced to strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualSlice {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub label: Value,
    #[serde(default)]
    pub alt: Value,
}

/// Clamp every rectangle into the body, dropping degenerate ones.
///
/// Fails with [`PipelineError::InvalidBodyRegion`] if the body has no rows and
/// with [`PipelineError::NoValidManualSlices`] if nothing survives.
pub fn normalize_manual_slices(
    body: &BodyRegion,
    frame_width: u32,
    slices: &[ManualSlice],
) -> Result<Vec<SliceRect>, PipelineError> {
    if body.is_empty() {
        return Err(PipelineError::InvalidBodyRegion {
            top: body.top,
            bottom: body.bottom,
        });
    }

    let normalized: Vec<SliceRect> = slices
        .iter()
        .enumerate()
        .filter_map(|(i, slice)| {
            let rect = normalize_one(body, frame_width, slice);
            if rect.is_none() {
                warn!(index = i + 1, "dropping degenerate manual slice");
            }
            rect
        })
        .collect();

    if normalized.is_empty() {
        return Err(PipelineError::NoValidManualSlices);
    }
    Ok(normalized)
}

fn normalize_one(body: &BodyRegion, frame_width: u32, slice: &ManualSlice) -> Option<SliceRect> {
    if frame_width == 0 {
        return None;
    }
    let (top, bottom) = (body.top as i64, body.bottom as i64);
    let frame_width = frame_width as i64;

    let x = clamp_i64(round_px(slice.x), 0, frame_width - 1);
    let y = clamp_i64(round_px(slice.y), top, top.max(bottom - 1));
    let width = clamp_i64(round_px(slice.width), 1, frame_width - x);
    let height = clamp_i64(round_px(slice.height), 1, bottom - y);

    let min = MIN_MANUAL_EXTENT as i64;
    if width < min || height < min {
        return None;
    }

    Some(SliceRect {
        x: x as u32,
        y: y as u32,
        width: width as u32,
        height: height as u32,
        url: slice.url.as_deref().map(sanitize_link).unwrap_or_default(),
        label: coerce_text(&slice.label),
        alt: coerce_text(&slice.alt),
    })
}

/// Keep a link only if it is an absolute `http`/`https` URL with a host.
pub fn sanitize_link(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
            trimmed.to_string()
        }
        _ => String::new(),
    }
}

/// Strings pass through, other scalars use their JSON text, null is empty.
pub fn coerce_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
