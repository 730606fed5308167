//! Shared types that cross the library boundary.
//!
//! These are serialized as camelCase JSON: requests come from the design-tool
//! side, batches go back to it, so field names here are part of the contract.

use serde::{Deserialize, Serialize};

/// A slice rectangle in logical (1x) frame coordinates.
///
/// `url`, `label` and `alt` are caller-owned pass-through strings. The
/// suggester leaves them empty; the manual normalizer sanitizes them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub alt: String,
}

impl SliceRect {
    /// A full-width rectangle with no caller metadata.
    pub fn band(width: u32, y: u32, height: u32) -> Self {
        Self {
            x: 0,
            y,
            width,
            height,
            ..Self::default()
        }
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

/// Bounding box of one direct child of the frame, relative to the frame.
///
/// Only the vertical span and the width matter for slicing; design tools
/// report fractional values, so these stay floating point until clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildBox {
    #[serde(default)]
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

/// One processed slice: its rectangle, where it was uploaded, and how it was
/// encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceRecord {
    /// 1-based position in the batch; matches the `-slice-N` upload suffix.
    pub index: usize,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub image_url: String,
    pub url: String,
    pub label: String,
    pub alt: String,
    pub mime_type: String,
    /// `None` (serialized as `null`) for lossless output.
    pub jpeg_quality: Option<u32>,
    pub original_kb: f64,
    pub compressed_kb: f64,
}

/// The full result of one export invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceBatch {
    pub account_id: String,
    pub batch_name: String,
    pub frame_name: String,
    pub slice_count: usize,
    pub manual_mode: bool,
    pub target_slice_kb: u32,
    pub slices: Vec<SliceRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_rect_band_is_full_width_without_metadata() {
        let rect = SliceRect::band(600, 100, 400);
        assert_eq!(rect.x, 0);
        assert_eq!(rect.bottom(), 500);
        assert!(rect.url.is_empty() && rect.label.is_empty() && rect.alt.is_empty());
    }

    #[test]
    fn child_box_visible_defaults_to_true() {
        let child: ChildBox = serde_json::from_str(r#"{"y": 10, "width": 600, "height": 80}"#).unwrap();
        assert!(child.visible);
        assert_eq!(child.y, 10.0);
    }

    #[test]
    fn slice_record_serializes_camel_case_with_null_quality() {
        let record = SliceRecord {
            index: 1,
            x: 0,
            y: 0,
            width: 600,
            height: 300,
            image_url: "https://i.example/a.png".into(),
            url: String::new(),
            label: String::new(),
            alt: String::new(),
            mime_type: "image/png".into(),
            jpeg_quality: None,
            original_kb: 12.5,
            compressed_kb: 12.5,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["imageUrl"], "https://i.example/a.png");
        assert_eq!(json["mimeType"], "image/png");
        assert!(json["jpegQuality"].is_null());
        assert_eq!(json["compressedKb"], 12.5);
    }
}
