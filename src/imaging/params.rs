//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides how a slice gets encoded) and the [`backend`](super::backend)
//! (which does the actual pixel work). This separation allows swapping backends
//! (e.g. for testing with a mock) without changing operation logic.
//!
//! ## Types
//!
//! - [`Quality`]: JPEG encoding quality (1–100, default 85). Clamped on construction.
//! - [`OutputFormat`]: What a compressed slice ended up as, with its mime type.
//! - [`CompressionParams`]: Quality search bounds and the per-slice byte budget.
//! - [`PixelRect`]: A crop rectangle in source-image pixels.

use crate::config::CompressionConfig;

/// Step between successive qualities in the size search.
pub const QUALITY_STEP: u32 = 5;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// One search step down, never below `floor`.
    pub fn step_down(self, floor: Quality) -> Self {
        Self(self.0.saturating_sub(QUALITY_STEP).max(floor.0))
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Encoding chosen for a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Lossless; palette-indexed when the region has few enough colors.
    Png,
    Jpeg,
}

impl OutputFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

/// Bounds for the adaptive JPEG search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionParams {
    pub default_quality: Quality,
    /// Floor; an over-budget slice at this quality is accepted as-is.
    pub min_quality: Quality,
    /// Per-slice budget in bytes.
    pub target_bytes: usize,
}

impl CompressionParams {
    pub fn from_config(config: &CompressionConfig) -> Self {
        let default_quality = Quality::new(config.default_quality);
        Self {
            default_quality,
            min_quality: Quality::new(config.min_quality).min(default_quality),
            target_bytes: config.target_slice_kb as usize * 1024,
        }
    }

    /// Upper bound on JPEG encodes for one slice.
    pub fn max_attempts(&self) -> u32 {
        (self.default_quality.0 - self.min_quality.0).div_ceil(QUALITY_STEP) + 1
    }
}

impl Default for CompressionParams {
    fn default() -> Self {
        Self::from_config(&CompressionConfig::default())
    }
}

/// A crop rectangle in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn right(&self) -> u32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.top + self.height
    }
}
