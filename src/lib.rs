//! # Frame Slicer
//!
//! Turns one exported design frame into an ordered set of compressed image
//! slices, each uploaded to an image host, ready to be stacked back together
//! in an email or landing page.
//!
//! # Architecture: Rectangles, Then Pixels
//!
//! An export runs in two phases:
//!
//! ```text
//! 1. Layout   frame geometry  →  rectangles     (logical 1x coordinates)
//! 2. Pixels   rectangles      →  SliceBatch     (rescale, extract, compress, upload)
//! ```
//!
//! Layout is pure integer math and never touches an image. Rectangles come
//! either from the caller (manual mode, clamped by [`manual`]) or from the
//! frame's children (auto mode, proposed by [`suggest`]). The pixel phase in
//! [`pipeline`] maps each rectangle onto the high-resolution export and walks
//! the slices strictly in order.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Entry points: [`pipeline::suggest`] and [`pipeline::export`] |
//! | [`suggest`] | Auto-slicing from child bounding boxes |
//! | [`manual`] | Clamps caller-drawn rectangles into the body region |
//! | [`geometry`] | Interval merge/split and pixel clamping helpers |
//! | [`imaging`] | Rescale, extract, and adaptive PNG/JPEG compression |
//! | [`upload`] | The image-API call, behind the [`upload::ImageUploader`] trait |
//! | [`credentials`] | Picks one upload key per export from the configured accounts |
//! | [`naming`] | The `{batch}-slice-{N}` upload name convention |
//! | [`config`] | `slicer.toml` loading, validation, and merging |
//! | [`types`] | Rectangles and results serialized across the library boundary |
//! | [`error`] | [`error::PipelineError`], the single failure type of an export |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Body Region
//!
//! Header and footer bands are never sliced. Everything else in the frame,
//! the body, is covered exactly once by auto-suggested slices: every pixel row
//! belongs to one slice, with no gaps and no overlaps. Manual rectangles are
//! clamped into the body but may overlap each other.
//!
//! ## All or Nothing
//!
//! An export either returns every slice or an error naming the first slice
//! that failed. Nothing is retried and there is no partial batch.
//!
//! ## Format Follows Alpha
//!
//! Slices with any transparency are always PNG. Opaque slices are always JPEG,
//! searched down in quality until they fit the byte budget or reach the floor.
//! The reported original size is the decoded pixel buffer of the region.

pub mod config;
pub mod credentials;
pub mod error;
pub mod geometry;
pub mod imaging;
pub mod manual;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod suggest;
pub mod types;
pub mod upload;

pub use error::PipelineError;
pub use pipeline::{ExportRequest, SuggestRequest, SuggestResponse};
