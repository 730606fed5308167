//! Image processing in pure Rust, with no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory` |
//! | **Extract** | `crop_imm` after a bounds check |
//! | **Lossless** | indexed PNG via `png`, else `PngEncoder` |
//! | **Lossy** | `JpegEncoder` with a stepped quality search |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for rectangle math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{bytes_to_kb, rescale_rect};
pub use operations::{CompressedSlice, compress_region, has_transparency};
pub use params::{CompressionParams, OutputFormat, PixelRect, Quality};
pub use rust_backend::RustBackend;
