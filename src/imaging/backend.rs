//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the four operations every backend must
//! support: decode, extract, encode_lossless, and encode_jpeg.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! and `png` crates. Tests use the recording `MockBackend` below.

use super::params::{PixelRect, Quality};
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel dimensions of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn of(image: &DynamicImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }
}

/// Trait for image processing backends.
///
/// Every operation works on in-memory images and byte buffers so a whole
/// export runs without touching disk. `Sync` lets the parallel encode path
/// share one backend across rayon workers.
pub trait ImageBackend: Sync {
    /// Decode an encoded image (PNG, JPEG, WebP).
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError>;

    /// Copy out the exact pixels under `rect`. Fails if `rect` leaves the image.
    fn extract(&self, source: &DynamicImage, rect: &PixelRect)
    -> Result<DynamicImage, BackendError>;

    /// Encode as lossless PNG at maximum compression effort.
    fn encode_lossless(&self, image: &DynamicImage) -> Result<Vec<u8>, BackendError>;

    /// Encode as baseline JPEG at `quality`. Alpha is discarded.
    fn encode_jpeg(&self, image: &DynamicImage, quality: Quality)
    -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use image::RgbaImage;
    use std::sync::Mutex;

    /// Mock backend that records operations and returns placeholder bytes.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    pub struct MockBackend {
        /// Size of every lossless encode.
        pub lossless_size: usize,
        /// Size of a JPEG encode at a given quality.
        pub jpeg_size_at: fn(u32) -> usize,
        /// 1-based extract call that should fail, if any.
        pub fail_extract_on: Option<usize>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode(usize),
        Extract(PixelRect),
        EncodeLossless { width: u32, height: u32 },
        EncodeJpeg { width: u32, height: u32, quality: u32 },
    }

    impl Default for MockBackend {
        fn default() -> Self {
            Self {
                lossless_size: 1_000_000,
                jpeg_size_at: |q| q as usize * 1000,
                fail_extract_on: None,
                operations: Mutex::new(Vec::new()),
            }
        }
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_sizes(lossless_size: usize, jpeg_size_at: fn(u32) -> usize) -> Self {
            Self {
                lossless_size,
                jpeg_size_at,
                ..Self::default()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn jpeg_qualities(&self) -> Vec<u32> {
            self.get_operations()
                .into_iter()
                .filter_map(|op| match op {
                    RecordedOp::EncodeJpeg { quality, .. } => Some(quality),
                    _ => None,
                })
                .collect()
        }

        fn extract_calls(&self) -> usize {
            self.operations
                .lock()
                .unwrap()
                .iter()
                .filter(|op| matches!(op, RecordedOp::Extract(_)))
                .count()
        }
    }

    impl ImageBackend for MockBackend {
        fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Decode(bytes.len()));
            image::load_from_memory(bytes)
                .map_err(|e| BackendError::ProcessingFailed(format!("mock decode: {e}")))
        }

        fn extract(
            &self,
            _source: &DynamicImage,
            rect: &PixelRect,
        ) -> Result<DynamicImage, BackendError> {
            let call = self.extract_calls() + 1;
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Extract(*rect));
            if self.fail_extract_on == Some(call) {
                return Err(BackendError::ProcessingFailed("mock extract failure".into()));
            }
            Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                rect.width,
                rect.height,
                image::Rgba([255, 255, 255, 255]),
            )))
        }

        fn encode_lossless(&self, image: &DynamicImage) -> Result<Vec<u8>, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::EncodeLossless {
                    width: image.width(),
                    height: image.height(),
                });
            Ok(vec![0; self.lossless_size])
        }

        fn encode_jpeg(
            &self,
            image: &DynamicImage,
            quality: Quality,
        ) -> Result<Vec<u8>, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::EncodeJpeg {
                width: image.width(),
                height: image.height(),
                quality: quality.value(),
            });
            Ok(vec![0; (self.jpeg_size_at)(quality.value())])
        }
    }

    #[test]
    fn mock_records_extract() {
        let backend = MockBackend::new();
        let source = DynamicImage::new_rgba8(10, 10);
        let rect = PixelRect {
            left: 1,
            top: 2,
            width: 3,
            height: 4,
        };

        let region = backend.extract(&source, &rect).unwrap();
        assert_eq!(Dimensions::of(&region), Dimensions { width: 3, height: 4 });

        let ops = backend.get_operations();
        assert_eq!(ops, vec![RecordedOp::Extract(rect)]);
    }

    #[test]
    fn mock_fails_requested_extract() {
        let backend = MockBackend {
            fail_extract_on: Some(2),
            ..MockBackend::default()
        };
        let source = DynamicImage::new_rgba8(10, 10);
        let rect = PixelRect {
            left: 0,
            top: 0,
            width: 1,
            height: 1,
        };
        assert!(backend.extract(&source, &rect).is_ok());
        assert!(backend.extract(&source, &rect).is_err());
        assert!(backend.extract(&source, &rect).is_ok());
    }

    #[test]
    fn mock_records_encodes() {
        let backend = MockBackend::with_sizes(10, |q| q as usize);
        let image = DynamicImage::new_rgb8(4, 2);

        assert_eq!(backend.encode_lossless(&image).unwrap().len(), 10);
        assert_eq!(backend.encode_jpeg(&image, Quality::new(70)).unwrap().len(), 70);

        assert_eq!(
            backend.get_operations(),
            vec![
                RecordedOp::EncodeLossless {
                    width: 4,
                    height: 2
                },
                RecordedOp::EncodeJpeg {
                    width: 4,
                    height: 2,
                    quality: 70
                },
            ]
        );
        assert_eq!(backend.jpeg_qualities(), vec![70]);
    }
}
