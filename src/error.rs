use thiserror::Error;

use crate::credentials::CredentialError;
use crate::imaging::BackendError;
use crate::upload::UploadError;

/// Why an export invocation failed.
///
/// Every variant is terminal: nothing is retried and slices processed before
/// the failure are discarded. Per-slice variants carry the 1-based index.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid body region: header and footer leave no rows to slice (top {top}, bottom {bottom})")]
    InvalidBodyRegion { top: u32, bottom: u32 },
    #[error("no valid manual slices: every rectangle was degenerate after clamping to the body")]
    NoValidManualSlices,
    #[error("unreadable source image: {0}")]
    UnreadableSourceImage(String),
    #[error(transparent)]
    CredentialNotFound(#[from] CredentialError),
    #[error("slice {index}: extraction failed: {source}")]
    ExtractionFailed { index: usize, source: BackendError },
    #[error("slice {index}: compression failed: {source}")]
    CompressionFailed { index: usize, source: BackendError },
    #[error("slice {index}: upload failed: {source}")]
    UploadFailed { index: usize, source: UploadError },
}

impl PipelineError {
    /// The 1-based slice index for per-slice failures.
    pub fn slice_index(&self) -> Option<usize> {
        match self {
            Self::ExtractionFailed { index, .. }
            | Self::CompressionFailed { index, .. }
            | Self::UploadFailed { index, .. } => Some(*index),
            _ => None,
        }
    }
}
