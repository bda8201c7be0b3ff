//! Transform primitive trait and shared error type.
//!
//! The engine never touches pixels. When a deployment serves the local
//! transform endpoint it plugs an implementation of [`TransformBackend`] in
//! here (an image library, a sidecar service, a CDN edge function). Without
//! one, resolution still works: it only builds URLs, and the transform
//! happens later when the URL is fetched.

use super::params::TransformParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),
    #[error("Crop {crop} exceeds source {source_width}x{source_height}")]
    CropOutOfBounds {
        crop: String,
        source_width: u64,
        source_height: u64,
    },
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Executes a planned transform and returns the encoded bytes.
pub trait TransformBackend: Sync {
    fn transform(&self, params: &TransformParams) -> Result<Vec<u8>, TransformError>;
}
