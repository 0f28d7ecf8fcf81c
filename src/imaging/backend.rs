//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait is everything the rest of the crate needs
//! from an image library: header probing, orientation-aware decoding of
//! uploads, decoding of stored artifacts, and resize + re-encode.
//!
//! The production implementation,
//! [`RustBackend`](super::rust_backend::RustBackend), is pure Rust and built
//! on the `image` crate.

use super::params::EncodeParams;
use image::DynamicImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
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

    pub fn longer_side(self) -> u32 {
        self.width.max(self.height)
    }
}

/// Trait for image processing backends.
///
/// Implementations must be shareable across request workers.
pub trait ImageBackend: Send + Sync {
    /// Read stored dimensions from the image header without decoding pixels.
    fn probe(&self, bytes: &[u8]) -> Result<Dimensions, BackendError>;

    /// Decode uploaded bytes, applying any embedded orientation so the
    /// returned pixel buffer is upright.
    fn decode_upright(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError>;

    /// Decode a previously stored artifact from disk.
    fn decode_file(&self, path: &Path) -> Result<DynamicImage, BackendError>;

    /// Resample to the target size and re-encode as JPEG.
    ///
    /// Deterministic: the same input and params always yield the same bytes.
    fn resize_and_encode(
        &self,
        image: &DynamicImage,
        params: &EncodeParams,
    ) -> Result<Vec<u8>, BackendError>;
}
