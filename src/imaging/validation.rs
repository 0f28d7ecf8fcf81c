//! Upload validation and normalization.
//!
//! Bounds are checked against the header dimensions before any pixels are
//! decoded, so oversized uploads are rejected without allocating a buffer
//! for them. Orientation only swaps width and height, and the bounds are
//! the same on both axes, so checking the stored dimensions is equivalent
//! to checking the upright ones.

use super::backend::{Dimensions, ImageBackend};
use super::params::VariantLimits;
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("image {width}x{height} exceeds the {max}px limit")]
    TooLarge { width: u32, height: u32, max: u32 },
    #[error("image {width}x{height} is below the {min}px minimum")]
    TooSmall { width: u32, height: u32, min: u32 },
}

/// An upright, bounds-checked upload ready for re-encoding.
#[derive(Debug)]
pub struct NormalizedImage {
    pub pixels: DynamicImage,
    pub dimensions: Dimensions,
}

/// Check both axes against the configured bounds.
pub fn check_bounds(dims: Dimensions, limits: &VariantLimits) -> Result<(), ValidationError> {
    let Dimensions { width, height } = dims;
    if width > limits.max_dimension || height > limits.max_dimension {
        return Err(ValidationError::TooLarge {
            width,
            height,
            max: limits.max_dimension,
        });
    }
    if width < limits.min_dimension || height < limits.min_dimension {
        return Err(ValidationError::TooSmall {
            width,
            height,
            min: limits.min_dimension,
        });
    }
    Ok(())
}

/// Decode an uploaded byte stream into an upright, bounds-checked image.
pub fn validate_upload(
    backend: &(impl ImageBackend + ?Sized),
    bytes: &[u8],
    limits: &VariantLimits,
) -> Result<NormalizedImage, ValidationError> {
    let header = backend
        .probe(bytes)
        .map_err(|e| ValidationError::UnsupportedFormat(e.to_string()))?;
    check_bounds(header, limits)?;

    let pixels = backend
        .decode_upright(bytes)
        .map_err(|e| ValidationError::UnsupportedFormat(e.to_string()))?;
    let dimensions = Dimensions::of(&pixels);
    check_bounds(dimensions, limits)?;

    Ok(NormalizedImage { pixels, dimensions })
}
