//! High-level image operations.
//!
//! These functions combine calculations with backend execution. They
//! compute parameters from limits and hand the pixel work to the backend.
//! Nothing here touches the filesystem except [`encode_bucketed`], which
//! reads the canonical artifact it resizes from.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{bucketed_dimensions, compute_canonical_size, compute_thumbnail_size};
use super::params::{EncodeParams, Quality, VariantLimits};
use super::validation::NormalizedImage;
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Encoded canonical + thumbnail bytes for a fresh upload.
#[derive(Debug, Clone)]
pub struct EncodedUpload {
    pub canonical: Vec<u8>,
    pub canonical_dimensions: Dimensions,
    pub thumbnail: Vec<u8>,
}

/// Plan the canonical re-encode for an image of the given size.
pub fn plan_canonical(dims: Dimensions, limits: &VariantLimits, quality: Quality) -> EncodeParams {
    let (width, height) = compute_canonical_size(dims.width, dims.height, limits.canonical_max_edge);
    EncodeParams {
        width,
        height,
        quality,
    }
}

/// Plan the thumbnail re-encode for an image of the given size.
pub fn plan_thumbnail(dims: Dimensions, limits: &VariantLimits, quality: Quality) -> EncodeParams {
    let (width, height) = compute_thumbnail_size(dims.width, dims.height, limits.thumbnail_edge);
    EncodeParams {
        width,
        height,
        quality,
    }
}

/// Plan a bucketed variant of an image of the given size.
pub fn plan_bucketed(dims: Dimensions, ratio_tenths: u32, quality: Quality) -> EncodeParams {
    let (width, height) = bucketed_dimensions(dims.width, dims.height, ratio_tenths);
    EncodeParams {
        width,
        height,
        quality,
    }
}

/// Encode the canonical artifact and thumbnail for a validated upload.
///
/// Both are derived from the upright upload, never from each other.
pub fn encode_upload(
    backend: &(impl ImageBackend + ?Sized),
    upload: &NormalizedImage,
    limits: &VariantLimits,
    quality: Quality,
) -> Result<EncodedUpload> {
    let canonical_params = plan_canonical(upload.dimensions, limits, quality);
    let canonical = backend.resize_and_encode(&upload.pixels, &canonical_params)?;

    let thumbnail_params = plan_thumbnail(upload.dimensions, limits, quality);
    let thumbnail = backend.resize_and_encode(&upload.pixels, &thumbnail_params)?;

    Ok(EncodedUpload {
        canonical,
        canonical_dimensions: Dimensions {
            width: canonical_params.width,
            height: canonical_params.height,
        },
        thumbnail,
    })
}

/// Decode a canonical artifact and re-encode it at the given bucket.
pub fn encode_bucketed(
    backend: &(impl ImageBackend + ?Sized),
    canonical_path: &Path,
    ratio_tenths: u32,
    quality: Quality,
) -> Result<Vec<u8>> {
    let canonical = backend.decode_file(canonical_path)?;
    let params = plan_bucketed(Dimensions::of(&canonical), ratio_tenths, quality);
    backend.resize_and_encode(&canonical, &params)
}
