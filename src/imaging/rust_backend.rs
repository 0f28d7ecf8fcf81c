//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Probe dimensions | `ImageReader::into_decoder` + `ImageDecoder::dimensions` (header only) |
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate decoders, format sniffed from content |
//! | Orientation | `ImageDecoder::orientation` + `DynamicImage::apply_orientation` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` at fixed quality |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::EncodeParams;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::io::Cursor;
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn reader_for(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, BackendError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(BackendError::Io)
}

impl ImageBackend for RustBackend {
    fn probe(&self, bytes: &[u8]) -> Result<Dimensions, BackendError> {
        let decoder = reader_for(bytes)?
            .into_decoder()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        let (width, height) = decoder.dimensions();
        Ok(Dimensions { width, height })
    }

    fn decode_upright(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
        let mut decoder = reader_for(bytes)?
            .into_decoder()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        // Missing or unreadable EXIF is treated as upright.
        let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
        let mut img =
            DynamicImage::from_decoder(decoder).map_err(|e| BackendError::Decode(e.to_string()))?;
        img.apply_orientation(orientation);
        Ok(img)
    }

    fn decode_file(&self, path: &Path) -> Result<DynamicImage, BackendError> {
        ImageReader::open(path)
            .map_err(BackendError::Io)?
            .with_guessed_format()
            .map_err(BackendError::Io)?
            .decode()
            .map_err(|e| {
                BackendError::Decode(format!("Failed to decode {}: {}", path.display(), e))
            })
    }

    fn resize_and_encode(
        &self,
        image: &DynamicImage,
        params: &EncodeParams,
    ) -> Result<Vec<u8>, BackendError> {
        let rgb = if image.width() == params.width && image.height() == params.height {
            image.to_rgb8()
        } else {
            image
                .resize_exact(params.width, params.height, FilterType::Lanczos3)
                .to_rgb8()
        };

        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, params.quality.value())
            .encode_image(&rgb)
            .map_err(|e| BackendError::Encode(format!("JPEG encode failed: {}", e)))?;
        Ok(bytes)
    }
}
