//! Image processing: pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Probe** | header-only decoder dimensions |
//! | **Decode upload** | `image` decoders + EXIF orientation |
//! | **Resize → JPEG** | Lanczos3 + `JpegEncoder` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension and bucket math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Validation**: Upload decoding and dimension bounds
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;
pub mod validation;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{
    MAX_RATIO_TENTHS, MIN_RATIO_TENTHS, bucketed_dimensions, compute_bucket_ratio,
    compute_canonical_size, compute_thumbnail_size, is_close_to_canonical,
};
pub use operations::{EncodedUpload, encode_bucketed, encode_upload};
pub use params::{EncodeParams, Quality, VariantLimits};
pub use rust_backend::RustBackend;
pub use validation::{NormalizedImage, ValidationError, validate_upload};
