//! Parameter types for image operations.
//!
//! These structs describe *what* to produce, not *how*. They sit between
//! the high-level [`operations`](super::operations) module (which decides
//! target sizes) and the [`backend`](super::backend) (which does the pixel
//! work), so a mock backend can stand in during tests.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy JPEG quality (1–100, default 75). Clamped on construction.
//! - [`EncodeParams`]: Target dimensions plus quality for one resize + re-encode.
//! - [`VariantLimits`]: Fixed edge lengths and dimension bounds shared by
//!   validation and sizing.

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(75)
    }
}

/// Parameters for a single resize + re-encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
}

/// Size limits that govern every artifact of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantLimits {
    /// Longer side of every thumbnail.
    pub thumbnail_edge: u32,
    /// Longer side ceiling for canonical artifacts.
    pub canonical_max_edge: u32,
    /// Smallest accepted upload dimension (per axis).
    pub min_dimension: u32,
    /// Largest accepted upload dimension (per axis).
    pub max_dimension: u32,
}

impl Default for VariantLimits {
    fn default() -> Self {
        Self {
            thumbnail_edge: 150,
            canonical_max_edge: 3840,
            min_dimension: 400,
            max_dimension: 10_000,
        }
    }
}
