//! Width-bucketed variant cache.
//!
//! Resizing a canonical artifact is the expensive part of serving an image.
//! This module lets the fetch path skip it whenever a variant for the same
//! bucket has been generated before.
//!
//! # Design
//!
//! The cache is **file-addressed**: there is no manifest. A variant's path is
//! derived from `(user, image, ratio bucket)` by the
//! [path resolver](crate::paths), so "is it cached" is just "does the file
//! exist". Variants are not tracked as metadata and can be deleted at any
//! time; a miss regenerates them from the canonical artifact.
//!
//! ## Buckets
//!
//! A requested width is turned into a ratio of the canonical longer side,
//! rounded half-up to the nearest tenth (see
//! [`compute_bucket_ratio`](crate::imaging::compute_bucket_ratio)). Many
//! requested widths collapse onto one bucket, trading exact sizing for hit
//! rate. Requests at or above 90% of the longer side get the canonical
//! artifact itself.
//!
//! ## Concurrency
//!
//! Two requests for the same cold bucket may both miss and both encode.
//! Encoding is deterministic and every write goes through
//! [`write_atomic`](crate::storage::write_atomic), so the loser overwrites
//! the winner with identical bytes and no reader sees a partial file.

use crate::error::ImageError;
use crate::imaging::{
    Dimensions, ImageBackend, Quality, compute_bucket_ratio, encode_bucketed,
    is_close_to_canonical,
};
use crate::paths::{StorageLayout, VariantKind};
use crate::storage::write_atomic;
use std::fmt;
use std::path::PathBuf;

/// How a variant request was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantOutcome {
    /// No resize needed; the canonical artifact is served.
    Canonical,
    /// A previously generated variant was found on disk.
    Hit,
    /// The variant was generated and written by this call.
    Generated,
}

impl fmt::Display for VariantOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Canonical => write!(f, "canonical"),
            Self::Hit => write!(f, "cached"),
            Self::Generated => write!(f, "generated"),
        }
    }
}

/// A resolved, existing-or-generated artifact ready to stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedVariant {
    pub path: PathBuf,
    pub outcome: VariantOutcome,
}

/// Decide which artifact serves a request, without touching the disk.
///
/// - no width → canonical
/// - width ≥ 90% of the longer side → canonical
/// - otherwise → bucketed at the rounded tenth
pub fn plan_variant(original: Dimensions, requested_width: Option<u32>) -> VariantKind {
    let longer = original.longer_side();
    match requested_width {
        None => VariantKind::Canonical,
        Some(width) if is_close_to_canonical(width, longer) => VariantKind::Canonical,
        Some(width) => VariantKind::Bucketed(compute_bucket_ratio(width, longer)),
    }
}

/// Return the artifact for `requested_width`, generating the bucketed
/// variant on first request.
///
/// `original` is the canonical artifact's recorded size. Blocking: call
/// from a blocking context.
pub fn get_or_create_bucketed_variant(
    backend: &(impl ImageBackend + ?Sized),
    layout: &StorageLayout,
    user_id: &str,
    image_id: &str,
    original: Dimensions,
    requested_width: Option<u32>,
    quality: Quality,
) -> Result<CachedVariant, ImageError> {
    let kind = plan_variant(original, requested_width);
    let path = layout.resolve(user_id, image_id, kind)?;

    let VariantKind::Bucketed(ratio_tenths) = kind else {
        return Ok(CachedVariant {
            path,
            outcome: VariantOutcome::Canonical,
        });
    };

    if path.is_file() {
        tracing::debug!(user = user_id, image = image_id, ratio_tenths, "variant cache hit");
        return Ok(CachedVariant {
            path,
            outcome: VariantOutcome::Hit,
        });
    }

    let canonical = layout.resolve(user_id, image_id, VariantKind::Canonical)?;
    let bytes = encode_bucketed(backend, &canonical, ratio_tenths, quality)?;
    write_atomic(&path, &bytes)?;
    tracing::info!(
        user = user_id,
        image = image_id,
        ratio_tenths,
        path = %path.display(),
        "generated variant"
    );

    Ok(CachedVariant {
        path,
        outcome: VariantOutcome::Generated,
    })
}
