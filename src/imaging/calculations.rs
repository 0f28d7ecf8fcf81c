//! Pure calculation functions for image dimensions and variant buckets.
//!
//! All functions here are pure and testable without any I/O or images.
//! Everything is integer arithmetic so bucket boundaries never depend on
//! floating-point rounding.

/// Smallest bucket a resized variant can land in (10% of the original).
pub const MIN_RATIO_TENTHS: u32 = 1;

/// Largest bucket (100% of the original).
pub const MAX_RATIO_TENTHS: u32 = 10;

/// Scale `side` by `edge / longer`, rounding half up, never below 1px.
fn scale_side(side: u32, edge: u32, longer: u32) -> u32 {
    let side = u64::from(side);
    let edge = u64::from(edge);
    let longer = u64::from(longer);
    let scaled = (2 * side * edge + longer) / (2 * longer);
    scaled.max(1) as u32
}

/// Scale `(width, height)` so the longer side is exactly `edge`,
/// preserving aspect ratio.
fn scale_to_longer_edge(width: u32, height: u32, edge: u32) -> (u32, u32) {
    if width >= height {
        (edge, scale_side(height, edge, width))
    } else {
        (scale_side(width, edge, height), edge)
    }
}

/// Calculate thumbnail dimensions.
///
/// The longer side always becomes `edge`, whatever the original size.
///
/// # Examples
/// ```
/// # use slyde::imaging::compute_thumbnail_size;
/// assert_eq!(compute_thumbnail_size(2000, 1000, 150), (150, 75));
/// assert_eq!(compute_thumbnail_size(400, 600, 150), (100, 150));
/// ```
pub fn compute_thumbnail_size(width: u32, height: u32, edge: u32) -> (u32, u32) {
    scale_to_longer_edge(width, height, edge)
}

/// Calculate canonical artifact dimensions.
///
/// Images whose longer side already fits under `ceiling` keep their size;
/// larger ones are scaled down so the longer side equals `ceiling`.
pub fn compute_canonical_size(width: u32, height: u32, ceiling: u32) -> (u32, u32) {
    if width.max(height) <= ceiling {
        (width, height)
    } else {
        scale_to_longer_edge(width, height, ceiling)
    }
}

/// Whether a requested size is close enough to the original that the
/// canonical artifact is served instead of a bucketed variant.
///
/// True when `requested >= 0.9 * longer_side`.
pub fn is_close_to_canonical(requested: u32, longer_side: u32) -> bool {
    u64::from(requested) * 10 >= u64::from(longer_side) * 9
}

/// Map a requested longer side onto a resize bucket, in tenths.
///
/// `requested / original` rounded half up to the nearest tenth and clamped
/// to `1..=10`. Many requested sizes collapse onto one bucket, which is what
/// makes the on-disk variant cache hit.
///
/// # Examples
/// ```
/// # use slyde::imaging::compute_bucket_ratio;
/// assert_eq!(compute_bucket_ratio(600, 2000), 3);
/// assert_eq!(compute_bucket_ratio(650, 2000), 3); // 3.25 -> 3
/// assert_eq!(compute_bucket_ratio(700, 2000), 4); // 3.5 rounds up
/// assert_eq!(compute_bucket_ratio(10, 2000), 1);  // never below 1
/// ```
pub fn compute_bucket_ratio(requested: u32, original_longer_side: u32) -> u32 {
    if original_longer_side == 0 {
        return MAX_RATIO_TENTHS;
    }
    let requested = u64::from(requested);
    let longer = u64::from(original_longer_side);
    let tenths = (20 * requested + longer) / (2 * longer);
    tenths.clamp(u64::from(MIN_RATIO_TENTHS), u64::from(MAX_RATIO_TENTHS)) as u32
}

/// Dimensions of a bucketed variant: `original * ratio_tenths / 10`,
/// truncated, never below 1px.
pub fn bucketed_dimensions(width: u32, height: u32, ratio_tenths: u32) -> (u32, u32) {
    let scale = |side: u32| {
        let scaled = u64::from(side) * u64::from(ratio_tenths) / 10;
        scaled.max(1) as u32
    };
    (scale(width), scale(height))
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // compute_thumbnail_size tests
    // =========================================================================

    #[test]
    fn thumbnail_landscape() {
        assert_eq!(compute_thumbnail_size(2000, 1000, 150), (150, 75));
    }

    #[test]
    fn thumbnail_portrait() {
        assert_eq!(compute_thumbnail_size(1000, 4000, 150), (38, 150));
    }

    #[test]
    fn thumbnail_square() {
        assert_eq!(compute_thumbnail_size(400, 400, 150), (150, 150));
    }

    #[test]
    fn thumbnail_longer_side_is_always_the_edge() {
        for (w, h) in [(400, 10_000), (10_000, 400), (1234, 987), (3001, 3000)] {
            let (tw, th) = compute_thumbnail_size(w, h, 150);
            assert_eq!(tw.max(th), 150, "{w}x{h} -> {tw}x{th}");
        }
    }

    #[test]
    fn thumbnail_extreme_aspect_never_collapses_to_zero() {
        assert_eq!(compute_thumbnail_size(10_000, 10, 150), (150, 1));
    }

    // =========================================================================
    // compute_canonical_size tests
    // =========================================================================

    #[test]
    fn canonical_keeps_small_images() {
        assert_eq!(compute_canonical_size(2000, 1000, 3840), (2000, 1000));
    }

    #[test]
    fn canonical_keeps_exact_ceiling() {
        assert_eq!(compute_canonical_size(3840, 2160, 3840), (3840, 2160));
    }

    #[test]
    fn canonical_scales_large_landscape() {
        assert_eq!(compute_canonical_size(7680, 4320, 3840), (3840, 2160));
    }

    #[test]
    fn canonical_scales_large_portrait() {
        assert_eq!(compute_canonical_size(5000, 10_000, 3840), (1920, 3840));
    }

    // =========================================================================
    // bucket tests
    // =========================================================================

    #[test]
    fn close_to_canonical_threshold() {
        assert!(is_close_to_canonical(1800, 2000));
        assert!(is_close_to_canonical(5000, 2000));
        assert!(!is_close_to_canonical(1799, 2000));
    }

    #[test]
    fn bucket_exact_tenth() {
        assert_eq!(compute_bucket_ratio(600, 2000), 3);
    }

    #[test]
    fn bucket_rounds_half_up() {
        // 0.35 -> 4, 0.25 -> 3
        assert_eq!(compute_bucket_ratio(700, 2000), 4);
        assert_eq!(compute_bucket_ratio(500, 2000), 3);
    }

    #[test]
    fn bucket_collapses_nearby_requests() {
        let a = compute_bucket_ratio(560, 2000);
        let b = compute_bucket_ratio(640, 2000);
        assert_eq!(a, 3);
        assert_eq!(a, b);
    }

    #[test]
    fn bucket_never_below_one() {
        assert_eq!(compute_bucket_ratio(0, 2000), 1);
        assert_eq!(compute_bucket_ratio(50, 2000), 1);
    }

    #[test]
    fn bucket_never_above_ten() {
        assert_eq!(compute_bucket_ratio(u32::MAX, 400), 10);
    }

    #[test]
    fn bucketed_dimensions_scale_both_sides() {
        assert_eq!(bucketed_dimensions(2000, 1000, 3), (600, 300));
        assert_eq!(bucketed_dimensions(1001, 999, 5), (500, 499));
    }

    #[test]
    fn bucketed_dimensions_never_zero() {
        assert_eq!(bucketed_dimensions(5, 3, 1), (1, 1));
    }
}
