//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.
//! Scaling uses integer arithmetic with 64-bit intermediates and rounds to
//! nearest, ties away from zero, so the same inputs always give the same
//! pixel counts on every platform.

use super::MIN_DIMENSION;

/// Largest JPEG DCT scaling denominator.
pub const MAX_SHRINK_FACTOR: u32 = 8;

/// Calculate the largest dimensions that fit within `bound` while keeping the
/// aspect ratio of `source`.
///
/// One axis always equals its bound; the other is scaled and rounded. Neither
/// axis drops below [`MIN_DIMENSION`].
///
/// # Arguments
/// * `source` - Dimensions whose aspect ratio is kept (width, height)
/// * `bound` - Box the result must fit in (width, height)
///
/// # Examples
/// ```
/// # use safethumb::imaging::calculations::fit_within;
/// // 4:3 landscape into a square box → height shrinks
/// assert_eq!(fit_within((4000, 3000), (200, 200)), (200, 150));
///
/// // Portrait into a landscape box → width shrinks
/// assert_eq!(fit_within((600, 800), (400, 300)), (225, 300));
/// ```
pub fn fit_within(source: (u32, u32), bound: (u32, u32)) -> (u32, u32) {
    scale_aspect(source, bound, true)
}

/// Calculate the smallest dimensions that cover `bound` while keeping the
/// aspect ratio of `source`.
///
/// This is the intermediate size to resize to before an exact crop: one axis
/// matches the bound, the other may exceed it.
///
/// # Examples
/// ```
/// # use safethumb::imaging::calculations::cover;
/// // 4:3 landscape covering a square → width overflows
/// assert_eq!(cover((4000, 3000), (200, 200)), (267, 200));
/// ```
pub fn cover(source: (u32, u32), bound: (u32, u32)) -> (u32, u32) {
    scale_aspect(source, bound, false)
}

fn scale_aspect(source: (u32, u32), bound: (u32, u32), within: bool) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (bound_w, bound_h) = bound;

    if src_w == 0 || src_h == 0 || bound_w == 0 || bound_h == 0 {
        return bound;
    }

    // Source is relatively wider than the box
    let wider = u64::from(src_w) * u64::from(bound_h) > u64::from(src_h) * u64::from(bound_w);

    let (w, h) = if wider == within {
        // Width matches the bound, height follows the source aspect
        (bound_w, scale(src_h, bound_w, src_w))
    } else {
        // Height matches the bound, width follows the source aspect
        (scale(src_w, bound_h, src_h), bound_h)
    };

    (w.max(MIN_DIMENSION), h.max(MIN_DIMENSION))
}

/// `round(value * num / den)` with ties rounded up.
fn scale(value: u32, num: u32, den: u32) -> u32 {
    let n = u64::from(value) * u64::from(num);
    let d = u64::from(den);
    u32::try_from((2 * n + d) / (2 * d)).unwrap_or(u32::MAX)
}

/// Pick the largest power-of-two shrink factor (up to `max_factor`) whose
/// reduced image still covers `target` on both axes.
///
/// Mirrors JPEG DCT scaling, where a factor `f` yields `ceil(w / f)` by
/// `ceil(h / f)` pixels.
///
/// # Examples
/// ```
/// # use safethumb::imaging::calculations::shrink_factor;
/// assert_eq!(shrink_factor((4000, 3000), (267, 200), 8), 8);
/// assert_eq!(shrink_factor((800, 600), (400, 300), 8), 2);
/// assert_eq!(shrink_factor((800, 600), (800, 600), 8), 1);
/// ```
pub fn shrink_factor(source: (u32, u32), target: (u32, u32), max_factor: u32) -> u32 {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let mut factor = max_factor.max(1).next_power_of_two();
    if factor > max_factor.max(1) {
        factor /= 2;
    }
    while factor > 1 {
        if src_w.div_ceil(factor) >= tgt_w && src_h.div_ceil(factor) >= tgt_h {
            return factor;
        }
        factor /= 2;
    }
    1
}

/// Top-left corner for a centered crop of `target` out of `source`.
///
/// Odd leftovers put the extra pixel on the right/bottom edge.
pub fn center_crop_origin(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    (
        source.0.saturating_sub(target.0) / 2,
        source.1.saturating_sub(target.1) / 2,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // fit_within tests
    // =========================================================================

    #[test]
    fn fit_landscape_into_square() {
        assert_eq!(fit_within((4000, 3000), (200, 200)), (200, 150));
    }

    #[test]
    fn fit_portrait_into_square() {
        assert_eq!(fit_within((3000, 4000), (200, 200)), (150, 200));
    }

    #[test]
    fn fit_same_aspect_ratio_is_exact() {
        assert_eq!(fit_within((800, 600), (400, 300)), (400, 300));
    }

    #[test]
    fn fit_may_enlarge() {
        // Upscaling is prevented by the caller, not here
        assert_eq!(fit_within((100, 50), (400, 400)), (400, 200));
    }

    #[test]
    fn fit_rounds_half_up() {
        // 3 * 5 / 2 = 7.5 → 8
        assert_eq!(fit_within((2, 3), (5, 100)), (5, 8));
    }

    #[test]
    fn fit_clamps_to_min_dimension() {
        // 32766x2 into 100x100 → height would round to 0
        assert_eq!(fit_within((32766, 2), (100, 100)), (100, MIN_DIMENSION));
    }

    #[test]
    fn fit_box_into_source_clamps_crop_request() {
        // A 1000x500 crop request against a 400x300 source
        assert_eq!(fit_within((1000, 500), (400, 300)), (400, 200));
    }

    // =========================================================================
    // cover tests
    // =========================================================================

    #[test]
    fn cover_landscape_over_square() {
        assert_eq!(cover((4000, 3000), (200, 200)), (267, 200));
    }

    #[test]
    fn cover_portrait_over_landscape() {
        // Source is taller: width matches, height overflows
        assert_eq!(cover((600, 800), (500, 400)), (500, 667));
    }

    #[test]
    fn cover_wider_source_over_portrait() {
        assert_eq!(cover((800, 600), (400, 500)), (667, 500));
    }

    #[test]
    fn cover_same_aspect_ratio_is_exact() {
        assert_eq!(cover((800, 600), (400, 300)), (400, 300));
    }

    #[test]
    fn zero_inputs_return_bound() {
        assert_eq!(fit_within((0, 10), (5, 5)), (5, 5));
        assert_eq!(cover((10, 10), (0, 5)), (0, 5));
    }

    // =========================================================================
    // shrink_factor tests
    // =========================================================================

    #[test]
    fn shrink_picks_largest_covering_factor() {
        // 4000/8 = 500 ≥ 267, 3000/8 = 375 ≥ 200
        assert_eq!(shrink_factor((4000, 3000), (267, 200), 8), 8);
        // 4000/4 = 1000 ≥ 600 but 4000/8 = 500 < 600
        assert_eq!(shrink_factor((4000, 3000), (600, 450), 8), 4);
    }

    #[test]
    fn shrink_rounds_up_like_jpeg() {
        // ceil(801 / 2) = 401 ≥ 401
        assert_eq!(shrink_factor((801, 601), (401, 301), 8), 2);
    }

    #[test]
    fn shrink_respects_max_factor() {
        assert_eq!(shrink_factor((8000, 8000), (10, 10), 2), 2);
        assert_eq!(shrink_factor((8000, 8000), (10, 10), 1), 1);
        assert_eq!(shrink_factor((8000, 8000), (10, 10), 0), 1);
        // Non-power-of-two limits round down
        assert_eq!(shrink_factor((8000, 8000), (10, 10), 6), 4);
    }

    #[test]
    fn shrink_never_goes_below_target() {
        assert_eq!(shrink_factor((200, 200), (300, 300), 8), 1);
    }

    // =========================================================================
    // center_crop_origin tests
    // =========================================================================

    #[test]
    fn center_crop_even_leftover() {
        assert_eq!(center_crop_origin((267, 200), (200, 200)), (33, 0));
    }

    #[test]
    fn center_crop_no_leftover() {
        assert_eq!(center_crop_origin((200, 200), (200, 200)), (0, 0));
    }

    #[test]
    fn center_crop_target_larger_saturates() {
        assert_eq!(center_crop_origin((100, 100), (200, 50)), (0, 25));
    }
}
