//! Pure resize geometry: aspect-preserving targets, fit and fill layouts.
//!
//! Ratios are `width / height` as `f64`; every derived axis is rounded half
//! away from zero (`f64::round`).

use crate::core::{Dimensions, PartialDimensions};

/// Smallest and largest accepted edge length in pixels.
pub const MIN_DIMENSION: u32 = 1;
pub const MAX_DIMENSION: u32 = 10_000;

fn round_px(value: f64) -> u32 {
    value.round() as u32
}

/// Completes a partial target from the original's aspect ratio.
///
/// Both axes given are returned verbatim (the caller accepts distortion),
/// one axis derives the other, and neither returns `original`.
pub fn aspect_preserve(original: Dimensions, target: PartialDimensions) -> Dimensions {
    let ratio = original.ratio();
    match (target.width, target.height) {
        (Some(width), Some(height)) => Dimensions::new(width, height),
        (Some(width), None) => Dimensions::new(width, round_px(width as f64 / ratio)),
        (None, Some(height)) => Dimensions::new(round_px(height as f64 * ratio), height),
        (None, None) => original,
    }
}

/// Largest size with `original`'s aspect ratio that fits inside `container`.
pub fn fit(original: Dimensions, container: Dimensions) -> Dimensions {
    let ratio = original.ratio();
    if ratio > container.ratio() {
        // Relatively wider: width is the binding axis
        Dimensions::new(container.width, round_px(container.width as f64 / ratio))
    } else {
        Dimensions::new(round_px(container.height as f64 * ratio), container.height)
    }
}

/// Smallest size with `original`'s aspect ratio that covers `container`.
pub fn fill(original: Dimensions, container: Dimensions) -> Dimensions {
    let ratio = original.ratio();
    if ratio > container.ratio() {
        Dimensions::new(round_px(container.height as f64 * ratio), container.height)
    } else {
        Dimensions::new(container.width, round_px(container.width as f64 / ratio))
    }
}

/// Checks every specified axis lies within `MIN_DIMENSION..=MAX_DIMENSION`.
/// Unspecified axes are not checked.
pub fn validate(dimensions: PartialDimensions) -> bool {
    [dimensions.width, dimensions.height]
        .into_iter()
        .flatten()
        .all(|d| (MIN_DIMENSION..=MAX_DIMENSION).contains(&d))
}

/// Scale-preset target: each axis scaled and rounded, at least one pixel.
pub fn scaled(original: Dimensions, factor: f64) -> Dimensions {
    Dimensions::new(
        round_px(original.width as f64 * factor).max(1),
        round_px(original.height as f64 * factor).max(1),
    )
}

/// Offset that centers `inner` within `outer` on one axis. Negative when
/// `inner` overflows.
pub fn center_offset(outer: u32, inner: u32) -> i64 {
    (outer as i64 - inner as i64) / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    const HD: Dimensions = Dimensions::new(1920, 1080);
    const CONTAINER: Dimensions = Dimensions::new(800, 600);
    const TALL: Dimensions = Dimensions::new(600, 1200);

    #[test]
    fn aspect_preserve_from_width_or_height() {
        assert_eq!(aspect_preserve(HD, PartialDimensions::width(960)), Dimensions::new(960, 540));
        assert_eq!(aspect_preserve(HD, PartialDimensions::height(540)), Dimensions::new(960, 540));
    }

    #[test]
    fn aspect_preserve_passes_through_both_or_neither() {
        let both = PartialDimensions::new(Some(100), Some(900));
        assert_eq!(aspect_preserve(HD, both), Dimensions::new(100, 900));
        assert_eq!(aspect_preserve(HD, PartialDimensions::default()), HD);
    }

    #[test]
    fn aspect_preserve_matches_ratio_for_many_sizes() {
        for (w, h) in [(1920, 1080), (3, 7), (1000, 1), (640, 480), (1, 999)] {
            let original = Dimensions::new(w, h);
            for target in [1, 17, 333, 4096] {
                let got = aspect_preserve(original, PartialDimensions::width(target));
                let expected = (target as f64 / (w as f64 / h as f64)).round() as u32;
                assert_eq!(got, Dimensions::new(target, expected));
            }
        }
    }

    #[test]
    fn fit_scenarios() {
        assert_eq!(fit(HD, CONTAINER), Dimensions::new(800, 450));
        assert_eq!(fit(TALL, CONTAINER), Dimensions::new(300, 600));
    }

    #[test]
    fn fill_scenarios() {
        assert_eq!(fill(HD, CONTAINER), Dimensions::new(1067, 600));
        assert_eq!(fill(TALL, CONTAINER), Dimensions::new(800, 1600));
    }

    #[test]
    fn fit_stays_inside_and_fill_covers() {
        let sizes = [(1, 1), (1920, 1080), (600, 1200), (7, 3), (10000, 1), (1, 10000), (333, 333)];
        for &(ow, oh) in &sizes {
            for &(cw, ch) in &sizes {
                let original = Dimensions::new(ow, oh);
                let container = Dimensions::new(cw, ch);

                let f = fit(original, container);
                assert!(f.width <= container.width && f.height <= container.height, "fit {original:?} in {container:?} = {f:?}");
                assert!(f.width == container.width || f.height == container.height);

                let c = fill(original, container);
                assert!(c.width >= container.width && c.height >= container.height, "fill {original:?} over {container:?} = {c:?}");
                assert!(c.width == container.width || c.height == container.height);
            }
        }
    }

    #[test]
    fn validate_bounds() {
        assert!(!validate(PartialDimensions::new(Some(0), Some(600))));
        assert!(validate(PartialDimensions::new(Some(800), Some(600))));
        assert!(!validate(PartialDimensions::new(Some(800), Some(15000))));
        assert!(validate(PartialDimensions::new(None, Some(10_000))));
        assert!(validate(PartialDimensions::default()));
    }

    #[test]
    fn scaled_clamps_to_one_pixel() {
        assert_eq!(scaled(HD, 0.5), Dimensions::new(960, 540));
        assert_eq!(scaled(Dimensions::new(3, 1), 0.01), Dimensions::new(1, 1));
        assert_eq!(scaled(Dimensions::new(5, 3), 0.5), Dimensions::new(3, 2));
    }

    #[test]
    fn center_offsets() {
        assert_eq!(center_offset(800, 450), 175);
        assert_eq!(center_offset(600, 1600), -500);
    }
}
