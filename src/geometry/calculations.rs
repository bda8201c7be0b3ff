//! Pure calculation functions for ratios, crops and rotated dimensions.
//!
//! All functions here are pure and testable without any asset or backend.

use super::crop::CropDimension;
use crate::types::{Dimension, Rotation};

/// Two ratios closer than this are the same shape.
pub const RATIO_TOLERANCE: f64 = 0.01;

/// Absorbs float noise at the tolerance edge (`1.61 - 1.6` is `0.0100000000000000089`).
const EDGE_SLACK: f64 = 1e-9;

/// `width / height`, or `0.0` when either side is unknown.
pub fn ratio(width: u64, height: u64) -> f64 {
    if width == 0 || height == 0 {
        return 0.0;
    }
    width as f64 / height as f64
}

/// Ratio equality within [`RATIO_TOLERANCE`], inclusive and symmetric.
///
/// ```
/// # use rendition_router::geometry::ratios_match;
/// assert!(ratios_match(400.0 / 250.0, 16.0 / 10.0));
/// assert!(ratios_match(1.6, 1.61));
/// assert!(!ratios_match(1.6, 1.62));
/// ```
pub fn ratios_match(a: f64, b: f64) -> bool {
    (a - b).abs() <= RATIO_TOLERANCE + EDGE_SLACK
}

/// Largest rectangle with `target_ratio` centered inside `width`×`height`.
///
/// Offsets and sizes are rounded, never truncated, and the rectangle never
/// leaves the source bounds. The result is flagged as an auto-crop.
/// Returns `None` for unknown source dimensions or a non-positive ratio.
///
/// ```
/// # use rendition_router::geometry::auto_crop_rectangle;
/// // 400x250 at 4:3 → keep full height, trim the sides
/// let crop = auto_crop_rectangle(400, 250, 4.0 / 3.0).unwrap();
/// assert_eq!((crop.left, crop.top, crop.width, crop.height), (34, 0, 333, 250));
/// ```
pub fn auto_crop_rectangle(width: u64, height: u64, target_ratio: f64) -> Option<CropDimension> {
    if width == 0 || height == 0 || target_ratio <= 0.0 || !target_ratio.is_finite() {
        return None;
    }
    let image_ratio = ratio(width, height);
    let (left, top, crop_w, crop_h) = if image_ratio < target_ratio {
        // Taller than wanted: keep the width, trim top and bottom
        let crop_h = ((width as f64 / target_ratio).round() as u64).clamp(1, height);
        let top = ((height - crop_h) as f64 / 2.0).round() as u64;
        (0, top, width, crop_h)
    } else {
        // Wider than wanted (or equal): keep the height, trim the sides
        let crop_w = ((height as f64 * target_ratio).round() as u64).clamp(1, width);
        let left = ((width - crop_w) as f64 / 2.0).round() as u64;
        (left, 0, crop_w, height)
    };
    Some(CropDimension::auto(left, top, crop_w, crop_h))
}

/// Width after rotation: quarter turns return `height`.
pub fn rotate_map_width(width: u64, height: u64, rotation: Option<Rotation>) -> u64 {
    match rotation {
        Some(r) if r.swaps_dimensions() => height,
        _ => width,
    }
}

/// Height after rotation: quarter turns return `width`.
pub fn rotate_map_height(width: u64, height: u64, rotation: Option<Rotation>) -> u64 {
    match rotation {
        Some(r) if r.swaps_dimensions() => width,
        _ => height,
    }
}

pub fn rotate_map_dimension(dimension: Dimension, rotation: Option<Rotation>) -> Dimension {
    Dimension::new(
        rotate_map_width(dimension.width, dimension.height, rotation),
        rotate_map_height(dimension.width, dimension.height, rotation),
    )
}

/// Output size for scaling `source` toward `target` without ever enlarging.
///
/// A `0` side in `target` is derived from the source ratio; a fully unknown
/// target keeps the source size. If the derived target does not fit inside
/// `source`, the source size is returned unchanged.
pub fn fit_within(target: Dimension, source: Dimension) -> Dimension {
    let source_ratio = source.ratio();
    let derived = match (target.width, target.height) {
        (0, 0) => return source,
        (w, 0) if source_ratio > 0.0 => Dimension::new(w, (w as f64 / source_ratio).round() as u64),
        (0, h) if source_ratio > 0.0 => Dimension::new((h as f64 * source_ratio).round() as u64, h),
        (w, h) => Dimension::new(w, h),
    };
    if source.covers(derived) && derived.is_known() {
        derived
    } else {
        source
    }
}

/// Scale `dimension` down so neither side exceeds `limit`, keeping the ratio.
///
/// Width is capped first; the resulting height is then checked again.
pub fn limit_to_size(dimension: Dimension, limit: Dimension) -> Dimension {
    let r = dimension.ratio();
    let mut result = dimension;
    if limit.width > 0 && result.width > limit.width && r > 0.0 {
        result = Dimension::new(limit.width, (limit.width as f64 / r).round() as u64);
    }
    if limit.height > 0 && result.height > limit.height && r > 0.0 {
        result = Dimension::new((limit.height as f64 * r).round() as u64, limit.height);
    }
    result
}
