//! Geometry and ratio math: pure functions, no I/O.
//!
//! | Concern | Function / type |
//! |---|---|
//! | **Ratio** | [`ratio`], [`ratios_match`] (tolerance [`RATIO_TOLERANCE`]) |
//! | **Auto-crop** | [`auto_crop_rectangle`]: largest centered rectangle for a ratio |
//! | **Rotation** | [`rotate_map_width`], [`rotate_map_height`], [`rotate_map_dimension`] |
//! | **Scaling** | [`fit_within`], [`limit_to_size`] |
//! | **Cropping** | [`CropDimension`] with its string encodings |
//!
//! Ratios are never compared for exact float equality: integer pixel math
//! makes `1.6` and `1.6000001` the same shape.

mod calculations;
mod crop;

pub use calculations::{
    RATIO_TOLERANCE, auto_crop_rectangle, fit_within, limit_to_size, ratio, ratios_match,
    rotate_map_dimension, rotate_map_height, rotate_map_width,
};
pub use crop::CropDimension;
