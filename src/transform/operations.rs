//! High-level transform operations.
//!
//! These functions turn an endpoint selector into concrete parameters and
//! hand them to a backend. The planning step is pure; only [`render`]
//! touches the backend.

use super::backend::{TransformBackend, TransformError};
use super::params::{Quality, TransformParams};
use super::selector::ImageFileSelector;
use crate::asset::AssetRendition;
use crate::file_type::extension_of;
use crate::geometry::{auto_crop_rectangle, ratio, ratios_match, rotate_map_dimension};
use crate::types::Dimension;

/// Result type for transform operations.
pub type Result<T> = std::result::Result<T, TransformError>;

/// Plan the transform a selector asks for on `layer`.
///
/// 1. An explicit crop must lie inside the layer.
/// 2. A missing width or height is derived from the cropped, rotated ratio.
/// 3. Without an explicit crop, a ratio mismatch is fixed with a centered auto-crop.
/// 4. Rotation is applied after cropping.
/// 5. The layer is resized only when the target is not larger than it.
///
/// The output format is PNG when the requested file name ends in `.png`,
/// JPEG otherwise.
pub fn plan_transform(
    layer: &AssetRendition,
    selector: &ImageFileSelector,
    file_name: &str,
    default_quality: Quality,
) -> Result<TransformParams> {
    if selector.width == 0 && selector.height == 0 {
        return Err(TransformError::InvalidSelector(
            "width and height are both zero".into(),
        ));
    }
    let layer_dim = layer.dimension();
    if !layer_dim.is_known() {
        return Err(TransformError::ProcessingFailed(format!(
            "source {} has unknown dimensions",
            layer.path
        )));
    }
    if let Some(crop) = selector.crop.filter(|c| !c.fits_within(layer_dim)) {
        return Err(TransformError::CropOutOfBounds {
            crop: crop.to_string(),
            source_width: layer_dim.width,
            source_height: layer_dim.height,
        });
    }

    let base = selector.crop.map_or(layer_dim, |c| c.dimension());
    let base_ratio = rotate_map_dimension(base, selector.rotation).ratio();
    let (mut width, mut height) = (selector.width, selector.height);
    if width == 0 {
        width = (height as f64 * base_ratio).round() as u64;
    } else if height == 0 {
        height = (width as f64 / base_ratio).round() as u64;
    }

    let mut crop = selector.crop;
    if crop.is_none() {
        let requested = ratio(width, height);
        if requested > 0.0 && !ratios_match(base_ratio, requested) {
            // The crop happens before rotation, so aim for the unrotated shape.
            let target = match selector.rotation {
                Some(r) if r.swaps_dimensions() => 1.0 / requested,
                _ => requested,
            };
            crop = auto_crop_rectangle(layer_dim.width, layer_dim.height, target);
        }
    }

    let rotated =
        rotate_map_dimension(crop.map_or(layer_dim, |c| c.dimension()), selector.rotation);
    let output = if width <= rotated.width && height <= rotated.height {
        Dimension::new(width, height)
    } else {
        rotated
    };

    let output_extension = if extension_of(file_name) == "png" {
        "png"
    } else {
        "jpg"
    };

    Ok(TransformParams {
        source: layer.path.clone(),
        crop,
        rotation: selector.rotation,
        output,
        quality: selector
            .quality
            .map_or(default_quality, Quality::from_percentage),
        output_extension: output_extension.to_string(),
    })
}

/// Plan and execute a transform, returning the encoded image.
pub fn render(
    backend: &impl TransformBackend,
    layer: &AssetRendition,
    selector: &ImageFileSelector,
    file_name: &str,
    default_quality: Quality,
) -> Result<Vec<u8>> {
    let params = plan_transform(layer, selector, file_name, default_quality)?;
    backend.transform(&params)
}
