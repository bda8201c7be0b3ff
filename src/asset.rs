//! Assets and their stored renditions, as seen by the engine.
//!
//! Storage is not the engine's business: callers implement [`Asset`] and
//! [`AssetSource`] over whatever repository they have. [`StaticAsset`] and
//! [`InMemoryAssetSource`] cover fixtures and simple deployments, and
//! deserialize from JSON:
//!
//! ```json
//! {
//!   "path": "/content/dam/sample.jpg",
//!   "renditions": [
//!     { "path": "/content/dam/sample.jpg/original", "file_name": "sample.jpg",
//!       "mime_type": "image/jpeg", "width": 400, "height": 250, "original": true }
//!   ]
//! }
//! ```

use crate::file_type::{MediaFileType, base_name, extension_of};
use crate::geometry::{CropDimension, ratios_match};
use crate::types::Dimension;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A stored binary variant of an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRendition {
    pub path: String,
    pub file_name: String,
    pub mime_type: String,
    pub width: u64,
    pub height: u64,
    #[serde(default)]
    pub file_size: Option<u64>,
    /// The raw upload every virtual rendition is derived from.
    #[serde(default)]
    pub original: bool,
    /// Pre-generated web rendition.
    #[serde(default)]
    pub web_rendition: bool,
}

impl AssetRendition {
    pub fn dimension(&self) -> Dimension {
        Dimension::new(self.width, self.height)
    }

    pub fn ratio(&self) -> f64 {
        self.dimension().ratio()
    }

    pub fn extension(&self) -> String {
        extension_of(&self.file_name)
    }

    /// File type from the extension, else from the MIME type.
    pub fn file_type(&self) -> Option<MediaFileType> {
        MediaFileType::from_extension(&self.extension())
            .or_else(|| MediaFileType::from_mime_type(&self.mime_type))
    }

    pub fn is_image(&self) -> bool {
        self.file_type().is_some_and(MediaFileType::is_image)
    }

    pub fn is_vector(&self) -> bool {
        self.file_type().is_some_and(MediaFileType::is_vector)
    }

    /// Raster image the engine may crop, rotate and resize.
    pub fn is_raster_image(&self) -> bool {
        self.is_image() && !self.is_vector()
    }
}

/// A named smart-crop region for one ratio.
///
/// Offsets and sizes are fractions of the original image. The size is
/// optional: profiles that only declare a region name still match by ratio,
/// they just cannot be size-validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartCropRegion {
    pub name: String,
    pub ratio: f64,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub normalized_width: Option<f64>,
    #[serde(default)]
    pub normalized_height: Option<f64>,
}

impl SmartCropRegion {
    pub fn new(name: impl Into<String>, ratio: f64) -> Self {
        Self {
            name: name.into(),
            ratio,
            left: 0.0,
            top: 0.0,
            normalized_width: None,
            normalized_height: None,
        }
    }

    pub fn with_area(mut self, left: f64, top: f64, width: f64, height: f64) -> Self {
        self.left = left;
        self.top = top;
        self.normalized_width = Some(width);
        self.normalized_height = Some(height);
        self
    }

    /// Region size in pixels of `image`, when the profile knows it.
    pub fn max_dimension(&self, image: Dimension) -> Option<Dimension> {
        let (nw, nh) = (self.normalized_width?, self.normalized_height?);
        let d = Dimension::new(
            (image.width as f64 * nw).round() as u64,
            (image.height as f64 * nh).round() as u64,
        );
        d.is_known().then_some(d)
    }

    /// Region as a crop rectangle on `image`, clamped to the image bounds.
    pub fn crop_dimension(&self, image: Dimension) -> Option<CropDimension> {
        let size = self.max_dimension(image)?;
        let left = ((image.width as f64 * self.left).round() as u64).min(image.width - 1);
        let top = ((image.height as f64 * self.top).round() as u64).min(image.height - 1);
        Some(CropDimension::auto(
            left,
            top,
            size.width.min(image.width - left),
            size.height.min(image.height - top),
        ))
    }

    /// The region covers at least `requested` pixels of `image`.
    ///
    /// Regions without a known size always pass.
    pub fn is_large_enough(&self, image: Dimension, requested: Dimension) -> bool {
        match self.max_dimension(image) {
            Some(available) => available.covers(requested),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmartCropProfile {
    pub regions: Vec<SmartCropRegion>,
}

impl SmartCropProfile {
    pub fn new(regions: Vec<SmartCropRegion>) -> Self {
        Self { regions }
    }

    /// First region whose ratio matches within tolerance.
    pub fn find_by_ratio(&self, ratio: f64) -> Option<&SmartCropRegion> {
        if ratio <= 0.0 {
            return None;
        }
        self.regions.iter().find(|r| ratios_match(r.ratio, ratio))
    }
}

/// Read-only view of one asset.
pub trait Asset: Send + Sync {
    fn path(&self) -> &str;

    fn renditions(&self) -> &[AssetRendition];

    /// Last path segment.
    fn file_name(&self) -> &str {
        self.path().rsplit('/').next().unwrap_or_default()
    }

    fn title(&self) -> &str {
        base_name(self.file_name())
    }

    /// The flagged original, else the largest rendition by area.
    fn original(&self) -> Option<&AssetRendition> {
        let renditions = self.renditions();
        renditions
            .iter()
            .find(|r| r.original)
            .or_else(|| renditions.iter().max_by_key(|r| r.dimension().area()))
    }

    fn smart_crop_profile(&self) -> Option<&SmartCropProfile> {
        None
    }

    /// Classic Dynamic Media object path (`company/folder/name`), when published there.
    fn dynamic_media_object(&self) -> Option<&str> {
        None
    }

    /// Next-gen asset id (`urn:aaid:aem:…`), when known.
    fn asset_id(&self) -> Option<&str> {
        None
    }
}

/// Reference → asset lookup.
pub trait AssetSource: Send + Sync {
    fn asset(&self, reference: &str) -> Option<Arc<dyn Asset>>;
}

/// Asset described entirely by data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticAsset {
    pub path: String,
    #[serde(default)]
    pub renditions: Vec<AssetRendition>,
    #[serde(default)]
    pub smart_crop_profile: Option<SmartCropProfile>,
    #[serde(default)]
    pub dynamic_media_object: Option<String>,
    #[serde(default)]
    pub asset_id: Option<String>,
}

impl StaticAsset {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_rendition(mut self, rendition: AssetRendition) -> Self {
        self.renditions.push(rendition);
        self
    }

    pub fn with_smart_crop_profile(mut self, profile: SmartCropProfile) -> Self {
        self.smart_crop_profile = Some(profile);
        self
    }

    pub fn with_dynamic_media_object(mut self, object: impl Into<String>) -> Self {
        self.dynamic_media_object = Some(object.into());
        self
    }

    pub fn with_asset_id(mut self, asset_id: impl Into<String>) -> Self {
        self.asset_id = Some(asset_id.into());
        self
    }
}

impl Asset for StaticAsset {
    fn path(&self) -> &str {
        &self.path
    }

    fn renditions(&self) -> &[AssetRendition] {
        &self.renditions
    }

    fn smart_crop_profile(&self) -> Option<&SmartCropProfile> {
        self.smart_crop_profile.as_ref()
    }

    fn dynamic_media_object(&self) -> Option<&str> {
        self.dynamic_media_object.as_deref()
    }

    fn asset_id(&self) -> Option<&str> {
        self.asset_id.as_deref()
    }
}

#[derive(Default, Clone)]
pub struct InMemoryAssetSource {
    assets: HashMap<String, Arc<dyn Asset>>,
}

impl InMemoryAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asset: impl Asset + 'static) {
        self.assets
            .insert(asset.path().to_string(), Arc::new(asset));
    }

    pub fn with_asset(mut self, asset: impl Asset + 'static) -> Self {
        self.insert(asset);
        self
    }

    /// Load a JSON array of [`StaticAsset`]s.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let assets: Vec<StaticAsset> = serde_json::from_str(json)?;
        Ok(assets.into_iter().fold(Self::new(), Self::with_asset))
    }
}

impl AssetSource for InMemoryAssetSource {
    fn asset(&self, reference: &str) -> Option<Arc<dyn Asset>> {
        self.assets.get(reference).cloned()
    }
}
