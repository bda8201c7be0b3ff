//! Candidate and resolved renditions.

use crate::asset::AssetRendition;
use crate::delivery::DeliveryKind;
use crate::file_type::{MediaFileType, extension_of};
use crate::format::MediaFormat;
use crate::geometry::{CropDimension, rotate_map_dimension};
use crate::transform::{Quality, image_file_name};
use crate::types::{Dimension, Rotation};
use std::sync::Arc;

/// How a virtual rendition is derived from its stored source.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformation {
    pub crop: Option<CropDimension>,
    pub rotation: Option<Rotation>,
    pub quality: Option<Quality>,
    /// Output extension when it differs from the source (enforced output).
    pub output_extension: Option<String>,
}

impl Transformation {
    pub fn is_identity(&self) -> bool {
        self.crop.is_none() && self.rotation.is_none() && self.output_extension.is_none()
    }
}

/// A stored rendition as-is, or a virtual one computed from it on demand.
///
/// Virtual renditions are never larger than their cropped and rotated source.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendition {
    pub source: AssetRendition,
    pub width: u64,
    pub height: u64,
    /// `None` for a stored rendition delivered unchanged.
    pub transformation: Option<Transformation>,
}

impl Rendition {
    pub fn stored(source: AssetRendition) -> Self {
        Self {
            width: source.width,
            height: source.height,
            source,
            transformation: None,
        }
    }

    pub fn virtual_rendition(
        source: AssetRendition,
        size: Dimension,
        transformation: Transformation,
    ) -> Self {
        Self {
            source,
            width: size.width,
            height: size.height,
            transformation: Some(transformation),
        }
    }

    /// Scaled vector image: only the advertised size changes, the file is delivered as-is.
    pub fn vector(source: AssetRendition, size: Dimension) -> Self {
        Self {
            source,
            width: size.width,
            height: size.height,
            transformation: None,
        }
    }

    pub fn dimension(&self) -> Dimension {
        Dimension::new(self.width, self.height)
    }

    pub fn ratio(&self) -> f64 {
        self.dimension().ratio()
    }

    /// Computed on demand rather than stored.
    pub fn is_virtual(&self) -> bool {
        self.transformation.is_some() || self.dimension() != self.source.dimension()
    }

    pub fn is_vector(&self) -> bool {
        self.source.is_vector()
    }

    pub fn is_image(&self) -> bool {
        self.source.is_image()
    }

    pub fn crop(&self) -> Option<CropDimension> {
        self.transformation.as_ref().and_then(|t| t.crop)
    }

    pub fn rotation(&self) -> Option<Rotation> {
        self.transformation.as_ref().and_then(|t| t.rotation)
    }

    pub fn quality(&self) -> Option<Quality> {
        self.transformation.as_ref().and_then(|t| t.quality)
    }

    /// Size of the source region after crop and rotation: the largest this rendition can be.
    pub fn natural_dimension(&self) -> Dimension {
        let cropped = self
            .crop()
            .map_or(self.source.dimension(), |c| c.dimension());
        rotate_map_dimension(cropped, self.rotation())
    }

    /// Extension of the delivered file.
    pub fn extension(&self) -> String {
        if let Some(ext) = self
            .transformation
            .as_ref()
            .and_then(|t| t.output_extension.clone())
        {
            return ext;
        }
        if self.is_virtual() && !self.is_vector() {
            return extension_of(&self.file_name());
        }
        self.source.extension()
    }

    pub fn mime_type(&self) -> String {
        MediaFileType::from_extension(&self.extension())
            .map(|t| t.mime_type().to_string())
            .unwrap_or_else(|| self.source.mime_type.clone())
    }

    /// File name as delivered: transformed rasters become `.jpg` or `.png`.
    pub fn file_name(&self) -> String {
        if self.is_vector() || !self.is_virtual() {
            return self.source.file_name.clone();
        }
        let enforced = self
            .transformation
            .as_ref()
            .and_then(|t| t.output_extension.as_deref());
        image_file_name(&self.source.file_name, enforced)
    }

    /// Byte size, only known for stored renditions delivered unchanged.
    pub fn file_size(&self) -> Option<u64> {
        if self.is_virtual() {
            None
        } else {
            self.source.file_size
        }
    }
}

/// Outcome of resolving one format.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRendition {
    pub rendition: Rendition,
    /// `None` when no backend could deliver it.
    pub url: Option<String>,
    /// Found only after relaxing an explicit crop.
    pub fallback: bool,
    pub format: Option<Arc<MediaFormat>>,
    /// Backend that built `url`.
    pub delivered_by: Option<DeliveryKind>,
}

impl ResolvedRendition {
    pub fn is_resolved(&self) -> bool {
        self.url.is_some()
    }
}
