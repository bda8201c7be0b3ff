//! The rendition request: everything a caller may constrain.
//!
//! A [`RenditionRequest`] is immutable once built. Per-format variants used
//! during resolution are derived from it by value (see
//! [`MatchRequest`](crate::rendition::MatchRequest)), so nothing is mutated
//! and restored while formats are tried in turn.

use crate::format::MediaFormat;
use crate::geometry::CropDimension;
use crate::types::Rotation;
use crate::widths::WidthOption;
use std::sync::Arc;

/// A format given either directly or by name (resolved through the registry).
#[derive(Debug, Clone, PartialEq)]
pub enum FormatRef {
    Format(Arc<MediaFormat>),
    Name(String),
}

impl From<MediaFormat> for FormatRef {
    fn from(format: MediaFormat) -> Self {
        Self::Format(Arc::new(format))
    }
}

impl From<Arc<MediaFormat>> for FormatRef {
    fn from(format: Arc<MediaFormat>) -> Self {
        Self::Format(format)
    }
}

impl From<&str> for FormatRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormatOption {
    pub format: FormatRef,
    pub mandatory: bool,
}

/// `sizes` attribute value plus the widths to generate for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSizes {
    pub sizes: String,
    pub widths: Vec<WidthOption>,
}

impl ImageSizes {
    pub fn new(sizes: impl Into<String>, widths: Vec<WidthOption>) -> Self {
        Self {
            sizes: sizes.into(),
            widths,
        }
    }
}

/// One `<source>` of a picture element.
#[derive(Debug, Clone, PartialEq)]
pub struct PictureSource {
    pub format: FormatRef,
    pub media: Option<String>,
    pub sizes: Option<String>,
    pub widths: Vec<WidthOption>,
}

impl PictureSource {
    pub fn new(format: impl Into<FormatRef>, widths: Vec<WidthOption>) -> Self {
        Self {
            format: format.into(),
            media: None,
            sizes: None,
            widths,
        }
    }

    pub fn media(mut self, media: impl Into<String>) -> Self {
        self.media = Some(media.into());
        self
    }

    pub fn sizes(mut self, sizes: impl Into<String>) -> Self {
        self.sizes = Some(sizes.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenditionRequest {
    formats: Vec<FormatOption>,
    fixed_width: u64,
    fixed_height: u64,
    crop: Option<CropDimension>,
    rotation: Option<Rotation>,
    auto_crop: bool,
    enforce_output_extension: Option<String>,
    quality: Option<f64>,
    image_sizes: Option<ImageSizes>,
    picture_sources: Vec<PictureSource>,
    download: bool,
    dynamic_media_disabled: bool,
    web_optimized_disabled: bool,
}

impl RenditionRequest {
    pub fn builder() -> RenditionRequestBuilder {
        RenditionRequestBuilder::default()
    }

    pub fn formats(&self) -> &[FormatOption] {
        &self.formats
    }

    /// Fixed width, `0` when not set.
    pub fn fixed_width(&self) -> u64 {
        self.fixed_width
    }

    pub fn fixed_height(&self) -> u64 {
        self.fixed_height
    }

    pub fn crop(&self) -> Option<CropDimension> {
        self.crop
    }

    pub fn rotation(&self) -> Option<Rotation> {
        self.rotation
    }

    pub fn auto_crop(&self) -> bool {
        self.auto_crop
    }

    pub fn enforce_output_extension(&self) -> Option<&str> {
        self.enforce_output_extension.as_deref()
    }

    /// Requested quality fraction (`0.0..=1.0`).
    pub fn quality(&self) -> Option<f64> {
        self.quality
    }

    pub fn image_sizes(&self) -> Option<&ImageSizes> {
        self.image_sizes.as_ref()
    }

    pub fn picture_sources(&self) -> &[PictureSource] {
        &self.picture_sources
    }

    /// Deliver as content-disposition attachment.
    pub fn download(&self) -> bool {
        self.download
    }

    pub fn dynamic_media_disabled(&self) -> bool {
        self.dynamic_media_disabled
    }

    pub fn web_optimized_disabled(&self) -> bool {
        self.web_optimized_disabled
    }

    /// Image sizes or picture sources were requested.
    pub fn is_responsive(&self) -> bool {
        self.image_sizes.is_some() || !self.picture_sources.is_empty()
    }
}

/// Builder yielding an immutable [`RenditionRequest`].
#[derive(Debug, Clone, Default)]
pub struct RenditionRequestBuilder {
    request: RenditionRequest,
}

impl RenditionRequestBuilder {
    /// Add an optional format.
    pub fn format(mut self, format: impl Into<FormatRef>) -> Self {
        self.request.formats.push(FormatOption {
            format: format.into(),
            mandatory: false,
        });
        self
    }

    /// Add a format that must resolve for the request to succeed.
    pub fn mandatory_format(mut self, format: impl Into<FormatRef>) -> Self {
        self.request.formats.push(FormatOption {
            format: format.into(),
            mandatory: true,
        });
        self
    }

    pub fn fixed_width(mut self, width: u64) -> Self {
        self.request.fixed_width = width;
        self
    }

    pub fn fixed_height(mut self, height: u64) -> Self {
        self.request.fixed_height = height;
        self
    }

    pub fn crop(mut self, crop: CropDimension) -> Self {
        self.request.crop = Some(crop);
        self
    }

    /// Rotation in degrees; `0` and invalid angles mean no rotation.
    pub fn rotation(mut self, degrees: i64) -> Self {
        self.request.rotation = Rotation::from_degrees(degrees);
        self
    }

    pub fn auto_crop(mut self, enabled: bool) -> Self {
        self.request.auto_crop = enabled;
        self
    }

    /// Checked against the configured allow-list when the request is resolved.
    pub fn enforce_output_extension(mut self, extension: &str) -> Self {
        self.request.enforce_output_extension = Some(extension.to_ascii_lowercase());
        self
    }

    /// Quality fraction, clamped to `0.0..=1.0`.
    pub fn quality(mut self, quality: f64) -> Self {
        self.request.quality = Some(quality.clamp(0.0, 1.0));
        self
    }

    pub fn image_sizes(mut self, image_sizes: ImageSizes) -> Self {
        self.request.image_sizes = Some(image_sizes);
        self
    }

    pub fn picture_source(mut self, source: PictureSource) -> Self {
        self.request.picture_sources.push(source);
        self
    }

    pub fn download(mut self, download: bool) -> Self {
        self.request.download = download;
        self
    }

    pub fn dynamic_media_disabled(mut self, disabled: bool) -> Self {
        self.request.dynamic_media_disabled = disabled;
        self
    }

    pub fn web_optimized_disabled(mut self, disabled: bool) -> Self {
        self.request.web_optimized_disabled = disabled;
        self
    }

    pub fn build(self) -> RenditionRequest {
        self.request
    }
}
