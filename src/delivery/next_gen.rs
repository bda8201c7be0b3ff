//! Next-generation Dynamic Media delivery.
//!
//! | URL | Form |
//! |---|---|
//! | Image | `https://{repo}{image_delivery_path}?crop=…&height=…&…&width=…` |
//! | Binary | `https://{repo}{binary_delivery_path}` |
//!
//! Query parameters are sorted by name; only `crop` and `smartcrop` are
//! percent-encoded, the rest are numbers.
//!
//! Size and crop parameters, first rule that applies:
//!
//! 1. A smart crop of the asset matches the requested ratio: `smartcrop`
//!    plus width (or height). With neither, the default size goes on the
//!    region's longer side.
//! 2. The original's ratio differs from the requested one: a centered
//!    relative `crop` plus width (or height).
//! 3. Otherwise width and height as requested. With neither but a ratio,
//!    the default size goes on the longer side and the other is derived.
//!
//! Remote assets (`/urn:…/name.jpg` references) are resolved by
//! [`NextGenRenditionSource`]; stored assets with an asset id go through
//! [`NextGenBackend`] in the router.

use super::metadata::NextGenMetadata;
use super::{DeliveryBackend, DeliveryKind, DeliveryRequest, delivery_format, sanitize_seo_name};
use crate::asset::{Asset, AssetRendition, SmartCropProfile, SmartCropRegion};
use crate::config::NextGenConfig;
use crate::error::ContractError;
use crate::file_type::{MediaFileType, base_name, extension_of};
use crate::format::MediaFormat;
use crate::geometry::{CropDimension, auto_crop_rectangle, ratios_match};
use crate::rendition::{MatchRequest, Rendition, RenditionSource, ResolvedRendition, Transformation};
use crate::request::RenditionRequest;
use crate::transform::Quality;
use crate::types::{Dimension, Rotation};
use crate::uri_template::{SENTINEL_HEIGHT, SENTINEL_WIDTH, UriTemplate, UriTemplateType};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

static REFERENCE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(urn:[^/]+)/([^/]+)$").expect("valid reference pattern"));

const PARAM_CROP: &str = "crop";
const PARAM_HEIGHT: &str = "height";
const PARAM_QUALITY: &str = "quality";
const PARAM_ROTATE: &str = "rotate";
const PARAM_SMARTCROP: &str = "smartcrop";
const PARAM_WIDTH: &str = "width";

// =========================================================================
// Reference
// =========================================================================

/// `/urn:aaid:aem:…/my-image.jpg`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextGenReference {
    pub asset_id: String,
    pub file_name: String,
}

impl NextGenReference {
    pub fn parse(reference: &str) -> Option<Self> {
        let captures = REFERENCE_PATTERN.captures(reference)?;
        Some(Self {
            asset_id: captures[1].to_string(),
            file_name: captures[2].to_string(),
        })
    }

    pub fn is_reference(reference: &str) -> bool {
        REFERENCE_PATTERN.is_match(reference)
    }
}

impl fmt::Display for NextGenReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.asset_id, self.file_name)
    }
}

// =========================================================================
// Remote asset
// =========================================================================

/// Asset living in a remote repository, known only by reference and metadata.
///
/// It has exactly one rendition, the original, whose size is `0x0` when no
/// metadata is available.
#[derive(Debug, Clone)]
pub struct RemoteAsset {
    reference: NextGenReference,
    path: String,
    renditions: Vec<AssetRendition>,
    metadata: Option<NextGenMetadata>,
    smart_crop_profile: Option<SmartCropProfile>,
}

impl RemoteAsset {
    pub fn new(reference: NextGenReference, metadata: Option<NextGenMetadata>) -> Self {
        let path = reference.to_string();
        let dimension = metadata
            .as_ref()
            .and_then(|m| m.dimension)
            .unwrap_or_default();
        let mime_type = metadata
            .as_ref()
            .and_then(|m| m.mime_type.clone())
            .or_else(|| {
                MediaFileType::from_extension(&extension_of(&reference.file_name))
                    .map(|t| t.mime_type().to_string())
            })
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let original = AssetRendition {
            path: path.clone(),
            file_name: reference.file_name.clone(),
            mime_type,
            width: dimension.width,
            height: dimension.height,
            file_size: metadata.as_ref().and_then(|m| m.file_size),
            original: true,
            web_rendition: false,
        };
        let smart_crop_profile = metadata
            .as_ref()
            .and_then(NextGenMetadata::smart_crop_profile);
        Self {
            reference,
            path,
            renditions: vec![original],
            metadata,
            smart_crop_profile,
        }
    }

    pub fn reference(&self) -> &NextGenReference {
        &self.reference
    }

    pub fn metadata(&self) -> Option<&NextGenMetadata> {
        self.metadata.as_ref()
    }

    fn original_dimension(&self) -> Option<Dimension> {
        self.metadata.as_ref().and_then(|m| m.dimension)
    }
}

impl Asset for RemoteAsset {
    fn path(&self) -> &str {
        &self.path
    }

    fn renditions(&self) -> &[AssetRendition] {
        &self.renditions
    }

    fn file_name(&self) -> &str {
        &self.reference.file_name
    }

    fn smart_crop_profile(&self) -> Option<&SmartCropProfile> {
        self.smart_crop_profile.as_ref()
    }

    fn asset_id(&self) -> Option<&str> {
        Some(&self.reference.asset_id)
    }
}

// =========================================================================
// URL builder
// =========================================================================

/// What to ask the image delivery for. `0` sides are not requested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NextGenImageParams {
    pub width: u64,
    pub height: u64,
    /// Requested ratio, drives smart crop and auto-crop selection.
    pub ratio: Option<f64>,
    /// Explicit crop on the original; wins over smart and auto crops.
    pub crop: Option<CropDimension>,
    pub rotation: Option<Rotation>,
    pub quality: Option<Quality>,
    pub output_extension: Option<String>,
}

/// URLs for one asset in one repository.
pub struct NextGenUrlBuilder<'a> {
    config: &'a NextGenConfig,
    repository_id: &'a str,
    asset_id: &'a str,
    file_name: &'a str,
    original: Option<Dimension>,
    smart_crops: &'a [SmartCropRegion],
}

impl<'a> NextGenUrlBuilder<'a> {
    pub fn new(
        config: &'a NextGenConfig,
        repository_id: &'a str,
        asset_id: &'a str,
        file_name: &'a str,
    ) -> Self {
        Self {
            config,
            repository_id,
            asset_id,
            file_name,
            original: None,
            smart_crops: &[],
        }
    }

    /// Original size, enables auto-crop detection.
    pub fn with_original(mut self, original: Option<Dimension>) -> Self {
        self.original = original.filter(Dimension::is_known);
        self
    }

    pub fn with_smart_crops(mut self, smart_crops: &'a [SmartCropRegion]) -> Self {
        self.smart_crops = smart_crops;
        self
    }

    /// Scaled and cropped image URL; `None` when repository or path is not configured.
    pub fn image_url(&self, params: &NextGenImageParams) -> Option<String> {
        if self.repository_id.trim().is_empty()
            || self.config.image_delivery_path.trim().is_empty()
        {
            return None;
        }
        let extension = params
            .output_extension
            .clone()
            .unwrap_or_else(|| extension_of(self.file_name));
        let path = self
            .config
            .image_delivery_path
            .replace("{asset-id}", self.asset_id)
            .replace("{seo-name}", &sanitize_seo_name(base_name(self.file_name)))
            .replace("{format}", delivery_format(&extension));

        let mut query = BTreeMap::new();
        self.apply_size_and_crop(params, &mut query);
        if let Some(rotation) = params.rotation {
            query.insert(PARAM_ROTATE, rotation.to_string());
        }
        if let Some(quality) = params.quality {
            query.insert(PARAM_QUALITY, quality.as_percentage().to_string());
        }

        let mut url = format!("https://{}{path}", self.repository_id);
        if !query.is_empty() {
            url.push(if url.contains('?') { '&' } else { '?' });
            let pairs: Vec<String> = query
                .iter()
                .map(|(key, value)| match *key {
                    PARAM_CROP | PARAM_SMARTCROP => format!("{key}={}", urlencoding::encode(value)),
                    _ => format!("{key}={value}"),
                })
                .collect();
            url.push_str(&pairs.join("&"));
        }
        Some(url)
    }

    /// Original binary URL.
    pub fn binary_url(&self) -> Option<String> {
        if self.repository_id.trim().is_empty()
            || self.config.binary_delivery_path.trim().is_empty()
        {
            return None;
        }
        let path = self
            .config
            .binary_delivery_path
            .replace("{asset-id}", self.asset_id)
            .replace("{seo-name}", self.file_name);
        Some(format!("https://{}{path}", self.repository_id))
    }

    /// Template with a width placeholder, or a height placeholder for scale-by-height.
    ///
    /// Bounds are the original size, or `0x0` when unknown.
    pub fn template(
        &self,
        template_type: UriTemplateType,
        params: &NextGenImageParams,
    ) -> Option<UriTemplate> {
        let (width, height) = match template_type {
            UriTemplateType::ScaleHeight => (0, SENTINEL_HEIGHT),
            UriTemplateType::CropCenter | UriTemplateType::ScaleWidth => (SENTINEL_WIDTH, 0),
        };
        let url = self.image_url(&NextGenImageParams {
            width,
            height,
            ..params.clone()
        })?;
        Some(UriTemplate::new(
            template_type.apply_placeholders(&url),
            template_type,
            self.original.unwrap_or_default(),
        ))
    }

    fn apply_size_and_crop(
        &self,
        params: &NextGenImageParams,
        query: &mut BTreeMap<&'static str, String>,
    ) {
        let width_or_height = |query: &mut BTreeMap<&'static str, String>| {
            if params.width > 0 {
                query.insert(PARAM_WIDTH, params.width.to_string());
                true
            } else if params.height > 0 {
                query.insert(PARAM_HEIGHT, params.height.to_string());
                true
            } else {
                false
            }
        };
        let default_size = self.config.image_width_height_default;

        if let (Some(crop), Some(original)) = (params.crop, self.original) {
            query.insert(PARAM_CROP, crop.relative_string(original));
            width_or_height(query);
            return;
        }

        let smart_crop = params
            .ratio
            .and_then(|r| self.smart_crops.iter().find(|c| ratios_match(c.ratio, r)));
        if let Some(smart_crop) = smart_crop {
            query.insert(PARAM_SMARTCROP, smart_crop.name.clone());
            if !width_or_height(query) {
                let landscape = self
                    .original
                    .and_then(|o| smart_crop.max_dimension(o))
                    .is_none_or(|d| d.width >= d.height);
                let key = if landscape { PARAM_WIDTH } else { PARAM_HEIGHT };
                query.insert(key, default_size.to_string());
            }
            return;
        }

        let auto_crop = match (self.original, params.ratio) {
            (Some(original), Some(ratio)) if !ratios_match(original.ratio(), ratio) => {
                auto_crop_rectangle(original.width, original.height, ratio)
                    .map(|crop| crop.relative_string(original))
            }
            _ => None,
        };
        if let Some(crop) = auto_crop {
            query.insert(PARAM_CROP, crop);
            width_or_height(query);
            return;
        }

        if params.width > 0 {
            query.insert(PARAM_WIDTH, params.width.to_string());
        }
        if params.height > 0 {
            query.insert(PARAM_HEIGHT, params.height.to_string());
        }
        if params.width == 0 && params.height == 0 {
            if let Some(ratio) = params.ratio {
                let (mut width, mut height) = (default_size, default_size);
                if ratio > 1.0 {
                    height = (width as f64 / ratio).round() as u64;
                } else if ratio < 1.0 {
                    width = (height as f64 * ratio).round() as u64;
                }
                query.insert(PARAM_WIDTH, width.to_string());
                query.insert(PARAM_HEIGHT, height.to_string());
            }
        }
    }
}

fn non_raster_template_error(template_type: UriTemplateType) -> ContractError {
    ContractError::UnsupportedTemplateType {
        template_type: template_type.to_string(),
        context: "a next-gen asset that is not a raster image".into(),
    }
}

// =========================================================================
// Remote rendition source
// =========================================================================

/// Resolves formats for a [`RemoteAsset`] without matching stored renditions.
///
/// Sizes come from the request, or the format's minimum, or the original.
/// Images are never upscaled: a request larger than the known original
/// size resolves to nothing.
pub struct NextGenRenditionSource<'a> {
    asset: &'a RemoteAsset,
    config: &'a NextGenConfig,
    default_quality: Quality,
}

impl<'a> NextGenRenditionSource<'a> {
    pub fn new(
        asset: &'a RemoteAsset,
        config: &'a NextGenConfig,
        default_quality: Quality,
    ) -> Self {
        Self {
            asset,
            config,
            default_quality,
        }
    }

    fn url_builder(&self) -> NextGenUrlBuilder<'a> {
        let smart_crops = self
            .asset
            .metadata()
            .map_or(&[][..], |m| m.smart_crops.as_slice());
        NextGenUrlBuilder::new(
            self.config,
            &self.config.remote_repository_id,
            &self.asset.reference.asset_id,
            &self.asset.reference.file_name,
        )
        .with_original(self.asset.original_dimension())
        .with_smart_crops(smart_crops)
    }

    /// Asset-level template for `format` (its ratio selects smart crops).
    pub fn uri_template(
        &self,
        template_type: UriTemplateType,
        format: Option<&MediaFormat>,
        request: &RenditionRequest,
    ) -> Result<Option<UriTemplate>, ContractError> {
        if !self.asset.renditions[0].is_raster_image() {
            return Err(non_raster_template_error(template_type));
        }
        let ratio = MatchRequest::from_request(request, format).requested_ratio();
        let params = NextGenImageParams {
            ratio: (ratio > 0.0).then_some(ratio),
            rotation: request.rotation(),
            quality: Some(self.quality(request)),
            output_extension: request.enforce_output_extension().map(str::to_string),
            ..NextGenImageParams::default()
        };
        Ok(self.url_builder().template(template_type, &params))
    }

    fn quality(&self, request: &RenditionRequest) -> Quality {
        request.quality().map_or(self.default_quality, Quality::new)
    }
}

impl RenditionSource for NextGenRenditionSource<'_> {
    fn resolve(
        &self,
        format: Option<&Arc<MediaFormat>>,
        request: &RenditionRequest,
    ) -> Option<ResolvedRendition> {
        let format_ref = format.map(Arc::as_ref);
        let source = self.asset.renditions[0].clone();
        if format_ref.is_some_and(|f| !f.accepts_extension(&source.extension())) {
            return None;
        }
        let builder = self.url_builder();
        let original = self.asset.original_dimension();
        let download = request.download() || format_ref.is_some_and(|f| f.download);

        let (rendition, url) = if download || !source.is_image() {
            (Rendition::stored(source), builder.binary_url())
        } else {
            let ratio = MatchRequest::from_request(request, format_ref).requested_ratio();
            let (mut width, mut height) = (request.fixed_width(), request.fixed_height());
            if width == 0 {
                if let Some(f) = format_ref {
                    width = f.effective_min_width();
                    height = f.effective_min_height();
                }
            }
            let size = requested_size(&mut width, &mut height, ratio, original);

            if source.is_vector() {
                let size = original.unwrap_or(size);
                (Rendition::vector(source, size), builder.binary_url())
            } else {
                if original.is_some_and(|o| width > o.width || height > o.height) {
                    log::trace!(
                        "requested {width}x{height} exceeds original of {}",
                        self.asset.reference
                    );
                    return None;
                }
                let params = NextGenImageParams {
                    width,
                    height,
                    ratio: (ratio > 0.0).then_some(ratio),
                    crop: None,
                    rotation: request.rotation(),
                    quality: Some(self.quality(request)),
                    output_extension: request.enforce_output_extension().map(str::to_string),
                };
                let url = builder.image_url(&params);
                let transformation = Transformation {
                    crop: None,
                    rotation: params.rotation,
                    quality: params.quality,
                    output_extension: params.output_extension,
                };
                (
                    Rendition::virtual_rendition(source, size, transformation),
                    url,
                )
            }
        };

        Some(ResolvedRendition {
            rendition,
            delivered_by: url.as_ref().map(|_| DeliveryKind::NextGen),
            url,
            fallback: false,
            format: format.cloned(),
        })
    }
}

/// Output size for the requested sides; a single side is completed by the
/// requested ratio (which then counts as requested too) or the original's.
fn requested_size(
    width: &mut u64,
    height: &mut u64,
    ratio: f64,
    original: Option<Dimension>,
) -> Dimension {
    match (*width, *height) {
        (w, h) if w > 0 && h > 0 => Dimension::new(w, h),
        (0, 0) => original.unwrap_or_default(),
        (w, 0) => {
            if ratio > 0.0 {
                *height = (w as f64 / ratio).round() as u64;
                Dimension::new(w, *height)
            } else {
                let h = original.map_or(0, |o| (w as f64 / o.ratio()).round() as u64);
                Dimension::new(w, h)
            }
        }
        (0, h) => {
            if ratio > 0.0 {
                *width = (h as f64 * ratio).round() as u64;
                Dimension::new(*width, h)
            } else {
                let w = original.map_or(0, |o| (h as f64 * o.ratio()).round() as u64);
                Dimension::new(w, h)
            }
        }
        _ => Dimension::default(),
    }
}

// =========================================================================
// Router backend for stored assets
// =========================================================================

/// Serves stored assets that carry a next-gen asset id from the local repository.
///
/// Authoritative: once an asset has an id, no other backend is asked.
pub struct NextGenBackend {
    config: NextGenConfig,
    default_quality: Quality,
}

impl NextGenBackend {
    pub fn new(config: NextGenConfig, default_quality: Quality) -> Self {
        Self {
            config,
            default_quality,
        }
    }

    fn url_builder<'a>(
        &'a self,
        request: &DeliveryRequest<'a>,
        asset_id: &'a str,
    ) -> NextGenUrlBuilder<'a> {
        let smart_crops = request
            .asset
            .smart_crop_profile()
            .map_or(&[][..], |p| p.regions.as_slice());
        NextGenUrlBuilder::new(
            &self.config,
            &self.config.local_repository_id,
            asset_id,
            request.asset.file_name(),
        )
        .with_original(request.asset.original().map(AssetRendition::dimension))
        .with_smart_crops(smart_crops)
    }

    fn params(&self, request: &DeliveryRequest) -> NextGenImageParams {
        let rendition = request.rendition;
        NextGenImageParams {
            width: rendition.width,
            height: rendition.height,
            ratio: request.requested_ratio(),
            crop: rendition.crop().filter(|c| !c.auto_crop),
            rotation: rendition.rotation(),
            quality: Some(request.quality_or(self.default_quality)),
            output_extension: request
                .request
                .enforce_output_extension()
                .map(str::to_string),
        }
    }
}

impl DeliveryBackend for NextGenBackend {
    fn kind(&self) -> DeliveryKind {
        DeliveryKind::NextGen
    }

    fn try_build_url(&self, request: &DeliveryRequest) -> Option<String> {
        let asset_id = request.asset.asset_id()?;
        let builder = self.url_builder(request, asset_id);
        let rendition = request.rendition;
        if request.download() || !rendition.source.is_raster_image() {
            return builder.binary_url();
        }
        builder.image_url(&self.params(request))
    }

    fn is_authoritative(&self, request: &DeliveryRequest) -> bool {
        request.asset.asset_id().is_some()
    }

    fn try_build_template(
        &self,
        request: &DeliveryRequest,
        template_type: UriTemplateType,
    ) -> Result<Option<UriTemplate>, ContractError> {
        let Some(asset_id) = request.asset.asset_id() else {
            return Ok(None);
        };
        if !request.rendition.source.is_raster_image() {
            return Err(non_raster_template_error(template_type));
        }
        let params = NextGenImageParams {
            width: 0,
            height: 0,
            ..self.params(request)
        };
        Ok(self
            .url_builder(request, asset_id)
            .template(template_type, &params))
    }
}
