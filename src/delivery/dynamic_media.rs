//! Classic Dynamic Media (Scene7) image and content URLs.
//!
//! ```text
//! {server}/is/image/{object}%3A{smart crop}?wid=W&hei=H&fit=stretch
//! {server}/is/image/{object}?crop=l,t,w,h&rotate=R&wid=W&hei=H&fit=stretch
//! {server}/is/content/{object}[?cdh=attachment]
//! ```
//!
//! A named smart crop is used only when the rendition carries no explicit
//! crop or rotation and a profile region matches its ratio. When size
//! validation is on, a region smaller than the requested size falls back
//! to the explicit form.

use super::{DeliveryBackend, DeliveryKind, DeliveryRequest};
use crate::asset::{Asset, SmartCropRegion};
use crate::config::DynamicMediaConfig;
use crate::error::ContractError;
use crate::geometry::{CropDimension, limit_to_size};
use crate::rendition::Rendition;
use crate::types::{Dimension, Rotation};
use crate::uri_template::{PLACEHOLDER_HEIGHT, PLACEHOLDER_WIDTH, UriTemplate, UriTemplateType};

const IMAGE_SERVER_PATH: &str = "/is/image/";
const CONTENT_SERVER_PATH: &str = "/is/content/";
const DOWNLOAD_SUFFIX: &str = "?cdh=attachment";

pub struct DynamicMediaBackend {
    config: DynamicMediaConfig,
}

impl DynamicMediaBackend {
    pub fn new(config: DynamicMediaConfig) -> Self {
        Self { config }
    }

    /// The asset's Dynamic Media object, unless the request opts out.
    fn object<'a>(&self, request: &DeliveryRequest<'a>) -> Option<&'a str> {
        if request.request.dynamic_media_disabled() {
            return None;
        }
        request
            .asset
            .dynamic_media_object()
            .filter(|o| !o.is_empty())
    }

    fn content_url(&self, object: &str, download: bool) -> String {
        let suffix = if download { DOWNLOAD_SUFFIX } else { "" };
        format!(
            "{}{CONTENT_SERVER_PATH}{}{suffix}",
            self.config.server_url,
            encode_object(object)
        )
    }

    fn image_url(&self, asset: &dyn Asset, object: &str, rendition: &Rendition) -> String {
        let requested = rendition.dimension();
        let size = limit_to_size(requested, self.config.size_limit());
        let base = format!(
            "{}{IMAGE_SERVER_PATH}{}",
            self.config.server_url,
            encode_object(object)
        );
        let wh = format!("wid={}&hei={}&fit=stretch", size.width, size.height);

        let crop = rendition.crop();
        let rotation = rendition.rotation();
        if let Some(region) = smart_crop_region(asset, crop, rotation, Some(requested.ratio())) {
            let original = original_dimension(asset);
            if !self.config.validate_smart_crop_sizes
                || region.is_large_enough(original, requested)
            {
                return format!("{base}%3A{}?{wh}", region.name);
            }
            log::trace!(
                "smart crop {} of {} too small for {requested}",
                region.name,
                asset.path()
            );
        }
        format!("{base}?{}{wh}", crop_rotate_params(crop, rotation))
    }
}

impl DeliveryBackend for DynamicMediaBackend {
    fn kind(&self) -> DeliveryKind {
        DeliveryKind::DynamicMedia
    }

    fn try_build_url(&self, request: &DeliveryRequest) -> Option<String> {
        let object = self.object(request)?;
        let rendition = request.rendition;
        let download = request.download();
        if download
            || !rendition.source.is_raster_image()
            || !rendition.dimension().is_known()
        {
            return Some(self.content_url(object, download));
        }
        Some(self.image_url(request.asset, object, rendition))
    }

    /// Without a Dynamic Media object, the asset gets no URL at all when
    /// AEM fallback is disabled.
    fn is_authoritative(&self, request: &DeliveryRequest) -> bool {
        self.config.aem_fallback_disabled
            && !request.request.dynamic_media_disabled()
            && self.object(request).is_none()
    }

    fn try_build_template(
        &self,
        request: &DeliveryRequest,
        template_type: UriTemplateType,
    ) -> Result<Option<UriTemplate>, ContractError> {
        let Some(object) = self.object(request) else {
            return Ok(None);
        };
        let rendition = request.rendition;
        if !rendition.source.is_raster_image() {
            return Ok(None);
        }
        let base = format!(
            "{}{IMAGE_SERVER_PATH}{}",
            self.config.server_url,
            encode_object(object)
        );
        let wh = template_params(template_type);
        let crop = rendition.crop();
        let rotation = rendition.rotation();

        let region = smart_crop_region(request.asset, crop, rotation, request.requested_ratio());
        let template = match region {
            Some(region) => {
                let bounds = region
                    .max_dimension(original_dimension(request.asset))
                    .unwrap_or(rendition.natural_dimension());
                UriTemplate::new(
                    format!("{base}%3A{}?{wh}&fit=constrain", region.name),
                    template_type,
                    bounds,
                )
            }
            None => UriTemplate::new(
                format!("{base}?{}{wh}", crop_rotate_params(crop, rotation)),
                template_type,
                rendition.natural_dimension(),
            ),
        };
        Ok(Some(template))
    }
}

/// Profile region for `ratio`, when neither an explicit crop nor a rotation is in the way.
fn smart_crop_region<'a>(
    asset: &'a dyn Asset,
    crop: Option<CropDimension>,
    rotation: Option<Rotation>,
    ratio: Option<f64>,
) -> Option<&'a SmartCropRegion> {
    let applicable = crop.is_none_or(|c| c.auto_crop) && rotation.is_none();
    if !applicable {
        return None;
    }
    asset.smart_crop_profile()?.find_by_ratio(ratio?)
}

fn original_dimension(asset: &dyn Asset) -> Dimension {
    asset.original().map(|o| o.dimension()).unwrap_or_default()
}

fn crop_rotate_params(crop: Option<CropDimension>, rotation: Option<Rotation>) -> String {
    let mut params = String::new();
    if let Some(crop) = crop {
        params.push_str(&format!("crop={}&", crop.crop_string_width_height()));
    }
    if let Some(rotation) = rotation {
        params.push_str(&format!("rotate={rotation}&"));
    }
    params
}

fn template_params(template_type: UriTemplateType) -> String {
    match template_type {
        UriTemplateType::CropCenter => {
            format!("wid={PLACEHOLDER_WIDTH}&hei={PLACEHOLDER_HEIGHT}&fit=crop")
        }
        UriTemplateType::ScaleWidth => format!("wid={PLACEHOLDER_WIDTH}"),
        UriTemplateType::ScaleHeight => format!("hei={PLACEHOLDER_HEIGHT}"),
    }
}

/// Percent-encode each path segment; spaces become `%20`.
fn encode_object(object: &str) -> String {
    object
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| urlencoding::encode(s).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
