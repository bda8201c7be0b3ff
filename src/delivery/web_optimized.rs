//! Web-optimized image delivery.
//!
//! `{delivery_path}?preferwebp=true&width=W[&c=crop][&r=rotation][&quality=Q]`
//!
//! The service scales by width only, so scale-by-height templates are left
//! to the next backend.

use super::{
    DeliveryBackend, DeliveryKind, DeliveryRequest, delivery_format, sanitize_seo_name,
    sentinel_template,
};
use crate::config::{CropOption, WebOptimizedConfig};
use crate::error::ContractError;
use crate::file_type::{base_name, extension_of};
use crate::transform::Quality;
use crate::uri_template::{UriTemplate, UriTemplateType};

pub struct WebOptimizedBackend {
    config: WebOptimizedConfig,
    default_quality: Quality,
}

impl WebOptimizedBackend {
    pub fn new(config: WebOptimizedConfig, default_quality: Quality) -> Self {
        Self {
            config,
            default_quality,
        }
    }
}

impl DeliveryBackend for WebOptimizedBackend {
    fn kind(&self) -> DeliveryKind {
        DeliveryKind::WebOptimized
    }

    fn try_build_url(&self, request: &DeliveryRequest) -> Option<String> {
        if request.request.web_optimized_disabled() || request.download() {
            return None;
        }
        let asset_id = request.asset.asset_id()?;
        let rendition = request.rendition;
        if !rendition.source.is_raster_image() || rendition.width == 0 {
            return None;
        }

        let file_name = request.asset.file_name();
        let path = self
            .config
            .delivery_path
            .replace("{asset-id}", asset_id)
            .replace("{seo-name}", &sanitize_seo_name(base_name(file_name)))
            .replace("{format}", delivery_format(&extension_of(file_name)));

        let mut params = vec![
            "preferwebp=true".to_string(),
            format!("width={}", rendition.width),
        ];
        if let Some(crop) = rendition.crop() {
            let value = match self.config.crop_option {
                CropOption::Relative => crop.relative_string(rendition.source.dimension()),
                CropOption::Absolute => crop.crop_string_width_height(),
            };
            params.push(format!("c={value}"));
        }
        if let Some(rotation) = rendition.rotation() {
            params.push(format!("r={rotation}"));
        }
        params.push(format!(
            "quality={}",
            request.quality_or(self.default_quality).as_percentage()
        ));

        let separator = if path.contains('?') { '&' } else { '?' };
        Some(format!("{path}{separator}{}", params.join("&")))
    }

    fn try_build_template(
        &self,
        request: &DeliveryRequest,
        template_type: UriTemplateType,
    ) -> Result<Option<UriTemplate>, ContractError> {
        if template_type == UriTemplateType::ScaleHeight {
            return Ok(None);
        }
        Ok(sentinel_template(self, request, template_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::StaticAsset;
    use crate::geometry::CropDimension;
    use crate::rendition::{Rendition, Transformation};
    use crate::request::RenditionRequest;
    use crate::test_helpers::*;
    use crate::types::{Dimension, Rotation};

    const ASSET_ID: &str = "urn:aaid:aem:12345678-abcd-abcd-abcd-abcd12345678";
    const BASE: &str =
        "/adobe/dynamicmedia/deliver/urn:aaid:aem:12345678-abcd-abcd-abcd-abcd12345678/sample.jpg";

    fn backend(crop_option: CropOption) -> WebOptimizedBackend {
        WebOptimizedBackend::new(
            WebOptimizedConfig {
                enabled: true,
                crop_option,
                ..WebOptimizedConfig::default()
            },
            Quality::default(),
        )
    }

    fn asset() -> StaticAsset {
        sample_asset().with_asset_id(ASSET_ID)
    }

    fn cropped() -> Rendition {
        Rendition::virtual_rendition(
            original_rendition(SAMPLE_ORIGINAL, "sample.jpg", 400, 250),
            Dimension::new(100, 150),
            Transformation {
                crop: Some(CropDimension::new(100, 0, 200, 250).unwrap()),
                rotation: Some(Rotation::Deg90),
                quality: None,
                output_extension: None,
            },
        )
    }

    fn url(
        backend: &WebOptimizedBackend,
        asset: &StaticAsset,
        rendition: &Rendition,
        request: &RenditionRequest,
    ) -> Option<String> {
        backend.try_build_url(&DeliveryRequest {
            asset,
            rendition,
            request,
            format: None,
        })
    }

    fn plain() -> RenditionRequest {
        RenditionRequest::builder().build()
    }

    #[test]
    fn plain_width_and_default_quality() {
        let b = backend(CropOption::Relative);
        let rendition =
            Rendition::stored(original_rendition(SAMPLE_ORIGINAL, "sample.jpg", 400, 250));
        assert_eq!(
            url(&b, &asset(), &rendition, &plain()).unwrap(),
            format!("{BASE}?preferwebp=true&width=400&quality=85")
        );
    }

    #[test]
    fn relative_crop_and_rotation() {
        let b = backend(CropOption::Relative);
        let request = RenditionRequest::builder().quality(0.5).build();
        assert_eq!(
            url(&b, &asset(), &cropped(), &request).unwrap(),
            format!("{BASE}?preferwebp=true&width=100&c=25.0p,0.0p,50.0p,100.0p&r=90&quality=50")
        );
    }

    #[test]
    fn absolute_crop() {
        let b = backend(CropOption::Absolute);
        let u = url(&b, &asset(), &cropped(), &plain()).unwrap();
        assert!(u.contains("&c=100,0,200,250&"), "{u}");
    }

    #[test]
    fn declines_without_asset_id_download_or_opt_out() {
        let b = backend(CropOption::Relative);
        let r = cropped();
        let download = RenditionRequest::builder().download(true).build();
        let opted_out = RenditionRequest::builder()
            .web_optimized_disabled(true)
            .build();
        assert_eq!(url(&b, &sample_asset(), &r, &plain()), None);
        assert_eq!(url(&b, &asset(), &r, &download), None);
        assert_eq!(url(&b, &asset(), &r, &opted_out), None);
    }

    #[test]
    fn declines_vectors() {
        let b = backend(CropOption::Relative);
        let logo = original_rendition("/content/dam/logo.svg/original", "logo.svg", 100, 50);
        let svg = StaticAsset::new("/content/dam/logo.svg")
            .with_rendition(logo)
            .with_asset_id(ASSET_ID);
        let rendition = Rendition::vector(svg.renditions[0].clone(), Dimension::new(200, 100));
        assert_eq!(url(&b, &svg, &rendition, &plain()), None);
    }

    #[test]
    fn templates_scale_by_width_only() {
        let b = backend(CropOption::Relative);
        let asset = asset();
        let rendition =
            Rendition::stored(original_rendition(SAMPLE_ORIGINAL, "sample.jpg", 400, 250));
        let request = plain();
        let delivery = DeliveryRequest {
            asset: &asset,
            rendition: &rendition,
            request: &request,
            format: None,
        };
        let template = b
            .try_build_template(&delivery, UriTemplateType::CropCenter)
            .unwrap()
            .unwrap();
        assert_eq!(
            template.template,
            format!("{BASE}?preferwebp=true&width={{width}}&quality=85")
        );
        let scale_height = b.try_build_template(&delivery, UriTemplateType::ScaleHeight);
        assert_eq!(scale_height.unwrap(), None);
    }
}
