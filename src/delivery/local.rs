//! Local transform endpoint paths. Always answers, so it closes the chain.

use super::{DeliveryBackend, DeliveryKind, DeliveryRequest};
use crate::file_type::MediaFileType;
use crate::transform::{ImageFileSelector, image_file_path, media_file_path};

/// Builds `image_file` paths for virtual renditions and `media_file` paths otherwise.
#[derive(Debug, Clone, Default)]
pub struct LocalBackend;

impl LocalBackend {
    pub fn new() -> Self {
        Self
    }
}

impl DeliveryBackend for LocalBackend {
    fn kind(&self) -> DeliveryKind {
        DeliveryKind::Local
    }

    fn try_build_url(&self, request: &DeliveryRequest) -> Option<String> {
        let rendition = request.rendition;
        let file_name = rendition.file_name();
        if !rendition.is_virtual() || !rendition.source.is_raster_image() {
            return Some(media_file_path(
                &rendition.source.path,
                request.download(),
                &file_name,
            ));
        }

        let lossy = MediaFileType::from_extension(&rendition.extension())
            .is_some_and(MediaFileType::supports_quality);
        let selector = ImageFileSelector {
            crop: rendition.crop(),
            rotation: rendition.rotation(),
            quality: rendition
                .quality()
                .filter(|_| lossy)
                .map(|q| q.as_percentage()),
            download: request.download(),
            ..ImageFileSelector::new(rendition.width, rendition.height)
        };
        Some(image_file_path(
            &rendition.source.path,
            &selector,
            &file_name,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::CropDimension;
    use crate::rendition::{Rendition, Transformation};
    use crate::request::RenditionRequest;
    use crate::test_helpers::*;
    use crate::transform::Quality;
    use crate::types::{Dimension, Rotation};

    fn url(rendition: &Rendition) -> String {
        url_for(rendition, &RenditionRequest::builder().build())
    }

    fn url_for(rendition: &Rendition, request: &RenditionRequest) -> String {
        let asset = sample_asset();
        LocalBackend::new()
            .try_build_url(&DeliveryRequest {
                asset: &asset,
                rendition,
                request,
                format: None,
            })
            .unwrap()
    }

    fn stored() -> Rendition {
        Rendition::stored(original_rendition(SAMPLE_ORIGINAL, "sample.jpg", 400, 250))
    }

    fn resized(width: u64, height: u64, transformation: Transformation) -> Rendition {
        Rendition::virtual_rendition(
            original_rendition(SAMPLE_ORIGINAL, "sample.jpg", 400, 250),
            Dimension::new(width, height),
            transformation,
        )
    }

    fn plain() -> Transformation {
        Transformation {
            crop: None,
            rotation: None,
            quality: None,
            output_extension: None,
        }
    }

    #[test]
    fn stored_rendition_is_served_as_is() {
        assert_eq!(
            url(&stored()),
            format!("{SAMPLE_ORIGINAL}.media_file.file/sample.jpg")
        );
    }

    #[test]
    fn stored_download() {
        let request = RenditionRequest::builder().download(true).build();
        assert_eq!(
            url_for(&stored(), &request),
            format!("{SAMPLE_ORIGINAL}.media_file.download_attachment.file/sample.jpg")
        );
    }

    #[test]
    fn resized_rendition_uses_selector() {
        assert_eq!(
            url(&resized(200, 125, plain())),
            format!("{SAMPLE_ORIGINAL}.image_file.200.125.file/sample.jpg")
        );
    }

    #[test]
    fn crop_rotation_and_quality_segments() {
        let transformation = Transformation {
            crop: Some(CropDimension::new(10, 10, 100, 50).unwrap()),
            rotation: Some(Rotation::Deg90),
            quality: Some(Quality::new(0.6)),
            output_extension: None,
        };
        assert_eq!(
            url(&resized(50, 100, transformation)),
            format!("{SAMPLE_ORIGINAL}.image_file.50.100.10,10,110,60.90.60.file/sample.jpg")
        );
    }

    #[test]
    fn png_output_drops_quality() {
        let transformation = Transformation {
            quality: Some(Quality::new(0.6)),
            output_extension: Some("png".into()),
            ..plain()
        };
        assert_eq!(
            url(&resized(400, 250, transformation)),
            format!("{SAMPLE_ORIGINAL}.image_file.400.250.file/sample.png")
        );
    }

    #[test]
    fn scaled_vector_keeps_media_file() {
        let svg = original_rendition("/content/dam/logo.svg/original", "logo.svg", 100, 50);
        let rendition = Rendition::vector(svg, Dimension::new(200, 100));
        assert_eq!(
            url(&rendition),
            "/content/dam/logo.svg/original.media_file.file/logo.svg"
        );
    }
}
