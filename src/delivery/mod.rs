//! Delivery routing: which service builds the URL for a rendition.
//!
//! Backends are tried in a fixed order and the first URL wins:
//!
//! | Order | Backend | Serves | Declines |
//! |---|---|---|---|
//! | 1 | [`NextGenBackend`] | local assets with an asset id | never, once it claims the asset |
//! | 2 | [`DynamicMediaBackend`] | assets with a Dynamic Media object | assets without one |
//! | 3 | [`WebOptimizedBackend`] | raster images with an asset id | vectors, downloads |
//! | 4 | [`LocalBackend`] | everything | nothing: terminal |
//!
//! With AEM fallback disabled, Dynamic Media stops the chain for assets it
//! cannot serve. Web-optimized delivery also declines scale-by-height
//! templates.
//!
//! Only enabled backends take part; [`DeliveryRouter::from_config`] builds
//! the chain from [`HandlerConfig`]. A backend declines by returning `None`,
//! never by failing. The only error is a [`ContractError`] for a template
//! type that makes no sense for the call.
//!
//! Remote next-gen assets (references like `/urn:aaid:aem:…/name.jpg`) do
//! not go through the router at all: they have no stored renditions to
//! match, so [`NextGenRenditionSource`] resolves them directly.

mod dynamic_media;
mod local;
pub mod metadata;
mod next_gen;
mod web_optimized;

pub use dynamic_media::DynamicMediaBackend;
pub use local::LocalBackend;
pub use metadata::{MetadataError, NextGenMetadata, fetch_metadata};
pub use next_gen::{
    NextGenBackend, NextGenImageParams, NextGenReference, NextGenRenditionSource,
    NextGenUrlBuilder, RemoteAsset,
};
pub use web_optimized::WebOptimizedBackend;

use crate::asset::Asset;
use crate::config::HandlerConfig;
use crate::error::ContractError;
use crate::format::MediaFormat;
use crate::rendition::{Rendition, Transformation};
use crate::request::RenditionRequest;
use crate::transform::Quality;
use crate::uri_template::{UriTemplate, UriTemplateType};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Output formats the delivery services accept in their `{format}` placeholder.
const DELIVERY_FORMATS: [&str; 4] = ["jpg", "png", "gif", "webp"];

static SEO_NAME_FILTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\W_]").expect("valid SEO name pattern"));

/// Everything a backend may look at for one rendition.
#[derive(Clone, Copy)]
pub struct DeliveryRequest<'a> {
    pub asset: &'a dyn Asset,
    pub rendition: &'a Rendition,
    pub request: &'a RenditionRequest,
    pub format: Option<&'a MediaFormat>,
}

impl<'a> DeliveryRequest<'a> {
    /// Content-disposition attachment, asked for by the request or the format.
    pub fn download(&self) -> bool {
        self.request.download() || self.format.is_some_and(|f| f.download)
    }

    /// Quality from the rendition or request, else `default`.
    pub fn quality_or(&self, default: Quality) -> Quality {
        self.rendition
            .quality()
            .or_else(|| self.request.quality().map(Quality::new))
            .unwrap_or(default)
    }

    /// Ratio of the requested format, when it declares one.
    pub fn requested_ratio(&self) -> Option<f64> {
        self.format.map(MediaFormat::ratio).filter(|r| *r > 0.0)
    }

    pub(crate) fn with_rendition<'b>(&self, rendition: &'b Rendition) -> DeliveryRequest<'b>
    where
        'a: 'b,
    {
        DeliveryRequest {
            asset: self.asset,
            rendition,
            request: self.request,
            format: self.format,
        }
    }
}

impl fmt::Debug for DeliveryRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryRequest")
            .field("asset", &self.asset.path())
            .field("rendition", &self.rendition)
            .field("format", &self.format.map(|f| f.name.as_str()))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryKind {
    NextGen,
    DynamicMedia,
    WebOptimized,
    Local,
}

impl fmt::Display for DeliveryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NextGen => "next-gen",
            Self::DynamicMedia => "dynamic-media",
            Self::WebOptimized => "web-optimized",
            Self::Local => "local",
        };
        f.write_str(name)
    }
}

/// A URL plus the backend that built it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub url: String,
    pub kind: DeliveryKind,
}

/// One URL-building service.
pub trait DeliveryBackend: Send + Sync {
    fn kind(&self) -> DeliveryKind;

    /// URL for the rendition, or `None` when this backend does not serve it.
    fn try_build_url(&self, request: &DeliveryRequest) -> Option<String>;

    /// When `true`, a `None` from this backend ends the chain.
    fn is_authoritative(&self, _request: &DeliveryRequest) -> bool {
        false
    }

    /// URI template for the rendition's source.
    ///
    /// The default runs [`try_build_url`](Self::try_build_url) on a sentinel
    /// sized copy of the rendition and swaps the sentinels for placeholders.
    /// The template can serve up to the cropped and rotated source size.
    fn try_build_template(
        &self,
        request: &DeliveryRequest,
        template_type: UriTemplateType,
    ) -> Result<Option<UriTemplate>, ContractError> {
        Ok(sentinel_template(self, request, template_type))
    }
}

/// Template from a backend's concrete URL grammar, bounded by the natural size.
pub(crate) fn sentinel_template<B: DeliveryBackend + ?Sized>(
    backend: &B,
    request: &DeliveryRequest,
    template_type: UriTemplateType,
) -> Option<UriTemplate> {
    let sentinel = sentinel_rendition(request.rendition, template_type);
    let url = backend.try_build_url(&request.with_rendition(&sentinel))?;
    Some(UriTemplate::new(
        template_type.apply_placeholders(&url),
        template_type,
        request.rendition.natural_dimension(),
    ))
}

/// Copy of `rendition` sized with the sentinels of `template_type`.
///
/// Keeps crop, rotation and output format, so the URL grammar matches the
/// one the concrete rendition would get. Quality is left to the client.
pub(crate) fn sentinel_rendition(
    rendition: &Rendition,
    template_type: UriTemplateType,
) -> Rendition {
    let transformation = Transformation {
        crop: rendition.crop(),
        rotation: rendition.rotation(),
        quality: None,
        output_extension: rendition
            .transformation
            .as_ref()
            .and_then(|t| t.output_extension.clone()),
    };
    Rendition::virtual_rendition(
        rendition.source.clone(),
        template_type.sentinel_dimension(),
        transformation,
    )
}

/// File base name made URL-safe: every non-word character and `_` becomes `-`.
pub fn sanitize_seo_name(name: &str) -> String {
    SEO_NAME_FILTER.replace_all(name, "-").to_lowercase()
}

/// `{format}` value for an extension: itself when the services accept it, else `jpg`.
pub(crate) fn delivery_format(extension: &str) -> &'static str {
    DELIVERY_FORMATS
        .iter()
        .find(|f| f.eq_ignore_ascii_case(extension))
        .copied()
        .unwrap_or("jpg")
}

/// Ordered backend chain.
pub struct DeliveryRouter {
    backends: Vec<Box<dyn DeliveryBackend>>,
}

impl DeliveryRouter {
    pub fn new(backends: Vec<Box<dyn DeliveryBackend>>) -> Self {
        Self { backends }
    }

    /// Chain of every backend `config` enables, always ending with [`LocalBackend`].
    pub fn from_config(config: &HandlerConfig) -> Self {
        let mut backends: Vec<Box<dyn DeliveryBackend>> = Vec::new();
        if config.next_gen.enabled && config.next_gen.local_assets {
            backends.push(Box::new(NextGenBackend::new(
                config.next_gen.clone(),
                config.images.quality(),
            )));
        }
        if config.dynamic_media.enabled {
            backends.push(Box::new(DynamicMediaBackend::new(
                config.dynamic_media.clone(),
            )));
        }
        if config.web_optimized.enabled {
            backends.push(Box::new(WebOptimizedBackend::new(
                config.web_optimized.clone(),
                config.images.quality(),
            )));
        }
        backends.push(Box::new(LocalBackend::new()));
        Self::new(backends)
    }

    pub fn kinds(&self) -> Vec<DeliveryKind> {
        self.backends.iter().map(|b| b.kind()).collect()
    }

    /// First URL in chain order.
    pub fn route(&self, request: &DeliveryRequest) -> Option<Delivered> {
        for backend in &self.backends {
            if let Some(url) = backend.try_build_url(request) {
                log::trace!("{} delivers {}: {url}", backend.kind(), request.asset.path());
                return Some(Delivered {
                    url,
                    kind: backend.kind(),
                });
            }
            if backend.is_authoritative(request) {
                log::trace!(
                    "{} claims {} without a URL",
                    backend.kind(),
                    request.asset.path()
                );
                return None;
            }
        }
        None
    }

    /// First URI template in chain order.
    pub fn build_template(
        &self,
        request: &DeliveryRequest,
        template_type: UriTemplateType,
    ) -> Result<Option<UriTemplate>, ContractError> {
        for backend in &self.backends {
            if let Some(template) = backend.try_build_template(request, template_type)? {
                return Ok(Some(template));
            }
            if backend.is_authoritative(request) {
                return Ok(None);
            }
        }
        Ok(None)
    }
}

impl fmt::Debug for DeliveryRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryRouter")
            .field("backends", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::test_helpers::*;
    use std::sync::{Arc, Mutex};

    /// Backend with a canned answer that records every asset it was asked about.
    pub struct MockBackend {
        pub kind: DeliveryKind,
        pub url: Option<String>,
        pub authoritative: bool,
        pub calls: Arc<Mutex<Vec<String>>>,
    }

    impl MockBackend {
        pub fn serving(kind: DeliveryKind, url: &str) -> Self {
            Self {
                kind,
                url: Some(url.to_string()),
                authoritative: false,
                calls: Arc::default(),
            }
        }

        pub fn declining(kind: DeliveryKind) -> Self {
            Self {
                kind,
                url: None,
                authoritative: false,
                calls: Arc::default(),
            }
        }

        pub fn authoritative(mut self) -> Self {
            self.authoritative = true;
            self
        }
    }

    impl DeliveryBackend for MockBackend {
        fn kind(&self) -> DeliveryKind {
            self.kind
        }

        fn try_build_url(&self, request: &DeliveryRequest) -> Option<String> {
            let entry = format!("{}@{}", request.asset.path(), request.rendition.width);
            self.calls.lock().unwrap().push(entry);
            self.url.clone()
        }

        fn is_authoritative(&self, _request: &DeliveryRequest) -> bool {
            self.authoritative
        }
    }

    fn route_sample(router: &DeliveryRouter) -> Option<Delivered> {
        let asset = sample_asset();
        let rendition =
            Rendition::stored(original_rendition(SAMPLE_ORIGINAL, "sample.jpg", 400, 250));
        let request = RenditionRequest::builder().build();
        router.route(&DeliveryRequest {
            asset: &asset,
            rendition: &rendition,
            request: &request,
            format: None,
        })
    }

    // =========================================================================
    // Chain order
    // =========================================================================

    #[test]
    fn first_url_wins() {
        let router = DeliveryRouter::new(vec![
            Box::new(MockBackend::declining(DeliveryKind::DynamicMedia)),
            Box::new(MockBackend::serving(DeliveryKind::WebOptimized, "/wo")),
            Box::new(MockBackend::serving(DeliveryKind::Local, "/local")),
        ]);
        assert_eq!(
            route_sample(&router),
            Some(Delivered {
                url: "/wo".into(),
                kind: DeliveryKind::WebOptimized
            })
        );
    }

    #[test]
    fn later_backends_not_called_after_a_hit() {
        let dm = MockBackend::serving(DeliveryKind::DynamicMedia, "/dm");
        let local = MockBackend::serving(DeliveryKind::Local, "/local");
        let (dm_calls, local_calls) = (dm.calls.clone(), local.calls.clone());
        let router = DeliveryRouter::new(vec![Box::new(dm), Box::new(local)]);

        assert_eq!(
            route_sample(&router).map(|d| d.kind),
            Some(DeliveryKind::DynamicMedia)
        );
        assert_eq!(*dm_calls.lock().unwrap(), vec![format!("{SAMPLE_PATH}@400")]);
        assert!(local_calls.lock().unwrap().is_empty());
    }

    #[test]
    fn authoritative_decline_stops_the_chain() {
        let router = DeliveryRouter::new(vec![
            Box::new(MockBackend::declining(DeliveryKind::NextGen).authoritative()),
            Box::new(MockBackend::serving(DeliveryKind::Local, "/local")),
        ]);
        assert_eq!(route_sample(&router), None);
    }

    #[test]
    fn all_declining_is_none() {
        let router =
            DeliveryRouter::new(vec![Box::new(MockBackend::declining(DeliveryKind::Local))]);
        assert_eq!(route_sample(&router), None);
    }

    // =========================================================================
    // Chain from config
    // =========================================================================

    #[test]
    fn default_config_is_local_only() {
        let router = DeliveryRouter::from_config(&HandlerConfig::default());
        assert_eq!(router.kinds(), vec![DeliveryKind::Local]);
    }

    #[test]
    fn enabled_backends_in_priority_order() {
        let mut config = HandlerConfig::default();
        config.web_optimized.enabled = true;
        config.dynamic_media.enabled = true;
        config.next_gen.enabled = true;
        config.next_gen.local_assets = true;
        let router = DeliveryRouter::from_config(&config);
        assert_eq!(
            router.kinds(),
            vec![
                DeliveryKind::NextGen,
                DeliveryKind::DynamicMedia,
                DeliveryKind::WebOptimized,
                DeliveryKind::Local
            ]
        );
    }

    #[test]
    fn next_gen_without_local_assets_stays_out_of_the_chain() {
        let mut config = HandlerConfig::default();
        config.next_gen.enabled = true;
        let router = DeliveryRouter::from_config(&config);
        assert_eq!(router.kinds(), vec![DeliveryKind::Local]);
    }

    // =========================================================================
    // Shared path helpers
    // =========================================================================

    #[test]
    fn seo_name_replaces_non_word_characters() {
        assert_eq!(
            sanitize_seo_name("My Image_2024 (final)"),
            "my-image-2024--final-"
        );
        assert_eq!(sanitize_seo_name("plain"), "plain");
    }

    #[test]
    fn delivery_format_falls_back_to_jpg() {
        assert_eq!(delivery_format("PNG"), "png");
        assert_eq!(delivery_format("webp"), "webp");
        assert_eq!(delivery_format("jpeg"), "jpg");
        assert_eq!(delivery_format("tif"), "jpg");
        assert_eq!(delivery_format(""), "jpg");
    }

    // =========================================================================
    // Templates
    // =========================================================================

    #[test]
    fn default_template_uses_natural_bounds() {
        let router = DeliveryRouter::from_config(&HandlerConfig::default());
        let asset = sample_asset();
        let rendition =
            Rendition::stored(original_rendition(SAMPLE_ORIGINAL, "sample.jpg", 400, 250));
        let request = RenditionRequest::builder().build();
        let template = router
            .build_template(
                &DeliveryRequest {
                    asset: &asset,
                    rendition: &rendition,
                    request: &request,
                    format: None,
                },
                UriTemplateType::ScaleWidth,
            )
            .unwrap()
            .unwrap();
        assert_eq!(
            template.template,
            format!("{SAMPLE_ORIGINAL}.image_file.{{width}}.0.file/sample.jpg")
        );
        assert_eq!((template.max_width, template.max_height), (400, 250));
    }
}
