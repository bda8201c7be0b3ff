//! Media handler: reference + request in, [`Media`] out.
//!
//! ```text
//! reference ─┬─ /urn:…/name.jpg ── RemoteAsset ── NextGenRenditionSource ─┐
//!            │                                                            ├─ resolve_formats
//!            └─ asset path ──── AssetSource ──── AssetRenditionSource ────┘
//! ```
//!
//! Expected failures (unknown reference, no matching rendition, a missing
//! mandatory format) end up as [`MediaInvalidReason`] on a [`Media`] value.
//! Only caller bugs are `Err`.

use crate::asset::{Asset, AssetSource};
use crate::config::HandlerConfig;
use crate::delivery::{
    DeliveryRequest, DeliveryRouter, NextGenReference, NextGenRenditionSource, RemoteAsset,
    fetch_metadata,
};
use crate::error::ContractError;
use crate::format::{MediaFormat, MediaFormatRegistry};
use crate::rendition::{
    AssetRenditionSource, Rendition, RequestedFormat, Resolution, ResolvedRendition,
    resolve_formats, responsive_format_options,
};
use crate::request::{FormatRef, RenditionRequest};
use crate::uri_template::{UriTemplate, UriTemplateType};
use crate::widths::WidthOption;
use std::fmt;
use std::sync::Arc;

/// Why a [`Media`] could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaInvalidReason {
    MediaReferenceMissing,
    MediaReferenceInvalid,
    NoMatchingRendition,
    NotEnoughMatchingRenditions,
    InvalidMediaFormat,
    Custom(String),
}

impl fmt::Display for MediaInvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MediaReferenceMissing => f.write_str("no media reference given"),
            Self::MediaReferenceInvalid => {
                f.write_str("media reference does not resolve to an asset")
            }
            Self::NoMatchingRendition => f.write_str("no rendition matches the requested formats"),
            Self::NotEnoughMatchingRenditions => {
                f.write_str("not every mandatory format has a matching rendition")
            }
            Self::InvalidMediaFormat => f.write_str("unknown or incomplete media format"),
            Self::Custom(reason) => f.write_str(reason),
        }
    }
}

/// The asset behind a [`Media`].
#[derive(Clone)]
pub enum MediaSource {
    Stored(Arc<dyn Asset>),
    Remote(Arc<RemoteAsset>),
}

impl MediaSource {
    pub fn asset(&self) -> &dyn Asset {
        match self {
            Self::Stored(asset) => asset.as_ref(),
            Self::Remote(asset) => asset.as_ref(),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

impl fmt::Debug for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_remote() { "Remote" } else { "Stored" };
        f.debug_tuple(kind).field(&self.asset().path()).finish()
    }
}

/// Resolution outcome for one reference.
#[derive(Debug, Clone)]
pub struct Media {
    pub reference: String,
    pub source: Option<MediaSource>,
    /// Non-fallback entries first.
    pub renditions: Vec<ResolvedRendition>,
    pub invalid_reason: Option<MediaInvalidReason>,
}

impl Media {
    fn invalid(reference: &str, reason: MediaInvalidReason) -> Self {
        Self {
            reference: reference.to_string(),
            source: None,
            renditions: Vec::new(),
            invalid_reason: Some(reason),
        }
    }

    fn from_resolution(reference: &str, source: MediaSource, resolution: Resolution) -> Self {
        let invalid_reason = if resolution.renditions.is_empty() {
            Some(MediaInvalidReason::NoMatchingRendition)
        } else if !resolution.success {
            Some(MediaInvalidReason::NotEnoughMatchingRenditions)
        } else {
            None
        };
        Self {
            reference: reference.to_string(),
            source: Some(source),
            renditions: resolution.renditions,
            invalid_reason,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.invalid_reason.is_none()
    }

    pub fn asset(&self) -> Option<&dyn Asset> {
        self.source.as_ref().map(MediaSource::asset)
    }

    /// The primary rendition: the first non-fallback entry, else the first fallback.
    pub fn rendition(&self) -> Option<&ResolvedRendition> {
        self.renditions.first()
    }

    /// URL of the primary rendition.
    pub fn url(&self) -> Option<&str> {
        self.rendition().and_then(|r| r.url.as_deref())
    }
}

/// Resolves references against an [`AssetSource`] with one configuration.
///
/// Holds no per-request state; share it across threads freely.
pub struct MediaHandler {
    config: HandlerConfig,
    registry: MediaFormatRegistry,
    assets: Arc<dyn AssetSource>,
    router: DeliveryRouter,
}

impl MediaHandler {
    pub fn new(config: HandlerConfig, assets: Arc<dyn AssetSource>) -> Self {
        let router = DeliveryRouter::from_config(&config);
        Self::with_router(config, assets, router)
    }

    /// Handler with a custom backend chain.
    pub fn with_router(
        config: HandlerConfig,
        assets: Arc<dyn AssetSource>,
        router: DeliveryRouter,
    ) -> Self {
        Self {
            registry: config.format_registry(),
            config,
            assets,
            router,
        }
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    pub fn router(&self) -> &DeliveryRouter {
        &self.router
    }

    /// Resolve `reference` against every format of `request`.
    ///
    /// Fails only for an enforced output extension outside the allow-list.
    pub fn resolve(
        &self,
        reference: &str,
        request: &RenditionRequest,
    ) -> Result<Media, ContractError> {
        if reference.trim().is_empty() {
            return Ok(Media::invalid(
                reference,
                MediaInvalidReason::MediaReferenceMissing,
            ));
        }
        self.check_enforced_extension(request)?;

        let source = match self.lookup(reference) {
            Some(source) => source,
            None => {
                log::debug!("no asset for {reference}");
                return Ok(Media::invalid(
                    reference,
                    MediaInvalidReason::MediaReferenceInvalid,
                ));
            }
        };

        let Some(formats) = self.requested_formats(request) else {
            return Ok(Media::invalid(
                reference,
                MediaInvalidReason::InvalidMediaFormat,
            ));
        };

        let resolution = match &source {
            MediaSource::Remote(asset) => {
                resolve_formats(&self.next_gen_source(asset), request, &formats)
            }
            MediaSource::Stored(asset) => {
                let rendition_source = AssetRenditionSource::new(asset.as_ref(), &self.router);
                resolve_formats(&rendition_source, request, &formats)
            }
        };
        let media = Media::from_resolution(reference, source, resolution);
        if let Some(reason) = &media.invalid_reason {
            log::debug!("{reference}: {reason}");
        }
        Ok(media)
    }

    /// Template over the whole asset, sized for the primary rendition's format.
    ///
    /// `Ok(None)` for invalid media or when no backend builds templates.
    pub fn asset_uri_template(
        &self,
        media: &Media,
        request: &RenditionRequest,
        template_type: UriTemplateType,
    ) -> Result<Option<UriTemplate>, ContractError> {
        let Some(source) = &media.source else {
            return Ok(None);
        };
        let format = media.rendition().and_then(|r| r.format.as_deref());
        match source {
            MediaSource::Remote(asset) => {
                let source = self.next_gen_source(asset);
                source.uri_template(template_type, format, request)
            }
            MediaSource::Stored(asset) => {
                let Some(original) = asset.original() else {
                    return Ok(None);
                };
                let rendition = Rendition::stored(original.clone());
                self.router.build_template(
                    &DeliveryRequest {
                        asset: asset.as_ref(),
                        rendition: &rendition,
                        request,
                        format,
                    },
                    template_type,
                )
            }
        }
    }

    /// Template for one resolved rendition, keeping its crop and rotation.
    ///
    /// A rendition is already cropped, so crop-center is a contract error.
    pub fn rendition_uri_template(
        &self,
        media: &Media,
        rendition: &ResolvedRendition,
        request: &RenditionRequest,
        template_type: UriTemplateType,
    ) -> Result<Option<UriTemplate>, ContractError> {
        if template_type == UriTemplateType::CropCenter {
            return Err(ContractError::UnsupportedTemplateType {
                template_type: template_type.to_string(),
                context: "a single rendition".into(),
            });
        }
        let Some(source) = &media.source else {
            return Ok(None);
        };
        let format = rendition.format.as_deref();
        match source {
            MediaSource::Remote(asset) => {
                let source = self.next_gen_source(asset);
                source.uri_template(template_type, format, request)
            }
            MediaSource::Stored(asset) => self.router.build_template(
                &DeliveryRequest {
                    asset: asset.as_ref(),
                    rendition: &rendition.rendition,
                    request,
                    format,
                },
                template_type,
            ),
        }
    }

    fn next_gen_source<'a>(&'a self, asset: &'a RemoteAsset) -> NextGenRenditionSource<'a> {
        NextGenRenditionSource::new(asset, &self.config.next_gen, self.config.images.quality())
    }

    fn check_enforced_extension(&self, request: &RenditionRequest) -> Result<(), ContractError> {
        match request.enforce_output_extension() {
            Some(extension) if !self.config.is_enforceable(extension) => {
                Err(ContractError::ExtensionNotAllowed {
                    extension: extension.to_string(),
                    allowed: self.config.images.enforceable_extensions.join(", "),
                })
            }
            _ => Ok(()),
        }
    }

    fn lookup(&self, reference: &str) -> Option<MediaSource> {
        if self.config.next_gen.enabled {
            if let Some(remote) = NextGenReference::parse(reference) {
                let metadata = fetch_metadata(
                    &self.config.next_gen,
                    &self.config.next_gen.remote_repository_id,
                    &remote.asset_id,
                );
                let asset = RemoteAsset::new(remote, metadata);
                return Some(MediaSource::Remote(Arc::new(asset)));
            }
        }
        self.assets.asset(reference).map(MediaSource::Stored)
    }

    /// Formats of `request` with names looked up and responsive children added.
    ///
    /// `None` for an unknown name, or image sizes without any format to size.
    fn requested_formats(&self, request: &RenditionRequest) -> Option<Vec<RequestedFormat>> {
        let parents = request
            .formats()
            .iter()
            .map(|option| {
                self.format(&option.format)
                    .map(|format| RequestedFormat::new(format, option.mandatory))
            })
            .collect::<Option<Vec<_>>>()?;
        if request.image_sizes().is_some() && parents.is_empty() {
            log::debug!("image sizes given without a media format");
            return None;
        }
        let picture_sources = request
            .picture_sources()
            .iter()
            .map(|source| {
                self.format(&source.format)
                    .map(|format| (format, source.widths.as_slice()))
            })
            .collect::<Option<Vec<(Arc<MediaFormat>, &[WidthOption])>>>()?;
        Some(responsive_format_options(
            &parents,
            request.image_sizes(),
            &picture_sources,
        ))
    }

    fn format(&self, format: &FormatRef) -> Option<Arc<MediaFormat>> {
        match format {
            FormatRef::Format(format) => Some(Arc::clone(format)),
            FormatRef::Name(name) => {
                let found = self.registry.get(name);
                if found.is_none() {
                    log::debug!("unknown media format '{name}'");
                }
                found
            }
        }
    }
}

impl fmt::Debug for MediaHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaHandler")
            .field("formats", &self.registry.len())
            .field("router", &self.router)
            .finish()
    }
}
