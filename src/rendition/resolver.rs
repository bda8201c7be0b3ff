//! Multi-format and responsive resolution.
//!
//! The resolver knows nothing about assets or URLs: it asks a
//! [`RenditionSource`] for one format at a time and applies the
//! mandatory/optional rules on top.
//!
//! ```text
//! formats ──┬── parents ── resolve each ──┐
//!           │                             ├── non-fallback … fallback
//!           └── children ── per resolved ─┘
//!                 parent
//! ```
//!
//! A single non-responsive request (or optional alternatives without any
//! mandatory entry) takes the first-match path instead: formats are tried in
//! order and the first hit wins.

use super::matcher::{MatchRequest, match_rendition};
use super::model::ResolvedRendition;
use crate::asset::Asset;
use crate::delivery::{DeliveryRequest, DeliveryRouter};
use crate::format::MediaFormat;
use crate::request::{ImageSizes, RenditionRequest};
use crate::widths::WidthOption;
use std::sync::Arc;

/// Resolves one format (or none) to a delivered rendition.
pub trait RenditionSource {
    fn resolve(
        &self,
        format: Option<&Arc<MediaFormat>>,
        request: &RenditionRequest,
    ) -> Option<ResolvedRendition>;
}

/// A format to resolve, after names have been looked up.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestedFormat {
    pub format: Arc<MediaFormat>,
    pub mandatory: bool,
}

impl RequestedFormat {
    pub fn new(format: Arc<MediaFormat>, mandatory: bool) -> Self {
        Self { format, mandatory }
    }

    fn parent_name(&self) -> Option<&str> {
        self.format.parent.as_ref().map(|p| p.name.as_str())
    }
}

/// Ordered renditions plus the overall verdict.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Non-fallback entries first; the first entry is the primary one.
    pub renditions: Vec<ResolvedRendition>,
    /// At least one rendition, and every mandatory format resolved.
    pub success: bool,
}

/// Resolve `formats` against `source`.
pub fn resolve_formats(
    source: &impl RenditionSource,
    request: &RenditionRequest,
    formats: &[RequestedFormat],
) -> Resolution {
    let resolve = |format: Option<&Arc<MediaFormat>>| {
        source
            .resolve(format, request)
            .filter(ResolvedRendition::is_resolved)
    };

    if formats.is_empty() {
        let renditions: Vec<_> = resolve(None).into_iter().collect();
        return Resolution {
            success: !renditions.is_empty(),
            renditions,
        };
    }

    let full =
        formats.len() > 1 && (formats.iter().any(|f| f.mandatory) || request.is_responsive());
    if !full {
        let renditions: Vec<_> = formats
            .iter()
            .find_map(|f| resolve(Some(&f.format)))
            .into_iter()
            .collect();
        return Resolution {
            success: !renditions.is_empty(),
            renditions,
        };
    }

    let (parents, children): (Vec<&RequestedFormat>, Vec<&RequestedFormat>) =
        formats.iter().partition(|f| f.format.parent.is_none());

    let mut resolved = Vec::new();
    let mut all_mandatory = true;
    let mut resolved_parents = Vec::new();
    for parent in &parents {
        match resolve(Some(&parent.format)) {
            Some(r) => {
                resolved_parents.push(*parent);
                resolved.push(r);
            }
            None => all_mandatory &= !parent.mandatory,
        }
    }

    // Children only resolve once every mandatory parent has.
    let scope = if !all_mandatory {
        Vec::new()
    } else if resolved_parents.is_empty() && parents.iter().all(|p| !p.mandatory) {
        parents.clone()
    } else {
        resolved_parents
    };
    for parent in scope {
        for child in children
            .iter()
            .filter(|c| c.parent_name() == Some(parent.format.name.as_str()))
        {
            match resolve(Some(&child.format)) {
                Some(r) => resolved.push(r),
                None => all_mandatory &= !child.mandatory,
            }
        }
    }

    let (mut renditions, fallbacks): (Vec<_>, Vec<_>) =
        resolved.into_iter().partition(|r| !r.fallback);
    renditions.extend(fallbacks);
    Resolution {
        success: !renditions.is_empty() && all_mandatory,
        renditions,
    }
}

/// Append one child format per width option to `parents`.
///
/// Image sizes apply to every parent. A picture source applies to the parent
/// with its format's name; its children resolve only when that parent is
/// requested too.
pub fn responsive_format_options(
    parents: &[RequestedFormat],
    image_sizes: Option<&ImageSizes>,
    picture_sources: &[(Arc<MediaFormat>, &[WidthOption])],
) -> Vec<RequestedFormat> {
    let mut result = parents.to_vec();
    if let Some(image_sizes) = image_sizes {
        for parent in parents {
            result.extend(image_sizes.widths.iter().map(|option| {
                RequestedFormat::new(
                    Arc::new(MediaFormat::responsive_child(&parent.format, option)),
                    option.mandatory,
                )
            }));
        }
    }
    for (format, widths) in picture_sources {
        result.extend(widths.iter().map(|option| {
            RequestedFormat::new(
                Arc::new(MediaFormat::responsive_child(format, option)),
                option.mandatory,
            )
        }));
    }
    result
}

/// Matches against a stored asset and routes the result through the delivery chain.
pub struct AssetRenditionSource<'a> {
    asset: &'a dyn Asset,
    router: &'a DeliveryRouter,
}

impl<'a> AssetRenditionSource<'a> {
    pub fn new(asset: &'a dyn Asset, router: &'a DeliveryRouter) -> Self {
        Self { asset, router }
    }
}

impl RenditionSource for AssetRenditionSource<'_> {
    fn resolve(
        &self,
        format: Option<&Arc<MediaFormat>>,
        request: &RenditionRequest,
    ) -> Option<ResolvedRendition> {
        let matched = match_rendition(
            self.asset,
            &MatchRequest::from_request(request, format.map(Arc::as_ref)),
        )?;
        let delivered = self.router.route(&DeliveryRequest {
            asset: self.asset,
            rendition: &matched.rendition,
            request,
            format: format.map(Arc::as_ref),
        });
        Some(ResolvedRendition {
            rendition: matched.rendition,
            url: delivered.as_ref().map(|d| d.url.clone()),
            delivered_by: delivered.map(|d| d.kind),
            fallback: matched.fallback,
            format: format.cloned(),
        })
    }
}
