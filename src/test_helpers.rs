//! Shared test utilities for the rendition-router test suite.
//!
//! Provides fixture assets, format shorthands, and lookup helpers that work
//! with resolution results (`ResolvedRendition`, `Media`).
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let asset = sample_asset();
//! let resolution = resolve_formats(&source, &request, &formats);
//!
//! let teaser = find_resolved(&resolution.renditions, "teaser");
//! assert!(!teaser.fallback);
//! assert_eq!(fallback_flags(&resolution.renditions), vec![false, true]);
//! ```

use crate::asset::{AssetRendition, InMemoryAssetSource, StaticAsset};
use crate::file_type::{MediaFileType, extension_of};
use crate::format::MediaFormat;
use crate::rendition::ResolvedRendition;

pub const SAMPLE_PATH: &str = "/content/dam/sample.jpg";
pub const SAMPLE_ORIGINAL: &str = "/content/dam/sample.jpg/jcr:content/renditions/original";

// =========================================================================
// Fixture setup
// =========================================================================

/// Stored rendition; the MIME type follows the file extension.
pub fn rendition(path: &str, file_name: &str, width: u64, height: u64) -> AssetRendition {
    let mime_type = MediaFileType::from_extension(&extension_of(file_name))
        .map_or("application/octet-stream", MediaFileType::mime_type);
    AssetRendition {
        path: path.to_string(),
        file_name: file_name.to_string(),
        mime_type: mime_type.to_string(),
        width,
        height,
        file_size: Some(width * height / 10),
        original: false,
        web_rendition: false,
    }
}

/// Stored rendition flagged as the original.
pub fn original_rendition(path: &str, file_name: &str, width: u64, height: u64) -> AssetRendition {
    AssetRendition {
        original: true,
        ..rendition(path, file_name, width, height)
    }
}

/// The 400x250 JPEG every scenario starts from.
pub fn sample_asset() -> StaticAsset {
    StaticAsset::new(SAMPLE_PATH).with_rendition(original_rendition(
        SAMPLE_ORIGINAL,
        "sample.jpg",
        400,
        250,
    ))
}

/// Asset source holding [`sample_asset`].
pub fn sample_source() -> InMemoryAssetSource {
    InMemoryAssetSource::new().with_asset(sample_asset())
}

// =========================================================================
// Format shorthands
// =========================================================================

/// Ratio-only format, e.g. `ratio_format("16_10", 16, 10)`.
pub fn ratio_format(name: &str, width: u32, height: u32) -> MediaFormat {
    MediaFormat::new(name).with_ratio(f64::from(width), f64::from(height))
}

// =========================================================================
// Result lookups: panic with a clear message on miss
// =========================================================================

/// Find a resolved rendition by format name. Panics if not found.
pub fn find_resolved<'a>(
    renditions: &'a [ResolvedRendition],
    format: &str,
) -> &'a ResolvedRendition {
    renditions
        .iter()
        .find(|r| r.format.as_ref().is_some_and(|f| f.name == format))
        .unwrap_or_else(|| {
            let names = resolved_format_names(renditions);
            panic!("no rendition for format '{format}'. Available: {names:?}")
        })
}

// =========================================================================
// Bulk extractors
// =========================================================================

/// Format names in result order (`"-"` for renditions without a format).
pub fn resolved_format_names(renditions: &[ResolvedRendition]) -> Vec<&str> {
    renditions
        .iter()
        .map(|r| r.format.as_ref().map_or("-", |f| f.name.as_str()))
        .collect()
}

/// URLs in result order. Panics on an unresolved entry.
pub fn resolved_urls(renditions: &[ResolvedRendition]) -> Vec<&str> {
    renditions
        .iter()
        .map(|r| {
            r.url.as_deref().unwrap_or_else(|| {
                panic!("rendition {} has no URL", r.rendition.source.path)
            })
        })
        .collect()
}

/// Fallback flags in result order.
pub fn fallback_flags(renditions: &[ResolvedRendition]) -> Vec<bool> {
    renditions.iter().map(|r| r.fallback).collect()
}
