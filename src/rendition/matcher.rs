//! Single-format rendition matching.
//!
//! Given one asset and one [`MatchRequest`], pick a stored rendition or
//! synthesize a virtual one. The steps run in order and stop at the first
//! hit:
//!
//! 1. **Direct**: no crop and no rotation. Scan the stored renditions.
//! 2. **Synthesize**: crop and/or rotation requested. Crop applies to the
//!    original only; rotation alone applies to every stored raster.
//! 3. **Relax**: a user crop that fails is dropped (rotation kept). A hit
//!    here is a fallback.
//! 4. **Auto-crop**: with auto-crop enabled, try the smart-crop region for
//!    the requested ratio, then the centered crop.
//!
//! No match is `None`. Virtual renditions never exceed their cropped and
//! rotated source.

use super::model::{Rendition, Transformation};
use crate::asset::{Asset, AssetRendition};
use crate::format::MediaFormat;
use crate::geometry::{
    CropDimension, auto_crop_rectangle, fit_within, limit_to_size, ratio, ratios_match,
    rotate_map_dimension,
};
use crate::request::RenditionRequest;
use crate::transform::Quality;
use crate::types::{Dimension, Rotation};

/// The constraints for matching one format.
///
/// Derived from a [`RenditionRequest`] per format. Variants (crop dropped,
/// auto-crop applied) are new values, the request itself never changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchRequest<'a> {
    pub format: Option<&'a MediaFormat>,
    pub fixed_width: u64,
    pub fixed_height: u64,
    pub crop: Option<CropDimension>,
    pub rotation: Option<Rotation>,
    pub auto_crop: bool,
    pub enforce_output_extension: Option<&'a str>,
    pub quality: Option<Quality>,
}

impl<'a> MatchRequest<'a> {
    pub fn from_request(request: &'a RenditionRequest, format: Option<&'a MediaFormat>) -> Self {
        Self {
            format,
            fixed_width: request.fixed_width(),
            fixed_height: request.fixed_height(),
            crop: request.crop(),
            rotation: request.rotation(),
            auto_crop: request.auto_crop(),
            enforce_output_extension: request.enforce_output_extension(),
            quality: request.quality().map(Quality::new),
        }
    }

    pub fn with_crop(self, crop: CropDimension) -> Self {
        Self {
            crop: Some(crop),
            ..self
        }
    }

    pub fn without_crop(self) -> Self {
        Self { crop: None, ..self }
    }

    /// Target ratio after rotation, `0.0` when unconstrained.
    ///
    /// Fixed width and height together override the format ratio.
    pub fn requested_ratio(&self) -> f64 {
        if self.fixed_width > 0 && self.fixed_height > 0 {
            return ratio(self.fixed_width, self.fixed_height);
        }
        self.format.map_or(0.0, MediaFormat::ratio)
    }

    /// Exact output size. A `0` side is derived from the ratio when possible.
    pub fn exact_dimension(&self) -> Dimension {
        let (w, h) = if self.fixed_width > 0 || self.fixed_height > 0 {
            (self.fixed_width, self.fixed_height)
        } else {
            self.format.map_or((0, 0), |f| (f.width, f.height))
        };
        let r = self.requested_ratio();
        match (w, h) {
            (w, 0) if w > 0 && r > 0.0 => Dimension::new(w, (w as f64 / r).round() as u64),
            (0, h) if h > 0 && r > 0.0 => Dimension::new((h as f64 * r).round() as u64, h),
            (w, h) => Dimension::new(w, h),
        }
    }

    /// Smallest acceptable size; `0` sides are unbounded.
    pub fn min_dimension(&self) -> Dimension {
        let exact = self.exact_dimension();
        let format_min = self
            .format
            .and_then(MediaFormat::min_dimension)
            .unwrap_or_default();
        Dimension::new(
            exact.width.max(format_min.width),
            exact.height.max(format_min.height),
        )
    }

    pub fn max_dimension(&self) -> Dimension {
        self.format
            .map_or_else(Dimension::default, MediaFormat::max_dimension)
    }

    /// Nothing constrains ratio, size or extension.
    pub fn is_unconstrained(&self) -> bool {
        self.format.is_none()
            && self.fixed_width == 0
            && self.fixed_height == 0
            && self.crop.is_none()
            && self.rotation.is_none()
    }

    fn accepts_extension(&self, rendition: &AssetRendition) -> bool {
        let Some(format) = self.format else {
            return true;
        };
        match self.enforce_output_extension {
            Some(enforced) if rendition.is_raster_image() => format.accepts_extension(enforced),
            _ => format.accepts_extension(&rendition.extension()),
        }
    }
}

/// A match and whether it needed relaxing a user crop.
#[derive(Debug, Clone, PartialEq)]
pub struct RenditionMatch {
    pub rendition: Rendition,
    pub fallback: bool,
}

/// Run the matching steps for one format against `asset`.
pub fn match_rendition(asset: &dyn Asset, request: &MatchRequest<'_>) -> Option<RenditionMatch> {
    let found = if request.crop.is_none() && request.rotation.is_none() {
        direct_match(asset, request)
    } else {
        synthesize(asset, request)
    };
    if let Some(rendition) = found {
        return Some(RenditionMatch {
            rendition,
            fallback: false,
        });
    }

    if request.crop.is_some_and(|c| !c.auto_crop) {
        let relaxed = request.without_crop();
        let found = if relaxed.rotation.is_none() {
            direct_match(asset, &relaxed)
        } else {
            synthesize(asset, &relaxed)
        };
        if let Some(rendition) = found {
            log::debug!(
                "{}: crop {} does not match, using {} without it",
                asset.path(),
                request.crop.map(|c| c.to_string()).unwrap_or_default(),
                rendition.dimension()
            );
            return Some(RenditionMatch {
                rendition,
                fallback: true,
            });
        }
    }

    if request.auto_crop {
        for crop in auto_crop_candidates(asset, request) {
            if let Some(rendition) = synthesize(asset, &request.with_crop(crop)) {
                log::debug!("{}: auto-cropped to {crop}", asset.path());
                return Some(RenditionMatch {
                    rendition,
                    fallback: false,
                });
            }
        }
    }
    None
}

/// Crops to try for auto-cropping: the smart-crop region first, then the centered crop.
fn auto_crop_candidates(asset: &dyn Asset, request: &MatchRequest<'_>) -> Vec<CropDimension> {
    let requested = request.requested_ratio();
    let Some(original) = asset.original().filter(|o| o.is_raster_image()) else {
        return Vec::new();
    };
    if requested <= 0.0 || !original.dimension().is_known() {
        return Vec::new();
    }
    // Crops apply before rotation.
    let target = match request.rotation {
        Some(r) if r.swaps_dimensions() => 1.0 / requested,
        _ => requested,
    };
    let image = original.dimension();
    let smart = asset
        .smart_crop_profile()
        .and_then(|p| p.find_by_ratio(target))
        .and_then(|region| region.crop_dimension(image));
    smart
        .into_iter()
        .chain(auto_crop_rectangle(image.width, image.height, target))
        .collect()
}

/// Step 1: smallest stored rendition that satisfies the request.
///
/// Applies to ratio-only requests too. An unconstrained request gets the
/// original.
fn direct_match(asset: &dyn Asset, request: &MatchRequest<'_>) -> Option<Rendition> {
    if request.is_unconstrained() {
        let original = asset.original()?;
        return Some(sized(original.clone(), original.dimension(), None, request));
    }

    let mut candidates: Vec<&AssetRendition> = asset.renditions().iter().collect();
    candidates.sort_by_key(|r| r.dimension().area());
    candidates
        .into_iter()
        .filter(|r| request.accepts_extension(r))
        .find_map(|r| fit_candidate(r, r.dimension(), None, request))
}

/// Step 2: apply crop and rotation.
fn synthesize(asset: &dyn Asset, request: &MatchRequest<'_>) -> Option<Rendition> {
    match request.crop {
        Some(crop) => {
            let original = asset.original()?;
            if !original.is_raster_image() || !request.accepts_extension(original) {
                return None;
            }
            if !crop.fits_within(original.dimension()) {
                log::trace!(
                    "{}: crop {crop} exceeds original {}",
                    asset.path(),
                    original.dimension()
                );
                return None;
            }
            let natural = rotate_map_dimension(crop.dimension(), request.rotation);
            fit_candidate(original, natural, Some(crop), request)
        }
        None => {
            let mut candidates: Vec<&AssetRendition> = asset
                .renditions()
                .iter()
                .filter(|r| r.is_raster_image() && request.accepts_extension(r))
                .collect();
            candidates.sort_by_key(|r| r.dimension().area());
            candidates.into_iter().find_map(|r| {
                let natural = rotate_map_dimension(r.dimension(), request.rotation);
                fit_candidate(r, natural, None, request)
            })
        }
    }
}

/// Check one candidate whose post-crop, post-rotation size is `natural`.
fn fit_candidate(
    source: &AssetRendition,
    natural: Dimension,
    crop: Option<CropDimension>,
    request: &MatchRequest<'_>,
) -> Option<Rendition> {
    let requested_ratio = request.requested_ratio();
    let min = request.min_dimension();

    if !source.is_image() || !natural.is_known() {
        // Binaries without geometry only satisfy size-free requests.
        return (requested_ratio <= 0.0 && min.width == 0 && min.height == 0)
            .then(|| Rendition::stored(source.clone()));
    }
    if requested_ratio > 0.0 && !ratios_match(natural.ratio(), requested_ratio) {
        return None;
    }
    if source.is_vector() {
        return Some(Rendition::vector(
            source.clone(),
            vector_size(natural, request.exact_dimension()),
        ));
    }
    if natural.width < min.width || natural.height < min.height {
        return None;
    }
    Some(sized(source.clone(), natural, crop, request))
}

/// Vectors scale freely, so the exact size is taken as-is.
fn vector_size(natural: Dimension, exact: Dimension) -> Dimension {
    let r = natural.ratio();
    match (exact.width, exact.height) {
        (0, 0) => natural,
        (w, 0) => Dimension::new(w, (w as f64 / r).round() as u64),
        (0, h) => Dimension::new((h as f64 * r).round() as u64, h),
        (w, h) => Dimension::new(w, h),
    }
}

/// Final output size and the stored-or-virtual decision.
fn sized(
    source: AssetRendition,
    natural: Dimension,
    crop: Option<CropDimension>,
    request: &MatchRequest<'_>,
) -> Rendition {
    let output = limit_to_size(
        fit_within(request.exact_dimension(), natural),
        request.max_dimension(),
    );
    let output_extension = request
        .enforce_output_extension
        .filter(|e| source.is_raster_image() && !e.eq_ignore_ascii_case(&source.extension()))
        .map(str::to_string);

    let unchanged = crop.is_none()
        && request.rotation.is_none()
        && output_extension.is_none()
        && output == source.dimension();
    if unchanged || !source.is_raster_image() {
        return Rendition::stored(source);
    }
    Rendition::virtual_rendition(
        source,
        output,
        Transformation {
            crop,
            rotation: request.rotation,
            quality: request.quality,
            output_extension,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{SmartCropProfile, SmartCropRegion, StaticAsset};
    use crate::test_helpers::*;

    fn format_16_10() -> MediaFormat {
        MediaFormat::new("16_10").with_ratio(16.0, 10.0)
    }

    fn format_4_3() -> MediaFormat {
        MediaFormat::new("4_3").with_ratio(4.0, 3.0)
    }

    fn request(format: &MediaFormat) -> MatchRequest<'_> {
        MatchRequest {
            format: Some(format),
            ..MatchRequest::default()
        }
    }

    // =========================================================================
    // Request derivation
    // =========================================================================

    #[test]
    fn exact_dimension_derives_missing_side_from_ratio() {
        let format = format_16_10().with_width(200);
        assert_eq!(request(&format).exact_dimension(), Dimension::new(200, 125));
    }

    #[test]
    fn fixed_size_overrides_format_ratio() {
        let format = format_16_10();
        let req = MatchRequest {
            fixed_width: 100,
            fixed_height: 100,
            ..request(&format)
        };
        assert_eq!(req.requested_ratio(), 1.0);
    }

    #[test]
    fn min_dimension_merges_exact_and_format_minimum() {
        let format = format_16_10().with_min_width(300);
        let req = MatchRequest {
            fixed_width: 160,
            ..request(&format)
        };
        assert_eq!(req.min_dimension(), Dimension::new(300, 188));
    }

    // =========================================================================
    // Direct matches
    // =========================================================================

    #[test]
    fn direct_ratio_match_on_only_rendition() {
        let asset = sample_asset();
        let format = format_16_10();
        let m = match_rendition(&asset, &request(&format)).unwrap();
        assert!(!m.fallback);
        assert!(!m.rendition.is_virtual());
        assert_eq!(m.rendition.dimension(), Dimension::new(400, 250));
    }

    #[test]
    fn direct_prefers_smallest_covering_rendition() {
        let original = original_rendition("/dam/multi.jpg/original", "multi.jpg", 1600, 1000);
        let asset = StaticAsset::new("/dam/multi.jpg")
            .with_rendition(original)
            .with_rendition(rendition("/dam/multi.jpg/web", "web.jpg", 800, 500))
            .with_rendition(rendition("/dam/multi.jpg/thumb", "thumb.jpg", 160, 100));
        let format = format_16_10().with_min_width(400);
        let m = match_rendition(&asset, &request(&format)).unwrap();
        assert_eq!(m.rendition.source.path, "/dam/multi.jpg/web");
        assert_eq!(m.rendition.dimension(), Dimension::new(800, 500));
    }

    #[test]
    fn direct_ratio_only_prefers_smallest() {
        let asset = StaticAsset::new("/dam/multi.jpg")
            .with_rendition(original_rendition(
                "/dam/multi.jpg/original",
                "multi.jpg",
                1600,
                1000,
            ))
            .with_rendition(rendition("/dam/multi.jpg/square", "square.jpg", 100, 100))
            .with_rendition(rendition("/dam/multi.jpg/thumb", "thumb.jpg", 160, 100));
        let format = format_16_10();
        let m = match_rendition(&asset, &request(&format)).unwrap();
        assert_eq!(m.rendition.source.path, "/dam/multi.jpg/thumb");
        assert!(!m.rendition.is_virtual());
    }

    #[test]
    fn direct_fixed_width_resizes_down() {
        let asset = sample_asset();
        let format = format_16_10().with_width(200);
        let m = match_rendition(&asset, &request(&format)).unwrap();
        assert!(m.rendition.is_virtual());
        assert_eq!(m.rendition.dimension(), Dimension::new(200, 125));
        assert_eq!(m.rendition.crop(), None);
    }

    #[test]
    fn direct_never_upscales() {
        let asset = sample_asset();
        let format = format_16_10().with_width(800);
        assert!(match_rendition(&asset, &request(&format)).is_none());
    }

    #[test]
    fn direct_ratio_mismatch_without_auto_crop_fails() {
        let asset = sample_asset();
        let format = format_4_3();
        assert!(match_rendition(&asset, &request(&format)).is_none());
    }

    #[test]
    fn direct_respects_extensions() {
        let asset = sample_asset();
        let format = format_16_10().with_extensions(&["png"]);
        assert!(match_rendition(&asset, &request(&format)).is_none());
    }

    #[test]
    fn enforced_extension_makes_rendition_virtual() {
        let asset = sample_asset();
        let format = format_16_10().with_extensions(&["png"]);
        let req = MatchRequest {
            enforce_output_extension: Some("png"),
            ..request(&format)
        };
        let m = match_rendition(&asset, &req).unwrap();
        assert!(m.rendition.is_virtual());
        assert_eq!(m.rendition.file_name(), "sample.png");
    }

    #[test]
    fn unconstrained_request_returns_original() {
        let asset = StaticAsset::new("/dam/doc.pdf").with_rendition(AssetRendition {
            path: "/dam/doc.pdf/original".into(),
            file_name: "doc.pdf".into(),
            mime_type: "application/pdf".into(),
            width: 0,
            height: 0,
            file_size: Some(1024),
            original: true,
            web_rendition: false,
        });
        let m = match_rendition(&asset, &MatchRequest::default()).unwrap();
        assert_eq!(m.rendition.file_name(), "doc.pdf");
        assert!(!m.rendition.is_virtual());
    }

    #[test]
    fn vector_scales_without_size_limit() {
        let logo = original_rendition("/dam/logo.svg/original", "logo.svg", 100, 100);
        let asset = StaticAsset::new("/dam/logo.svg").with_rendition(logo);
        let format = MediaFormat::new("square")
            .with_ratio(1.0, 1.0)
            .with_width(400);
        let m = match_rendition(&asset, &request(&format)).unwrap();
        assert!(m.rendition.is_vector());
        assert_eq!(m.rendition.dimension(), Dimension::new(400, 400));
        assert_eq!(m.rendition.transformation, None);
    }

    // =========================================================================
    // Synthesis
    // =========================================================================

    #[test]
    fn explicit_crop_synthesizes_from_original() {
        let asset = sample_asset();
        let format = MediaFormat::new("square").with_ratio(1.0, 1.0);
        let crop = CropDimension::new(50, 0, 250, 250).unwrap();
        let m = match_rendition(&asset, &request(&format).with_crop(crop)).unwrap();
        assert!(!m.fallback);
        assert_eq!(m.rendition.crop(), Some(crop));
        assert_eq!(m.rendition.dimension(), Dimension::new(250, 250));
    }

    #[test]
    fn rotation_swaps_candidate_shape() {
        let asset = sample_asset();
        let format = MediaFormat::new("10_16").with_ratio(10.0, 16.0);
        let req = MatchRequest {
            rotation: Some(Rotation::Deg90),
            ..request(&format)
        };
        let m = match_rendition(&asset, &req).unwrap();
        assert_eq!(m.rendition.dimension(), Dimension::new(250, 400));
        assert_eq!(m.rendition.rotation(), Some(Rotation::Deg90));
    }

    #[test]
    fn crop_outside_original_fails_synthesis() {
        let asset = sample_asset();
        let crop = CropDimension::new(350, 0, 100, 100).unwrap();
        let req = MatchRequest::default().with_crop(crop);
        assert!(synthesize(&asset, &req).is_none());
    }

    #[test]
    fn vector_is_never_cropped() {
        let logo = original_rendition("/dam/logo.svg/original", "logo.svg", 100, 100);
        let asset = StaticAsset::new("/dam/logo.svg").with_rendition(logo);
        let crop = CropDimension::new(0, 0, 50, 50).unwrap();
        let request = MatchRequest::default().with_crop(crop);
        assert!(synthesize(&asset, &request).is_none());
    }

    // =========================================================================
    // Relaxation and auto-crop
    // =========================================================================

    #[test]
    fn failed_crop_relaxes_to_fallback_keeping_rotation() {
        let asset = sample_asset();
        let format = MediaFormat::new("10_16").with_ratio(10.0, 16.0);
        let req = MatchRequest {
            rotation: Some(Rotation::Deg90),
            ..request(&format)
        }
        .with_crop(CropDimension::new(5, 5, 80, 55).unwrap());
        let m = match_rendition(&asset, &req).unwrap();
        assert!(m.fallback);
        assert_eq!(m.rendition.crop(), None);
        assert_eq!(m.rendition.rotation(), Some(Rotation::Deg90));
        assert_eq!(m.rendition.dimension(), Dimension::new(250, 400));
    }

    #[test]
    fn crop_past_u64_range_relaxes_to_fallback() {
        let asset = sample_asset();
        let format = format_16_10();
        let crop = CropDimension::new(u64::MAX - 5, 0, 10, 10).unwrap();
        let m = match_rendition(&asset, &request(&format).with_crop(crop)).unwrap();
        assert!(m.fallback);
        assert_eq!(m.rendition.crop(), None);
        assert_eq!(m.rendition.dimension(), Dimension::new(400, 250));
    }

    #[test]
    fn auto_crop_is_not_relaxed() {
        let asset = sample_asset();
        let format = format_4_3();
        let req = request(&format).with_crop(CropDimension::auto(0, 0, 100, 100));
        assert!(match_rendition(&asset, &req).is_none());
    }

    #[test]
    fn auto_crop_centers_when_no_profile() {
        let asset = sample_asset();
        let format = format_4_3();
        let req = MatchRequest {
            auto_crop: true,
            ..request(&format)
        };
        let m = match_rendition(&asset, &req).unwrap();
        assert!(!m.fallback);
        let crop = m.rendition.crop().unwrap();
        assert!(crop.auto_crop);
        assert_eq!((crop.left, crop.top), (34, 0));
        assert_eq!(m.rendition.dimension(), Dimension::new(333, 250));
    }

    #[test]
    fn auto_crop_prefers_smart_crop_region() {
        let asset = sample_asset().with_smart_crop_profile(SmartCropProfile::new(vec![
            SmartCropRegion::new("Square", 1.0).with_area(0.1, 0.0, 0.625, 1.0),
        ]));
        let format = MediaFormat::new("square").with_ratio(1.0, 1.0);
        let req = MatchRequest {
            auto_crop: true,
            ..request(&format)
        };
        let m = match_rendition(&asset, &req).unwrap();
        let crop = m.rendition.crop().unwrap();
        assert_eq!(
            (crop.left, crop.top, crop.width, crop.height),
            (40, 0, 250, 250)
        );
    }

    #[test]
    fn auto_crop_needs_a_ratio() {
        let asset = sample_asset();
        let format = MediaFormat::new("wide").with_min_width(1000);
        let req = MatchRequest {
            auto_crop: true,
            ..request(&format)
        };
        assert!(match_rendition(&asset, &req).is_none());
    }
}
