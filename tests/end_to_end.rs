//! Whole-pipeline scenarios through the public API: a 400x250 JPEG, a
//! handler built from config, and the URLs that come out.

use rendition_router::asset::{InMemoryAssetSource, SmartCropProfile, SmartCropRegion, StaticAsset};
use rendition_router::config::HandlerConfig;
use rendition_router::delivery::DeliveryKind;
use rendition_router::format::MediaFormat;
use rendition_router::geometry::{CropDimension, ratios_match};
use rendition_router::request::{ImageSizes, RenditionRequest};
use rendition_router::types::Dimension;
use rendition_router::widths::parse_widths;
use rendition_router::{MediaHandler, MediaInvalidReason};
use std::sync::Arc;

const SAMPLE: &str = "/content/dam/sample.jpg";
const ORIGINAL: &str = "/content/dam/sample.jpg/jcr:content/renditions/original";

const SAMPLE_JSON: &str = r#"{
  "path": "/content/dam/sample.jpg",
  "renditions": [
    {
      "path": "/content/dam/sample.jpg/jcr:content/renditions/original",
      "file_name": "sample.jpg",
      "mime_type": "image/jpeg",
      "width": 400,
      "height": 250,
      "original": true
    }
  ]
}"#;

fn ratio(name: &str, width: f64, height: f64) -> MediaFormat {
    MediaFormat::new(name).with_ratio(width, height)
}

fn handler(config: HandlerConfig) -> MediaHandler {
    let assets = InMemoryAssetSource::from_json(&format!("[{SAMPLE_JSON}]")).unwrap();
    MediaHandler::new(config, Arc::new(assets))
}

fn local_handler() -> MediaHandler {
    handler(HandlerConfig {
        formats: vec![
            ratio("16_10", 16.0, 10.0),
            ratio("4_3", 4.0, 3.0),
            ratio("10_16", 10.0, 16.0),
            ratio("55_80", 55.0, 80.0),
            MediaFormat::new("huge").with_width(1200),
        ],
        ..HandlerConfig::default()
    })
}

// =========================================================================
// Scenarios
// =========================================================================

#[test]
fn matching_ratio_delivers_the_stored_original() {
    let media = local_handler()
        .resolve(SAMPLE, &RenditionRequest::builder().format("16_10").build())
        .unwrap();
    assert!(media.is_valid());
    let primary = media.rendition().unwrap();
    assert!(!primary.fallback);
    assert!(!primary.rendition.is_virtual());
    assert_eq!(primary.delivered_by, Some(DeliveryKind::Local));
    assert_eq!(
        media.url().unwrap(),
        format!("{ORIGINAL}.media_file.file/sample.jpg")
    );
}

#[test]
fn auto_crop_centers_a_4_3_window() {
    let request = RenditionRequest::builder()
        .format("4_3")
        .auto_crop(true)
        .build();
    let media = local_handler().resolve(SAMPLE, &request).unwrap();
    assert!(media.is_valid());
    let primary = media.rendition().unwrap();
    assert!(!primary.fallback);
    assert_eq!(primary.rendition.dimension(), Dimension::new(333, 250));
    assert!(ratios_match(primary.rendition.ratio(), 4.0 / 3.0));
    let crop = primary.rendition.crop().unwrap();
    assert_eq!(
        (crop.left, crop.top, crop.width, crop.height),
        (34, 0, 333, 250)
    );
    assert_eq!(
        media.url().unwrap(),
        format!("{ORIGINAL}.image_file.333.250.34,0,367,250.file/sample.jpg")
    );
}

#[test]
fn ratio_mismatch_without_auto_crop_is_no_match() {
    let media = local_handler()
        .resolve(SAMPLE, &RenditionRequest::builder().format("4_3").build())
        .unwrap();
    assert_eq!(
        media.invalid_reason,
        Some(MediaInvalidReason::NoMatchingRendition)
    );
}

#[test]
fn unusable_crop_is_dropped_and_rotation_kept() {
    let request = RenditionRequest::builder()
        .format("10_16")
        .crop(CropDimension::new(5, 5, 80, 55).unwrap())
        .rotation(90)
        .build();
    let media = local_handler().resolve(SAMPLE, &request).unwrap();
    assert!(media.is_valid());
    let primary = media.rendition().unwrap();
    assert!(primary.fallback);
    assert_eq!(primary.rendition.crop(), None);
    assert_eq!(primary.rendition.dimension(), Dimension::new(250, 400));
    assert_eq!(
        media.url().unwrap(),
        format!("{ORIGINAL}.image_file.250.400.-.90.file/sample.jpg")
    );
}

#[test]
fn undersized_smart_crop_falls_back_to_explicit_dynamic_media_params() {
    let mut config = HandlerConfig::default();
    config.dynamic_media.enabled = true;
    config.dynamic_media.server_url = "https://dummy.scene7.com".into();
    let asset = StaticAsset::from_json(SAMPLE_JSON)
        .unwrap()
        .with_dynamic_media_object("acme/sample")
        .with_smart_crop_profile(SmartCropProfile::new(vec![
            SmartCropRegion::new("Landscape", 1.6).with_area(0.25, 0.25, 0.5, 0.5),
        ]));
    let assets = InMemoryAssetSource::new().with_asset(asset);
    let handler = MediaHandler::new(config, Arc::new(assets));

    let teaser = ratio("teaser", 16.0, 10.0).with_width(300);
    let media = handler
        .resolve(SAMPLE, &RenditionRequest::builder().format(teaser).build())
        .unwrap();
    let primary = media.rendition().unwrap();
    assert_eq!(primary.delivered_by, Some(DeliveryKind::DynamicMedia));
    assert_eq!(
        media.url().unwrap(),
        "https://dummy.scene7.com/is/image/acme/sample?wid=300&hei=188&fit=stretch"
    );

    let small = ratio("small", 16.0, 10.0).with_width(160);
    let media = handler
        .resolve(SAMPLE, &RenditionRequest::builder().format(small).build())
        .unwrap();
    assert_eq!(
        media.url().unwrap(),
        "https://dummy.scene7.com/is/image/acme/sample%3ALandscape?wid=160&hei=100&fit=stretch"
    );
}

// =========================================================================
// Multi-format properties
// =========================================================================

#[test]
fn missing_mandatory_format_fails_the_request() {
    let request = RenditionRequest::builder()
        .mandatory_format("huge")
        .format("16_10")
        .build();
    let media = local_handler().resolve(SAMPLE, &request).unwrap();
    assert_eq!(
        media.invalid_reason,
        Some(MediaInvalidReason::NotEnoughMatchingRenditions)
    );
}

#[test]
fn optional_alternatives_succeed_with_any_match() {
    let request = RenditionRequest::builder()
        .format("huge")
        .format("16_10")
        .build();
    let media = local_handler().resolve(SAMPLE, &request).unwrap();
    assert!(media.is_valid());
    assert_eq!(media.renditions.len(), 1);
    let primary = media.rendition().unwrap();
    assert_eq!(primary.format.as_ref().unwrap().name, "16_10");
}

#[test]
fn fallbacks_come_after_direct_matches() {
    // The rotated crop is 55x80: a direct match for 55_80, a relaxed one for 10_16.
    let request = RenditionRequest::builder()
        .mandatory_format("10_16")
        .mandatory_format("55_80")
        .crop(CropDimension::new(5, 5, 80, 55).unwrap())
        .rotation(90)
        .build();
    let media = local_handler().resolve(SAMPLE, &request).unwrap();
    assert!(media.is_valid());
    let names: Vec<&str> = media
        .renditions
        .iter()
        .map(|r| r.format.as_ref().unwrap().name.as_str())
        .collect();
    let flags: Vec<bool> = media.renditions.iter().map(|r| r.fallback).collect();
    assert_eq!(names, vec!["55_80", "10_16"]);
    assert_eq!(flags, vec![false, true]);
    assert_eq!(
        media.url().unwrap(),
        format!("{ORIGINAL}.image_file.55.80.5,5,85,60.90.file/sample.jpg")
    );
}

#[test]
fn responsive_widths_become_child_renditions() {
    let widths = parse_widths("320,160:2x,1200?").unwrap();
    let request = RenditionRequest::builder()
        .format("16_10")
        .image_sizes(ImageSizes::new("100vw", widths))
        .build();
    let media = local_handler().resolve(SAMPLE, &request).unwrap();
    assert!(media.is_valid(), "{:?}", media.invalid_reason);
    let names: Vec<&str> = media
        .renditions
        .iter()
        .map(|r| r.format.as_ref().unwrap().name.as_str())
        .collect();
    assert_eq!(names, vec!["16_10", "16_10___320", "16_10___160_2x"]);
    let widths: Vec<u64> = media.renditions.iter().map(|r| r.rendition.width).collect();
    assert_eq!(widths, vec![400, 320, 160]);
}

#[test]
fn no_upscaling_anywhere() {
    let request = RenditionRequest::builder().fixed_width(800).build();
    let media = local_handler().resolve(SAMPLE, &request).unwrap();
    for r in &media.renditions {
        assert!(r.rendition.width <= 400 && r.rendition.height <= 250);
    }
}
