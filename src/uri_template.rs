//! URI templates: delivery URLs with `{width}`/`{height}` placeholders.
//!
//! Templates are built by running the concrete URL builders with sentinel
//! sizes and replacing the sentinels afterwards, so every backend grammar
//! is written once.
//!
//! | Type | Width sentinel becomes | Height sentinel becomes |
//! |------|------------------------|-------------------------|
//! | [`CropCenter`](UriTemplateType::CropCenter) | `{width}` | `{height}` |
//! | [`ScaleWidth`](UriTemplateType::ScaleWidth) | `{width}` | `0` |
//! | [`ScaleHeight`](UriTemplateType::ScaleHeight) | `0` | `{height}` |

use crate::types::Dimension;
use std::fmt;

pub const PLACEHOLDER_WIDTH: &str = "{width}";
pub const PLACEHOLDER_HEIGHT: &str = "{height}";

pub const SENTINEL_WIDTH: u64 = 999_991;
pub const SENTINEL_HEIGHT: u64 = 999_992;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UriTemplateType {
    /// Scale and crop to both placeholders around the center.
    CropCenter,
    /// Scale to the width placeholder, height follows.
    ScaleWidth,
    /// Scale to the height placeholder, width follows.
    ScaleHeight,
}

impl UriTemplateType {
    /// Sentinel size passed to the URL builders.
    pub fn sentinel_dimension(self) -> Dimension {
        match self {
            Self::CropCenter => Dimension::new(SENTINEL_WIDTH, SENTINEL_HEIGHT),
            Self::ScaleWidth => Dimension::new(SENTINEL_WIDTH, 0),
            Self::ScaleHeight => Dimension::new(0, SENTINEL_HEIGHT),
        }
    }

    /// Replace the sentinels in `url` with placeholders.
    pub fn apply_placeholders(self, url: &str) -> String {
        let (width, height) = match self {
            Self::CropCenter => (PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT),
            Self::ScaleWidth => (PLACEHOLDER_WIDTH, "0"),
            Self::ScaleHeight => ("0", PLACEHOLDER_HEIGHT),
        };
        url.replace(&SENTINEL_WIDTH.to_string(), width)
            .replace(&SENTINEL_HEIGHT.to_string(), height)
    }
}

impl fmt::Display for UriTemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CropCenter => "CROP_CENTER",
            Self::ScaleWidth => "SCALE_WIDTH",
            Self::ScaleHeight => "SCALE_HEIGHT",
        };
        f.write_str(name)
    }
}

/// A delivery URL pattern plus the largest size it can serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    pub template: String,
    pub template_type: UriTemplateType,
    /// `0` when unknown.
    pub max_width: u64,
    /// `0` when unknown.
    pub max_height: u64,
}

impl UriTemplate {
    pub fn new(template: String, template_type: UriTemplateType, bounds: Dimension) -> Self {
        Self {
            template,
            template_type,
            max_width: bounds.width,
            max_height: bounds.height,
        }
    }

    /// Fill the placeholders with a concrete size.
    pub fn expand(&self, width: u64, height: u64) -> String {
        self.template
            .replace(PLACEHOLDER_WIDTH, &width.to_string())
            .replace(PLACEHOLDER_HEIGHT, &height.to_string())
    }
}

impl fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}
