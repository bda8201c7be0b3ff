//! Media formats: named target shapes a caller asks for.
//!
//! A format constrains ratio, size and file extension. Formats are defined
//! once (in `[[formats]]` config tables or in code) and shared as
//! `Arc<MediaFormat>` for the lifetime of the handler.
//!
//! ```toml
//! [[formats]]
//! name = "teaser"
//! ratio = [16, 10]
//! min_width = 400
//! extensions = ["jpg", "png"]
//! ```
//!
//! Responsive width variants are *child* formats: a copy of the parent with
//! a fixed width and a back-reference to the parent, created per request by
//! [`MediaFormat::responsive_child`]. Children never come from config.

use crate::file_type::{is_image_extension, same_extension};
use crate::types::Dimension;
use crate::widths::WidthOption;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MediaFormat {
    pub name: String,
    pub label: Option<String>,
    /// Ratio as `[width, height]`, e.g. `[16, 10]`. Components may be fractional.
    pub ratio: Option<[f64; 2]>,
    /// Fixed width; `0` when not fixed.
    pub width: u64,
    pub min_width: u64,
    pub max_width: u64,
    /// Fixed height; `0` when not fixed.
    pub height: u64,
    pub min_height: u64,
    pub max_height: u64,
    /// Allowed file extensions. Empty allows every image type.
    pub extensions: Vec<String>,
    /// Binary download format: any file type is acceptable and never transformed.
    pub download: bool,
    #[serde(skip)]
    pub parent: Option<Arc<MediaFormat>>,
    /// Density descriptor carried over from the width option of a child.
    #[serde(skip)]
    pub density: Option<String>,
}

impl MediaFormat {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_ratio(mut self, width: f64, height: f64) -> Self {
        self.ratio = Some([width, height]);
        self
    }

    pub fn with_width(mut self, width: u64) -> Self {
        self.width = width;
        self
    }

    pub fn with_height(mut self, height: u64) -> Self {
        self.height = height;
        self
    }

    pub fn with_min_width(mut self, min_width: u64) -> Self {
        self.min_width = min_width;
        self
    }

    pub fn with_min_height(mut self, min_height: u64) -> Self {
        self.min_height = min_height;
        self
    }

    pub fn with_max_width(mut self, max_width: u64) -> Self {
        self.max_width = max_width;
        self
    }

    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn as_download(mut self) -> Self {
        self.download = true;
        self
    }

    /// `width / height` from the ratio pair, else from fixed width and height, else `0.0`.
    pub fn ratio(&self) -> f64 {
        match self.ratio {
            Some([w, h]) if w > 0.0 && h > 0.0 => w / h,
            _ => crate::geometry::ratio(self.width, self.height),
        }
    }

    pub fn has_ratio(&self) -> bool {
        self.ratio() > 0.0
    }

    /// Ratio as integer width/height, e.g. `16:10` → `16x10`.
    ///
    /// Fractional components are scaled by 100000 before rounding so no
    /// precision is lost (`1.91:1` → `191000x100000`).
    pub fn ratio_as_width_height(&self) -> Option<Dimension> {
        let (mut w, mut h) = match self.ratio {
            Some([w, h]) if w > 0.0 && h > 0.0 => (w, h),
            _ if self.has_ratio() => (self.ratio(), 1.0),
            _ => return None,
        };
        if w.fract() > 0.0 || h.fract() > 0.0 {
            w *= 100_000.0;
            h *= 100_000.0;
        }
        Some(Dimension::new(w.round() as u64, h.round() as u64))
    }

    pub fn effective_min_width(&self) -> u64 {
        if self.width > 0 { self.width } else { self.min_width }
    }

    pub fn effective_min_height(&self) -> u64 {
        if self.height > 0 { self.height } else { self.min_height }
    }

    /// Fixed width or height given.
    pub fn is_fixed(&self) -> bool {
        self.width > 0 || self.height > 0
    }

    /// Smallest acceptable size; a missing side is derived through the ratio.
    ///
    /// `None` when the format constrains neither side.
    pub fn min_dimension(&self) -> Option<Dimension> {
        let mut w = self.effective_min_width();
        let mut h = self.effective_min_height();
        let r = self.ratio();
        if w > 0 && h == 0 && r > 0.0 {
            h = (w as f64 / r).round() as u64;
        } else if h > 0 && w == 0 && r > 0.0 {
            w = (h as f64 * r).round() as u64;
        }
        if w == 0 && h == 0 {
            None
        } else {
            Some(Dimension::new(w, h))
        }
    }

    /// Maximum size (`0` sides are unbounded).
    pub fn max_dimension(&self) -> Dimension {
        Dimension::new(self.max_width, self.max_height)
    }

    /// Extension allowed by this format.
    ///
    /// Download formats accept anything unless they list extensions. Other
    /// formats with no list accept image types only.
    pub fn accepts_extension(&self, extension: &str) -> bool {
        if self.extensions.is_empty() {
            return self.download || is_image_extension(extension);
        }
        self.extensions
            .iter()
            .any(|allowed| same_extension(allowed, extension))
    }

    /// Formats that only allow image extensions (or none at all).
    pub fn is_image(&self) -> bool {
        !self.download && self.extensions.iter().all(|e| is_image_extension(e))
    }

    /// Responsive child with a fixed width, linked back to `parent`.
    pub fn responsive_child(parent: &Arc<MediaFormat>, option: &WidthOption) -> MediaFormat {
        let mut name = format!("{}___{}", parent.name, option.width);
        if let Some(density) = &option.density {
            name.push('_');
            name.push_str(density);
        }
        MediaFormat {
            name,
            label: parent.label.clone(),
            ratio: parent.ratio,
            width: option.width,
            height: if parent.has_ratio() {
                (option.width as f64 / parent.ratio()).round() as u64
            } else {
                0
            },
            extensions: parent.extensions.clone(),
            download: parent.download,
            parent: Some(Arc::clone(parent)),
            density: option.density.clone(),
            ..MediaFormat::default()
        }
    }

    pub fn is_child(&self) -> bool {
        self.parent.is_some()
    }
}

/// Name → format lookup, built from config.
#[derive(Debug, Clone, Default)]
pub struct MediaFormatRegistry {
    formats: HashMap<String, Arc<MediaFormat>>,
}

impl MediaFormatRegistry {
    pub fn new(formats: impl IntoIterator<Item = MediaFormat>) -> Self {
        Self {
            formats: formats
                .into_iter()
                .map(|f| (f.name.clone(), Arc::new(f)))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<MediaFormat>> {
        self.formats.get(name).cloned()
    }

    pub fn register(&mut self, format: MediaFormat) -> Arc<MediaFormat> {
        let format = Arc::new(format);
        self.formats
            .insert(format.name.clone(), Arc::clone(&format));
        format
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}
