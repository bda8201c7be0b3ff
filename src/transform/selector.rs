//! Path grammar of the local transform endpoint.
//!
//! Virtual renditions are addressed as
//!
//! ```text
//! {rendition_path}.image_file.{w}.{h}[.{crop}][.{rotation}][.{quality}]
//!     [.download_attachment].file/{name}
//! ```
//!
//! - `crop` is `left,top,right,bottom`, or `-` when absent but later segments follow
//! - `rotation` is `90`/`180`/`270`, or `0` when absent but a quality follows
//! - `quality` is an integer percentage, written only when above zero
//!
//! Stored renditions are served unchanged as
//! `{rendition_path}.media_file[.download_attachment].file/{file_name}`.
//!
//! Parsing is lenient the way a public endpoint must be: negative sizes
//! become `0`, unknown rotations become none and out-of-range qualities
//! become "use the default".

use crate::file_type::base_name;
use crate::geometry::CropDimension;
use crate::types::Rotation;

pub const IMAGE_FILE_SELECTOR: &str = "image_file";
pub const MEDIA_FILE_SELECTOR: &str = "media_file";
pub const DOWNLOAD_SELECTOR: &str = "download_attachment";
pub const FILE_EXTENSION: &str = "file";

/// Parsed `image_file` selector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageFileSelector {
    pub width: u64,
    pub height: u64,
    pub crop: Option<CropDimension>,
    pub rotation: Option<Rotation>,
    /// Percentage `1..=100`; `None` uses the configured default.
    pub quality: Option<u32>,
    pub download: bool,
}

impl ImageFileSelector {
    pub fn new(width: u64, height: u64) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Parse the dot-separated selector segments, starting at `image_file`.
    ///
    /// Returns `None` when the first segment is not `image_file` or the
    /// width/height segments are missing.
    pub fn parse(selectors: &[&str]) -> Option<Self> {
        let (&first, rest) = selectors.split_first()?;
        if first != IMAGE_FILE_SELECTOR || rest.len() < 2 {
            return None;
        }
        let (download, rest) = match rest.split_last() {
            Some((&DOWNLOAD_SELECTOR, head)) => (true, head),
            _ => (false, rest),
        };
        let number = |s: &str| s.parse::<i64>().unwrap_or(0);
        let width = number(rest[0]).max(0) as u64;
        let height = rest.get(1).map_or(0, |s| number(s)).max(0) as u64;
        let crop = rest
            .get(2)
            .filter(|s| **s != "-")
            .and_then(|s| CropDimension::parse(s));
        let rotation = rest.get(3).and_then(|s| Rotation::from_degrees(number(s)));
        let quality = rest
            .get(4)
            .map(|s| number(s))
            .filter(|q| (1..=100).contains(q))
            .map(|q| q as u32);
        Some(Self {
            width,
            height,
            crop,
            rotation,
            quality,
            download,
        })
    }

    /// Parse the selector part of a full endpoint path.
    ///
    /// `"/a/original.image_file.100.50.file/a.jpg"` → width 100, height 50.
    pub fn from_path(path: &str) -> Option<Self> {
        let (resource, _suffix) = path.split_once(&format!(".{FILE_EXTENSION}/"))?;
        let start = resource.find(&format!(".{IMAGE_FILE_SELECTOR}."))?;
        let selectors: Vec<&str> = resource[start + 1..].split('.').collect();
        // Crop strings contain commas, never dots, so a plain split is safe.
        Self::parse(&selectors)
    }

    /// Selector string, without the leading dot.
    pub fn build(&self) -> String {
        let mut result = format!("{IMAGE_FILE_SELECTOR}.{}.{}", self.width, self.height);
        let quality = self.quality.filter(|q| *q > 0);
        match self.crop {
            Some(crop) => result.push_str(&format!(".{}", crop.crop_string())),
            None if self.rotation.is_some() || quality.is_some() => result.push_str(".-"),
            None => {}
        }
        match self.rotation {
            Some(rotation) => result.push_str(&format!(".{rotation}")),
            None if quality.is_some() => result.push_str(".0"),
            None => {}
        }
        if let Some(q) = quality {
            result.push_str(&format!(".{q}"));
        }
        if self.download {
            result.push('.');
            result.push_str(DOWNLOAD_SELECTOR);
        }
        result
    }
}

/// Output file name of the transform endpoint: `png` stays `png`, everything else becomes `jpg`.
pub fn image_file_name(original_file_name: &str, enforce_output_extension: Option<&str>) -> String {
    let extension = enforce_output_extension
        .map(str::to_string)
        .unwrap_or_else(|| crate::file_type::extension_of(original_file_name));
    let extension = if extension.eq_ignore_ascii_case("png") {
        "png"
    } else {
        "jpg"
    };
    format!("{}.{extension}", base_name(original_file_name))
}

/// Endpoint path for a transformed rendition.
pub fn image_file_path(
    rendition_path: &str,
    selector: &ImageFileSelector,
    file_name: &str,
) -> String {
    format!(
        "{rendition_path}.{}.{FILE_EXTENSION}/{file_name}",
        selector.build()
    )
}

/// Endpoint path for a stored rendition served as-is.
pub fn media_file_path(rendition_path: &str, download: bool, file_name: &str) -> String {
    let download = if download {
        format!(".{DOWNLOAD_SELECTOR}")
    } else {
        String::new()
    };
    format!("{rendition_path}.{MEDIA_FILE_SELECTOR}{download}.{FILE_EXTENSION}/{file_name}")
}
