//! File type classification by extension or MIME type.
//!
//! | Type | Extensions | Image | Browser | Vector | Video |
//! |---|---|---|---|---|---|
//! | Jpeg | `jpg`, `jpeg` | ✓ | ✓ | | |
//! | Png | `png` | ✓ | ✓ | | |
//! | Gif | `gif` | ✓ | ✓ | | |
//! | Tiff | `tif`, `tiff` | ✓ | | | |
//! | Webp | `webp` | ✓ | ✓ | | |
//! | Svg | `svg` | ✓ | ✓ | ✓ | |
//! | Mp4 / Webm / Mov | `mp4`, `webm`, `mov` | | | | ✓ |
//!
//! Vector images are never cropped or rotated by the engine; they scale
//! freely in the browser.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaFileType {
    Jpeg,
    Png,
    Gif,
    Tiff,
    Webp,
    Svg,
    Mp4,
    Webm,
    Mov,
}

const ALL: [MediaFileType; 9] = [
    MediaFileType::Jpeg,
    MediaFileType::Png,
    MediaFileType::Gif,
    MediaFileType::Tiff,
    MediaFileType::Webp,
    MediaFileType::Svg,
    MediaFileType::Mp4,
    MediaFileType::Webm,
    MediaFileType::Mov,
];

impl MediaFileType {
    /// Case-insensitive lookup by file extension (without the dot).
    pub fn from_extension(extension: &str) -> Option<Self> {
        let ext = extension.to_ascii_lowercase();
        ALL.into_iter()
            .find(|t| t.extensions().contains(&ext.as_str()))
    }

    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        let mime = mime_type.to_ascii_lowercase();
        ALL.into_iter().find(|t| t.mime_type() == mime)
    }

    /// Known extensions; the first one is canonical.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Jpeg => &["jpg", "jpeg"],
            Self::Png => &["png"],
            Self::Gif => &["gif"],
            Self::Tiff => &["tif", "tiff"],
            Self::Webp => &["webp"],
            Self::Svg => &["svg"],
            Self::Mp4 => &["mp4"],
            Self::Webm => &["webm"],
            Self::Mov => &["mov"],
        }
    }

    pub fn canonical_extension(self) -> &'static str {
        self.extensions()[0]
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Tiff => "image/tiff",
            Self::Webp => "image/webp",
            Self::Svg => "image/svg+xml",
            Self::Mp4 => "video/mp4",
            Self::Webm => "video/webm",
            Self::Mov => "video/quicktime",
        }
    }

    pub fn is_image(self) -> bool {
        !self.is_video()
    }

    pub fn is_browser_image(self) -> bool {
        matches!(
            self,
            Self::Jpeg | Self::Png | Self::Gif | Self::Webp | Self::Svg
        )
    }

    pub fn is_vector(self) -> bool {
        self == Self::Svg
    }

    pub fn is_video(self) -> bool {
        matches!(self, Self::Mp4 | Self::Webm | Self::Mov)
    }

    /// Only lossy JPEG output honours a quality percentage.
    pub fn supports_quality(self) -> bool {
        self == Self::Jpeg
    }
}

/// Lowercased extension of a file name, or `""` when there is none.
pub fn extension_of(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => String::new(),
    }
}

/// File name without its last extension.
pub fn base_name(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    }
}

/// Two extensions name the same file type (`jpeg` equals `jpg`).
pub fn same_extension(a: &str, b: &str) -> bool {
    let lookup = MediaFileType::from_extension;
    match (lookup(a), lookup(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a.eq_ignore_ascii_case(b),
    }
}

pub fn is_image_extension(extension: &str) -> bool {
    MediaFileType::from_extension(extension).is_some_and(MediaFileType::is_image)
}

pub fn is_vector_extension(extension: &str) -> bool {
    MediaFileType::from_extension(extension).is_some_and(MediaFileType::is_vector)
}
