//! Handler configuration module.
//!
//! Handles loading, validating, and merging `rendition-router.toml` files.
//! Stock defaults are overridden by a user config file, which only needs the
//! keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [images]
//! default_quality = 0.85                       # Lossy quality fraction (0.0-1.0)
//! enforceable_extensions = ["jpg", "png"]      # Allowed enforced output extensions
//!
//! [dynamic_media]
//! enabled = false
//! server_url = ""                              # e.g. "https://dummy.scene7.com"
//! aem_fallback_disabled = false                # Non-DM assets get no URL when true
//! validate_smart_crop_sizes = true             # Reject smart crops smaller than requested
//! image_size_limit = [2000, 2000]              # Max width/height the service renders
//!
//! [web_optimized]
//! enabled = false
//! delivery_path = "/adobe/dynamicmedia/deliver/{asset-id}/{seo-name}.{format}"
//! crop_option = "relative"                     # "relative" (percent) or "absolute" (pixels)
//!
//! [next_gen]
//! enabled = false
//! local_assets = false                         # Also serve assets of this instance
//! remote_repository_id = ""                    # e.g. "delivery-p1-e1.adobeaemcloud.com"
//! local_repository_id = ""
//! image_delivery_path = "/adobe/assets/{asset-id}/as/{seo-name}.{format}?accept-experimental=1"
//! binary_delivery_path = "/adobe/assets/{asset-id}/original/as/{seo-name}?accept-experimental=1"
//! metadata_path = "/adobe/assets/{asset-id}/metadata"
//! image_width_height_default = 2048            # Size used when nothing else is known
//!
//! [next_gen.metadata]
//! enabled = false
//! headers = ["X-Adobe-Accept-Experimental:1"]  # "Name:value" pairs
//! timeout_ms = 5000
//!
//! [[formats]]
//! name = "teaser"
//! ratio = [16, 10]
//! min_width = 400
//! ```
//!
//! ## Partial Configuration
//!
//! ```toml
//! # Only turn on Dynamic Media
//! [dynamic_media]
//! enabled = true
//! server_url = "https://dummy.scene7.com"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::format::{MediaFormat, MediaFormatRegistry};
use crate::transform::Quality;
use crate::types::Dimension;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up by [`load_raw_config`].
pub const CONFIG_FILE_NAME: &str = "rendition-router.toml";

/// Output extensions the transform endpoint and delivery services can produce.
const ENFORCEABLE: [&str; 4] = ["jpg", "png", "gif", "webp"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Handler configuration loaded from `rendition-router.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HandlerConfig {
    /// Quality and output extension policy.
    pub images: ImagesConfig,
    /// Classic Dynamic Media delivery.
    pub dynamic_media: DynamicMediaConfig,
    /// Web-optimized image delivery.
    pub web_optimized: WebOptimizedConfig,
    /// Next-generation Dynamic Media delivery.
    pub next_gen: NextGenConfig,
    /// Named media formats.
    pub formats: Vec<MediaFormat>,
}

impl HandlerConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.images.default_quality) {
            return Err(ConfigError::Validation(
                "images.default_quality must be 0.0-1.0".into(),
            ));
        }
        if let Some(ext) = self
            .images
            .enforceable_extensions
            .iter()
            .find(|e| !ENFORCEABLE.contains(&e.to_ascii_lowercase().as_str()))
        {
            return Err(ConfigError::Validation(format!(
                "images.enforceable_extensions: '{ext}' is not one of {ENFORCEABLE:?}"
            )));
        }
        if self.dynamic_media.image_size_limit.contains(&0) {
            return Err(ConfigError::Validation(
                "dynamic_media.image_size_limit values must be non-zero".into(),
            ));
        }
        if self.dynamic_media.enabled && self.dynamic_media.server_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "dynamic_media.server_url is required when dynamic_media is enabled".into(),
            ));
        }
        if self.next_gen.image_width_height_default == 0 {
            return Err(ConfigError::Validation(
                "next_gen.image_width_height_default must be non-zero".into(),
            ));
        }
        if self.next_gen.metadata.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "next_gen.metadata.timeout_ms must be non-zero".into(),
            ));
        }
        let mut names = HashSet::new();
        for format in &self.formats {
            if format.name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "formats: name must not be blank".into(),
                ));
            }
            if !names.insert(format.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "formats: duplicate name '{}'",
                    format.name
                )));
            }
            if format.ratio.is_some_and(|[w, h]| w <= 0.0 || h <= 0.0) {
                return Err(ConfigError::Validation(format!(
                    "formats: ratio of '{}' must be positive",
                    format.name
                )));
            }
        }
        Ok(())
    }

    /// Registry over the configured `[[formats]]`.
    pub fn format_registry(&self) -> MediaFormatRegistry {
        MediaFormatRegistry::new(self.formats.iter().cloned())
    }

    /// The enforced output extension is on the allow-list.
    pub fn is_enforceable(&self, extension: &str) -> bool {
        self.images
            .enforceable_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(extension))
    }
}

/// Quality and output extension policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Lossy quality fraction used when a request gives none.
    pub default_quality: f64,
    /// Extensions a request may enforce as output format.
    pub enforceable_extensions: Vec<String>,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            default_quality: 0.85,
            enforceable_extensions: vec!["jpg".into(), "png".into()],
        }
    }
}

impl ImagesConfig {
    pub fn quality(&self) -> Quality {
        Quality::new(self.default_quality)
    }
}

/// Classic Dynamic Media delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DynamicMediaConfig {
    pub enabled: bool,
    /// Production server, prefixed to every `/is/image` and `/is/content` path.
    pub server_url: String,
    /// When set, assets without Dynamic Media metadata get no URL at all.
    pub aem_fallback_disabled: bool,
    /// Reject smart-crop regions smaller than the requested size.
    pub validate_smart_crop_sizes: bool,
    /// Largest `[width, height]` the service renders.
    pub image_size_limit: [u64; 2],
}

impl Default for DynamicMediaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            server_url: String::new(),
            aem_fallback_disabled: false,
            validate_smart_crop_sizes: true,
            image_size_limit: [2000, 2000],
        }
    }
}

impl DynamicMediaConfig {
    pub fn size_limit(&self) -> Dimension {
        Dimension::new(self.image_size_limit[0], self.image_size_limit[1])
    }
}

/// How web-optimized delivery encodes crop rectangles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropOption {
    /// Percentages of the image size: `16.7p,0.0p,66.7p,100.0p`.
    #[default]
    Relative,
    /// Pixels: `l,t,w,h`.
    Absolute,
}

/// Web-optimized image delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebOptimizedConfig {
    pub enabled: bool,
    /// Path with `{asset-id}`, `{seo-name}` and `{format}` placeholders.
    pub delivery_path: String,
    pub crop_option: CropOption,
}

impl Default for WebOptimizedConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            delivery_path: "/adobe/dynamicmedia/deliver/{asset-id}/{seo-name}.{format}".into(),
            crop_option: CropOption::Relative,
        }
    }
}

/// Next-generation Dynamic Media delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NextGenConfig {
    pub enabled: bool,
    /// Also serve assets of the local repository through next-gen delivery.
    pub local_assets: bool,
    pub remote_repository_id: String,
    pub local_repository_id: String,
    pub image_delivery_path: String,
    pub binary_delivery_path: String,
    pub metadata_path: String,
    /// Width and height used when neither the request nor metadata gives one.
    pub image_width_height_default: u64,
    pub metadata: NextGenMetadataConfig,
}

impl Default for NextGenConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            local_assets: false,
            remote_repository_id: String::new(),
            local_repository_id: String::new(),
            image_delivery_path:
                "/adobe/assets/{asset-id}/as/{seo-name}.{format}?accept-experimental=1".into(),
            binary_delivery_path:
                "/adobe/assets/{asset-id}/original/as/{seo-name}?accept-experimental=1".into(),
            metadata_path: "/adobe/assets/{asset-id}/metadata".into(),
            image_width_height_default: 2048,
            metadata: NextGenMetadataConfig::default(),
        }
    }
}

/// Metadata lookups for next-gen assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NextGenMetadataConfig {
    pub enabled: bool,
    /// Extra request headers as `Name:value`.
    pub headers: Vec<String>,
    pub timeout_ms: u64,
}

impl Default for NextGenMetadataConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            headers: vec!["X-Adobe-Accept-Experimental:1".into()],
            timeout_ms: 5000,
        }
    }
}

impl NextGenMetadataConfig {
    /// Headers split into name/value pairs; malformed entries are skipped.
    pub fn header_pairs(&self) -> Vec<(&str, &str)> {
        self.headers
            .iter()
            .filter_map(|h| h.split_once(':'))
            .map(|(name, value)| (name.trim(), value.trim()))
            .filter(|(name, _)| !name.is_empty())
            .collect()
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(HandlerConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `rendition-router.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<HandlerConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: HandlerConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `rendition-router.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<HandlerConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `rendition-router.toml` with all keys and explanations.
pub fn stock_config_toml() -> &'static str {
    r##"# Rendition Router Configuration
# ==============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Images
# ---------------------------------------------------------------------------
[images]
# Lossy encoding quality as a fraction (0.0 = worst, 1.0 = best).
default_quality = 0.85

# Output extensions a request may enforce. Allowed: jpg, png, gif, webp.
enforceable_extensions = ["jpg", "png"]

# ---------------------------------------------------------------------------
# Classic Dynamic Media
# ---------------------------------------------------------------------------
[dynamic_media]
enabled = false

# Production server URL, required when enabled.
server_url = ""

# When true, assets without Dynamic Media metadata are not delivered at all.
aem_fallback_disabled = false

# Reject smart-crop regions smaller than the requested size and fall back
# to an explicit crop.
validate_smart_crop_sizes = true

# Largest [width, height] the image server renders.
image_size_limit = [2000, 2000]

# ---------------------------------------------------------------------------
# Web-optimized image delivery
# ---------------------------------------------------------------------------
[web_optimized]
enabled = false

# Placeholders: {asset-id}, {seo-name}, {format}.
delivery_path = "/adobe/dynamicmedia/deliver/{asset-id}/{seo-name}.{format}"

# "relative" sends crops as percentages, "absolute" as pixels.
crop_option = "relative"

# ---------------------------------------------------------------------------
# Next-generation Dynamic Media
# ---------------------------------------------------------------------------
[next_gen]
enabled = false

# Also deliver assets of this repository through next-gen delivery.
local_assets = false

remote_repository_id = ""
local_repository_id = ""

# Placeholders: {asset-id}, {seo-name}, {format}.
image_delivery_path = "/adobe/assets/{asset-id}/as/{seo-name}.{format}?accept-experimental=1"
binary_delivery_path = "/adobe/assets/{asset-id}/original/as/{seo-name}?accept-experimental=1"
metadata_path = "/adobe/assets/{asset-id}/metadata"

# Width/height used when neither request nor metadata provides one.
image_width_height_default = 2048

[next_gen.metadata]
# Fetch asset metadata (dimensions, smart crops) before building URLs.
enabled = false

# Extra request headers as "Name:value".
headers = ["X-Adobe-Accept-Experimental:1"]

timeout_ms = 5000

# ---------------------------------------------------------------------------
# Media formats
# ---------------------------------------------------------------------------
# [[formats]]
# name = "teaser"
# ratio = [16, 10]
# min_width = 400
# extensions = ["jpg", "png"]
"##
}
