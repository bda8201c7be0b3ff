//! Next-gen asset metadata: MIME type, original size and named smart crops.
//!
//! Fetched with a blocking GET of `metadata_path` on the asset's repository.
//! Every failure degrades to "no metadata": a 404 is logged at trace level,
//! anything else at warn level, and the asset is then served without size
//! checks or smart crops.
//!
//! Response shape (other keys are ignored):
//!
//! ```json
//! {
//!   "repositoryMetadata": {
//!     "dc:format": "image/jpeg",
//!     "repo:size": 250000,
//!     "smartcrops": {
//!       "Landscape": {
//!         "left": 0.0, "top": 0.2, "normalizedWidth": 1.0, "normalizedHeight": 0.5
//!       }
//!     }
//!   },
//!   "assetMetadata": {
//!     "tiff:ImageWidth": 1200, "tiff:ImageLength": 800, "dam:assetStatus": "approved"
//!   }
//! }
//! ```

use crate::asset::{SmartCropProfile, SmartCropRegion};
use crate::config::{NextGenConfig, NextGenMetadataConfig};
use crate::types::Dimension;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("HTTP error: {0}")]
    Http(#[from] ureq::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What the repository knows about a remote asset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NextGenMetadata {
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
    /// Original image size, when both sides are known.
    pub dimension: Option<Dimension>,
    pub asset_status: Option<String>,
    /// Named crops; empty unless the original size is known.
    pub smart_crops: Vec<SmartCropRegion>,
}

impl NextGenMetadata {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let response: MetadataResponse = serde_json::from_str(json)?;
        let dimension = response
            .asset_metadata
            .as_ref()
            .map(|a| Dimension::new(a.width, a.height))
            .filter(Dimension::is_known);
        let asset_status = response.asset_metadata.and_then(|a| a.asset_status);

        let (mime_type, file_size, smart_crops) = match response.repository_metadata {
            Some(repository) => {
                let smart_crops = match dimension {
                    Some(image) => repository
                        .smart_crops
                        .into_iter()
                        .filter(|(name, crop)| crop.is_valid(name))
                        .map(|(name, crop)| crop.into_region(name, image))
                        .collect(),
                    None => Vec::new(),
                };
                (repository.format, repository.size, smart_crops)
            }
            None => (None, None, Vec::new()),
        };

        Ok(Self {
            mime_type,
            file_size,
            dimension,
            asset_status,
            smart_crops,
        })
    }

    /// Usable only when the repository reported a MIME type.
    pub fn is_valid(&self) -> bool {
        self.mime_type.is_some()
    }

    pub fn mime_type_or_default(&self) -> &str {
        self.mime_type.as_deref().unwrap_or(DEFAULT_MIME_TYPE)
    }

    pub fn smart_crop_profile(&self) -> Option<SmartCropProfile> {
        (!self.smart_crops.is_empty()).then(|| SmartCropProfile::new(self.smart_crops.clone()))
    }
}

#[derive(Deserialize)]
struct MetadataResponse {
    #[serde(rename = "repositoryMetadata")]
    repository_metadata: Option<RepositoryMetadata>,
    #[serde(rename = "assetMetadata")]
    asset_metadata: Option<AssetMetadata>,
}

#[derive(Deserialize)]
struct RepositoryMetadata {
    #[serde(rename = "dc:format")]
    format: Option<String>,
    #[serde(rename = "repo:size")]
    size: Option<u64>,
    #[serde(rename = "smartcrops", default)]
    smart_crops: BTreeMap<String, SmartCropEntry>,
}

#[derive(Deserialize)]
struct AssetMetadata {
    #[serde(rename = "tiff:ImageWidth", default)]
    width: u64,
    #[serde(rename = "tiff:ImageLength", default)]
    height: u64,
    #[serde(rename = "dam:assetStatus")]
    asset_status: Option<String>,
}

#[derive(Deserialize)]
struct SmartCropEntry {
    #[serde(default)]
    left: f64,
    #[serde(default)]
    top: f64,
    #[serde(rename = "normalizedWidth", default)]
    normalized_width: f64,
    #[serde(rename = "normalizedHeight", default)]
    normalized_height: f64,
}

impl SmartCropEntry {
    fn is_valid(&self, name: &str) -> bool {
        !name.trim().is_empty()
            && self.normalized_width > 0.0
            && self.normalized_height > 0.0
            && self.left >= 0.0
            && self.top >= 0.0
    }

    fn into_region(self, name: String, image: Dimension) -> SmartCropRegion {
        let ratio = (image.width as f64 * self.normalized_width)
            / (image.height as f64 * self.normalized_height);
        SmartCropRegion::new(name, ratio).with_area(
            self.left,
            self.top,
            self.normalized_width,
            self.normalized_height,
        )
    }
}

/// Metadata URL; plain http for `localhost:` repositories.
pub fn metadata_url(config: &NextGenConfig, repository_id: &str, asset_id: &str) -> Option<String> {
    if repository_id.trim().is_empty() || config.metadata_path.trim().is_empty() {
        return None;
    }
    let scheme = if repository_id.starts_with("localhost:") {
        "http"
    } else {
        "https"
    };
    let path = config.metadata_path.replace("{asset-id}", asset_id);
    Some(format!("{scheme}://{repository_id}{path}"))
}

/// Fetch metadata for `asset_id`, or `None` when disabled, missing or failing.
pub fn fetch_metadata(
    config: &NextGenConfig,
    repository_id: &str,
    asset_id: &str,
) -> Option<NextGenMetadata> {
    if !config.metadata.enabled {
        return None;
    }
    let url = metadata_url(config, repository_id, asset_id)?;
    match request_metadata(&url, &config.metadata) {
        Ok(Some(metadata)) if metadata.is_valid() => Some(metadata),
        Ok(Some(_)) => {
            log::warn!("Metadata from {url} has no MIME type");
            None
        }
        Ok(None) => None,
        Err(e) => {
            log::warn!("Unable to fetch metadata from {url}: {e}");
            None
        }
    }
}

fn request_metadata(
    url: &str,
    config: &NextGenMetadataConfig,
) -> Result<Option<NextGenMetadata>, MetadataError> {
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_millis(config.timeout_ms)))
        .http_status_as_error(false)
        .build()
        .into();
    let mut request = agent.get(url);
    for (name, value) in config.header_pairs() {
        request = request.header(name, value);
    }
    let response = request.call()?;
    match response.status().as_u16() {
        200 => {
            let mut body = String::new();
            response
                .into_body()
                .into_reader()
                .read_to_string(&mut body)?;
            Ok(Some(NextGenMetadata::from_json(&body)?))
        }
        404 => {
            log::trace!("No metadata at {url}");
            Ok(None)
        }
        status => {
            log::warn!("Unexpected status {status} from {url}");
            Ok(None)
        }
    }
}
