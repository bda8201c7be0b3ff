//! Contract violations.
//!
//! Only caller bugs live here: an unsupported template type, a crop that
//! cannot exist, an output extension nobody may enforce. Anything that can
//! legitimately be missing at runtime (no matching rendition, a backend that
//! does not know the asset, a failed metadata lookup) is an `Option`, not an
//! error.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("Invalid crop: width and height must be positive (got {width}x{height})")]
    InvalidCrop { width: u64, height: u64 },
    #[error("Output extension '{extension}' cannot be enforced (allowed: {allowed})")]
    ExtensionNotAllowed { extension: String, allowed: String },
    #[error("URI template type {template_type} is not supported for {context}")]
    UnsupportedTemplateType {
        template_type: String,
        context: String,
    },
    #[error("Invalid width options: '{0}'")]
    InvalidWidths(String),
}
