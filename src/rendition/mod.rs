//! Rendition matching and multi-format resolution.
//!
//! | Module | Role |
//! |--------|------|
//! | `model` | [`Rendition`] (stored or virtual) and [`ResolvedRendition`] |
//! | `matcher` | One format: direct match, synthesis, relaxation, auto-crop |
//! | `resolver` | Many formats: parents, responsive children, mandatory gating, fallback ordering |

mod matcher;
mod model;
mod resolver;

pub use matcher::{MatchRequest, RenditionMatch, match_rendition};
pub use model::{Rendition, ResolvedRendition, Transformation};
pub use resolver::{
    AssetRenditionSource, RenditionSource, RequestedFormat, Resolution, resolve_formats,
    responsive_format_options,
};
