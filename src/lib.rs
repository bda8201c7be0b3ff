//! # Rendition Router
//!
//! Picks the rendition of a media asset that satisfies a caller's formats,
//! synthesizes crop/rotate/resize transformations when no stored rendition
//! fits, and builds the URL of the delivery system that serves it.
//!
//! # Architecture: Match, Resolve, Route
//!
//! A request flows through three layers, each a pure function of its inputs:
//!
//! ```text
//! 1. Match     asset + one format    →  Rendition           (stored or virtual)
//! 2. Resolve   asset + many formats  →  Vec<ResolvedRendition> + success
//! 3. Route     rendition             →  URL from the first backend that answers
//! ```
//!
//! [`media::MediaHandler`] ties them together: it turns a reference into an
//! asset, names into formats, and the result into a [`media::Media`] value.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`media`] | Top-level handler: reference + request → `Media` or an invalid reason |
//! | [`rendition`] | Matching, transformation synthesis, multi-format and responsive resolution |
//! | [`delivery`] | Backend chain: next-gen, Dynamic Media, web-optimized, local transform paths |
//! | [`uri_template`] | `{width}`/`{height}` URL templates built with sentinel sizes |
//! | [`transform`] | Local transform endpoint: selector paths and the pixel primitive |
//! | [`geometry`] | Ratios, crop rectangles, rotation mapping, auto-crop |
//! | [`format`] | Named media formats and their registry |
//! | [`request`] | Immutable rendition request and its builder |
//! | [`asset`] | Asset and rendition views, smart crop profiles, in-memory sources |
//! | [`config`] | `rendition-router.toml` loading, merging and validation |
//! | [`widths`] | Responsive width option strings (`"100,200:2x,300?"`) |
//! | [`file_type`] | Extension and MIME type classification |
//! | [`types`] | `Dimension` and `Rotation` |
//! | [`error`] | `ContractError`: caller bugs that must fail loudly |
//!
//! # Design Decisions
//!
//! ## Absence Is Not an Error
//!
//! A missing rendition, a backend that does not know an asset, a failed
//! metadata lookup: all of these are `Option`. The handler folds them into
//! a [`media::MediaInvalidReason`] so renderers treat them as a normal branch.
//! `Result` is kept for contract violations such as enforcing an output
//! extension that is not on the allow-list.
//!
//! ## Immutable Requests
//!
//! A [`request::RenditionRequest`] is built once. Per-format variants (crop
//! dropped on relaxation, auto-crop applied) are derived by value as
//! [`rendition::MatchRequest`]s, so nothing is mutated and restored while
//! formats are tried one after another. The handler itself holds no
//! per-request state and can be shared across threads.
//!
//! ## An Ordered Backend Chain
//!
//! Every delivery system implements [`delivery::DeliveryBackend`] and may
//! decline. The router asks them in a fixed order and keeps the first URL.
//! The local transform backend always answers, so a resolved rendition
//! always has a URL unless an earlier backend claims the asset and refuses it.
//!
//! ## Templates From Sentinels
//!
//! URI templates for local, web-optimized and next-gen delivery reuse the
//! URL builders: they are called with sentinel sizes that no real
//! request produces, and the sentinels are replaced by placeholders
//! afterwards. Dynamic Media is the exception. Its templates switch
//! between `wid`/`hei` parameters and add `fit=constrain` for smart crops,
//! so it builds them in a separate `try_build_template`.

pub mod asset;
pub mod config;
pub mod delivery;
pub mod error;
pub mod file_type;
pub mod format;
pub mod geometry;
pub mod media;
pub mod rendition;
pub mod request;
pub mod transform;
pub mod types;
pub mod uri_template;
pub mod widths;

pub use error::ContractError;
pub use media::{Media, MediaHandler, MediaInvalidReason};

#[cfg(test)]
pub(crate) mod test_helpers;
