//! Local on-demand transform endpoint.
//!
//! | Piece | Role |
//! |---|---|
//! | **Selector** | [`ImageFileSelector`]: the `image_file.{w}.{h}…` path grammar |
//! | **Parameters** | [`Quality`], [`TransformParams`]: what to do, not how |
//! | **Backend** | [`TransformBackend`]: the external pixel primitive |
//! | **Operations** | [`plan_transform`], [`render`]: selector → parameters → bytes |
//!
//! The delivery router only ever *builds* endpoint paths. Serving them is
//! up to the host application, which parses the selector back and calls
//! [`render`] with its own backend.

pub mod backend;
pub mod operations;
mod params;
pub mod selector;

pub use backend::{TransformBackend, TransformError};
pub use operations::{plan_transform, render};
pub use params::{Quality, TransformParams};
pub use selector::{ImageFileSelector, image_file_name, image_file_path, media_file_path};
