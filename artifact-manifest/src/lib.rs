//! # artifact-manifest
//!
//! Tera-based renderer for `ARTIFACT_INDEX.md`, the human-readable view of
//! the canonical index.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use artifact_core::CanonicalIndex;
//! use artifact_manifest::ManifestRenderer;
//!
//! fn manifest(index: &CanonicalIndex) -> Option<String> {
//!     let renderer = ManifestRenderer::new(None).ok()?;
//!     renderer.render(index, Path::new("outputs")).ok()
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::ManifestContext;
pub use engine::{ManifestRenderer, MANIFEST_TEMPLATE};
pub use error::RenderError;
