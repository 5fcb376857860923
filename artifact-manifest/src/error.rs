//! Error types for artifact-manifest.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from rendering `ARTIFACT_INDEX.md`.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// Building the tera context.
    #[error("context serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading user override templates.
    #[error("template io error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
}
