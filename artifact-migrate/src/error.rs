//! Error types for artifact-migrate.
//!
//! Only run-level failures live here. Per-key problems become `ERROR` or
//! `CONFLICT` records and never abort a run.

use std::path::PathBuf;

use thiserror::Error;

use artifact_core::{ConfigError, SelectionError};
use artifact_discovery::DiscoveryError;
use artifact_manifest::RenderError;

#[derive(Debug, Error)]
pub enum MigrateError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("index JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("manifest error: {0}")]
    Manifest(#[from] RenderError),

    /// Another run holds the advisory lock on the canonical root.
    #[error("another run holds the lock at {path}")]
    LockHeld { path: PathBuf },

    #[error("canonical index at {path} is unreadable: {source}")]
    IndexCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("canonical index at {path} has format version {found}, expected at most {supported}")]
    IndexVersion {
        path: PathBuf,
        found: u32,
        supported: u32,
    },

    #[error("no record for '{key}' in the canonical index")]
    UnknownKey { key: String },
}

/// Convenience constructor for [`MigrateError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> MigrateError {
    MigrateError::Io {
        path: path.into(),
        source,
    }
}
