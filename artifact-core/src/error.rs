//! Error types for artifact-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::LogicalKey;

/// A string could not be turned into a [`LogicalKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("logical key is empty")]
    Empty,

    #[error("logical key '{key}' contains an empty path segment")]
    EmptySegment { key: String },

    #[error("logical key '{key}' contains '.' or '..' segments")]
    Traversal { key: String },
}

/// Invariant violations inside the selection stage.
///
/// These indicate a discovery bug, never a user mistake.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("selection invariant violated: empty candidate group for '{key}'")]
    EmptyGroup { key: LogicalKey },

    #[error(
        "selection invariant violated: candidate {path} has key '{found}' in group '{expected}'"
    )]
    KeyMismatch {
        expected: LogicalKey,
        found: LogicalKey,
        path: PathBuf,
    },
}

/// Errors loading, writing, or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load; carries the file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
