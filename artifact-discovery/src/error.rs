//! Error types for artifact-discovery.

use thiserror::Error;

use artifact_core::ConfigError;

/// Errors building discovery rules. Walking itself never fails; unreadable
/// roots are reported through [`artifact_core::RootIssue`].
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("invalid glob '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("invalid key extraction pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
