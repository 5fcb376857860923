//! Artifact canonicalization core — domain types, hashing, config, paths.
//!
//! Public API surface:
//! - [`types`]: candidates, selections, migration records, the canonical index
//! - [`capability`]: [`Discover`], [`Select`], [`Migrate`] stage traits
//! - [`config`]: `artifact-canon.yaml` loading and scaffolding
//! - [`paths`]: canonical-root resolution and reserved file names
//! - [`hash`]: SHA-256 content hashing
//! - [`error`]: [`ConfigError`], [`SelectionError`], [`KeyError`]

pub mod capability;
pub mod config;
pub mod error;
pub mod hash;
pub mod paths;
pub mod types;

pub use capability::{Discover, Migrate, Select};
pub use config::{CanonConfig, SearchRoot};
pub use error::{ConfigError, KeyError, SelectionError};
pub use types::{
    Candidate, CandidateGroup, CanonicalIndex, ContentHash, DiscoveryReport, LogicalKey,
    MigrationRecord, MigrationReport, MigrationStatus, RootIssue, SelectionReason,
    SelectionResult, SourceTag, StatusCounts,
};
