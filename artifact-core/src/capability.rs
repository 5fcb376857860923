//! The three pipeline capabilities.
//!
//! Each stage crate implements one trait; the pipeline is generic over all
//! three so stages can be swapped for synthetic ones in tests.

use crate::error::SelectionError;
use crate::types::{
    Candidate, CanonicalIndex, DiscoveryReport, MigrationReport, SelectionResult,
};

/// Produce the candidate set for one run.
pub trait Discover {
    type Error: std::error::Error + Send + Sync + 'static;

    fn discover(&self) -> Result<DiscoveryReport, Self::Error>;
}

/// Choose exactly one winner per logical key. Performs no I/O.
pub trait Select {
    fn select(&self, candidates: Vec<Candidate>) -> Result<Vec<SelectionResult>, SelectionError>;
}

/// Bring the canonical tree in line with a set of selections.
pub trait Migrate {
    type Error: std::error::Error + Send + Sync + 'static;

    fn migrate(&mut self, selections: &[SelectionResult]) -> Result<MigrationReport, Self::Error>;

    /// The index after every `migrate` call so far.
    fn into_index(self) -> CanonicalIndex;
}
