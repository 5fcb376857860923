//! # artifact-migrate
//!
//! Copies selected winners into the canonical tree and maintains
//! `ARTIFACT_INDEX.json` / `ARTIFACT_INDEX.md`.
//!
//! Call [`pipeline::run`] for a full discover → select → migrate pass, or use
//! [`Migrator`] directly with selections from elsewhere. [`verify::check`]
//! and [`diff::diff_conflict`] inspect a canonical root after the fact.

pub mod diff;
pub mod error;
pub mod index_store;
pub mod lock;
pub mod pipeline;
pub mod verify;
pub mod writer;

pub use error::MigrateError;
pub use index_store::Persisted;
pub use lock::RunLock;
pub use pipeline::{run, run_stages, RunOutcome};
pub use writer::Migrator;
