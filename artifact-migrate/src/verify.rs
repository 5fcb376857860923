//! Canonical tree verification for `artifact-canon status`.
//!
//! Record state precedence:
//! 1. `Unresolved` (last run recorded CONFLICT or ERROR)
//! 2. `Missing` (canonical file gone)
//! 3. `Modified` (canonical file hash differs from the recorded hash)
//! 4. `Current`
//!
//! Paths are derived from the key and the current canonical root, so a
//! canonical tree that was moved as a whole still verifies.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;

use artifact_core::{hash::hash_file, paths, ContentHash, LogicalKey, MigrationStatus};

use crate::error::{io_err, MigrateError};
use crate::index_store;

/// State of one indexed artifact on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RecordState {
    Current,
    Missing,
    Modified {
        expected: Option<ContentHash>,
        actual: ContentHash,
    },
    Unresolved {
        status: MigrationStatus,
        detail: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordCheck {
    pub logical_key: LogicalKey,
    pub canonical_path: PathBuf,
    #[serde(flatten)]
    pub state: RecordState,
}

/// Verification result for a canonical root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "signal", content = "records", rename_all = "snake_case")]
pub enum IndexSignal {
    /// No index has been written under this root.
    NeverRun,
    Checked(Vec<RecordCheck>),
}

impl IndexSignal {
    /// True only when an index exists and every record is `Current`.
    pub fn is_current(&self) -> bool {
        match self {
            IndexSignal::NeverRun => false,
            IndexSignal::Checked(checks) => {
                checks.iter().all(|c| c.state == RecordState::Current)
            }
        }
    }

    pub fn checks(&self) -> &[RecordCheck] {
        match self {
            IndexSignal::NeverRun => &[],
            IndexSignal::Checked(checks) => checks,
        }
    }
}

/// Check every indexed artifact under `canonical_root`. Reads only.
pub fn check(canonical_root: &Path) -> Result<IndexSignal, MigrateError> {
    let Some(index) = index_store::try_load_at(canonical_root)? else {
        return Ok(IndexSignal::NeverRun);
    };

    let mut checks = Vec::with_capacity(index.len());
    for record in index.records.values() {
        let canonical_path = paths::destination_for(canonical_root, &record.logical_key);
        let state = match record.status {
            MigrationStatus::Copied | MigrationStatus::SkippedUnchanged => {
                file_state(&canonical_path, record.content_hash.as_ref())?
            }
            status => RecordState::Unresolved {
                status,
                detail: record.detail.clone(),
            },
        };
        checks.push(RecordCheck {
            logical_key: record.logical_key.clone(),
            canonical_path,
            state,
        });
    }
    Ok(IndexSignal::Checked(checks))
}

fn file_state(path: &Path, expected: Option<&ContentHash>) -> Result<RecordState, MigrateError> {
    match hash_file(path) {
        Ok(actual) if Some(&actual) == expected => Ok(RecordState::Current),
        Ok(actual) => Ok(RecordState::Modified {
            expected: expected.cloned(),
            actual,
        }),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(RecordState::Missing),
        Err(err) => Err(io_err(path, err)),
    }
}
