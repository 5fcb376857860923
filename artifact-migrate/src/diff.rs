//! Unified diff support for `artifact-canon diff`.
//!
//! Compares the file currently in the canonical tree with the source the last
//! run selected for that key. Nothing is written.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use similar::TextDiff;

use artifact_core::{paths, LogicalKey, MigrationStatus};

use crate::error::{io_err, MigrateError};
use crate::index_store;

/// What the comparison found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffBody {
    Identical,
    /// Unified diff, canonical file first.
    Text(String),
    /// At least one side is not UTF-8 text.
    Binary,
    CanonicalMissing,
    SourceMissing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictDiff {
    pub logical_key: LogicalKey,
    pub status: MigrationStatus,
    pub canonical_path: PathBuf,
    pub source_path: PathBuf,
    pub body: DiffBody,
}

/// Diff the canonical file for `key` against its recorded source.
pub fn diff_conflict(canonical_root: &Path, key: &str) -> Result<ConflictDiff, MigrateError> {
    let unknown = || MigrateError::UnknownKey {
        key: key.to_string(),
    };
    let logical_key = LogicalKey::parse(key).map_err(|_| unknown())?;
    let index = index_store::load_at(canonical_root)?;
    let record = index.get(&logical_key).ok_or_else(unknown)?;

    let canonical_path = paths::destination_for(canonical_root, &logical_key);
    let source_path = record.source_path.clone();

    let body = match (read_optional(&canonical_path)?, read_optional(&source_path)?) {
        (None, _) => DiffBody::CanonicalMissing,
        (_, None) => DiffBody::SourceMissing,
        (Some(current), Some(source)) if current == source => DiffBody::Identical,
        (Some(current), Some(source)) => {
            match (String::from_utf8(current), String::from_utf8(source)) {
                (Ok(current), Ok(source)) if !current.contains('\0') && !source.contains('\0') => {
                    DiffBody::Text(unified(&logical_key, &record.source_tag.0, &current, &source))
                }
                _ => DiffBody::Binary,
            }
        }
    };

    Ok(ConflictDiff {
        logical_key,
        status: record.status,
        canonical_path,
        source_path,
        body,
    })
}

fn unified(key: &LogicalKey, source_tag: &str, current: &str, source: &str) -> String {
    let old_header = format!("canonical/{key}");
    let new_header = format!("{source_tag}/{key}");
    TextDiff::from_lines(current, source)
        .unified_diff()
        .header(&old_header, &new_header)
        .context_radius(3)
        .to_string()
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, MigrateError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}
