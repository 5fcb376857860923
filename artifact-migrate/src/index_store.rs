//! Canonical index persistence: `<canonical_root>/ARTIFACT_INDEX.json`.
//!
//! Writes use the same atomic `.canon.tmp` + rename pattern as artifact
//! copies, and are skipped entirely when the serialized content is unchanged.

use std::io::ErrorKind;
use std::path::Path;

use artifact_core::{paths, types::INDEX_FORMAT_VERSION, CanonicalIndex};

use crate::error::{io_err, MigrateError};

/// Whether a persisted file was touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persisted {
    Written,
    Unchanged,
}

/// Load the index under `canonical_root`, or `None` if no run has written one.
pub fn try_load_at(canonical_root: &Path) -> Result<Option<CanonicalIndex>, MigrateError> {
    let path = paths::index_path(canonical_root);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(io_err(&path, err)),
    };
    let index: CanonicalIndex = serde_json::from_str(&contents)
        .map_err(|source| MigrateError::IndexCorrupt {
            path: path.clone(),
            source,
        })?;
    if index.version > INDEX_FORMAT_VERSION {
        return Err(MigrateError::IndexVersion {
            path,
            found: index.version,
            supported: INDEX_FORMAT_VERSION,
        });
    }
    Ok(Some(index))
}

/// Load the index, or an empty one if none exists yet.
pub fn load_at(canonical_root: &Path) -> Result<CanonicalIndex, MigrateError> {
    Ok(try_load_at(canonical_root)?.unwrap_or_default())
}

/// Serialize `index` the way [`save_at`] writes it.
pub fn to_json(index: &CanonicalIndex) -> Result<String, MigrateError> {
    let mut json = serde_json::to_string_pretty(index)?;
    json.push('\n');
    Ok(json)
}

/// Save the index atomically. Skips the write when the file already holds
/// identical bytes.
pub fn save_at(canonical_root: &Path, index: &CanonicalIndex) -> Result<Persisted, MigrateError> {
    let path = paths::index_path(canonical_root);
    write_if_changed(&path, &to_json(index)?)
}

/// Atomically replace `path` with `content` unless it already matches.
pub(crate) fn write_if_changed(path: &Path, content: &str) -> Result<Persisted, MigrateError> {
    match std::fs::read(path) {
        Ok(existing) if existing == content.as_bytes() => {
            tracing::debug!("unchanged: {}", path.display());
            return Ok(Persisted::Unchanged);
        }
        Ok(_) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(io_err(path, err)),
    }

    let tmp = paths::tmp_path_for(path);
    std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    tracing::info!("wrote: {}", path.display());
    Ok(Persisted::Written)
}
