//! Per-key migration into the canonical tree.
//!
//! ## Copy protocol
//!
//! 1. Hash the winner.
//! 2. Destination missing: stream the winner into `<dest>.canon.tmp`,
//!    hashing as it goes.
//! 3. Compare the streamed hash with step 1; a mismatch means the source
//!    changed mid-run, so the temp file is removed and the key is an error.
//! 4. Apply the source mtime to the temp file.
//! 5. Rename onto the destination (atomic on POSIX).
//!
//! An existing destination is never replaced: equal content is skipped,
//! different content is a conflict.

use std::fs::File;
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use filetime::FileTime;

use artifact_core::{
    hash::{hash_file, HashingWriter},
    paths, CanonicalIndex, ContentHash, Migrate, MigrationRecord, MigrationReport,
    MigrationStatus, SelectionResult,
};

use crate::error::MigrateError;

/// Applies selections to a canonical root and keeps the index in step.
#[derive(Debug)]
pub struct Migrator {
    canonical_root: PathBuf,
    index: CanonicalIndex,
    dry_run: bool,
    now: DateTime<Utc>,
}

impl Migrator {
    /// `index` is the state left by the previous run.
    pub fn new(canonical_root: impl Into<PathBuf>, index: CanonicalIndex, dry_run: bool) -> Self {
        Self {
            canonical_root: canonical_root.into(),
            index,
            dry_run,
            now: Utc::now(),
        }
    }

    /// Timestamp stamped on new records.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn index(&self) -> &CanonicalIndex {
        &self.index
    }

    /// Classify and, unless dry-running, apply one selection. Never fails:
    /// every problem becomes an `ERROR` record.
    pub fn migrate_one(&self, selection: &SelectionResult) -> MigrationRecord {
        let key = &selection.logical_key;
        let dest = paths::destination_for(&self.canonical_root, key);
        let mut record = MigrationRecord {
            logical_key: key.clone(),
            canonical_path: dest.clone(),
            source_path: selection.winner.absolute_path.clone(),
            source_tag: selection.winner.source_tag.clone(),
            migrated_at: self.now,
            content_hash: None,
            status: MigrationStatus::Error,
            reason: selection.reason,
            candidate_count: selection.candidate_count(),
            destination_hash: None,
            detail: None,
        };

        if paths::is_reserved(key) {
            tracing::warn!("{key}: collides with a reserved file in the canonical root");
            record.detail = Some(format!("'{key}' collides with a reserved file name"));
            return record;
        }

        let source_hash = match selection.winner.hashed() {
            Ok(hashed) => hashed.content_hash,
            Err(err) => return fail(record, format!("cannot read source: {err}")),
        };
        let Some(source_hash) = source_hash else {
            return fail(record, "source hash unavailable".to_string());
        };
        record.content_hash = Some(source_hash.clone());

        match std::fs::symlink_metadata(&dest) {
            Ok(meta) if !meta.is_file() => fail(
                record,
                "destination exists and is not a regular file".to_string(),
            ),
            Ok(_) => self.compare_existing(record, &dest, &source_hash),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                if self.dry_run {
                    tracing::info!("[dry-run] would copy: {key}");
                    record.status = MigrationStatus::WouldCopy;
                    return record;
                }
                match copy_verified(&selection.winner.absolute_path, &dest, &source_hash) {
                    Ok(()) => {
                        tracing::info!("copied: {key}");
                        record.status = MigrationStatus::Copied;
                        record
                    }
                    Err(detail) => fail(record, detail),
                }
            }
            Err(err) => fail(record, format!("cannot inspect destination: {err}")),
        }
    }

    fn compare_existing(
        &self,
        mut record: MigrationRecord,
        dest: &Path,
        source_hash: &ContentHash,
    ) -> MigrationRecord {
        let dest_hash = match hash_file(dest) {
            Ok(hash) => hash,
            Err(err) => return fail(record, format!("cannot read destination: {err}")),
        };

        if &dest_hash == source_hash {
            tracing::debug!("unchanged: {}", record.logical_key);
            record.status = MigrationStatus::SkippedUnchanged;
        } else {
            tracing::warn!(
                "conflict: {} (canonical {}, source {})",
                record.logical_key,
                dest_hash.short(),
                source_hash.short()
            );
            record.status = MigrationStatus::Conflict;
            record.detail = Some(format!(
                "canonical file {} differs from selected source {}",
                dest_hash.short(),
                source_hash.short()
            ));
            record.destination_hash = Some(dest_hash);
        }
        self.carry_timestamp(record)
    }

    /// Keep the previous `migrated_at` when nothing about the outcome moved,
    /// so an unchanged tree yields an unchanged index.
    fn carry_timestamp(&self, mut record: MigrationRecord) -> MigrationRecord {
        let Some(prev) = self.index.get(&record.logical_key) else {
            return record;
        };
        let same_source = prev.source_path == record.source_path
            && prev.content_hash == record.content_hash;
        let carried = match record.status {
            MigrationStatus::SkippedUnchanged => same_source,
            MigrationStatus::Conflict => {
                same_source
                    && prev.status == MigrationStatus::Conflict
                    && prev.destination_hash == record.destination_hash
            }
            _ => false,
        };
        if carried {
            record.migrated_at = prev.migrated_at;
        }
        record
    }
}

impl Migrate for Migrator {
    type Error = MigrateError;

    fn migrate(&mut self, selections: &[SelectionResult]) -> Result<MigrationReport, Self::Error> {
        let mut records = Vec::with_capacity(selections.len());
        for selection in selections {
            let record = self.migrate_one(selection);
            if !self.dry_run {
                self.index.upsert(record.clone());
            }
            records.push(record);
        }
        Ok(MigrationReport {
            records,
            dry_run: self.dry_run,
        })
    }

    fn into_index(self) -> CanonicalIndex {
        self.index
    }
}

fn fail(mut record: MigrationRecord, detail: String) -> MigrationRecord {
    tracing::warn!("{}: {detail}", record.logical_key);
    record.status = MigrationStatus::Error;
    record.detail = Some(detail);
    record
}

/// Copy `src` to `dest` through a temp sibling, verifying the streamed bytes
/// against `expected`. Returns a human-readable detail on failure.
fn copy_verified(src: &Path, dest: &Path, expected: &ContentHash) -> Result<(), String> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("cannot create {}: {e}", parent.display()))?;
    }

    let tmp = paths::tmp_path_for(dest);
    let outcome = stream_to_tmp(src, &tmp, expected).and_then(|()| {
        std::fs::rename(&tmp, dest).map_err(|e| format!("cannot rename into place: {e}"))
    });
    if outcome.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    outcome
}

fn stream_to_tmp(src: &Path, tmp: &Path, expected: &ContentHash) -> Result<(), String> {
    let copy = || -> io::Result<ContentHash> {
        let mut input = File::open(src)?;
        let mut writer = HashingWriter::new(BufWriter::new(File::create(tmp)?));
        io::copy(&mut input, &mut writer)?;
        writer.flush()?;
        let (buffered, digest, _) = writer.finish();
        let file = buffered.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(digest)
    };
    let digest = copy().map_err(|e| format!("copy failed: {e}"))?;
    if &digest != expected {
        return Err(format!(
            "source changed during copy (expected {}, copied {})",
            expected.short(),
            digest.short()
        ));
    }

    let mtime = std::fs::metadata(src)
        .map(|m| FileTime::from_last_modification_time(&m))
        .map_err(|e| format!("cannot read source mtime: {e}"))?;
    filetime::set_file_mtime(tmp, mtime).map_err(|e| format!("cannot set mtime: {e}"))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
