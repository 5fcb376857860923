//! Advisory run lock on `<canonical_root>/.artifact-canon.lock`.
//!
//! The lock file itself is left on disk between runs; only the OS-level
//! exclusive lock marks a run in progress, so a crashed run never leaves a
//! stale lock behind.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use artifact_core::paths;

use crate::error::{io_err, MigrateError};

/// Held for the duration of a real run. Released on drop.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Take the lock without waiting. Contention is
    /// [`MigrateError::LockHeld`].
    pub fn acquire(canonical_root: &Path) -> Result<Self, MigrateError> {
        let path = paths::lock_path(canonical_root);
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| io_err(&path, e))?;

        if let Err(err) = file.try_lock_exclusive() {
            if err.kind() == fs2::lock_contended_error().kind() {
                let mut holder = String::new();
                let _ = file.read_to_string(&mut holder);
                let holder = holder.trim();
                tracing::warn!(
                    "lock {} is held ({})",
                    path.display(),
                    if holder.is_empty() { "holder unknown" } else { holder }
                );
                return Err(MigrateError::LockHeld { path });
            }
            return Err(io_err(&path, err));
        }

        // Best effort: record who holds the lock for the next contender.
        let _ = file
            .set_len(0)
            .and_then(|_| file.seek(SeekFrom::Start(0)))
            .and_then(|_| writeln!(file, "pid {}", std::process::id()));

        tracing::debug!("acquired {}", path.display());
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn second_acquire_fails_fast() {
        let root = TempDir::new().unwrap();
        let first = RunLock::acquire(root.path()).expect("first lock");
        let err = RunLock::acquire(root.path()).unwrap_err();
        assert!(matches!(err, MigrateError::LockHeld { .. }), "got {err}");
        drop(first);
    }

    #[test]
    fn lock_is_released_on_drop() {
        let root = TempDir::new().unwrap();
        drop(RunLock::acquire(root.path()).unwrap());
        let again = RunLock::acquire(root.path()).expect("reacquire after drop");
        assert_eq!(again.path(), paths::lock_path(root.path()));
    }

    #[test]
    fn lock_records_holder_pid() {
        let root = TempDir::new().unwrap();
        let _lock = RunLock::acquire(root.path()).unwrap();
        let contents = std::fs::read_to_string(paths::lock_path(root.path())).unwrap();
        assert_eq!(contents.trim(), format!("pid {}", std::process::id()));
    }
}
