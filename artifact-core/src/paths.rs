//! Canonical-root resolution and fixed file names under it.
//!
//! # Layout
//!
//! ```text
//! <canonical_root>/
//!   ARTIFACT_INDEX.json      (machine-readable index, rewritten atomically)
//!   ARTIFACT_INDEX.md        (human-readable manifest)
//!   .artifact-canon.lock     (advisory run lock)
//!   <logical key path>       (one file per migrated artifact)
//! ```
//!
//! Resolution takes the environment value and working directory as explicit
//! inputs; callers read `$OUTPUT_DIR` themselves.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{io_err, ConfigError};
use crate::types::LogicalKey;

/// Environment variable overriding the default output root.
pub const OUTPUT_DIR_ENV: &str = "OUTPUT_DIR";
/// Output root used when neither a flag, config value, nor env var is set.
pub const DEFAULT_OUTPUT_DIR: &str = "outputs";

pub const INDEX_FILE: &str = "ARTIFACT_INDEX.json";
pub const MANIFEST_FILE: &str = "ARTIFACT_INDEX.md";
pub const LOCK_FILE: &str = ".artifact-canon.lock";
/// Suffix appended to a destination while its bytes are being written.
pub const TMP_SUFFIX: &str = ".canon.tmp";

/// Names at the top of the canonical root that no artifact may occupy.
pub const RESERVED_NAMES: &[&str] = &[INDEX_FILE, MANIFEST_FILE, LOCK_FILE];

/// Resolve the output root from an optional env value, relative to `cwd`.
pub fn resolve_output_root_from(env_value: Option<OsString>, cwd: &Path) -> PathBuf {
    let raw = env_value
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    absolutize(&raw, cwd)
}

/// Explicit canonical root if given, else the resolved output root.
pub fn resolve_canonical_root_from(
    explicit: Option<&Path>,
    env_value: Option<OsString>,
    cwd: &Path,
) -> PathBuf {
    match explicit {
        Some(path) => absolutize(path, cwd),
        None => resolve_output_root_from(env_value, cwd),
    }
}

/// Join `path` onto `base` unless it is already absolute. Pure, no I/O.
pub fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Create `dir` and all parents if missing.
pub fn ensure_dir(dir: &Path) -> Result<(), ConfigError> {
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))
}

/// Destination of `key` under `root`. Pure, no I/O.
///
/// Keys are validated at construction, so the result never leaves `root`.
pub fn destination_for(root: &Path, key: &LogicalKey) -> PathBuf {
    key.segments().fold(root.to_path_buf(), |acc, s| acc.join(s))
}

/// True when `key` would collide with the index, manifest, or lock file, or
/// with a write-in-progress temp file.
///
/// Only the first segment is checked against the reserved names, so
/// `nested/ARTIFACT_INDEX.md` is an ordinary key while
/// `ARTIFACT_INDEX.json/data.csv` is not.
pub fn is_reserved(key: &LogicalKey) -> bool {
    let top_level = key
        .segments()
        .next()
        .is_some_and(|first| RESERVED_NAMES.contains(&first));
    top_level || key.segments().any(|s| s.ends_with(TMP_SUFFIX))
}

pub fn index_path(root: &Path) -> PathBuf {
    root.join(INDEX_FILE)
}

pub fn manifest_path(root: &Path) -> PathBuf {
    root.join(MANIFEST_FILE)
}

pub fn lock_path(root: &Path) -> PathBuf {
    root.join(LOCK_FILE)
}

/// `<path>.canon.tmp`, a sibling of `path` on the same filesystem.
pub fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(TMP_SUFFIX);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_value_overrides_default() {
        let cwd = Path::new("/work");
        let root = resolve_output_root_from(Some(OsString::from("/data/out")), cwd);
        assert_eq!(root, PathBuf::from("/data/out"));
    }

    #[test]
    fn default_is_outputs_under_cwd() {
        let cwd = Path::new("/work");
        assert_eq!(
            resolve_output_root_from(None, cwd),
            PathBuf::from("/work/outputs")
        );
        assert_eq!(
            resolve_output_root_from(Some(OsString::new()), cwd),
            PathBuf::from("/work/outputs")
        );
    }

    #[test]
    fn relative_env_value_resolves_against_cwd() {
        let cwd = Path::new("/work");
        let root = resolve_output_root_from(Some(OsString::from("runtime/outputs")), cwd);
        assert_eq!(root, PathBuf::from("/work/runtime/outputs"));
    }

    #[test]
    fn explicit_root_wins_over_env() {
        let cwd = Path::new("/work");
        let root = resolve_canonical_root_from(
            Some(Path::new("canonical")),
            Some(OsString::from("/ignored")),
            cwd,
        );
        assert_eq!(root, PathBuf::from("/work/canonical"));
    }

    #[test]
    fn destination_stays_under_root() {
        let key = LogicalKey::parse("figures/plot.html").unwrap();
        let dest = destination_for(Path::new("/out"), &key);
        assert_eq!(dest, PathBuf::from("/out/figures/plot.html"));
        assert!(dest.starts_with("/out"));
    }

    #[test]
    fn reserved_names_detected() {
        assert!(is_reserved(&LogicalKey::parse(INDEX_FILE).unwrap()));
        assert!(is_reserved(&LogicalKey::parse(MANIFEST_FILE).unwrap()));
        assert!(!is_reserved(
            &LogicalKey::parse("nested/ARTIFACT_INDEX.md").unwrap()
        ));
    }

    #[test]
    fn reserved_name_as_directory_is_reserved() {
        assert!(is_reserved(
            &LogicalKey::parse("ARTIFACT_INDEX.json/data.csv").unwrap()
        ));
        assert!(is_reserved(
            &LogicalKey::parse(".artifact-canon.lock/x").unwrap()
        ));
    }

    #[test]
    fn temp_suffix_segments_are_reserved() {
        assert!(is_reserved(
            &LogicalKey::parse("report.md.canon.tmp").unwrap()
        ));
        assert!(is_reserved(
            &LogicalKey::parse("figs.canon.tmp/plot.png").unwrap()
        ));
        assert!(!is_reserved(&LogicalKey::parse("figs/plot.png").unwrap()));
    }

    #[test]
    fn tmp_path_is_sibling() {
        let tmp = tmp_path_for(Path::new("/out/report.md"));
        assert_eq!(tmp, PathBuf::from("/out/report.md.canon.tmp"));
    }
}
