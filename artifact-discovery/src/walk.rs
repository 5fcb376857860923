//! Lazy per-root walk producing [`Candidate`]s.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use walkdir::{DirEntry, WalkDir};

use artifact_core::{Candidate, LogicalKey, RootIssue, SourceTag};

use crate::rules::MatchRules;

/// Iterator over one search root. Finite and not restartable: each call to
/// [`crate::Discovery::walk_root`] re-walks the filesystem.
///
/// Symlinks are never followed and never yield candidates.
pub struct RootWalk<'a> {
    root: PathBuf,
    root_tag: String,
    rules: &'a MatchRules,
    entries: Box<dyn Iterator<Item = walkdir::Result<DirEntry>> + 'a>,
}

impl<'a> RootWalk<'a> {
    /// `root` must already be absolute; `excluded` subtrees are pruned.
    pub(crate) fn new(
        root: PathBuf,
        root_tag: String,
        rules: &'a MatchRules,
        excluded: &'a [PathBuf],
    ) -> Self {
        let mut walker = WalkDir::new(&root)
            .follow_links(false)
            .sort_by_file_name();
        if let Some(depth) = rules.max_depth {
            walker = walker.max_depth(depth);
        }
        let entries = walker
            .into_iter()
            .filter_entry(move |entry| keep_entry(entry, rules, excluded));

        Self {
            root,
            root_tag,
            rules,
            entries: Box::new(entries),
        }
    }

    fn issue(&self, message: String) -> RootIssue {
        RootIssue {
            root: self.root.clone(),
            message,
        }
    }

    fn candidate_for(&self, entry: &DirEntry) -> Option<Result<Candidate, RootIssue>> {
        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy();
        if self.rules.ignores_file(&file_name) {
            return None;
        }

        let relative = relative_slash_path(&self.root, path)?;
        if !self.rules.includes(&relative) {
            return None;
        }

        let Some(extracted) = self.rules.key_rule.extract(&relative) else {
            tracing::debug!("no key for {relative}");
            return None;
        };
        let logical_key = match LogicalKey::parse(&extracted.key) {
            Ok(key) => key,
            Err(err) => {
                tracing::warn!("skipping {}: {err}", path.display());
                return None;
            }
        };

        let meta = match entry.metadata() {
            Ok(meta) => meta,
            Err(err) => {
                return Some(Err(
                    self.issue(format!("cannot stat {}: {err}", path.display()))
                ))
            }
        };
        let modified_time = match meta.modified() {
            Ok(t) => DateTime::<Utc>::from(t),
            Err(err) => {
                return Some(Err(self.issue(format!(
                    "no modification time for {}: {err}",
                    path.display()
                ))))
            }
        };

        let source_tag = SourceTag(extracted.tag.unwrap_or_else(|| self.root_tag.clone()));
        Some(Ok(Candidate {
            logical_key,
            absolute_path: path.to_path_buf(),
            size_bytes: meta.len(),
            modified_time,
            content_hash: None,
            source_tag,
        }))
    }
}

impl Iterator for RootWalk<'_> {
    type Item = Result<Candidate, RootIssue>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let at = err
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| self.root.display().to_string());
                    return Some(Err(self.issue(format!("cannot read {at}: {err}"))));
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(item) = self.candidate_for(&entry) {
                return Some(item);
            }
        }
    }
}

fn keep_entry(entry: &DirEntry, rules: &MatchRules, excluded: &[PathBuf]) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return true;
    }
    if excluded.iter().any(|e| e == entry.path()) {
        tracing::debug!("not descending into {}", entry.path().display());
        return false;
    }
    !rules.ignores_dir(&entry.file_name().to_string_lossy())
}

/// `path` relative to `root`, joined with `/`. `None` if not under `root`.
fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}
