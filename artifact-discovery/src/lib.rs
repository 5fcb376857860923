//! # artifact-discovery
//!
//! Walks configured search roots and produces the candidate set: every file
//! matching the include rules, keyed by the configured [`KeyRule`].
//!
//! Missing or unreadable roots are reported, never fatal. Symlinks are not
//! followed. The canonical root is excluded so migrated copies are never
//! rediscovered as candidates.

pub mod context;
pub mod error;
pub mod rules;
pub mod walk;

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use artifact_core::{
    CanonConfig, Candidate, Discover, DiscoveryReport, RootIssue, SearchRoot,
};

pub use context::DiscoveryContext;
pub use error::DiscoveryError;
pub use rules::{ExtractedKey, KeyRule, MatchRules};
pub use walk::RootWalk;

/// Discovery over a fixed set of roots and rules.
#[derive(Debug, Clone)]
pub struct Discovery {
    roots: Vec<SearchRoot>,
    rules: MatchRules,
    excluded: Vec<PathBuf>,
    parallel: bool,
}

impl Discovery {
    pub fn new(roots: Vec<SearchRoot>, rules: MatchRules) -> Self {
        Self {
            roots,
            rules,
            excluded: vec![],
            parallel: false,
        }
    }

    /// Build roots and rules from config. Fails on invalid globs or patterns.
    pub fn from_config(config: &CanonConfig) -> Result<Self, DiscoveryError> {
        let rules = MatchRules::from_config(config)?;
        Ok(Self::new(config.search_roots.clone(), rules).parallel(config.parallel_roots))
    }

    /// Never descend into `dir` (typically the canonical root). `dir` need
    /// not exist yet.
    pub fn exclude(mut self, dir: impl Into<PathBuf>) -> Self {
        self.excluded.push(resolve_lenient(&dir.into()));
        self
    }

    /// Walk roots on the rayon pool instead of one after another.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn roots(&self) -> &[SearchRoot] {
        &self.roots
    }

    /// Lazily walk one root.
    ///
    /// Returns a [`RootIssue`] when the root does not exist, is not a
    /// directory, or lies inside an excluded directory; read errors inside
    /// the root surface as `Err` items.
    pub fn walk_root(&self, root: &SearchRoot) -> Result<RootWalk<'_>, RootIssue> {
        let resolved = std::fs::canonicalize(&root.path).map_err(|err| RootIssue {
            root: root.path.clone(),
            message: format!("search root unavailable: {err}"),
        })?;
        if !resolved.is_dir() {
            return Err(RootIssue {
                root: root.path.clone(),
                message: "search root is not a directory".to_string(),
            });
        }
        if let Some(excluded) = self.excluded.iter().find(|ex| resolved.starts_with(ex)) {
            tracing::warn!(
                "skipping search root {}: inside excluded {}",
                root.path.display(),
                excluded.display()
            );
            return Err(RootIssue {
                root: root.path.clone(),
                message: format!(
                    "search root lies inside the canonical root {}",
                    excluded.display()
                ),
            });
        }
        Ok(RootWalk::new(
            resolved,
            root.effective_tag(),
            &self.rules,
            &self.excluded,
        ))
    }

    /// Walk every root into `ctx`. Roots are merged in configured order after
    /// all walks complete, so the result does not depend on thread timing.
    pub fn discover_with(&self, ctx: &mut DiscoveryContext) {
        let per_root: Vec<Vec<Result<Candidate, RootIssue>>> = if self.parallel {
            self.roots.par_iter().map(|root| self.collect_root(root)).collect()
        } else {
            self.roots.iter().map(|root| self.collect_root(root)).collect()
        };

        for items in per_root {
            for item in items {
                match item {
                    Ok(candidate) => {
                        let path = candidate.absolute_path.clone();
                        if !ctx.admit(candidate) {
                            tracing::debug!("already discovered {}", path.display());
                        }
                    }
                    Err(issue) => ctx.report_issue(issue),
                }
            }
        }
    }

    fn collect_root(&self, root: &SearchRoot) -> Vec<Result<Candidate, RootIssue>> {
        match self.walk_root(root) {
            Ok(walk) => {
                let items: Vec<_> = walk.collect();
                tracing::debug!("{} entries from {}", items.len(), root.path.display());
                items
            }
            Err(issue) => vec![Err(issue)],
        }
    }
}

/// Canonicalize the longest existing ancestor of `path` and re-append the
/// rest, so walk paths and not-yet-created directories compare equal.
fn resolve_lenient(path: &Path) -> PathBuf {
    let mut missing = Vec::new();
    let mut cursor = path;
    loop {
        if let Ok(resolved) = std::fs::canonicalize(cursor) {
            return missing
                .iter()
                .rev()
                .fold(resolved, |acc: PathBuf, part| acc.join(part));
        }
        match (cursor.parent(), cursor.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                cursor = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}

impl Discover for Discovery {
    type Error = DiscoveryError;

    fn discover(&self) -> Result<DiscoveryReport, Self::Error> {
        let mut ctx = DiscoveryContext::new();
        self.discover_with(&mut ctx);
        let report = ctx.into_report();
        tracing::info!(
            "discovered {} candidate(s) across {} root(s)",
            report.candidates.len(),
            self.roots.len()
        );
        Ok(report)
    }
}
