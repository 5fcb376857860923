//! Per-run discovery state.

use std::collections::HashSet;
use std::path::PathBuf;

use artifact_core::{Candidate, DiscoveryReport, RootIssue};

/// State scoped to one discovery run: paths already admitted and issues seen.
///
/// Created fresh for every run and passed explicitly; nothing is cached
/// between runs.
#[derive(Debug, Default)]
pub struct DiscoveryContext {
    seen: HashSet<PathBuf>,
    candidates: Vec<Candidate>,
    issues: Vec<RootIssue>,
    duplicates: usize,
}

impl DiscoveryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a candidate unless its path was already seen through an
    /// overlapping root. Returns whether it was admitted.
    pub fn admit(&mut self, candidate: Candidate) -> bool {
        if !self.seen.insert(candidate.absolute_path.clone()) {
            self.duplicates += 1;
            return false;
        }
        self.candidates.push(candidate);
        true
    }

    pub fn report_issue(&mut self, issue: RootIssue) {
        tracing::warn!("{}: {}", issue.root.display(), issue.message);
        self.issues.push(issue);
    }

    /// Number of candidates dropped because another root already yielded them.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Finish the run: candidates sorted by path.
    pub fn into_report(mut self) -> DiscoveryReport {
        self.candidates
            .sort_by(|a, b| a.absolute_path.cmp(&b.absolute_path));
        DiscoveryReport {
            candidates: self.candidates,
            root_issues: self.issues,
        }
    }
}
