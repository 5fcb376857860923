//! Run pipeline: discover → select → migrate → persist.
//!
//! This is the single entrypoint used by `artifact-canon run`.

use std::path::{Path, PathBuf};

use artifact_core::{
    paths, CanonConfig, CanonicalIndex, Discover, Migrate, MigrationReport, RootIssue, Select,
    SelectionResult,
};
use artifact_discovery::Discovery;
use artifact_manifest::ManifestRenderer;
use artifact_select::Selector;

use crate::error::MigrateError;
use crate::index_store::{self, Persisted};
use crate::lock::RunLock;
use crate::writer::Migrator;

/// Everything a run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub canonical_root: PathBuf,
    pub report: MigrationReport,
    pub root_issues: Vec<RootIssue>,
    pub selections: Vec<SelectionResult>,
    /// `None` on dry runs.
    pub index_written: Option<Persisted>,
    pub manifest_written: Option<Persisted>,
}

impl RunOutcome {
    /// `1` when any key needs an operator, else `0`.
    pub fn exit_code(&self) -> i32 {
        if self.report.needs_attention() {
            1
        } else {
            0
        }
    }
}

/// Build the stages from `config` and run them against `canonical_root`.
pub fn run(
    config: &CanonConfig,
    canonical_root: &Path,
    dry_run: bool,
) -> Result<RunOutcome, MigrateError> {
    config.validate()?;
    let discovery = Discovery::from_config(config)?.exclude(canonical_root);
    let selector = Selector::from_config(config);
    let renderer = ManifestRenderer::new(config.manifest_template_dir.as_deref())?;
    run_stages(
        &discovery,
        &selector,
        |previous| Migrator::new(canonical_root, previous, dry_run),
        &renderer,
        canonical_root,
        dry_run,
    )
}

/// Run arbitrary stage implementations. A real run holds the canonical-root
/// lock from before discovery until both index files are written.
///
/// `migrator_for` receives the index left by the previous run, loaded under
/// the lock.
pub fn run_stages<D, S, M, F>(
    discover: &D,
    select: &S,
    migrator_for: F,
    renderer: &ManifestRenderer,
    canonical_root: &Path,
    dry_run: bool,
) -> Result<RunOutcome, MigrateError>
where
    D: Discover,
    S: Select,
    M: Migrate,
    F: FnOnce(CanonicalIndex) -> M,
    MigrateError: From<D::Error> + From<M::Error>,
{
    let _lock = if dry_run {
        None
    } else {
        paths::ensure_dir(canonical_root)?;
        Some(RunLock::acquire(canonical_root)?)
    };

    let previous = index_store::load_at(canonical_root)?;

    let discovered = discover.discover()?;
    let root_issues = discovered.root_issues;
    let selections = select.select(discovered.candidates)?;

    let mut migrator = migrator_for(previous);
    let report = migrator.migrate(&selections)?;

    let (index_written, manifest_written) = if dry_run {
        (None, None)
    } else {
        let index = migrator.into_index();
        let index_written = index_store::save_at(canonical_root, &index)?;
        let manifest = renderer.render(&index, canonical_root)?;
        let manifest_written =
            index_store::write_if_changed(&paths::manifest_path(canonical_root), &manifest)?;
        (Some(index_written), Some(manifest_written))
    };

    let counts = report.counts();
    tracing::info!(
        "{}{} copied, {} unchanged, {} conflict(s), {} error(s)",
        if dry_run { "[dry-run] " } else { "" },
        counts.copied + counts.would_copy,
        counts.skipped_unchanged,
        counts.conflict,
        counts.error
    );

    Ok(RunOutcome {
        canonical_root: canonical_root.to_path_buf(),
        report,
        root_issues,
        selections,
        index_written,
        manifest_written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use artifact_core::{
        Candidate, DiscoveryReport, LogicalKey, MigrationRecord, MigrationStatus, SourceTag,
    };
    use artifact_discovery::DiscoveryError;
    use chrono::Utc;
    use tempfile::TempDir;

    /// Fixed candidate set, no filesystem walk.
    struct Fixed(Vec<Candidate>);

    impl Discover for Fixed {
        type Error = DiscoveryError;

        fn discover(&self) -> Result<DiscoveryReport, Self::Error> {
            Ok(DiscoveryReport {
                candidates: self.0.clone(),
                root_issues: vec![],
            })
        }
    }

    fn candidate(path: &Path, key: &str) -> Candidate {
        let meta = std::fs::metadata(path).unwrap();
        Candidate {
            logical_key: LogicalKey::parse(key).unwrap(),
            absolute_path: path.to_path_buf(),
            size_bytes: meta.len(),
            modified_time: Utc::now(),
            content_hash: None,
            source_tag: SourceTag::from("fixed"),
        }
    }

    fn run_default(candidates: Vec<Candidate>, root: &Path) -> Result<RunOutcome, MigrateError> {
        let renderer = ManifestRenderer::new(None).unwrap();
        run_stages(
            &Fixed(candidates),
            &Selector::default(),
            |previous| Migrator::new(root, previous, false),
            &renderer,
            root,
            false,
        )
    }

    #[test]
    fn synthetic_stages_run_end_to_end() {
        let src = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let file = src.path().join("a.md");
        std::fs::write(&file, "a").unwrap();

        let outcome = run_default(vec![candidate(&file, "a.md")], root.path()).unwrap();

        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(outcome.report.records[0].status, MigrationStatus::Copied);
        assert_eq!(outcome.index_written, Some(Persisted::Written));
        assert!(paths::manifest_path(root.path()).exists());
    }

    #[test]
    fn empty_candidate_set_still_writes_index() {
        let root = TempDir::new().unwrap();
        let outcome = run_default(vec![], root.path()).unwrap();
        assert!(outcome.report.records.is_empty());
        assert!(paths::index_path(root.path()).exists());
    }

    #[test]
    fn key_nested_under_index_name_fails_alone() {
        let src = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let nested = src.path().join("data.csv");
        let report = src.path().join("report.md");
        std::fs::write(&nested, "x,y\n").unwrap();
        std::fs::write(&report, "# report\n").unwrap();
        let candidates = vec![
            candidate(&nested, "ARTIFACT_INDEX.json/data.csv"),
            candidate(&report, "report.md"),
        ];

        for _ in 0..2 {
            let outcome = run_default(candidates.clone(), root.path()).unwrap();
            let status = |key: &str| {
                outcome
                    .report
                    .records
                    .iter()
                    .find(|r| r.logical_key.as_str() == key)
                    .map(|r| r.status)
            };
            assert_eq!(
                status("ARTIFACT_INDEX.json/data.csv"),
                Some(MigrationStatus::Error)
            );
            assert!(matches!(
                status("report.md"),
                Some(MigrationStatus::Copied | MigrationStatus::SkippedUnchanged)
            ));
            assert_eq!(outcome.exit_code(), 1);
        }
        assert!(paths::index_path(root.path()).is_file());
        assert!(index_store::load_at(root.path()).is_ok());
    }

    /// Records every selection as unchanged, touching nothing.
    struct Recording {
        index: CanonicalIndex,
    }

    impl Migrate for Recording {
        type Error = MigrateError;

        fn migrate(
            &mut self,
            selections: &[SelectionResult],
        ) -> Result<MigrationReport, Self::Error> {
            let records: Vec<MigrationRecord> = selections
                .iter()
                .map(|s| MigrationRecord {
                    logical_key: s.logical_key.clone(),
                    canonical_path: PathBuf::from(s.logical_key.as_str()),
                    source_path: s.winner.absolute_path.clone(),
                    source_tag: s.winner.source_tag.clone(),
                    migrated_at: Utc::now(),
                    content_hash: None,
                    status: MigrationStatus::SkippedUnchanged,
                    reason: s.reason,
                    candidate_count: s.candidate_count(),
                    destination_hash: None,
                    detail: None,
                })
                .collect();
            for record in &records {
                self.index.upsert(record.clone());
            }
            Ok(MigrationReport {
                records,
                dry_run: false,
            })
        }

        fn into_index(self) -> CanonicalIndex {
            self.index
        }
    }

    #[test]
    fn synthetic_migrator_receives_previous_index() {
        let src = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let file = src.path().join("a.md");
        std::fs::write(&file, "a").unwrap();
        run_default(vec![candidate(&file, "a.md")], root.path()).unwrap();

        let renderer = ManifestRenderer::new(None).unwrap();
        let mut previous_len = None;
        let outcome = run_stages(
            &Fixed(vec![candidate(&file, "b.md")]),
            &Selector::default(),
            |previous| {
                previous_len = Some(previous.len());
                Recording { index: previous }
            },
            &renderer,
            root.path(),
            false,
        )
        .unwrap();

        assert_eq!(previous_len, Some(1));
        assert_eq!(
            outcome.report.records[0].status,
            MigrationStatus::SkippedUnchanged
        );
        assert!(!root.path().join("b.md").exists());
        let saved = index_store::load_at(root.path()).unwrap();
        assert_eq!(saved.len(), 2);
    }
}
