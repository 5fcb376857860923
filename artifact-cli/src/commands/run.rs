//! `artifact-canon run` — discover, select, and migrate.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use artifact_core::{
    paths, CandidateGroup, CanonConfig, MigrationRecord, MigrationStatus, RootIssue, SearchRoot,
    SelectionResult, StatusCounts,
};
use artifact_migrate::{pipeline, Persisted, RunOutcome};
use artifact_select::Selector;

use super::Outcome;

/// Arguments for `artifact-canon run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Directories to search. Replaces `search_roots` from the config file.
    pub roots: Vec<PathBuf>,

    /// Canonical output directory (default: config, then $OUTPUT_DIR, then ./outputs).
    #[arg(long, value_name = "DIR")]
    pub canonical_root: Option<PathBuf>,

    /// Source tag that outranks recency. Repeatable; adds to the config list.
    #[arg(long = "trusted-tag", value_name = "TAG")]
    pub trusted_tags: Vec<String>,

    /// Regex with a `key` (and optional `tag`) capture group.
    #[arg(long, value_name = "REGEX")]
    pub key_pattern: Option<String>,

    /// Glob selecting candidate files. Repeatable; replaces the config list.
    #[arg(long = "include", value_name = "GLOB")]
    pub include: Vec<String>,

    /// Config file (default: ./artifact-canon.yaml when present).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Report what would happen without writing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit machine-readable JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// Print the full ranking of every contested key.
    #[arg(long)]
    pub explain: bool,
}

impl RunArgs {
    pub fn run(self) -> Result<Outcome> {
        let cwd = super::current_dir()?;
        let config = self.apply_overrides(super::load_config(self.config.as_deref(), &cwd)?, &cwd);
        let canonical_root = super::canonical_root(self.canonical_root.as_deref(), &config, &cwd);

        let outcome = pipeline::run(&config, &canonical_root, self.dry_run).with_context(|| {
            format!("run failed for canonical root '{}'", canonical_root.display())
        })?;

        if self.json {
            print_json(&outcome)?;
        } else {
            if self.explain {
                print_explain(&Selector::from_config(&config), &outcome.selections)?;
            }
            print_summary(&outcome);
        }

        Ok(Outcome::attention_if(outcome.report.needs_attention()))
    }

    /// Flags override file values; list flags replace, trusted tags extend.
    fn apply_overrides(&self, mut config: CanonConfig, cwd: &Path) -> CanonConfig {
        if !self.roots.is_empty() {
            config.search_roots = self
                .roots
                .iter()
                .map(|root| SearchRoot::new(paths::absolutize(root, cwd)))
                .collect();
        }
        config
            .trusted_source_tags
            .extend(self.trusted_tags.iter().cloned());
        if let Some(pattern) = &self.key_pattern {
            config.key_extraction_pattern = pattern.clone();
        }
        if !self.include.is_empty() {
            config.include = self.include.clone();
        }
        config
    }
}

// ---------------------------------------------------------------------------
// Human output
// ---------------------------------------------------------------------------

fn print_summary(outcome: &RunOutcome) {
    let dry_run = outcome.report.dry_run;
    let prefix = if dry_run { "[dry-run] " } else { "" };
    let counts = outcome.report.counts();

    for issue in &outcome.root_issues {
        println!(
            "{prefix}{} skipped root {}: {}",
            "!".yellow().bold(),
            issue.root.display(),
            issue.message
        );
    }

    if outcome.report.records.is_empty() {
        println!(
            "{prefix}✓ nothing to migrate into {}",
            outcome.canonical_root.display()
        );
        return;
    }

    let marker = if outcome.report.needs_attention() {
        "✗".red().bold()
    } else {
        "✓".green().bold()
    };
    println!(
        "{prefix}{marker} {} ({})",
        outcome.canonical_root.display(),
        count_line(&counts, dry_run)
    );

    for record in &outcome.report.records {
        println!(
            "  {}  {}  {}",
            status_glyph(record.status),
            record.logical_key,
            record_note(record).bright_black()
        );
    }

    if outcome.report.needs_attention() {
        println!("{prefix}{}", "Attention required:".bold());
        for record in outcome.report.attention() {
            println!(
                "  {} {}: {}",
                status_label(record.status),
                record.logical_key,
                record.detail.as_deref().unwrap_or("no detail recorded")
            );
        }
        println!("Run 'artifact-canon diff <KEY>' to inspect a conflict.");
    }

    if let (Some(index), Some(manifest)) = (outcome.index_written, outcome.manifest_written) {
        println!(
            "  index {}, manifest {}",
            persisted_label(index),
            persisted_label(manifest)
        );
    }
}

fn count_line(counts: &StatusCounts, dry_run: bool) -> String {
    let mut parts = Vec::new();
    if dry_run {
        parts.push(format!("{} would copy", counts.would_copy));
    } else {
        parts.push(format!("{} copied", counts.copied));
    }
    parts.push(format!("{} unchanged", counts.skipped_unchanged));
    parts.push(format!("{} conflict", counts.conflict));
    parts.push(format!("{} error", counts.error));
    parts.join(", ")
}

fn record_note(record: &MigrationRecord) -> String {
    format!(
        "{} of {} from {}",
        record.reason, record.candidate_count, record.source_tag
    )
}

fn status_glyph(status: MigrationStatus) -> String {
    match status {
        MigrationStatus::Copied => "✎".green().to_string(),
        MigrationStatus::WouldCopy => "~".cyan().to_string(),
        MigrationStatus::SkippedUnchanged => "·".bright_black().to_string(),
        MigrationStatus::Conflict => "!".yellow().bold().to_string(),
        MigrationStatus::Error => "✗".red().bold().to_string(),
    }
}

fn status_label(status: MigrationStatus) -> String {
    match status {
        MigrationStatus::Conflict => status.to_string().yellow().bold().to_string(),
        MigrationStatus::Error => status.to_string().red().bold().to_string(),
        other => other.to_string(),
    }
}

fn persisted_label(persisted: Persisted) -> &'static str {
    match persisted {
        Persisted::Written => "written",
        Persisted::Unchanged => "unchanged",
    }
}

fn print_explain(selector: &Selector, selections: &[SelectionResult]) -> Result<()> {
    for selection in selections.iter().filter(|s| !s.losers.is_empty()) {
        let mut members = selection.losers.clone();
        members.push(selection.winner.clone());
        let group = CandidateGroup::from_members(selection.logical_key.clone(), members)
            .with_context(|| format!("failed to regroup '{}'", selection.logical_key))?;

        println!("{} ({})", selection.logical_key.to_string().bold(), selection.reason);
        for (rank, entry) in selector.rank(&group).iter().enumerate() {
            let c = &entry.candidate;
            let verdict = match entry.lost_on {
                None => "winner".green().to_string(),
                Some(rule) => format!("lost on {rule}"),
            };
            println!(
                "  {}. {}  [{}{}]  {} bytes  {}  {}",
                rank + 1,
                c.absolute_path.display(),
                c.source_tag,
                if entry.trusted { ", trusted" } else { "" },
                c.size_bytes,
                c.modified_time.format("%Y-%m-%d %H:%M:%S"),
                verdict
            );
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON output
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RunJson<'a> {
    canonical_root: &'a Path,
    dry_run: bool,
    needs_attention: bool,
    counts: StatusCounts,
    records: &'a [MigrationRecord],
    root_issues: &'a [RootIssue],
    #[serde(skip_serializing_if = "Option::is_none")]
    index: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    manifest: Option<&'static str>,
}

fn print_json(outcome: &RunOutcome) -> Result<()> {
    let payload = RunJson {
        canonical_root: &outcome.canonical_root,
        dry_run: outcome.report.dry_run,
        needs_attention: outcome.report.needs_attention(),
        counts: outcome.report.counts(),
        records: &outcome.report.records,
        root_issues: &outcome.root_issues,
        index: outcome.index_written.map(persisted_label),
        manifest: outcome.manifest_written.map(persisted_label),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize run JSON")?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> RunArgs {
        RunArgs {
            roots: vec![],
            canonical_root: None,
            trusted_tags: vec![],
            key_pattern: None,
            include: vec![],
            config: None,
            dry_run: false,
            json: false,
            explain: false,
        }
    }

    #[test]
    fn roots_and_include_replace_config_lists() {
        let mut config = CanonConfig::default();
        config.search_roots = vec![SearchRoot::new("/from/file")];
        let run = RunArgs {
            roots: vec![PathBuf::from("runs")],
            include: vec!["**/*.md".to_string()],
            ..args()
        };

        let merged = run.apply_overrides(config, Path::new("/work"));
        assert_eq!(merged.search_roots, vec![SearchRoot::new("/work/runs")]);
        assert_eq!(merged.include, vec!["**/*.md".to_string()]);
    }

    #[test]
    fn trusted_tags_extend_config_set() {
        let mut config = CanonConfig::default();
        config.trusted_source_tags.insert("agent_1_a".to_string());
        let run = RunArgs {
            trusted_tags: vec!["agent_2_b".to_string()],
            ..args()
        };

        let merged = run.apply_overrides(config, Path::new("/work"));
        assert_eq!(merged.trusted_source_tags.len(), 2);
    }

    #[test]
    fn empty_flags_keep_config_values() {
        let config = CanonConfig {
            key_extraction_pattern: "(?P<key>.+)".to_string(),
            ..CanonConfig::default()
        };
        let merged = args().apply_overrides(config.clone(), Path::new("/work"));
        assert_eq!(merged, config);
    }

    #[test]
    fn dry_run_counts_say_would_copy() {
        let counts = StatusCounts {
            would_copy: 2,
            ..StatusCounts::default()
        };
        assert!(count_line(&counts, true).starts_with("2 would copy"));
        assert!(count_line(&counts, false).starts_with("0 copied"));
    }
}
