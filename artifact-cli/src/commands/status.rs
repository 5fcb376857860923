//! `artifact-canon status` — verify the canonical tree against its index.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use artifact_migrate::verify::{self, IndexSignal, RecordCheck, RecordState};

use super::Outcome;

/// Arguments for `artifact-canon status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Canonical output directory (default: config, then $OUTPUT_DIR, then ./outputs).
    #[arg(long, value_name = "DIR")]
    pub canonical_root: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<Outcome> {
        let cwd = super::current_dir()?;
        let config = super::load_config(None, &cwd)?;
        let canonical_root = super::canonical_root(self.canonical_root.as_deref(), &config, &cwd);

        let signal = verify::check(&canonical_root).with_context(|| {
            format!("status check failed for '{}'", canonical_root.display())
        })?;

        if self.json {
            print_json(&canonical_root, &signal)?;
        } else {
            print_table(&canonical_root, &signal);
        }
        Ok(Outcome::attention_if(!signal.is_current()))
    }
}

#[derive(Serialize)]
struct StatusJson<'a> {
    canonical_root: &'a Path,
    current: bool,
    index: &'a IndexSignal,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "key")]
    key: String,
    #[tabled(rename = "state")]
    state: String,
    #[tabled(rename = "detail")]
    detail: String,
}

fn print_json(canonical_root: &Path, signal: &IndexSignal) -> Result<()> {
    let payload = StatusJson {
        canonical_root,
        current: signal.is_current(),
        index: signal,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(canonical_root: &Path, signal: &IndexSignal) {
    let checks = match signal {
        IndexSignal::NeverRun => {
            println!(
                "{} no index under {}. Run 'artifact-canon run' first.",
                indicator(None),
                canonical_root.display()
            );
            return;
        }
        IndexSignal::Checked(checks) => checks,
    };

    let drifted = checks
        .iter()
        .filter(|c| c.state != RecordState::Current)
        .count();
    println!(
        "artifact-canon v{} | {} | {} artifact(s) | {} need attention",
        env!("CARGO_PKG_VERSION"),
        canonical_root.display(),
        checks.len(),
        drifted
    );
    if checks.is_empty() {
        return;
    }

    let rows: Vec<StatusTableRow> = checks
        .iter()
        .map(|check| StatusTableRow {
            key: check.logical_key.to_string(),
            state: format!("{} {}", indicator(Some(&check.state)), state_label(&check.state)),
            detail: state_detail(check),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if drifted > 0 {
        println!("Run 'artifact-canon run' to refresh, or 'artifact-canon diff <KEY>' to inspect.");
    }
}

fn state_label(state: &RecordState) -> &'static str {
    match state {
        RecordState::Current => "CURRENT",
        RecordState::Missing => "MISSING",
        RecordState::Modified { .. } => "MODIFIED",
        RecordState::Unresolved { .. } => "UNRESOLVED",
    }
}

fn indicator(state: Option<&RecordState>) -> String {
    match state {
        None => "■".bright_black().bold().to_string(),
        Some(RecordState::Current) => "■".green().bold().to_string(),
        Some(RecordState::Missing) => "■".magenta().bold().to_string(),
        Some(RecordState::Modified { .. }) => "■".red().bold().to_string(),
        Some(RecordState::Unresolved { .. }) => "■".yellow().bold().to_string(),
    }
}

fn state_detail(check: &RecordCheck) -> String {
    match &check.state {
        RecordState::Current => "up to date".to_string(),
        RecordState::Missing => format!("{} not found", check.canonical_path.display()),
        RecordState::Modified { expected, actual } => match expected {
            Some(expected) => format!("hash {} (indexed {})", actual.short(), expected.short()),
            None => format!("hash {} (nothing indexed)", actual.short()),
        },
        RecordState::Unresolved { status, detail } => match detail {
            Some(detail) => format!("{status}: {detail}"),
            None => status.to_string(),
        },
    }
}
