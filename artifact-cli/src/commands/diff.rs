//! `artifact-canon diff <KEY>` — canonical file vs. its recorded source.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use artifact_migrate::diff::{diff_conflict, DiffBody};

use super::Outcome;

/// Arguments for `artifact-canon diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Logical key to diff, e.g. `reports/summary.md`.
    pub key: String,

    /// Canonical output directory (default: config, then $OUTPUT_DIR, then ./outputs).
    #[arg(long, value_name = "DIR")]
    pub canonical_root: Option<PathBuf>,
}

impl DiffArgs {
    pub fn run(self) -> Result<Outcome> {
        let cwd = super::current_dir()?;
        let config = super::load_config(None, &cwd)?;
        let canonical_root = super::canonical_root(self.canonical_root.as_deref(), &config, &cwd);

        let diff = diff_conflict(&canonical_root, &self.key)
            .with_context(|| format!("diff failed for '{}'", self.key))?;

        match diff.body {
            DiffBody::Identical => println!("No differences for '{}'.", diff.logical_key),
            DiffBody::Text(text) => {
                print!("{text}");
                if !text.ends_with('\n') {
                    println!();
                }
            }
            DiffBody::Binary => println!(
                "Binary files {} and {} differ.",
                diff.canonical_path.display(),
                diff.source_path.display()
            ),
            DiffBody::CanonicalMissing => println!(
                "'{}' has no canonical file at {}.",
                diff.logical_key,
                diff.canonical_path.display()
            ),
            DiffBody::SourceMissing => println!(
                "Recorded source {} for '{}' no longer exists.",
                diff.source_path.display(),
                diff.logical_key
            ),
        }

        Ok(Outcome::Clean)
    }
}
