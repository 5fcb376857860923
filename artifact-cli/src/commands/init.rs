//! `artifact-canon init [--force]`

use anyhow::{Context, Result};
use clap::Args;

use artifact_core::config;

use super::Outcome;

/// Write a commented default `artifact-canon.yaml` into the current directory.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Replace an existing config file.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<Outcome> {
        let cwd = super::current_dir()?;
        let path = config::write_default_at(&cwd, self.force)
            .with_context(|| format!("failed to write config in '{}'", cwd.display()))?;

        println!("✓ Wrote {}", path.display());
        println!("  Edit `search_roots`, then run `artifact-canon run --dry-run`.");
        Ok(Outcome::Clean)
    }
}
