//! Subcommand implementations and the helpers they share.

pub mod diff;
pub mod init;
pub mod run;
pub mod status;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};

use artifact_core::{config, paths, CanonConfig};

/// How a successful command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Clean,
    /// At least one key needs an operator.
    Attention,
}

impl Outcome {
    pub fn attention_if(flag: bool) -> Self {
        if flag {
            Outcome::Attention
        } else {
            Outcome::Clean
        }
    }
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Clean => ExitCode::SUCCESS,
            Outcome::Attention => ExitCode::from(1),
        }
    }
}

pub fn current_dir() -> Result<PathBuf> {
    std::env::current_dir().context("could not determine current directory")
}

/// `--config FILE` if given, else `./artifact-canon.yaml` when present, else defaults.
pub fn load_config(explicit: Option<&Path>, cwd: &Path) -> Result<CanonConfig> {
    match explicit {
        Some(path) => {
            let path = paths::absolutize(path, cwd);
            config::load_at(&path)
                .with_context(|| format!("failed to load config '{}'", path.display()))
        }
        None => config::load_or_default_at(cwd).with_context(|| {
            format!(
                "failed to load {}",
                cwd.join(config::CONFIG_FILE).display()
            )
        }),
    }
}

/// Flag, else config value, else `$OUTPUT_DIR`, else `./outputs`.
pub fn canonical_root(flag: Option<&Path>, config: &CanonConfig, cwd: &Path) -> PathBuf {
    paths::resolve_canonical_root_from(
        flag.or(config.canonical_root.as_deref()),
        std::env::var_os(paths::OUTPUT_DIR_ENV),
        cwd,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_beats_config_root() {
        let cwd = Path::new("/work");
        let config = CanonConfig {
            canonical_root: Some(PathBuf::from("/from/config")),
            ..CanonConfig::default()
        };
        assert_eq!(
            canonical_root(Some(Path::new("out")), &config, cwd),
            PathBuf::from("/work/out")
        );
        assert_eq!(
            canonical_root(None, &config, cwd),
            PathBuf::from("/from/config")
        );
    }

    #[test]
    fn outcome_maps_to_exit_code() {
        assert_eq!(Outcome::attention_if(false), Outcome::Clean);
        assert_eq!(Outcome::attention_if(true), Outcome::Attention);
    }
}
