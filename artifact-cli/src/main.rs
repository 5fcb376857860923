//! artifact-canon: collapse duplicated run outputs into one canonical tree.
//!
//! # Usage
//!
//! ```text
//! artifact-canon run [ROOTS...] [--canonical-root DIR] [--trusted-tag TAG]...
//!                    [--key-pattern REGEX] [--include GLOB]... [--config FILE]
//!                    [--dry-run] [--json] [--explain]
//! artifact-canon status [--canonical-root DIR] [--json]
//! artifact-canon diff <KEY> [--canonical-root DIR]
//! artifact-canon init [--force]
//! ```
//!
//! Exit codes: `0` clean, `1` something needs an operator, `2` fatal.

mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use commands::{diff::DiffArgs, init::InitArgs, run::RunArgs, status::StatusArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "artifact-canon",
    version,
    about = "Pick one authoritative copy of every run artifact and keep a canonical index",
    long_about = None,
)]
struct Cli {
    /// Log per-file decisions (sets the default filter to `debug`).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Discover candidates, select winners, and migrate them into the canonical root.
    Run(RunArgs),

    /// Verify the canonical tree against its index.
    Status(StatusArgs),

    /// Show how the canonical file for a key differs from its recorded source.
    Diff(DiffArgs),

    /// Write a commented `artifact-canon.yaml` into the current directory.
    Init(InitArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Diff(args) => args.run(),
        Commands::Init(args) => args.run(),
    };

    match result {
        Ok(outcome) => outcome.into(),
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::from(2)
        }
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
/// `-v` wins over `RUST_LOG`.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
