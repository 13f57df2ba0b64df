// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::default_config_path;
use crate::types::SegmentationKind;

/// Command-line arguments for `fsseg`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "fsseg",
    version,
    about = "Run FreeSurfer subfield segmentations over a directory of subjects.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Fsseg.toml` in the current working directory.
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        default_value_os_t = default_config_path()
    )]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FSSEG_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the segmentation batch.
    Run(RunArgs),
    /// Show what has and has not been processed.
    Status(StatusArgs),
}

/// Overrides shared by every subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct OverrideArgs {
    /// Override `[config].analysis_id`.
    #[arg(long, value_name = "ID")]
    pub analysis_id: Option<String>,

    /// Override `[config].kinds` (repeatable: hpc, thn, bs, hth, scl).
    #[arg(long = "kind", value_name = "KIND", value_parser = parse_kind)]
    pub kinds: Vec<SegmentationKind>,
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Subject IDs to process; the `sub-` prefix may be left out.
    ///
    /// When empty, every subject in the subjects directory is processed.
    #[arg(value_name = "SUBJECT")]
    pub subjects: Vec<String>,

    #[command(flatten)]
    pub overrides: OverrideArgs,

    /// Override `[config].threads`.
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// Re-run subjects even if they were processed or failed before.
    #[arg(long)]
    pub no_skip_existing: bool,

    /// Send a completion notification (requires telegram credentials).
    #[arg(long)]
    pub notify: bool,

    /// Resolve and print the planned commands without running anything.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Args)]
pub struct StatusArgs {
    #[command(flatten)]
    pub overrides: OverrideArgs,

    /// Also list the subject IDs in each bucket.
    #[arg(long)]
    pub list: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn parse_kind(s: &str) -> Result<SegmentationKind, String> {
    s.parse()
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
