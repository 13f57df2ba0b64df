// src/lib.rs

pub mod batch;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod notify;
pub mod types;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::batch::{collect_status, discover_subjects, BatchDriver, PlannedAction, PlannedJob};
use crate::cli::{CliArgs, Command, OverrideArgs, RunArgs, StatusArgs};
use crate::config::{load_from_path, ConfigFile, DriverConfig, RawConfigFile};
use crate::exec::ProcessRunner;
use crate::fs::{FileSystem, RealFileSystem};
use crate::notify::notifier_from_config;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading + CLI overrides
/// - subject discovery
/// - the batch driver with the real process runner
/// - (optional) completion notifications
pub async fn run(args: CliArgs) -> Result<()> {
    let mut raw = load_from_path(&args.config)?;

    match args.command {
        Command::Run(run_args) => {
            apply_run_overrides(&mut raw, &run_args);
            let cfg = ConfigFile::try_from(raw)?;
            run_batch(cfg, run_args).await
        }
        Command::Status(status_args) => {
            apply_overrides(&mut raw, &status_args.overrides);
            let cfg = ConfigFile::try_from(raw)?;
            print_status(&cfg.driver, &status_args)
        }
    }
}

async fn run_batch(cfg: ConfigFile, args: RunArgs) -> Result<()> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let runner = ProcessRunner::new(cfg.driver.invocation_timeout);
    let driver = BatchDriver::new(cfg.driver.clone(), Arc::clone(&fs), runner)?;

    let subjects = if args.subjects.is_empty() {
        let found = discover_subjects(
            fs.as_ref(),
            &cfg.driver.subjects_dir,
            &cfg.driver.subject_prefix,
        )?;
        info!(count = found.len(), dir = ?cfg.driver.subjects_dir, "discovered subjects");
        found
    } else {
        args.subjects.clone()
    };

    if args.dry_run {
        print_dry_run(&cfg.driver, &driver.plan(&subjects));
        return Ok(());
    }

    let mut driver = driver.with_notifier(notifier_from_config(&cfg.notify));
    let summary = driver.run(&subjects).await?;
    info!(?summary, state = ?driver.state(), "batch done");
    Ok(())
}

fn apply_run_overrides(raw: &mut RawConfigFile, args: &RunArgs) {
    apply_overrides(raw, &args.overrides);
    if let Some(threads) = args.threads {
        raw.config.threads = threads;
    }
    if args.no_skip_existing {
        raw.config.skip_existing = false;
    }
    if args.notify {
        raw.notify.enabled = true;
    }
}

fn apply_overrides(raw: &mut RawConfigFile, overrides: &OverrideArgs) {
    if let Some(ref id) = overrides.analysis_id {
        raw.config.analysis_id = id.clone();
    }
    if !overrides.kinds.is_empty() {
        raw.config.kinds = overrides.kinds.clone();
    }
}

fn print_status(cfg: &DriverConfig, args: &StatusArgs) -> Result<()> {
    let report = collect_status(&RealFileSystem, cfg)?;
    print!("{}", report.render(args.list));
    Ok(())
}

/// Simple dry-run output: print the resolved config and each planned job.
fn print_dry_run(cfg: &DriverConfig, jobs: &[PlannedJob]) {
    println!("fsseg dry-run");
    println!("  analysis_id = {}", cfg.analysis_id);
    println!("  subjects_dir = {}", cfg.subjects_dir.display());
    println!("  pd_images_dir = {}", cfg.pd_images_dir.display());
    println!("  threads = {}", cfg.threads);
    println!("  skip_existing = {}", cfg.skip_existing);
    println!(
        "  kinds = {:?}",
        cfg.kinds.iter().map(|k| k.tag()).collect::<Vec<_>>()
    );
    if let Some(timeout) = cfg.invocation_timeout {
        println!("  invocation_timeout = {:?}", timeout);
    }
    println!();

    println!("jobs ({}):", jobs.len());
    for job in jobs {
        match &job.action {
            PlannedAction::Run(spec) => println!("  - {} {}: {}", job.subject, job.kind, spec),
            PlannedAction::Skip(status) => {
                println!("  - {} {}: skip ({:?})", job.subject, job.kind, status)
            }
            PlannedAction::Blocked(reason) => {
                println!("  - {} {}: blocked ({})", job.subject, job.kind, reason)
            }
            PlannedAction::Unavailable => {
                println!("  - {} {}: not available", job.subject, job.kind)
            }
        }
    }

    debug!("dry-run complete (no execution)");
}
