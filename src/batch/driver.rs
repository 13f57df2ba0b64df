// src/batch/driver.rs

//! The sequential segmentation batch.
//!
//! Subjects are processed one at a time, and every enabled kind finishes
//! before the next subject starts. Per-subject problems (missing directory,
//! missing or ambiguous PD image, tool failure) are logged and the batch moves
//! on. Only construction-time checks and an empty subject list stop a batch
//! before it starts.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use tracing::{debug, info, warn};

use crate::batch::companion::{resolve_companion, CompanionError};
use crate::batch::discovery::normalize_subject_id;
use crate::batch::precheck::{self, PrecheckStatus};
use crate::batch::result_log::{self, FailureCategory};
use crate::batch::timing::TimingSamples;
use crate::config::DriverConfig;
use crate::errors::{FssegError, Result};
use crate::exec::{build_command, CommandSpec, SegmentationRunner};
use crate::fs::FileSystem;
use crate::notify::{NoopNotifier, Notifier};
use crate::types::{DriverState, SegmentationKind};

/// Counters for one `run`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub subjects: usize,
    /// Subjects where every enabled kind was already handled.
    pub subjects_skipped: usize,
    pub jobs_succeeded: usize,
    pub jobs_failed: usize,
    /// Jobs skipped because the precheck found them handled.
    pub jobs_skipped: usize,
    /// Jobs not attempted because the subject dir or PD image was unusable.
    pub jobs_blocked: usize,
    /// Jobs for kinds with no runnable tool.
    pub jobs_unavailable: usize,
}

/// What a dry run would do for one `(subject, kind)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAction {
    Run(CommandSpec),
    Skip(PrecheckStatus),
    Blocked(String),
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedJob {
    pub subject: String,
    pub kind: SegmentationKind,
    pub action: PlannedAction,
}

pub struct BatchDriver<R: SegmentationRunner> {
    cfg: DriverConfig,
    fs: Arc<dyn FileSystem>,
    runner: R,
    notifier: Box<dyn Notifier>,
    state: DriverState,
    timings: TimingSamples,
}

impl<R: SegmentationRunner> fmt::Debug for BatchDriver<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchDriver")
            .field("analysis_id", &self.cfg.analysis_id)
            .field("state", &self.state)
            .field("timings", &self.timings.len())
            .finish_non_exhaustive()
    }
}

impl<R: SegmentationRunner> BatchDriver<R> {
    /// Build a driver, failing if the subjects or PD image directories are
    /// missing.
    pub fn new(cfg: DriverConfig, fs: Arc<dyn FileSystem>, runner: R) -> Result<Self> {
        ensure_dir(fs.as_ref(), &cfg.subjects_dir, "Subjects directory")?;
        ensure_dir(fs.as_ref(), &cfg.pd_images_dir, "PD images directory")?;

        if cfg.kinds.contains(&SegmentationKind::Hypothalamus) {
            warn!("hypothalamus segmentation is not available with the current toolchain; it will be skipped");
        }

        Ok(Self {
            cfg,
            fs,
            runner,
            notifier: Box::new(NoopNotifier),
            state: DriverState::Idle,
            timings: TimingSamples::new(),
        })
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn timings(&self) -> &TimingSamples {
        &self.timings
    }

    /// Process `subjects` in order.
    ///
    /// Returns an error only if the list is empty, in which case nothing is
    /// written and the driver ends up `Aborted`.
    pub async fn run(&mut self, subjects: &[String]) -> Result<BatchSummary> {
        if subjects.is_empty() {
            self.state = DriverState::Aborted;
            return Err(FssegError::EmptySubjectList);
        }

        self.state = DriverState::Running;
        let total = subjects.len();
        let labels = self.kind_labels();
        info!(
            analysis = %self.cfg.analysis_id,
            subjects = total,
            kinds = %labels,
            started = %Local::now().format("%Y-%m-%d %H:%M:%S"),
            "running segmentation batch"
        );

        let mut summary = BatchSummary {
            subjects: total,
            ..BatchSummary::default()
        };

        for (i, raw_id) in subjects.iter().enumerate() {
            let subject = normalize_subject_id(raw_id, &self.cfg.subject_prefix);
            info!(subject = %subject, "subject {}/{}", i + 1, total);

            self.process_subject(&subject, &mut summary).await;
            self.report_progress(total - (i + 1));
        }

        self.state = DriverState::Completed;
        info!(?summary, "finished {} segmentation on {} subjects", labels, total);

        let message = format!(
            "Finished {} segmentation ({}) on {} subjects: {} ok, {} failed, {} blocked",
            labels,
            self.cfg.analysis_id,
            total,
            summary.jobs_succeeded,
            summary.jobs_failed,
            summary.jobs_blocked
        );
        if let Err(e) = self.notifier.notify(&message).await {
            warn!(error = %e, "could not deliver completion notification");
        }

        Ok(summary)
    }

    /// Describe what `run` would do, without invoking or writing anything.
    pub fn plan(&self, subjects: &[String]) -> Vec<PlannedJob> {
        let fs = self.fs.as_ref();
        let mut jobs = Vec::new();

        for raw_id in subjects {
            let subject = normalize_subject_id(raw_id, &self.cfg.subject_prefix);
            let mut companion: Option<std::result::Result<PathBuf, CompanionError>> = None;

            for &kind in &self.cfg.kinds {
                let action = if kind == SegmentationKind::Hypothalamus {
                    PlannedAction::Unavailable
                } else {
                    match self.precheck(&subject, kind) {
                        Err(e) => PlannedAction::Blocked(e.to_string()),
                        Ok(status) if status.is_handled() => PlannedAction::Skip(status),
                        Ok(_) => {
                            let image = if kind.needs_companion() {
                                match companion
                                    .get_or_insert_with(|| resolve_companion(fs, &self.cfg, &subject))
                                {
                                    Ok(path) => Some(path.clone()),
                                    Err(e) => {
                                        jobs.push(PlannedJob {
                                            subject: subject.clone(),
                                            kind,
                                            action: PlannedAction::Blocked(e.to_string()),
                                        });
                                        continue;
                                    }
                                }
                            } else {
                                None
                            };
                            match build_command(kind, &subject, image.as_deref(), &self.cfg) {
                                Some(spec) => PlannedAction::Run(spec),
                                None => PlannedAction::Unavailable,
                            }
                        }
                    }
                };
                jobs.push(PlannedJob {
                    subject: subject.clone(),
                    kind,
                    action,
                });
            }
        }

        jobs
    }

    /// Skip-existing aware precheck. With skipping off, only the subject
    /// directory is verified.
    fn precheck(&self, subject: &str, kind: SegmentationKind) -> Result<PrecheckStatus> {
        if self.cfg.skip_existing {
            precheck::check(self.fs.as_ref(), &self.cfg, subject, kind)
        } else {
            let dir = self.cfg.subject_dir(subject);
            if self.fs.is_dir(&dir) {
                Ok(PrecheckStatus::Pending)
            } else {
                Err(FssegError::SubjectMissing(dir))
            }
        }
    }

    async fn process_subject(&mut self, subject: &str, summary: &mut BatchSummary) {
        let mut pending = Vec::new();
        let mut handled = 0;
        let mut dir_missing = false;

        for &kind in &self.cfg.kinds {
            if kind == SegmentationKind::Hypothalamus {
                debug!(subject = %subject, "hypothalamus segmentation unavailable; skipping");
                summary.jobs_unavailable += 1;
                continue;
            }
            match self.precheck(subject, kind) {
                Ok(status) if status.is_handled() => {
                    info!(subject = %subject, kind = %kind, ?status, "already handled, skipping");
                    summary.jobs_skipped += 1;
                    handled += 1;
                }
                Ok(_) => pending.push(kind),
                Err(FssegError::SubjectMissing(dir)) => {
                    if !dir_missing {
                        warn!(subject = %subject, dir = ?dir, "subject directory does not exist");
                        result_log::log_failure_best_effort(
                            self.fs.as_ref(),
                            &self.cfg,
                            subject,
                            FailureCategory::SubjectDirMissing,
                        );
                        dir_missing = true;
                    }
                    summary.jobs_blocked += 1;
                }
                Err(e) => {
                    warn!(subject = %subject, kind = %kind, error = %e, "precheck failed");
                    summary.jobs_blocked += 1;
                }
            }
        }

        if dir_missing {
            return;
        }

        if pending.is_empty() {
            if handled > 0 {
                info!(subject = %subject, "subject has been processed before, skipping");
                summary.subjects_skipped += 1;
            } else {
                info!(subject = %subject, "no runnable segmentation for subject");
            }
            return;
        }

        let mut companion: Option<std::result::Result<PathBuf, CompanionError>> = None;
        let mut started: Option<Instant> = None;

        for kind in pending {
            let image = if kind.needs_companion() {
                let resolved = companion.get_or_insert_with(|| {
                    let res = resolve_companion(self.fs.as_ref(), &self.cfg, subject);
                    if let Err(ref e) = res {
                        warn!(subject = %subject, error = %e, "PD image unusable");
                        result_log::log_failure_best_effort(
                            self.fs.as_ref(),
                            &self.cfg,
                            subject,
                            FailureCategory::from(e),
                        );
                    }
                    res
                });
                match resolved {
                    Ok(path) => Some(path.clone()),
                    Err(_) => {
                        summary.jobs_blocked += 1;
                        continue;
                    }
                }
            } else {
                None
            };

            let Some(spec) = build_command(kind, subject, image.as_deref(), &self.cfg) else {
                continue;
            };

            if started.is_none() {
                started = Some(Instant::now());
            }
            info!(subject = %subject, kind = kind.label(), "running segmentation");

            if self.invoke(subject, kind, spec).await {
                summary.jobs_succeeded += 1;
            } else {
                summary.jobs_failed += 1;
            }
        }

        if let Some(started) = started {
            let elapsed = started.elapsed();
            self.timings.push(elapsed);
            info!(
                subject = %subject,
                minutes = elapsed.as_secs_f64() / 60.0,
                "finished subject"
            );
        }
    }

    /// Run one tool; returns whether it succeeded. Failures are recorded.
    async fn invoke(&mut self, subject: &str, kind: SegmentationKind, spec: CommandSpec) -> bool {
        let stderr = match self.runner.run(spec).await {
            Ok(outcome) if outcome.success() => return true,
            Ok(outcome) => {
                warn!(
                    subject = %subject,
                    kind = kind.label(),
                    exit_code = ?outcome.exit_code,
                    timed_out = outcome.timed_out,
                    "segmentation failed"
                );
                outcome.stderr
            }
            Err(e) => {
                warn!(subject = %subject, kind = kind.label(), error = %e, "could not run segmentation");
                format!("{e:#}\n")
            }
        };

        if let Err(e) =
            result_log::record_tool_failure(self.fs.as_ref(), &self.cfg, subject, kind, &stderr)
        {
            warn!(subject = %subject, error = %e, "could not record segmentation failure");
        }
        false
    }

    fn report_progress(&self, remaining: usize) {
        if let Some((median, eta)) = self.timings.estimate(remaining, Local::now()) {
            info!(
                median_minutes = median.as_secs_f64() / 60.0,
                remaining,
                eta = %eta.format("%Y-%m-%d %H:%M:%S"),
                "progress"
            );
        }
    }

    fn kind_labels(&self) -> String {
        self.cfg
            .kinds
            .iter()
            .map(|k| k.label())
            .collect::<Vec<_>>()
            .join("+")
    }
}

fn ensure_dir(fs: &dyn FileSystem, path: &std::path::Path, what: &str) -> Result<()> {
    if fs.is_dir(path) {
        Ok(())
    } else {
        Err(FssegError::ConfigError(format!(
            "{} does not exist: {}",
            what,
            path.display()
        )))
    }
}
