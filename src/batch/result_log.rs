// src/batch/result_log.rs

//! Append-only failure log plus per-subject error markers.
//!
//! Lines look like `2024-03-01 12:00:00.123456\tsub-01\tPD image does not exist`.
//! Only one driver writes a given log at a time; there is no locking.

use std::fmt;

use chrono::Local;
use tracing::warn;

use crate::batch::companion::CompanionError;
use crate::config::DriverConfig;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::types::SegmentationKind;

/// Fixed messages written to the aggregate log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    SubjectDirMissing,
    CompanionMissing,
    CompanionAmbiguous,
    CompanionUnreadable,
    SegmentationFailed(SegmentationKind),
}

impl From<&CompanionError> for FailureCategory {
    fn from(err: &CompanionError) -> Self {
        match err {
            CompanionError::Missing => FailureCategory::CompanionMissing,
            CompanionError::Ambiguous(_) => FailureCategory::CompanionAmbiguous,
            CompanionError::Unreadable(_) => FailureCategory::CompanionUnreadable,
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCategory::SubjectDirMissing => f.write_str("Subject dir does not exist"),
            FailureCategory::CompanionMissing => f.write_str("PD image does not exist"),
            FailureCategory::CompanionAmbiguous => f.write_str("Multiple PD images"),
            FailureCategory::CompanionUnreadable => f.write_str("PD image directory unreadable"),
            FailureCategory::SegmentationFailed(kind) => {
                write!(f, "{} segmentation failed", kind.label())
            }
        }
    }
}

/// Append one line to `<work_dir>/<analysis_id>_errlog.txt`.
pub fn log_failure(
    fs: &dyn FileSystem,
    cfg: &DriverConfig,
    subject_id: &str,
    category: FailureCategory,
) -> Result<()> {
    let line = format!(
        "{}\t{}\t{}\n",
        Local::now().format("%Y-%m-%d %H:%M:%S%.6f"),
        subject_id,
        category
    );
    fs.append(&cfg.errlog_path(), line.as_bytes())?;
    Ok(())
}

/// Record a failed tool run: one aggregate log line plus the captured stderr
/// in `<subject>_<kind>_seg_err.txt`, which also stops later runs from
/// retrying this subject and kind.
pub fn record_tool_failure(
    fs: &dyn FileSystem,
    cfg: &DriverConfig,
    subject_id: &str,
    kind: SegmentationKind,
    stderr: &str,
) -> Result<()> {
    log_failure(fs, cfg, subject_id, FailureCategory::SegmentationFailed(kind))?;
    fs.write(&cfg.marker_path(subject_id, kind), stderr.as_bytes())?;
    Ok(())
}

/// Like [`log_failure`] but a write error is only logged; the batch carries on.
pub(crate) fn log_failure_best_effort(
    fs: &dyn FileSystem,
    cfg: &DriverConfig,
    subject_id: &str,
    category: FailureCategory,
) {
    if let Err(e) = log_failure(fs, cfg, subject_id, category) {
        warn!(subject = %subject_id, error = %e, "could not write to error log");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigFile, ConfigSection, NotifySection, RawConfigFile};
    use crate::fs::mock::MockFileSystem;

    fn cfg() -> DriverConfig {
        let mut section = ConfigSection::new("/subs", "/pds", "cost2022");
        section.work_dir = "/work".to_string();
        ConfigFile::try_from(RawConfigFile {
            config: section,
            notify: NotifySection::default(),
        })
        .unwrap()
        .driver
    }

    #[test]
    fn log_lines_are_tab_separated_and_appended() {
        let fs = MockFileSystem::new();
        let cfg = cfg();

        log_failure(&fs, &cfg, "sub-01", FailureCategory::CompanionMissing).unwrap();
        log_failure(&fs, &cfg, "sub-02", FailureCategory::CompanionAmbiguous).unwrap();

        let log = fs.read_to_string(&cfg.errlog_path()).unwrap();
        let lines: Vec<Vec<&str>> = log.lines().map(|l| l.split('\t').collect()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0][1..], ["sub-01", "PD image does not exist"]);
        assert_eq!(lines[1][1..], ["sub-02", "Multiple PD images"]);
    }

    #[test]
    fn tool_failure_writes_marker_with_stderr() {
        let fs = MockFileSystem::new();
        let cfg = cfg();

        record_tool_failure(&fs, &cfg, "sub-01", SegmentationKind::Thalamus, "matlab crashed\n")
            .unwrap();

        assert_eq!(
            fs.read_to_string(&cfg.marker_path("sub-01", SegmentationKind::Thalamus))
                .unwrap(),
            "matlab crashed\n"
        );
        assert!(fs
            .read_to_string(&cfg.errlog_path())
            .unwrap()
            .ends_with("\tsub-01\tTHN segmentation failed\n"));
    }
}
