// src/batch/status.rs

//! Summary of what has and has not been processed for an analysis.

use std::fmt::Write as _;

use anyhow::Context;

use crate::batch::discovery::discover_subjects;
use crate::batch::precheck::{self, PrecheckStatus};
use crate::config::DriverConfig;
use crate::errors::{FssegError, Result};
use crate::fs::FileSystem;
use crate::types::SegmentationKind;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindStatus {
    pub processed: Vec<String>,
    pub failed: Vec<String>,
    pub pending: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub analysis_id: String,
    pub subjects_dir: String,
    pub total: usize,
    pub kinds: Vec<(SegmentationKind, KindStatus)>,
    /// Error marker file names found in the work directory.
    pub error_markers: Vec<String>,
}

/// Classify every discovered subject for each enabled kind.
pub fn collect_status(fs: &dyn FileSystem, cfg: &DriverConfig) -> Result<StatusReport> {
    let subjects = discover_subjects(fs, &cfg.subjects_dir, &cfg.subject_prefix)?;

    let mut kinds = Vec::new();
    for &kind in &cfg.kinds {
        let mut status = KindStatus::default();
        for subject in &subjects {
            match precheck::check(fs, cfg, subject, kind) {
                Ok(PrecheckStatus::PreviouslyFailed) => status.failed.push(subject.clone()),
                Ok(PrecheckStatus::AlreadyProcessed) => status.processed.push(subject.clone()),
                Ok(PrecheckStatus::Pending) => status.pending.push(subject.clone()),
                // Discovered entries that are not directories.
                Err(FssegError::SubjectMissing(_)) => status.pending.push(subject.clone()),
                Err(e) => return Err(e),
            }
        }
        kinds.push((kind, status));
    }

    let mut error_markers: Vec<String> = if fs.is_dir(&cfg.work_dir) {
        fs.read_dir(&cfg.work_dir)
            .with_context(|| format!("listing error markers in {:?}", cfg.work_dir))?
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .filter(|name| name.ends_with("_seg_err.txt"))
            .map(str::to_string)
            .collect()
    } else {
        Vec::new()
    };
    error_markers.sort();

    Ok(StatusReport {
        analysis_id: cfg.analysis_id.clone(),
        subjects_dir: cfg.subjects_dir.display().to_string(),
        total: subjects.len(),
        kinds,
        error_markers,
    })
}

impl StatusReport {
    /// Plain-text rendering; `list_ids` adds the subject IDs in each bucket.
    pub fn render(&self, list_ids: bool) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Data info for {}.", self.analysis_id);
        let _ = writeln!(
            out,
            "Found a total of {} subjects in {}.",
            self.total, self.subjects_dir
        );

        for (kind, status) in &self.kinds {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}:", kind.label());
            push_bucket(&mut out, "processed", &status.processed, list_ids);
            push_bucket(&mut out, "failed previously", &status.failed, list_ids);
            push_bucket(&mut out, "not processed", &status.pending, list_ids);
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "Found {} error logs.", self.error_markers.len());
        if list_ids {
            for name in &self.error_markers {
                let _ = writeln!(out, "    {name}");
            }
        }
        out
    }
}

fn push_bucket(out: &mut String, label: &str, ids: &[String], list_ids: bool) {
    let _ = writeln!(out, "  {} subjects {}", ids.len(), label);
    if list_ids {
        for id in ids {
            let _ = writeln!(out, "    {id}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigFile, ConfigSection, NotifySection, RawConfigFile};
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn subjects_are_bucketed_per_kind() {
        let mut section = ConfigSection::new("/subs", "/pds", "cost2022");
        section.work_dir = "/work".to_string();
        section.kinds = vec![SegmentationKind::Hippocampus, SegmentationKind::Thalamus];
        let cfg = ConfigFile::try_from(RawConfigFile {
            config: section,
            notify: NotifySection::default(),
        })
        .unwrap()
        .driver;

        let fs = MockFileSystem::new();
        fs.add_file("/subs/sub-01/mri/cost2022.FSspace.mgz", b"".to_vec());
        fs.add_dir("/subs/sub-02/mri");
        fs.add_dir("/subs/sub-03/mri");
        fs.add_file("/work/sub-02_thn_seg_err.txt", b"err".to_vec());

        let report = collect_status(&fs, &cfg).unwrap();
        assert_eq!(report.total, 3);

        let (_, hpc) = &report.kinds[0];
        assert_eq!(hpc.processed, vec!["sub-01"]);
        assert_eq!(hpc.pending, vec!["sub-02", "sub-03"]);

        let (_, thn) = &report.kinds[1];
        assert_eq!(thn.failed, vec!["sub-02"]);
        assert_eq!(report.error_markers, vec!["sub-02_thn_seg_err.txt"]);

        let text = report.render(true);
        assert!(text.contains("Found a total of 3 subjects"));
        assert!(text.contains("    sub-02_thn_seg_err.txt"));
    }
}
