// src/batch/precheck.rs

//! "Has this subject already been handled?" checks used for resuming.

use crate::config::DriverConfig;
use crate::errors::{FssegError, Result};
use crate::fs::FileSystem;
use crate::types::SegmentationKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecheckStatus {
    /// An error marker from an earlier run exists.
    PreviouslyFailed,
    /// The expected output file is present.
    AlreadyProcessed,
    Pending,
}

impl PrecheckStatus {
    /// Whether the job should be skipped on resume.
    pub fn is_handled(self) -> bool {
        !matches!(self, PrecheckStatus::Pending)
    }
}

/// Classify `(subject_id, kind)`.
///
/// The error marker is consulted first and short-circuits everything else.
/// A missing subject directory is reported as [`FssegError::SubjectMissing`],
/// never as processed.
pub fn check(
    fs: &dyn FileSystem,
    cfg: &DriverConfig,
    subject_id: &str,
    kind: SegmentationKind,
) -> Result<PrecheckStatus> {
    if fs.exists(&cfg.marker_path(subject_id, kind)) {
        return Ok(PrecheckStatus::PreviouslyFailed);
    }

    let subject_dir = cfg.subject_dir(subject_id);
    if !fs.is_dir(&subject_dir) {
        return Err(FssegError::SubjectMissing(subject_dir));
    }

    if fs.exists(&cfg.output_path(subject_id, kind)) {
        Ok(PrecheckStatus::AlreadyProcessed)
    } else {
        Ok(PrecheckStatus::Pending)
    }
}

/// Boolean form of [`check`]: `true` means skip.
pub fn is_handled(
    fs: &dyn FileSystem,
    cfg: &DriverConfig,
    subject_id: &str,
    kind: SegmentationKind,
) -> Result<bool> {
    check(fs, cfg, subject_id, kind).map(PrecheckStatus::is_handled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigFile, ConfigSection, NotifySection, RawConfigFile};
    use crate::fs::mock::MockFileSystem;
    use std::path::PathBuf;

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
    fn marker_short_circuits_without_further_access() {
        let fs = MockFileSystem::new();
        fs.add_file("/work/sub-01_hpc_seg_err.txt", b"boom".to_vec());
        fs.clear_accessed();

        let status = check(&fs, &cfg(), "sub-01", SegmentationKind::Hippocampus).unwrap();

        assert_eq!(status, PrecheckStatus::PreviouslyFailed);
        assert_eq!(
            fs.accessed_paths(),
            vec![PathBuf::from("/work/sub-01_hpc_seg_err.txt")]
        );
    }

    #[test]
    fn marker_for_another_kind_does_not_count() {
        let fs = MockFileSystem::new();
        fs.add_dir("/subs/sub-01/mri");
        fs.add_file("/work/sub-01_thn_seg_err.txt", b"boom".to_vec());

        assert!(!is_handled(&fs, &cfg(), "sub-01", SegmentationKind::Hippocampus).unwrap());
        assert!(is_handled(&fs, &cfg(), "sub-01", SegmentationKind::Thalamus).unwrap());
    }

    #[test]
    fn output_file_marks_processed() {
        let fs = MockFileSystem::new();
        fs.add_file("/subs/sub-01/mri/cost2022.FSspace.mgz", b"mgz".to_vec());

        assert_eq!(
            check(&fs, &cfg(), "sub-01", SegmentationKind::Hippocampus).unwrap(),
            PrecheckStatus::AlreadyProcessed
        );
    }

    #[test]
    fn missing_subject_dir_is_an_error() {
        let fs = MockFileSystem::new();
        fs.add_dir("/subs");

        match check(&fs, &cfg(), "sub-09", SegmentationKind::Hippocampus) {
            Err(FssegError::SubjectMissing(path)) => {
                assert_eq!(path, PathBuf::from("/subs/sub-09"))
            }
            other => panic!("expected SubjectMissing, got {:?}", other),
        }
    }
}
