// src/batch/companion.rs

//! Locating the proton-density image that some kinds take as extra input.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::DriverConfig;
use crate::fs::FileSystem;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompanionError {
    #[error("PD image does not exist")]
    Missing,

    #[error("Multiple PD images")]
    Ambiguous(Vec<PathBuf>),

    #[error("PD image directory unreadable: {0}")]
    Unreadable(String),
}

/// Find the single companion image for `subject_id`.
///
/// A missing `Results` directory counts as [`CompanionError::Missing`]; one
/// that exists but cannot be listed is [`CompanionError::Unreadable`].
pub fn resolve_companion(
    fs: &dyn FileSystem,
    cfg: &DriverConfig,
    subject_id: &str,
) -> Result<PathBuf, CompanionError> {
    let dir = cfg.companion_dir(subject_id);
    if !fs.exists(&dir) {
        return Err(CompanionError::Missing);
    }
    let entries = fs
        .read_dir(&dir)
        .map_err(|e| CompanionError::Unreadable(format!("{e:#}")))?;

    let mut matches: Vec<PathBuf> = entries
        .into_iter()
        .filter(|p| p.file_name().is_some_and(|name| cfg.is_companion(Path::new(name))))
        .collect();
    matches.sort();

    match matches.len() {
        0 => Err(CompanionError::Missing),
        1 => Ok(matches.remove(0)),
        _ => Err(CompanionError::Ambiguous(matches)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigFile, ConfigSection, NotifySection, RawConfigFile};
    use crate::fs::mock::MockFileSystem;

    fn cfg() -> DriverConfig {
        ConfigFile::try_from(RawConfigFile {
            config: ConfigSection::new("/subs", "/pds", "cost2022"),
            notify: NotifySection::default(),
        })
        .unwrap()
        .driver
    }

    #[test]
    fn single_match_is_returned() {
        let fs = MockFileSystem::new();
        fs.add_file("/pds/sub-01/Results/s01_PD.nii", b"".to_vec());
        fs.add_file("/pds/sub-01/Results/s01_T1.nii", b"".to_vec());

        assert_eq!(
            resolve_companion(&fs, &cfg(), "sub-01"),
            Ok(PathBuf::from("/pds/sub-01/Results/s01_PD.nii"))
        );
    }

    #[test]
    fn none_and_many_are_distinct_errors() {
        let fs = MockFileSystem::new();
        fs.add_file("/pds/sub-01/Results/s01_T1.nii", b"".to_vec());
        fs.add_file("/pds/sub-02/Results/a_PD.nii", b"".to_vec());
        fs.add_file("/pds/sub-02/Results/b_PD.nii", b"".to_vec());

        assert_eq!(resolve_companion(&fs, &cfg(), "sub-01"), Err(CompanionError::Missing));
        assert!(matches!(
            resolve_companion(&fs, &cfg(), "sub-02"),
            Err(CompanionError::Ambiguous(ref found)) if found.len() == 2
        ));
        assert_eq!(resolve_companion(&fs, &cfg(), "sub-03"), Err(CompanionError::Missing));
    }

    #[test]
    fn unlistable_results_dir_is_not_reported_as_missing() {
        let fs = MockFileSystem::new();
        fs.add_file("/pds/sub-01/Results", b"not a directory".to_vec());

        assert!(matches!(
            resolve_companion(&fs, &cfg(), "sub-01"),
            Err(CompanionError::Unreadable(ref msg)) if msg.contains("Results")
        ));
    }

    #[test]
    fn compressed_images_do_not_match_default_pattern() {
        let fs = MockFileSystem::new();
        fs.add_file("/pds/sub-01/Results/s01_PD.nii.gz", b"".to_vec());

        assert_eq!(resolve_companion(&fs, &cfg(), "sub-01"), Err(CompanionError::Missing));
    }
}
