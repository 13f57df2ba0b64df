// src/exec/command.rs

//! Command templates for each segmentation kind.

use std::fmt;
use std::path::Path;

use crate::config::DriverConfig;
use crate::types::SegmentationKind;

/// Environment variable the segmentation tools read their thread count from.
pub const THREADS_ENV: &str = "ITK_GLOBAL_DEFAULT_NUMBER_OF_THREADS";

/// A fully resolved external invocation: program, arguments and the extra
/// environment it runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.env {
            write!(f, "{key}={value} ")?;
        }
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Build the invocation for `kind` on `subject_id`.
///
/// `companion` must be `Some` for kinds where
/// [`SegmentationKind::needs_companion`] holds; it is ignored otherwise.
/// Returns `None` for kinds that have no runnable tool yet (hypothalamus) and
/// for companion-requiring kinds called without a companion image.
pub fn build_command(
    kind: SegmentationKind,
    subject_id: &str,
    companion: Option<&Path>,
    cfg: &DriverConfig,
) -> Option<CommandSpec> {
    let subjects_dir = cfg.subjects_dir.display().to_string();
    let threads = cfg.threads.to_string();

    let (program, args) = match kind {
        SegmentationKind::Hippocampus => {
            let pd = companion?.display().to_string();
            (
                "segmentHA_T2.sh",
                vec![
                    subject_id.to_string(),
                    pd,
                    cfg.analysis_id.clone(),
                    "1".to_string(),
                    subjects_dir.clone(),
                ],
            )
        }
        SegmentationKind::Thalamus => {
            let pd = companion?.display().to_string();
            (
                "segmentThalamicNuclei.sh",
                vec![
                    subject_id.to_string(),
                    subjects_dir.clone(),
                    pd,
                    cfg.analysis_id.clone(),
                    "t2".to_string(),
                ],
            )
        }
        SegmentationKind::Brainstem => (
            "segmentBS.sh",
            vec![subject_id.to_string(), subjects_dir.clone()],
        ),
        SegmentationKind::Hypothalamus => return None,
        SegmentationKind::SubcorticalLimbic => (
            "mri_sclimbic_seg",
            vec![
                "--s".to_string(),
                subject_id.to_string(),
                "--sd".to_string(),
                subjects_dir.clone(),
                "--threads".to_string(),
                threads.clone(),
            ],
        ),
    };

    Some(CommandSpec {
        program: program.to_string(),
        args,
        env: vec![
            (THREADS_ENV.to_string(), threads),
            ("SUBJECTS_DIR".to_string(), subjects_dir),
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigFile, ConfigSection, NotifySection, RawConfigFile};
    use std::path::PathBuf;

    fn cfg() -> DriverConfig {
        let mut section = ConfigSection::new("/fs/subs", "/fs/pds", "cost2022");
        section.threads = 8;
        ConfigFile::try_from(RawConfigFile {
            config: section,
            notify: NotifySection::default(),
        })
        .unwrap()
        .driver
    }

    #[test]
    fn hippocampus_takes_pd_image_before_analysis_id() {
        let pd = PathBuf::from("/fs/pds/sub-01/Results/s_PD.nii");
        let spec = build_command(SegmentationKind::Hippocampus, "sub-01", Some(&pd), &cfg()).unwrap();

        assert_eq!(spec.program, "segmentHA_T2.sh");
        assert_eq!(
            spec.args,
            vec!["sub-01", "/fs/pds/sub-01/Results/s_PD.nii", "cost2022", "1", "/fs/subs"]
        );
        assert!(spec.env.contains(&(THREADS_ENV.to_string(), "8".to_string())));
    }

    #[test]
    fn thalamus_takes_subjects_dir_first() {
        let pd = PathBuf::from("/fs/pds/sub-01/Results/s_PD.nii");
        let spec = build_command(SegmentationKind::Thalamus, "sub-01", Some(&pd), &cfg()).unwrap();

        assert_eq!(spec.program, "segmentThalamicNuclei.sh");
        assert_eq!(
            spec.args,
            vec!["sub-01", "/fs/subs", "/fs/pds/sub-01/Results/s_PD.nii", "cost2022", "t2"]
        );
    }

    #[test]
    fn companion_kinds_need_an_image() {
        assert!(build_command(SegmentationKind::Hippocampus, "sub-01", None, &cfg()).is_none());
        assert!(build_command(SegmentationKind::Brainstem, "sub-01", None, &cfg()).is_some());
    }

    #[test]
    fn hypothalamus_has_no_command() {
        assert!(build_command(SegmentationKind::Hypothalamus, "sub-01", None, &cfg()).is_none());
    }

    #[test]
    fn display_renders_env_then_command_line() {
        let spec = build_command(SegmentationKind::Brainstem, "sub-02", None, &cfg()).unwrap();
        assert_eq!(
            spec.to_string(),
            "ITK_GLOBAL_DEFAULT_NUMBER_OF_THREADS=8 SUBJECTS_DIR=/fs/subs segmentBS.sh sub-02 /fs/subs"
        );
    }
}
