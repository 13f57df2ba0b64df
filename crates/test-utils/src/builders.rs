#![allow(dead_code)]

use fsseg::config::{ConfigFile, ConfigSection, DriverConfig, NotifySection, RawConfigFile};
use fsseg::fs::mock::MockFileSystem;
use fsseg::types::SegmentationKind;

pub const SUBJECTS_DIR: &str = "/data/freesurfer";
pub const PD_IMAGES_DIR: &str = "/data/hmri";
pub const WORK_DIR: &str = "/work";
pub const ANALYSIS_ID: &str = "cost2022";

/// Builder for `DriverConfig` to simplify test setup.
///
/// Defaults to the fixed directories above, which line up with
/// [`LabTreeBuilder`].
pub struct DriverConfigBuilder {
    section: ConfigSection,
}

impl DriverConfigBuilder {
    pub fn new() -> Self {
        let mut section = ConfigSection::new(SUBJECTS_DIR, PD_IMAGES_DIR, ANALYSIS_ID);
        section.work_dir = WORK_DIR.to_string();
        section.threads = 4;
        Self { section }
    }

    pub fn kinds(mut self, kinds: &[SegmentationKind]) -> Self {
        self.section.kinds = kinds.to_vec();
        self
    }

    pub fn skip_existing(mut self, val: bool) -> Self {
        self.section.skip_existing = val;
        self
    }

    pub fn output_template(mut self, template: &str) -> Self {
        self.section.output_template = template.to_string();
        self
    }

    pub fn work_dir(mut self, dir: &str) -> Self {
        self.section.work_dir = dir.to_string();
        self
    }

    pub fn subjects_dir(mut self, dir: &str) -> Self {
        self.section.subjects_dir = dir.to_string();
        self
    }

    pub fn pd_images_dir(mut self, dir: &str) -> Self {
        self.section.pd_images_dir = dir.to_string();
        self
    }

    pub fn build(self) -> DriverConfig {
        ConfigFile::try_from(RawConfigFile {
            config: self.section,
            notify: NotifySection::default(),
        })
        .expect("Failed to build valid config from builder")
        .driver
    }
}

impl Default for DriverConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for an in-memory lab layout:
/// `<subjects>/<id>/mri/` and `<pd>/<id>/Results/*PD.nii`.
pub struct LabTreeBuilder {
    fs: MockFileSystem,
}

impl LabTreeBuilder {
    pub fn new() -> Self {
        let fs = MockFileSystem::new();
        fs.add_dir(SUBJECTS_DIR);
        fs.add_dir(PD_IMAGES_DIR);
        Self { fs }
    }

    /// Subject with a reconstruction directory and exactly one PD image.
    pub fn subject(self, id: &str) -> Self {
        self.fs.add_dir(format!("{SUBJECTS_DIR}/{id}/mri"));
        self.fs
            .add_file(format!("{PD_IMAGES_DIR}/{id}/Results/{id}_PD.nii"), b"nii".to_vec());
        self
    }

    /// Subject with a reconstruction directory but no PD image.
    pub fn subject_without_pd(self, id: &str) -> Self {
        self.fs.add_dir(format!("{SUBJECTS_DIR}/{id}/mri"));
        self.fs.add_dir(format!("{PD_IMAGES_DIR}/{id}/Results"));
        self
    }

    /// Subject with two PD images.
    pub fn subject_with_two_pds(self, id: &str) -> Self {
        self.fs.add_dir(format!("{SUBJECTS_DIR}/{id}/mri"));
        self.fs
            .add_file(format!("{PD_IMAGES_DIR}/{id}/Results/run1_PD.nii"), b"nii".to_vec());
        self.fs
            .add_file(format!("{PD_IMAGES_DIR}/{id}/Results/run2_PD.nii"), b"nii".to_vec());
        self
    }

    /// Pre-existing output, as left by an earlier successful run.
    pub fn processed(self, id: &str) -> Self {
        self.fs.add_file(
            format!("{SUBJECTS_DIR}/{id}/mri/{ANALYSIS_ID}.FSspace.mgz"),
            b"mgz".to_vec(),
        );
        self
    }

    /// Pre-existing error marker for `kind`.
    pub fn failed_before(self, id: &str, kind: SegmentationKind) -> Self {
        self.fs
            .add_file(format!("{WORK_DIR}/{id}_{}_seg_err.txt", kind.tag()), b"old".to_vec());
        self
    }

    pub fn build(self) -> MockFileSystem {
        self.fs
    }
}

impl Default for LabTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
