// src/config/model.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use globset::GlobMatcher;
use serde::Deserialize;

use crate::types::SegmentationKind;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// subjects_dir = "/mnt/clab/COST_mri/derivatives/freesurfer"
/// pd_images_dir = "/mnt/clab/COST_mri/derivatives/hMRI"
/// analysis_id = "cost2022"
/// kinds = ["hpc", "thn"]
///
/// [notify]
/// enabled = true
/// ```
///
/// Only the three directory/label keys are required; everything else has a
/// default. Use [`ConfigFile`] (via `TryFrom`) for the validated form.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    pub config: ConfigSection,

    #[serde(default)]
    pub notify: NotifySection,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Reconstruction subjects directory (one sub-directory per subject).
    pub subjects_dir: String,

    /// Root of the proton-density images (`<dir>/<subject>/Results/*PD.nii`).
    pub pd_images_dir: String,

    /// Label distinguishing this batch's outputs from other runs.
    pub analysis_id: String,

    /// Thread-count hint handed to the external tool.
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Skip subjects that were already processed or previously failed.
    #[serde(default = "default_skip_existing")]
    pub skip_existing: bool,

    /// Segmentation kinds to run. Order in the file does not matter.
    #[serde(default = "default_kinds")]
    pub kinds: Vec<SegmentationKind>,

    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,

    /// Glob selecting the companion image inside `Results/`.
    #[serde(default = "default_companion_pattern")]
    pub companion_pattern: String,

    /// File name under `<subject>/mri/` whose presence marks a subject as done.
    ///
    /// Supports `{analysis_id}` and `{kind}` placeholders.
    #[serde(default = "default_output_template")]
    pub output_template: String,

    /// Directory receiving the aggregate log and the error markers.
    #[serde(default = "default_work_dir")]
    pub work_dir: String,

    /// Optional upper bound per tool invocation, e.g. `"48h"`.
    #[serde(default)]
    pub invocation_timeout: Option<String>,
}

fn default_threads() -> usize {
    40
}

fn default_skip_existing() -> bool {
    true
}

fn default_kinds() -> Vec<SegmentationKind> {
    vec![SegmentationKind::Hippocampus]
}

fn default_subject_prefix() -> String {
    "sub-".to_string()
}

fn default_companion_pattern() -> String {
    "*PD.nii".to_string()
}

fn default_output_template() -> String {
    "{analysis_id}.FSspace.mgz".to_string()
}

fn default_work_dir() -> String {
    ".".to_string()
}

impl ConfigSection {
    /// A section with every optional key at its default.
    pub fn new(
        subjects_dir: impl Into<String>,
        pd_images_dir: impl Into<String>,
        analysis_id: impl Into<String>,
    ) -> Self {
        Self {
            subjects_dir: subjects_dir.into(),
            pd_images_dir: pd_images_dir.into(),
            analysis_id: analysis_id.into(),
            threads: default_threads(),
            skip_existing: default_skip_existing(),
            kinds: default_kinds(),
            subject_prefix: default_subject_prefix(),
            companion_pattern: default_companion_pattern(),
            output_template: default_output_template(),
            work_dir: default_work_dir(),
            invocation_timeout: None,
        }
    }
}

/// `[notify]` section.
///
/// Credentials may be left out of the file and supplied through
/// `FSSEG_TELEGRAM_TOKEN` / `FSSEG_TELEGRAM_CHAT_ID`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct NotifySection {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub telegram_token: Option<String>,

    #[serde(default)]
    pub telegram_chat_id: Option<String>,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub driver: DriverConfig,
    pub notify: NotifySection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(driver: DriverConfig, notify: NotifySection) -> Self {
        Self { driver, notify }
    }
}

/// Resolved settings consumed by the batch driver.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub subjects_dir: PathBuf,
    pub pd_images_dir: PathBuf,
    pub analysis_id: String,
    pub threads: usize,
    pub skip_existing: bool,
    /// Sorted into run order, no duplicates.
    pub kinds: Vec<SegmentationKind>,
    pub subject_prefix: String,
    pub companion_pattern: String,
    pub companion_matcher: GlobMatcher,
    pub output_template: String,
    pub work_dir: PathBuf,
    pub invocation_timeout: Option<Duration>,
}

impl DriverConfig {
    /// Aggregate failure log, one per analysis label.
    pub fn errlog_path(&self) -> PathBuf {
        self.work_dir.join(format!("{}_errlog.txt", self.analysis_id))
    }

    /// Per-subject, per-kind error marker holding the tool's stderr.
    pub fn marker_path(&self, subject_id: &str, kind: SegmentationKind) -> PathBuf {
        self.work_dir
            .join(format!("{}_{}_seg_err.txt", subject_id, kind.tag()))
    }

    pub fn subject_dir(&self, subject_id: &str) -> PathBuf {
        self.subjects_dir.join(subject_id)
    }

    /// Expected output whose presence means `kind` already ran for the subject.
    pub fn output_path(&self, subject_id: &str, kind: SegmentationKind) -> PathBuf {
        let name = self
            .output_template
            .replace("{analysis_id}", &self.analysis_id)
            .replace("{kind}", kind.tag());
        self.subject_dir(subject_id).join("mri").join(name)
    }

    /// Directory searched for the companion PD image.
    pub fn companion_dir(&self, subject_id: &str) -> PathBuf {
        self.pd_images_dir.join(subject_id).join("Results")
    }

    /// Whether a file name is a companion image candidate.
    pub fn is_companion(&self, file_name: &Path) -> bool {
        self.companion_matcher.is_match(file_name)
    }
}
